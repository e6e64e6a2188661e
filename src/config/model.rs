//! AgentConfig struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for extraction and dispatch.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    // =========================================================================
    // Extraction settings
    // =========================================================================
    /// Directories or zip bundles holding handler manifests.
    pub roots: Vec<PathBuf>,

    /// Glob patterns over logical handler names; empty includes everything.
    pub include: Vec<String>,

    /// File suffixes recognized as manifests (leading dot required).
    #[serde(default = "default_manifest_suffixes")]
    pub manifest_suffixes: Vec<String>,

    // =========================================================================
    // Dispatch settings
    // =========================================================================
    /// Cache handler resolution per (target type, method) pair.
    #[serde(default = "default_true")]
    pub cache_dispatch: bool,

    // =========================================================================
    // Logging
    // =========================================================================
    /// Default log level when `HOOKSCOPE_LOG` is not set.
    pub log_level: LogLevel,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            include: Vec::new(),
            manifest_suffixes: default_manifest_suffixes(),
            cache_dispatch: default_true(),
            log_level: LogLevel::default(),
        }
    }
}
