//! Configuration types and defaults.

use serde::{Deserialize, Serialize};

/// Default log verbosity for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// File suffixes recognized as capability manifests.
pub fn default_manifest_suffixes() -> Vec<String> {
    vec![
        ".hook.yaml".to_string(),
        ".hook.yml".to_string(),
        ".hook.json".to_string(),
    ]
}

// Default value functions for serde
pub(crate) fn default_true() -> bool {
    true
}
