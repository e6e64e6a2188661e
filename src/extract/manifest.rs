//! Capability manifest format.
//!
//! A manifest is the build-time description of one handler, emitted next to
//! (or instead of) the handler's compiled code. Extraction only ever reads
//! manifests, so it never needs the handler or the types it references.
//!
//! ```yaml
//! handler: com.example.hooks.ServletHook
//! instruments:
//!   - javax.servlet.Servlet
//! skip_nested_calls: true
//! entry_points:
//!   - name: before
//!     before: [service]
//!     parameters:
//!       - type: javax.servlet.ServletRequest
//!       - type: javax.servlet.ServletResponse
//!   - name: after
//!     after: [service]
//!     parameters:
//!       - type: javax.servlet.ServletRequest
//!       - type: javax.servlet.ServletResponse
//!       - type: java.lang.Throwable
//!         role: thrown
//! ```

use crate::config::types::default_true;
use crate::error::{HookError, Result};
use crate::signature::{CapabilityKind, HandlerCapability, Parameter, ParameterRole, canonical_type_name};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// On-disk encoding of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    /// Pick the encoding from a resource name.
    pub fn for_name(name: &str) -> Self {
        if name.ends_with(".json") {
            ManifestFormat::Json
        } else {
            ManifestFormat::Yaml
        }
    }
}

/// Parsed handler manifest.
///
/// Unknown fields are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerManifest {
    /// Fully qualified handler name, used to resolve the handler at dispatch.
    pub handler: String,

    /// Types whose methods this handler observes.
    #[serde(default)]
    pub instruments: Vec<String>,

    /// Whether re-entrant calls on the same thread are hidden from the handler.
    #[serde(default = "default_true")]
    pub skip_nested_calls: bool,

    /// Logical name of a manifest whose entry points are inherited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    #[serde(default)]
    pub entry_points: Vec<EntryPointManifest>,
}

/// One method on the handler that may carry Before and/or After bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPointManifest {
    /// Name of the method on the handler (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Logical method names this entry point runs before.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,

    /// Logical method names this entry point runs after.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,

    #[serde(default)]
    pub parameters: Vec<ParameterManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterManifest {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default, skip_serializing_if = "is_plain")]
    pub role: ParameterRole,
}

fn is_plain(role: &ParameterRole) -> bool {
    *role == ParameterRole::Plain
}

impl HandlerManifest {
    /// Parse a manifest from text.
    pub fn parse(content: &str, format: ManifestFormat) -> Result<Self> {
        let manifest: HandlerManifest = match format {
            ManifestFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| HookError::Manifest(format!("invalid YAML: {}", e)))?,
            ManifestFormat::Json => serde_json::from_str(content)
                .map_err(|e| HookError::Manifest(format!("invalid JSON: {}", e)))?,
        };

        if manifest.handler.trim().is_empty() {
            return Err(HookError::Manifest("handler name is empty".to_string()));
        }
        Ok(manifest)
    }

    /// Serialize the manifest in the given format.
    pub fn render(&self, format: ManifestFormat) -> Result<String> {
        match format {
            ManifestFormat::Yaml => serde_yaml::to_string(self)
                .map_err(|e| HookError::Manifest(format!("failed to serialize manifest: {}", e))),
            ManifestFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| HookError::Manifest(format!("failed to serialize manifest: {}", e))),
        }
    }

    /// Canonical target type names.
    pub fn target_types(&self) -> Result<BTreeSet<String>> {
        self.instruments
            .iter()
            .map(|t| canonical_type_name(t))
            .collect()
    }
}

impl EntryPointManifest {
    /// Capabilities declared by this entry point (zero, one or two).
    pub fn capabilities(&self) -> Result<Vec<HandlerCapability>> {
        let parameters: Vec<Parameter> = self
            .parameters
            .iter()
            .map(|p| Parameter {
                type_name: p.type_name.clone(),
                role: p.role,
            })
            .collect();

        let mut capabilities = Vec::new();
        if !self.before.is_empty() {
            capabilities.push(HandlerCapability::new(
                CapabilityKind::Before,
                self.before.iter().cloned(),
                parameters.clone(),
            )?);
        }
        if !self.after.is_empty() {
            capabilities.push(HandlerCapability::new(
                CapabilityKind::After,
                self.after.iter().cloned(),
                parameters,
            )?);
        }
        Ok(capabilities)
    }
}

/// Write a manifest to disk atomically, choosing the format from the file name.
///
/// This is the packaging step that produces the artifacts extraction reads.
pub fn write_manifest<P: AsRef<Path>>(path: P, manifest: &HandlerManifest) -> Result<()> {
    let path = path.as_ref();
    let name = path.to_string_lossy();
    let content = manifest.render(ManifestFormat::for_name(&name))?;
    crate::fs::atomic_write_file(path, &content)
}
