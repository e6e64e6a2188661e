//! Config loading, validation, and derived objects.

use super::model::AgentConfig;
use crate::error::{HookError, Result};
use crate::extract::{Extractor, NameFilter};
use std::path::Path;

impl AgentConfig {
    /// Load config from a YAML file.
    ///
    /// Relative roots are resolved against the directory holding the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            HookError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::from_yaml(&content)?;
        if let Some(base) = path.parent() {
            config.roots = config
                .roots
                .into_iter()
                .map(|root| if root.is_relative() { base.join(root) } else { root })
                .collect();
        }
        Ok(config)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty map.
        let config: AgentConfig = if yaml.trim().is_empty() {
            AgentConfig::default()
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| HookError::Config(format!("failed to parse config YAML: {}", e)))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| HookError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values.
    ///
    /// - `manifest_suffixes` must be non-empty, each starting with `.`
    /// - `include` patterns must be valid globs
    pub fn validate(&self) -> Result<()> {
        if self.manifest_suffixes.is_empty() {
            return Err(HookError::Config(
                "config validation failed: manifest_suffixes must not be empty".to_string(),
            ));
        }

        for suffix in &self.manifest_suffixes {
            if !suffix.starts_with('.') || suffix.len() < 2 {
                return Err(HookError::Config(format!(
                    "config validation failed: manifest suffix '{}' must start with '.'",
                    suffix
                )));
            }
        }

        self.name_filter()?;
        Ok(())
    }

    /// Name filter built from `include`.
    pub fn name_filter(&self) -> Result<NameFilter> {
        NameFilter::new(&self.include)
    }

    /// Extractor configured with this config's filter and suffixes.
    pub fn extractor(&self) -> Result<Extractor> {
        Ok(Extractor::new(self.name_filter()?).with_suffixes(self.manifest_suffixes.clone()))
    }
}
