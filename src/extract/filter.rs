//! Name filter applied to logical manifest names.

use crate::error::{HookError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Accepts logical names matching any of a set of glob patterns.
///
/// An empty filter accepts every name.
#[derive(Debug, Clone)]
pub struct NameFilter {
    patterns: Vec<String>,
    globs: GlobSet,
}

impl NameFilter {
    /// Build a filter from glob patterns such as `com.example.hooks.*`.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern.as_ref()).map_err(|e| {
                HookError::Config(format!(
                    "invalid include pattern '{}': {}",
                    pattern.as_ref(),
                    e
                ))
            })?;
            builder.add(glob);
        }

        let globs = builder
            .build()
            .map_err(|e| HookError::Config(format!("failed to build include patterns: {}", e)))?;

        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            globs,
        })
    }

    /// A filter that accepts everything.
    pub fn all() -> Self {
        Self {
            patterns: Vec::new(),
            globs: GlobSet::empty(),
        }
    }

    pub fn accepts(&self, logical_name: &str) -> bool {
        self.patterns.is_empty() || self.globs.is_match(logical_name)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::all()
    }
}
