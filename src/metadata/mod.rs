//! Handler metadata and the registry built from it.
//!
//! A `HandlerMetadata` is the structural summary of one handler: which types
//! it targets, which method signatures it observes, and whether it skips
//! nested calls. The `Registry` is the sorted, immutable set of all of them,
//! built once at startup and shared read-only afterwards.


use crate::error::{HookError, Result};
use crate::signature::{HandlerCapability, MethodSignature};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Structural summary of a handler.
///
/// Ordering (and therefore registry order) is by handler name, then target
/// types, then signatures.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandlerMetadata {
    pub handler_name: String,
    pub target_types: BTreeSet<String>,
    pub signatures: BTreeSet<MethodSignature>,
    pub skip_nested_calls: bool,
}

impl HandlerMetadata {
    /// Build metadata from a handler's declared capabilities.
    ///
    /// Returns `None` when the handler has no target types or no signatures;
    /// such handlers are left out of the registry.
    pub fn from_capabilities<'a, I>(
        handler_name: impl Into<String>,
        target_types: BTreeSet<String>,
        skip_nested_calls: bool,
        capabilities: I,
    ) -> Option<Self>
    where
        I: IntoIterator<Item = &'a HandlerCapability>,
    {
        let signatures: BTreeSet<MethodSignature> = capabilities
            .into_iter()
            .flat_map(|cap| cap.signatures())
            .collect();

        if target_types.is_empty() || signatures.is_empty() {
            return None;
        }

        Some(Self {
            handler_name: handler_name.into(),
            target_types,
            signatures,
            skip_nested_calls,
        })
    }

    /// Whether any declared target type is in `closure`.
    pub fn targets_any(&self, closure: &BTreeSet<String>) -> bool {
        // Both sets are sorted; iterate the smaller one.
        if self.target_types.len() <= closure.len() {
            self.target_types.iter().any(|t| closure.contains(t))
        } else {
            closure.iter().any(|t| self.target_types.contains(t))
        }
    }

    /// Whether a signature with this name and arity is declared.
    pub fn declares_shape(&self, name: &str, parameter_count: usize) -> bool {
        self.signatures
            .iter()
            .any(|s| s.name == name && s.parameter_types.len() == parameter_count)
    }
}

/// Immutable, deterministically ordered set of handler metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Registry {
    entries: Vec<HandlerMetadata>,
}

impl Registry {
    /// Build a registry; input order does not affect the result.
    pub fn new(entries: impl IntoIterator<Item = HandlerMetadata>) -> Self {
        let entries: BTreeSet<HandlerMetadata> = entries.into_iter().collect();
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HandlerMetadata> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a handler by name.
    pub fn find(&self, handler_name: &str) -> Option<&HandlerMetadata> {
        self.entries.iter().find(|m| m.handler_name == handler_name)
    }

    /// Map each target type to the signatures that must be intercepted on it.
    pub fn instrumented_targets(&self) -> BTreeMap<String, BTreeSet<MethodSignature>> {
        let mut targets: BTreeMap<String, BTreeSet<MethodSignature>> = BTreeMap::new();
        for metadata in &self.entries {
            for target in &metadata.target_types {
                targets
                    .entry(target.clone())
                    .or_default()
                    .extend(metadata.signatures.iter().cloned());
            }
        }
        targets
    }

    /// Canonical YAML serialization.
    ///
    /// Identical registries always serialize to identical text.
    pub fn to_canonical_string(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| HookError::Config(format!("failed to serialize registry: {}", e)))
    }

    /// JSON rendering of the registry.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| HookError::Config(format!("failed to serialize registry: {}", e)))
    }
}

// Deserialized entries go through `Registry::new` so order and uniqueness hold.
impl<'de> Deserialize<'de> for Registry {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Vec::<HandlerMetadata>::deserialize(deserializer).map(Registry::new)
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a HandlerMetadata;
    type IntoIter = std::slice::Iter<'a, HandlerMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
