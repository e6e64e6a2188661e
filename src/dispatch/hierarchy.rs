//! Target-type ancestry.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Source of direct supertypes for a runtime type.
///
/// The instrumentation mechanism knows the real type graph; the dispatcher
/// only needs the transitive closure.
pub trait TypeHierarchy: Send + Sync {
    /// Direct supertypes and implemented interfaces of `type_name`.
    fn direct_supertypes(&self, type_name: &str) -> Vec<String>;

    /// `type_name` plus every transitive supertype.
    fn ancestor_closure(&self, type_name: &str) -> BTreeSet<String> {
        let mut closure = BTreeSet::new();
        let mut queue = VecDeque::from([type_name.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !closure.insert(current.clone()) {
                continue;
            }
            for parent in self.direct_supertypes(&current) {
                if !closure.contains(&parent) {
                    queue.push_back(parent);
                }
            }
        }
        closure
    }
}

/// In-memory type graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeGraph {
    supertypes: BTreeMap<String, Vec<String>>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the direct supertypes of `type_name`, appending to any known ones.
    pub fn declare<I, S>(&mut self, type_name: impl Into<String>, supertypes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supertypes
            .entry(type_name.into())
            .or_default()
            .extend(supertypes.into_iter().map(Into::into));
        self
    }

    pub fn with<I, S>(mut self, type_name: impl Into<String>, supertypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declare(type_name, supertypes);
        self
    }
}

impl TypeHierarchy for TypeGraph {
    fn direct_supertypes(&self, type_name: &str) -> Vec<String> {
        self.supertypes.get(type_name).cloned().unwrap_or_default()
    }
}
