//! Signature model.
//!
//! Defines the comparable description of a method (`MethodSignature`) and of
//! one declared entry point on a handler (`HandlerCapability`). Only the
//! plain parameters of a capability take part in matching; capture
//! parameters are filled from the outcome of the intercepted call.

mod canonical;

pub use canonical::{canonical_type_name, canonical_type_names, is_primitive};

use crate::error::{HookError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A method name plus its ordered canonical parameter types.
///
/// Orders lexicographically by name, then by parameter list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub parameter_types: Vec<String>,
}

impl MethodSignature {
    /// Build a signature from names that are already canonical.
    pub fn new(name: impl Into<String>, parameter_types: Vec<String>) -> Self {
        Self {
            name: name.into(),
            parameter_types,
        }
    }

    /// Build a signature, canonicalizing every parameter type.
    pub fn canonical<S: AsRef<str>>(name: impl Into<String>, parameter_types: &[S]) -> Result<Self> {
        Ok(Self::new(name, canonical_type_names(parameter_types)?))
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_types.len()
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parameter_types.join(", "))
    }
}

/// Whether an entry point runs before or after the intercepted body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Before,
    After,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityKind::Before => write!(f, "before"),
            CapabilityKind::After => write!(f, "after"),
        }
    }
}

/// Where a capability parameter gets its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParameterRole {
    /// Positional argument of the intercepted call.
    #[default]
    Plain,
    /// Return value of the intercepted call.
    Returned,
    /// Error raised by the intercepted call.
    Thrown,
}

/// One parameter of a capability.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Parameter {
    pub type_name: String,
    pub role: ParameterRole,
}

impl Parameter {
    pub fn plain(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            role: ParameterRole::Plain,
        }
    }

    pub fn returned(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            role: ParameterRole::Returned,
        }
    }

    pub fn thrown(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            role: ParameterRole::Thrown,
        }
    }
}

/// A declared Before or After entry point on a handler.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerCapability {
    pub kind: CapabilityKind,
    pub bound_names: BTreeSet<String>,
    pub parameters: Vec<Parameter>,
}

impl HandlerCapability {
    /// Build a capability, canonicalizing parameter types and checking that
    /// the declaration is well formed.
    pub fn new<I, S>(kind: CapabilityKind, bound_names: I, parameters: Vec<Parameter>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bound_names: BTreeSet<String> = bound_names.into_iter().map(Into::into).collect();
        if bound_names.is_empty() || bound_names.iter().any(|n| n.trim().is_empty()) {
            return Err(HookError::Manifest(format!(
                "{} entry point must be bound to at least one non-empty method name",
                kind
            )));
        }

        let parameters = parameters
            .into_iter()
            .map(|p| {
                Ok(Parameter {
                    type_name: canonical_type_name(&p.type_name)?,
                    role: p.role,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if kind == CapabilityKind::Before
            && parameters.iter().any(|p| p.role != ParameterRole::Plain)
        {
            return Err(HookError::Manifest(format!(
                "before entry point bound to {:?} declares a returned/thrown parameter",
                bound_names
            )));
        }

        Ok(Self {
            kind,
            bound_names,
            parameters,
        })
    }

    /// Parameter types that take part in signature matching.
    pub fn plain_types(&self) -> Vec<String> {
        self.parameters
            .iter()
            .filter(|p| p.role == ParameterRole::Plain)
            .map(|p| p.type_name.clone())
            .collect()
    }

    /// Expand bound names by the stripped parameter list.
    pub fn signatures(&self) -> impl Iterator<Item = MethodSignature> + '_ {
        let plain = self.plain_types();
        self.bound_names
            .iter()
            .map(move |name| MethodSignature::new(name.clone(), plain.clone()))
    }

    /// Exact match: the name is bound and the plain types are equal positionally.
    pub fn matches(&self, method: &MethodSignature) -> bool {
        if !self.bound_names.contains(&method.name) {
            return false;
        }
        let mut plain = self
            .parameters
            .iter()
            .filter(|p| p.role == ParameterRole::Plain);
        let mut expected = method.parameter_types.iter();
        loop {
            match (plain.next(), expected.next()) {
                (None, None) => return true,
                (Some(p), Some(t)) if &p.type_name == t => continue,
                _ => return false,
            }
        }
    }
}
