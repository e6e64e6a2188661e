//! Metadata extraction.
//!
//! Scans artifact roots for capability manifests, parses them without
//! resolving any handler or target type, and builds the registry.
//!
//! # Failure policy
//!
//! - A missing or unreadable root is fatal (`NotFound` / `Extraction`).
//! - An `extends` reference to a manifest that is not in any root is fatal
//!   (`NotFound`).
//! - A malformed manifest, or one with no target types or no signatures, is
//!   excluded from the registry and logged; it is never an error.

mod filter;
pub mod manifest;
mod source;
#[cfg(test)]
mod tests;

pub use filter::NameFilter;
pub use manifest::{
    EntryPointManifest, HandlerManifest, ManifestFormat, ParameterManifest, write_manifest,
};
pub use source::{ManifestIndex, ManifestResource, logical_name};

use crate::config::default_manifest_suffixes;
use crate::error::{HookError, Result};
use crate::metadata::{HandlerMetadata, Registry};
use crate::signature::HandlerCapability;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Why a manifest was left out of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    /// The handler declares no target types.
    NoTargetTypes,
    /// The handler declares no Before or After entry point.
    NoSignatures,
    /// The manifest could not be parsed or is structurally invalid.
    Malformed(String),
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::NoTargetTypes => write!(f, "no target types"),
            ExclusionReason::NoSignatures => write!(f, "no before/after entry points"),
            ExclusionReason::Malformed(msg) => write!(f, "malformed: {}", msg),
        }
    }
}

/// A manifest that passed the name filter but was not registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub logical_name: String,
    pub location: String,
    pub reason: ExclusionReason,
}

/// Registry plus the manifests that were excluded while building it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub registry: Registry,
    pub excluded: Vec<Exclusion>,
}

impl Extraction {
    /// Whether any manifest was excluded for being malformed.
    pub fn has_malformed(&self) -> bool {
        self.excluded
            .iter()
            .any(|e| matches!(e.reason, ExclusionReason::Malformed(_)))
    }
}

/// Builds a registry from artifact roots.
#[derive(Debug, Clone)]
pub struct Extractor {
    filter: NameFilter,
    suffixes: Vec<String>,
}

/// Extract a registry from `roots`, keeping handlers whose logical name
/// passes `filter`.
pub fn extract(roots: &[PathBuf], filter: &NameFilter) -> Result<Registry> {
    Extractor::new(filter.clone()).extract(roots)
}

enum Rejection {
    Fatal(HookError),
    Exclude(ExclusionReason),
}

impl From<HookError> for Rejection {
    fn from(err: HookError) -> Self {
        match err {
            HookError::Manifest(msg) => Rejection::Exclude(ExclusionReason::Malformed(msg)),
            other => Rejection::Fatal(other),
        }
    }
}

impl Extractor {
    pub fn new(filter: NameFilter) -> Self {
        Self {
            filter,
            suffixes: default_manifest_suffixes(),
        }
    }

    /// Replace the recognized manifest suffixes (e.g. `.hook.yaml`).
    pub fn with_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.suffixes = suffixes;
        self
    }

    pub fn extract(&self, roots: &[PathBuf]) -> Result<Registry> {
        Ok(self.extract_with_report(roots)?.registry)
    }

    pub fn extract_with_report(&self, roots: &[PathBuf]) -> Result<Extraction> {
        let index = ManifestIndex::scan(roots, &self.suffixes)?;
        tracing::debug!(manifests = index.len(), roots = roots.len(), "scanned artifact roots");

        let mut parsed = ParsedManifests::new();
        for resource in index.iter() {
            let result = resource
                .text()
                .and_then(|text| HandlerManifest::parse(text, resource.format))
                .map_err(|e| match e {
                    HookError::Manifest(msg) => msg,
                    other => other.to_string(),
                });
            parsed.insert(resource.logical_name.clone(), result);
        }

        let mut entries = Vec::new();
        let mut excluded = Vec::new();

        for resource in index.iter() {
            if !self.filter.accepts(&resource.logical_name) {
                continue;
            }

            match build_metadata(&resource.logical_name, &parsed) {
                Ok(metadata) => {
                    tracing::debug!(
                        handler = %metadata.handler_name,
                        targets = metadata.target_types.len(),
                        signatures = metadata.signatures.len(),
                        "registered handler"
                    );
                    entries.push(metadata);
                }
                Err(Rejection::Exclude(reason)) => {
                    tracing::warn!(
                        name = %resource.logical_name,
                        location = %resource.location,
                        %reason,
                        "excluding handler manifest"
                    );
                    excluded.push(Exclusion {
                        logical_name: resource.logical_name.clone(),
                        location: resource.location.clone(),
                        reason,
                    });
                }
                Err(Rejection::Fatal(err)) => return Err(err),
            }
        }

        Ok(Extraction {
            registry: Registry::new(entries),
            excluded,
        })
    }
}

type ParsedManifests = BTreeMap<String, std::result::Result<HandlerManifest, String>>;

fn lookup<'a>(
    parsed: &'a ParsedManifests,
    logical_name: &str,
) -> std::result::Result<&'a HandlerManifest, Rejection> {
    match parsed.get(logical_name) {
        Some(Ok(manifest)) => Ok(manifest),
        Some(Err(msg)) => Err(Rejection::Exclude(ExclusionReason::Malformed(msg.clone()))),
        None => Err(Rejection::Fatal(HookError::NotFound(format!(
            "manifest '{}'",
            logical_name
        )))),
    }
}

fn build_metadata(
    logical_name: &str,
    parsed: &ParsedManifests,
) -> std::result::Result<HandlerMetadata, Rejection> {
    let manifest = lookup(parsed, logical_name)?;
    let target_types = manifest.target_types()?;
    let capabilities = inherited_capabilities(logical_name, parsed)?;

    if target_types.is_empty() {
        return Err(Rejection::Exclude(ExclusionReason::NoTargetTypes));
    }

    HandlerMetadata::from_capabilities(
        manifest.handler.clone(),
        target_types,
        manifest.skip_nested_calls,
        &capabilities,
    )
    .ok_or(Rejection::Exclude(ExclusionReason::NoSignatures))
}

/// Capabilities of a manifest and everything it extends, ancestors first.
fn inherited_capabilities(
    logical_name: &str,
    parsed: &ParsedManifests,
) -> std::result::Result<Vec<HandlerCapability>, Rejection> {
    let mut chain = Vec::new();
    let mut seen = BTreeSet::new();
    let mut current = Some(logical_name.to_string());

    while let Some(name) = current {
        if !seen.insert(name.clone()) {
            return Err(Rejection::Exclude(ExclusionReason::Malformed(format!(
                "cyclic extends through '{}'",
                name
            ))));
        }
        let manifest = lookup(parsed, &name)?;
        current = manifest.extends.clone();
        chain.push(manifest);
    }

    let mut capabilities = Vec::new();
    for manifest in chain.iter().rev() {
        for entry_point in &manifest.entry_points {
            capabilities.extend(entry_point.capabilities()?);
        }
    }
    Ok(capabilities)
}
