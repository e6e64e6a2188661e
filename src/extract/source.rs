//! Artifact roots: directories and zip bundles holding manifests.

use super::manifest::ManifestFormat;
use crate::error::{HookError, Result};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// A manifest found under an artifact root, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestResource {
    /// Dotted name derived from the resource path (e.g. `com.example.Hook`).
    pub logical_name: String,
    /// Human-readable location for diagnostics.
    pub location: String,
    pub format: ManifestFormat,
    /// Raw bytes, decoded by [`ManifestResource::text`].
    pub content: Vec<u8>,
}

impl ManifestResource {
    /// The manifest text. Invalid UTF-8 makes the manifest malformed.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.content)
            .map_err(|e| HookError::Manifest(format!("invalid UTF-8: {}", e)))
    }
}

/// Every manifest found in a set of roots, keyed by logical name.
///
/// When the same logical name appears more than once, the resource with the
/// lexicographically smallest content wins (then the smallest location), so
/// the result does not depend on root order.
#[derive(Debug, Default)]
pub struct ManifestIndex {
    resources: BTreeMap<String, ManifestResource>,
}

impl ManifestIndex {
    /// Scan all roots.
    ///
    /// A root that does not exist is `NotFound`; one that cannot be read is
    /// an `Extraction` error. Both abort the scan.
    pub fn scan(roots: &[PathBuf], suffixes: &[String]) -> Result<Self> {
        let mut index = Self::default();
        for root in roots {
            if !root.exists() {
                return Err(HookError::NotFound(format!(
                    "artifact root '{}'",
                    root.display()
                )));
            }

            let found = if root.is_dir() {
                scan_directory(root, suffixes)?
            } else {
                scan_archive(root, suffixes)?
            };

            for resource in found {
                index.insert(resource);
            }
        }
        Ok(index)
    }

    fn insert(&mut self, resource: ManifestResource) {
        let Some(existing) = self.resources.get(&resource.logical_name) else {
            self.resources.insert(resource.logical_name.clone(), resource);
            return;
        };

        let replaces =
            (&resource.content, &resource.location) < (&existing.content, &existing.location);
        let (kept, ignored) = if replaces {
            (&resource.location, &existing.location)
        } else {
            (&existing.location, &resource.location)
        };
        tracing::warn!(
            name = %resource.logical_name,
            %kept,
            %ignored,
            "duplicate manifest"
        );
        if replaces {
            self.resources.insert(resource.logical_name.clone(), resource);
        }
    }

    pub fn get(&self, logical_name: &str) -> Option<&ManifestResource> {
        self.resources.get(logical_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestResource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Strip a manifest suffix and turn the relative path into a dotted name.
pub fn logical_name(relative: &str, suffixes: &[String]) -> Option<String> {
    let relative = relative.replace('\\', "/");
    let stem = suffixes
        .iter()
        .find_map(|suffix| relative.strip_suffix(suffix.as_str()))?;
    let name = stem
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".");
    if name.is_empty() { None } else { Some(name) }
}

fn scan_directory(root: &Path, suffixes: &[String]) -> Result<Vec<ManifestResource>> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    let mut found = Vec::new();
    for path in files {
        let relative = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();
        let Some(name) = logical_name(&relative, suffixes) else {
            continue;
        };

        let content = fs::read(&path).map_err(|e| {
            HookError::Extraction(format!("failed to read '{}': {}", path.display(), e))
        })?;
        found.push(ManifestResource {
            format: ManifestFormat::for_name(&relative),
            logical_name: name,
            location: path.display().to_string(),
            content,
        });
    }
    Ok(found)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| {
        HookError::Extraction(format!(
            "failed to read directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            HookError::Extraction(format!(
                "failed to read directory entry in '{}': {}",
                dir.display(),
                e
            ))
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn scan_archive(root: &Path, suffixes: &[String]) -> Result<Vec<ManifestResource>> {
    let file = File::open(root).map_err(|e| {
        HookError::Extraction(format!("failed to open '{}': {}", root.display(), e))
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        HookError::Extraction(format!(
            "'{}' is not a readable archive: {}",
            root.display(),
            e
        ))
    })?;

    let mut found = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            HookError::Extraction(format!(
                "failed to read entry {} of '{}': {}",
                i,
                root.display(),
                e
            ))
        })?;
        if entry.is_dir() {
            continue;
        }

        let entry_name = entry.name().to_string();
        let Some(name) = logical_name(&entry_name, suffixes) else {
            continue;
        };

        let mut content = Vec::new();
        entry.read_to_end(&mut content).map_err(|e| {
            HookError::Extraction(format!(
                "failed to read '{}!/{}': {}",
                root.display(),
                entry_name,
                e
            ))
        })?;
        found.push(ManifestResource {
            format: ManifestFormat::for_name(&entry_name),
            logical_name: name,
            location: format!("{}!/{}", root.display(), entry_name),
            content,
        });
    }

    // Archive order is whatever the packer wrote; make duplicates deterministic.
    found.sort_by(|a, b| a.location.cmp(&b.location));
    Ok(found)
}
