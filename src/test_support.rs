//! Fixtures shared by unit tests: manifest trees and zip bundles.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write `content` to `root/relative`, creating parent directories.
pub(crate) fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// A temporary directory root holding the given `(relative path, content)` files.
pub(crate) fn manifest_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (relative, content) in files {
        write_file(dir.path(), relative, content);
    }
    dir
}

/// Pack the given files into a zip bundle at `dir/name`.
pub(crate) fn manifest_zip(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (entry, content) in files {
        zip.start_file(*entry, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// YAML manifest for a handler with one Before entry point bound to `method`
/// taking a single `int`.
pub(crate) fn simple_manifest(handler: &str, target: &str, method: &str) -> String {
    format!(
        r#"handler: {handler}
instruments:
  - {target}
entry_points:
  - name: enter
    before: [{method}]
    parameters:
      - type: int
"#
    )
}
