//! Tests for metadata extraction.

use super::*;
use crate::test_support::{manifest_dir, manifest_zip, simple_manifest, write_file};
use tempfile::TempDir;

const SERVLET_HOOK: &str = r#"
handler: com.example.hooks.ServletHook
instruments:
  - javax.servlet.Servlet
entry_points:
  - name: enter
    before: [service]
    parameters:
      - type: javax.servlet.ServletRequest
      - type: javax.servlet.ServletResponse
  - name: exit
    after: [service]
    parameters:
      - type: javax.servlet.ServletRequest
      - type: javax.servlet.ServletResponse
      - type: java.lang.Throwable
        role: thrown
"#;

fn roots(paths: &[&std::path::Path]) -> Vec<PathBuf> {
    paths.iter().map(|p| p.to_path_buf()).collect()
}

fn report(dir: &TempDir) -> Extraction {
    Extractor::new(NameFilter::all())
        .extract_with_report(&roots(&[dir.path()]))
        .unwrap()
}

fn reason_for<'a>(extraction: &'a Extraction, name: &str) -> &'a ExclusionReason {
    &extraction
        .excluded
        .iter()
        .find(|e| e.logical_name == name)
        .unwrap()
        .reason
}

// =============================================================================
// Logical names and filters
// =============================================================================

#[test]
fn test_logical_name() {
    let suffixes = default_manifest_suffixes();
    assert_eq!(
        logical_name("com/example/Hook.hook.yaml", &suffixes).as_deref(),
        Some("com.example.Hook")
    );
    assert_eq!(
        logical_name("com\\example\\Hook.hook.json", &suffixes).as_deref(),
        Some("com.example.Hook")
    );
    assert_eq!(logical_name("com/example/Hook.yaml", &suffixes), None);
    assert_eq!(logical_name(".hook.yaml", &suffixes), None);
}

#[test]
fn test_name_filter() {
    let filter = NameFilter::new(&["com.example.hooks.*"]).unwrap();
    assert!(filter.accepts("com.example.hooks.ServletHook"));
    assert!(!filter.accepts("org.other.Hook"));
    assert_eq!(filter.patterns().to_vec(), vec!["com.example.hooks.*".to_string()]);

    assert!(NameFilter::all().accepts("anything"));
    assert!(NameFilter::new::<&str>(&[]).unwrap().accepts("anything"));
}

#[test]
fn test_name_filter_rejects_invalid_glob() {
    let err = NameFilter::new(&["com.[example"]).unwrap_err();
    assert!(matches!(err, HookError::Config(_)));
    assert!(err.to_string().contains("invalid include pattern"));
}

// =============================================================================
// Directory and archive roots
// =============================================================================

#[test]
fn test_extract_from_directory() {
    let dir = manifest_dir(&[
        ("com/example/hooks/ServletHook.hook.yaml", SERVLET_HOOK),
        (
            "com/example/hooks/Timer.hook.yaml",
            simple_manifest("com.example.hooks.Timer", "app.Clock", "tick").as_str(),
        ),
        ("README.md", "not a manifest"),
    ]);

    let registry = extract(&roots(&[dir.path()]), &NameFilter::all()).unwrap();

    assert_eq!(registry.len(), 2);
    let names: Vec<&str> = registry.iter().map(|m| m.handler_name.as_str()).collect();
    assert_eq!(names, vec!["com.example.hooks.ServletHook", "com.example.hooks.Timer"]);

    let servlet = registry.find("com.example.hooks.ServletHook").unwrap();
    assert!(servlet.skip_nested_calls);
    assert!(servlet.target_types.contains("javax.servlet.Servlet"));
    assert_eq!(
        servlet.signatures.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["service(javax.servlet.ServletRequest, javax.servlet.ServletResponse)"]
    );
}

#[test]
fn test_extract_from_zip_bundle() {
    let dir = TempDir::new().unwrap();
    let bundle = manifest_zip(
        dir.path(),
        "hooks.zip",
        &[
            ("com/example/hooks/ServletHook.hook.yaml", SERVLET_HOOK),
            ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\n"),
        ],
    );

    let index = ManifestIndex::scan(&[bundle.clone()], &default_manifest_suffixes()).unwrap();
    assert_eq!(index.len(), 1);
    let resource = index.get("com.example.hooks.ServletHook").unwrap();
    assert!(resource.location.ends_with("hooks.zip!/com/example/hooks/ServletHook.hook.yaml"));

    let registry = extract(&[bundle], &NameFilter::all()).unwrap();
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_json_manifest() {
    let json = r#"{
        "handler": "com.example.hooks.JsonHook",
        "instruments": ["app.Service"],
        "skip_nested_calls": false,
        "entry_points": [
            {"after": ["run"], "parameters": [{"type": "long"}, {"type": "java.lang.Object", "role": "returned"}]}
        ]
    }"#;
    let dir = manifest_dir(&[("com/example/hooks/JsonHook.hook.json", json)]);

    let registry = extract(&roots(&[dir.path()]), &NameFilter::all()).unwrap();
    let metadata = registry.find("com.example.hooks.JsonHook").unwrap();
    assert!(!metadata.skip_nested_calls);
    assert_eq!(metadata.signatures.iter().next().unwrap().to_string(), "run(long)");
}

#[test]
fn test_include_filter_limits_registry() {
    let dir = manifest_dir(&[
        ("com/example/hooks/ServletHook.hook.yaml", SERVLET_HOOK),
        ("org/other/Hook.hook.yaml", simple_manifest("org.other.Hook", "app.Clock", "tick").as_str()),
    ]);

    let filter = NameFilter::new(&["com.example.*"]).unwrap();
    let registry = extract(&roots(&[dir.path()]), &filter).unwrap();

    assert_eq!(registry.len(), 1);
    assert!(registry.find("org.other.Hook").is_none());
}

#[test]
fn test_custom_suffixes() {
    let dir = manifest_dir(&[
        ("a/Custom.advice.yaml", simple_manifest("a.Custom", "app.Clock", "tick").as_str()),
        ("a/Hook.hook.yaml", simple_manifest("a.Hook", "app.Clock", "tick").as_str()),
    ]);

    let registry = Extractor::new(NameFilter::all())
        .with_suffixes(vec![".advice.yaml".to_string()])
        .extract(&roots(&[dir.path()]))
        .unwrap();

    assert_eq!(registry.len(), 1);
    assert!(registry.find("a.Custom").is_some());
}

#[test]
fn test_missing_root_is_not_found() {
    let err = extract(&[PathBuf::from("/nonexistent/hooks")], &NameFilter::all()).unwrap_err();
    assert!(matches!(err, HookError::NotFound(_)));
    assert_eq!(err.exit_code(), crate::exit_codes::EXTRACTION_FAILURE);
}

#[test]
fn test_unreadable_archive_is_extraction_error() {
    let dir = TempDir::new().unwrap();
    let bogus = write_file(dir.path(), "hooks.zip", "this is not a zip archive");

    let err = extract(&[bogus], &NameFilter::all()).unwrap_err();
    assert!(matches!(err, HookError::Extraction(_)));
}

#[test]
fn test_duplicate_names_resolved_independent_of_root_order() {
    let first = manifest_dir(&[("a/Hook.hook.yaml", simple_manifest("a.Hook", "app.First", "tick").as_str())]);
    let second = manifest_dir(&[("a/Hook.hook.yaml", simple_manifest("a.Hook", "app.Second", "tick").as_str())]);

    let forward = extract(&roots(&[first.path(), second.path()]), &NameFilter::all()).unwrap();
    let backward = extract(&roots(&[second.path(), first.path()]), &NameFilter::all()).unwrap();

    assert_eq!(
        forward.to_canonical_string().unwrap(),
        backward.to_canonical_string().unwrap()
    );
    assert_eq!(forward.len(), 1);
    // Smallest content wins: "app.First" sorts before "app.Second".
    assert!(forward.find("a.Hook").unwrap().target_types.contains("app.First"));
}

#[test]
fn test_registry_independent_of_root_order() {
    let first = manifest_dir(&[("a/One.hook.yaml", simple_manifest("a.One", "app.Clock", "tick").as_str())]);
    let second = manifest_dir(&[
        ("b/Two.hook.yaml", simple_manifest("b.Two", "app.Clock", "tock").as_str()),
        ("com/example/hooks/ServletHook.hook.yaml", SERVLET_HOOK),
    ]);

    let forward = extract(&roots(&[first.path(), second.path()]), &NameFilter::all()).unwrap();
    let backward = extract(&roots(&[second.path(), first.path()]), &NameFilter::all()).unwrap();

    assert_eq!(forward, backward);
    assert_eq!(
        forward.to_canonical_string().unwrap(),
        backward.to_canonical_string().unwrap()
    );
}

// =============================================================================
// Exclusions
// =============================================================================

#[test]
fn test_handler_without_targets_is_excluded() {
    let dir = manifest_dir(&[(
        "a/NoTargets.hook.yaml",
        "handler: a.NoTargets\nentry_points:\n  - before: [run]\n",
    )]);

    let extraction = report(&dir);
    assert!(extraction.registry.is_empty());
    assert_eq!(reason_for(&extraction, "a.NoTargets"), &ExclusionReason::NoTargetTypes);
    assert!(!extraction.has_malformed());
}

#[test]
fn test_handler_without_entry_points_is_excluded() {
    let dir = manifest_dir(&[(
        "a/Idle.hook.yaml",
        "handler: a.Idle\ninstruments: [app.Service]\nentry_points:\n  - name: helper\n",
    )]);

    let extraction = report(&dir);
    assert!(extraction.registry.is_empty());
    assert_eq!(reason_for(&extraction, "a.Idle"), &ExclusionReason::NoSignatures);
}

#[test]
fn test_invalid_utf8_manifest_is_excluded_not_fatal() {
    let dir = manifest_dir(&[("a/Good.hook.yaml", simple_manifest("a.Good", "app.Service", "run").as_str())]);
    std::fs::write(dir.path().join("a/Binary.hook.yaml"), [0xff, 0xfe, b'h', b':']).unwrap();

    let extraction = report(&dir);

    assert_eq!(extraction.registry.len(), 1);
    assert!(extraction.registry.find("a.Good").is_some());
    let ExclusionReason::Malformed(message) = reason_for(&extraction, "a.Binary") else {
        panic!("a.Binary should be malformed");
    };
    assert!(message.contains("UTF-8"), "{}", message);
}

#[test]
fn test_malformed_manifests_are_excluded_not_fatal() {
    let dir = manifest_dir(&[
        ("a/Broken.hook.yaml", "handler: [unterminated"),
        ("a/NoHandler.hook.yaml", "instruments: [app.Service]\n"),
        (
            "a/CaptureOnBefore.hook.yaml",
            "handler: a.CaptureOnBefore\ninstruments: [app.Service]\nentry_points:\n  - before: [run]\n    parameters:\n      - type: java.lang.Object\n        role: returned\n",
        ),
        (
            "a/BadType.hook.yaml",
            "handler: a.BadType\ninstruments: [app.Service]\nentry_points:\n  - before: [run]\n    parameters:\n      - type: \"not a type\"\n",
        ),
        ("a/Good.hook.yaml", simple_manifest("a.Good", "app.Service", "run").as_str()),
    ]);

    let extraction = report(&dir);

    assert_eq!(extraction.registry.len(), 1);
    assert!(extraction.registry.find("a.Good").is_some());
    assert_eq!(extraction.excluded.len(), 4);
    assert!(extraction.has_malformed());
    for name in ["a.Broken", "a.NoHandler", "a.CaptureOnBefore", "a.BadType"] {
        assert!(
            matches!(reason_for(&extraction, name), ExclusionReason::Malformed(_)),
            "{} should be malformed",
            name
        );
    }
    let ExclusionReason::Malformed(message) = reason_for(&extraction, "a.BadType") else {
        unreachable!()
    };
    assert!(message.contains("invalid type name 'not a type'"));
}

// =============================================================================
// Inheritance
// =============================================================================

const BASE: &str = r#"
handler: lib.BaseHook
entry_points:
  - before: [open]
    parameters:
      - type: java.lang.String
"#;

#[test]
fn test_extends_inherits_entry_points() {
    let child = "handler: app.FileHook\ninstruments: [java.io.File]\nextends: lib.BaseHook\nentry_points:\n  - before: [close]\n";
    let dir = manifest_dir(&[("lib/BaseHook.hook.yaml", BASE), ("app/FileHook.hook.yaml", child)]);

    let filter = NameFilter::new(&["app.*"]).unwrap();
    let extraction = Extractor::new(filter)
        .extract_with_report(&roots(&[dir.path()]))
        .unwrap();

    // The base is filtered out but still usable as a parent.
    assert_eq!(extraction.registry.len(), 1);
    let metadata = extraction.registry.find("app.FileHook").unwrap();
    assert_eq!(
        metadata.signatures.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["close()", "open(java.lang.String)"]
    );
}

#[test]
fn test_extends_across_roots() {
    let dir = TempDir::new().unwrap();
    let bundle = manifest_zip(dir.path(), "lib.zip", &[("lib/BaseHook.hook.yaml", BASE)]);
    let app = manifest_dir(&[(
        "app/FileHook.hook.yaml",
        "handler: app.FileHook\ninstruments: [java.io.File]\nextends: lib.BaseHook\n",
    )]);

    let registry = extract(&[app.path().to_path_buf(), bundle], &NameFilter::all()).unwrap();
    let metadata = registry.find("app.FileHook").unwrap();
    assert_eq!(metadata.signatures.len(), 1);
}

#[test]
fn test_missing_extends_target_is_not_found() {
    let dir = manifest_dir(&[(
        "app/Orphan.hook.yaml",
        "handler: app.Orphan\ninstruments: [app.Service]\nextends: lib.Missing\n",
    )]);

    let err = extract(&roots(&[dir.path()]), &NameFilter::all()).unwrap_err();
    assert!(matches!(err, HookError::NotFound(ref msg) if msg.contains("lib.Missing")));
}

#[test]
fn test_cyclic_extends_is_malformed() {
    let dir = manifest_dir(&[
        ("a/Ping.hook.yaml", "handler: a.Ping\ninstruments: [app.Service]\nextends: a.Pong\n"),
        ("a/Pong.hook.yaml", "handler: a.Pong\ninstruments: [app.Service]\nextends: a.Ping\n"),
    ]);

    let extraction = report(&dir);
    assert!(extraction.registry.is_empty());
    assert!(matches!(reason_for(&extraction, "a.Ping"), ExclusionReason::Malformed(m) if m.contains("cyclic")));
}

// =============================================================================
// Packaging
// =============================================================================

#[test]
fn test_write_manifest_then_extract() {
    let manifest = HandlerManifest::parse(SERVLET_HOOK, ManifestFormat::Yaml).unwrap();
    let dir = TempDir::new().unwrap();

    write_manifest(dir.path().join("com/example/hooks/ServletHook.hook.json"), &manifest).unwrap();
    let written =
        std::fs::read_to_string(dir.path().join("com/example/hooks/ServletHook.hook.json")).unwrap();
    assert!(written.trim_start().starts_with('{'));

    let from_json = extract(&roots(&[dir.path()]), &NameFilter::all()).unwrap();
    let source = manifest_dir(&[("com/example/hooks/ServletHook.hook.yaml", SERVLET_HOOK)]);
    let from_yaml = extract(&roots(&[source.path()]), &NameFilter::all()).unwrap();
    assert_eq!(from_json, from_yaml);
}
