//! Integration tests for project discovery and handler cataloging.
//!
//! These run against the fixture SST project in testdata/project.

use std::path::PathBuf;

use handlercheck::project::{self, MARKER_FILE};

fn project_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/project")
}

#[test]
fn test_find_project_config_from_root() {
    let config = project::find_project_config(&project_path()).expect("should find project");
    assert_eq!(config.root_path, project_path());
    assert!(config
        .marker_file_path
        .as_ref()
        .is_some_and(|p| p.ends_with(MARKER_FILE)));
    assert_eq!(config.include_patterns, vec!["**/*.ts"]);
    assert!(config
        .exclude_patterns
        .contains(&"**/*.test.ts".to_string()));
}

#[test]
fn test_find_project_config_from_nested_directory() {
    let nested = project_path().join("infra");
    let config = project::find_project_config(&nested).expect("should find project upward");
    assert_eq!(config.root_path, project_path());
}

#[test]
fn test_catalog_contents() {
    let config = project::find_project_config(&project_path()).unwrap();
    let catalog = project::scan_handlers(&config);

    let paths: Vec<&str> = catalog.iter().map(|h| h.relative_path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["functions/details", "functions/orphan", "functions/upload"]
    );

    let details = &catalog[0];
    assert_eq!(details.exported_functions, vec!["handler", "list"]);
    let upload = &catalog[2];
    assert_eq!(upload.exported_functions, vec!["handler"]);
}

#[test]
fn test_excluded_and_non_exporting_files_absent() {
    let config = project::find_project_config(&project_path()).unwrap();
    let catalog = project::scan_handlers(&config);

    // ignored.test.ts matches an exclude pattern; the infra files export
    // nothing; sst.config.ts is excluded by the fixture config.
    assert!(!catalog
        .iter()
        .any(|h| h.relative_path.contains("ignored")));
    assert!(!catalog.iter().any(|h| h.relative_path.contains("infra")));
    assert!(!catalog
        .iter()
        .any(|h| h.relative_path.contains("sst.config")));
}

#[test]
fn test_scan_is_idempotent() {
    let config = project::find_project_config(&project_path()).unwrap();
    let first = project::scan_handlers(&config);
    let second = project::scan_handlers(&config);
    assert_eq!(first, second);
}

#[test]
fn test_source_files_are_deterministic_and_filtered() {
    let config = project::find_project_config(&project_path()).unwrap();
    let files = project::project_source_files(&config);
    let again = project::project_source_files(&config);
    assert_eq!(files, again);

    for file in &files {
        let name = file.file_name().unwrap().to_string_lossy();
        assert!(name.ends_with(".ts"));
        assert!(!name.ends_with(".d.ts"));
        assert!(!name.ends_with(".test.ts"));
    }
}
