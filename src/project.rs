//! Project discovery and handler cataloging.
//!
//! Finds the project root by locating the `sst.config.ts` marker file, loads
//! include/exclude globs from an optional `handlercheck.json`, and walks the
//! tree collecting every TypeScript file that exports at least one handler
//! function.
//!
//! The resulting [`ProjectConfig`] is an explicit immutable value threaded
//! into every scan/validate/stats call; there is no cached scanner state, so
//! every call reflects current disk contents.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::exports;
use crate::glob;
use crate::parser;

/// Marker file identifying the project root. Contents are never parsed.
pub const MARKER_FILE: &str = "sst.config.ts";

/// Optional include/exclude configuration file.
pub const CONFIG_FILE: &str = "handlercheck.json";

/// Default include patterns when no config file is found.
pub const DEFAULT_INCLUDE: &[&str] = &["**/*.ts"];

/// Default exclude patterns when no config file is found.
pub const DEFAULT_EXCLUDE: &[&str] = &["node_modules/**", "dist/**", "**/*.test.ts"];

/// Resolved project configuration.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Absolute project root (directory containing the marker file).
    pub root_path: PathBuf,
    /// Path to the marker file that identified the root.
    pub marker_file_path: Option<PathBuf>,
    /// Include glob patterns.
    pub include_patterns: Vec<String>,
    /// Exclude glob patterns (checked first, short-circuit to exclusion).
    pub exclude_patterns: Vec<String>,
}

/// One handler file in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerInfo {
    /// Absolute path on disk.
    pub file_path: PathBuf,
    /// Project-root-relative path, slash-normalized, extension stripped.
    pub relative_path: String,
    /// Exported function names, deduplicated in document order.
    pub exported_functions: Vec<String>,
}

/// On-disk shape of `handlercheck.json`.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    include: Option<Vec<String>>,
    #[serde(default)]
    exclude: Option<Vec<String>>,
}

/// Directories never descended into during any walk.
fn skip_dir(name: &str) -> bool {
    name.starts_with('.') || name == "node_modules"
}

fn walk(root: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // depth 0 is the walk root itself; never filter it, even when its
            // own name would be skipped (temp dirs often start with a dot).
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !(e.file_type().is_dir() && skip_dir(&name))
        })
        // Permission errors and race-deleted entries are skipped; one bad
        // directory must not blank out the whole catalog.
        .filter_map(|e| e.ok())
}

/// Locate the project root starting from a workspace path.
///
/// Searches subdirectories depth-first for the marker file, then walks
/// upward through ancestors. Returns `None` when no marker is found.
pub fn find_project_root(workspace: &Path) -> Option<PathBuf> {
    for entry in walk(workspace) {
        if entry.file_type().is_file() && entry.file_name() == MARKER_FILE {
            return entry.path().parent().map(Path::to_path_buf);
        }
    }
    for ancestor in workspace.ancestors().skip(1) {
        if ancestor.join(MARKER_FILE).is_file() {
            return Some(ancestor.to_path_buf());
        }
    }
    None
}

/// Discover the project root and load its configuration.
///
/// A missing or unparsable config file only forfeits custom patterns; the
/// defaults apply and no error is raised.
pub fn find_project_config(workspace: &Path) -> Option<ProjectConfig> {
    let root = find_project_root(workspace)?;
    let marker_path = root.join(MARKER_FILE);

    let config_path = walk(&root)
        .find(|e| e.file_type().is_file() && e.file_name() == CONFIG_FILE)
        .map(|e| e.path().to_path_buf());

    let mut include: Vec<String> = DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect();
    let mut exclude: Vec<String> = DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect();

    if let Some(ref path) = config_path {
        if let Ok(text) = std::fs::read_to_string(path) {
            if let Ok(parsed) = serde_json::from_str::<ConfigFile>(&text) {
                if let Some(inc) = parsed.include {
                    include = inc;
                }
                if let Some(exc) = parsed.exclude {
                    exclude = exc;
                }
            }
        }
    }

    Some(ProjectConfig {
        root_path: root,
        marker_file_path: marker_path.is_file().then_some(marker_path),
        include_patterns: include,
        exclude_patterns: exclude,
    })
}

/// Test a root-relative path against the config's include/exclude globs.
///
/// Excludes are checked first and short-circuit. With include patterns
/// present the path must match at least one; with none, everything passes.
pub fn should_include_file(relative_path: &str, config: &ProjectConfig) -> bool {
    for pattern in &config.exclude_patterns {
        if glob::matches(relative_path, pattern) {
            return false;
        }
    }
    if config.include_patterns.is_empty() {
        return true;
    }
    config
        .include_patterns
        .iter()
        .any(|pattern| glob::matches(relative_path, pattern))
}

/// Root-relative, slash-normalized path for a file under the project root.
pub fn relative_path(config: &ProjectConfig, path: &Path) -> Option<String> {
    path.strip_prefix(&config.root_path)
        .ok()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
}

/// All qualifying TypeScript source files, in deterministic walk order.
///
/// Applies the extension filter (`.ts` but not `.d.ts`) and the
/// include/exclude globs; returns absolute paths.
pub fn project_source_files(config: &ProjectConfig) -> Vec<PathBuf> {
    walk(&config.root_path)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let path = e.path().to_path_buf();
            let name = e.file_name().to_string_lossy().to_string();
            if !name.ends_with(".ts") || name.ends_with(".d.ts") {
                return None;
            }
            let rel = relative_path(config, &path)?;
            if should_include_file(&rel, config) {
                Some(path)
            } else {
                None
            }
        })
        .collect()
}

/// Scan the project and build the handler catalog.
///
/// Files are parsed and export-scanned in parallel; the order-preserving
/// collect keeps the catalog in walk order for reproducible output. Files
/// that cannot be read, or that export nothing, are dropped silently.
pub fn scan_handlers(config: &ProjectConfig) -> Vec<HandlerInfo> {
    let files = project_source_files(config);

    files
        .par_iter()
        .map(|path| {
            let source = std::fs::read(path).ok()?;
            let parsed = parser::parse(path, &source).ok()?;
            let exported = exports::exported_names(&parsed);
            if exported.is_empty() {
                return None;
            }
            let rel = relative_path(config, path)?;
            let rel_no_ext = rel.strip_suffix(".ts").unwrap_or(&rel).to_string();
            Some(HandlerInfo {
                file_path: path.clone(),
                relative_path: rel_no_ext,
                exported_functions: exported,
            })
        })
        .collect::<Vec<Option<HandlerInfo>>>()
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    fn make_project(temp: &TempDir) -> PathBuf {
        let root = temp.path().join("app");
        std::fs::create_dir_all(&root).unwrap();
        // Non-exporting marker body: a default export would put the marker
        // itself in the catalog under the default patterns.
        write(&root, MARKER_FILE, "const app = {};\n");
        root
    }

    #[test]
    fn test_find_root_downward() {
        let temp = TempDir::new().unwrap();
        let root = make_project(&temp);
        let found = find_project_root(temp.path()).unwrap();
        assert_eq!(found, root);
    }

    #[test]
    fn test_find_root_upward() {
        let temp = TempDir::new().unwrap();
        let root = make_project(&temp);
        let nested = root.join("infra/deep");
        std::fs::create_dir_all(&nested).unwrap();
        let found = find_project_root(&nested).unwrap();
        assert_eq!(found, root);
    }

    #[test]
    fn test_no_marker_yields_none() {
        let temp = TempDir::new().unwrap();
        assert!(find_project_root(temp.path()).is_none());
    }

    #[test]
    fn test_config_defaults_when_missing() {
        let temp = TempDir::new().unwrap();
        make_project(&temp);
        let config = find_project_config(temp.path()).unwrap();
        assert_eq!(config.include_patterns, DEFAULT_INCLUDE);
        assert_eq!(config.exclude_patterns, DEFAULT_EXCLUDE);
        assert!(config
            .marker_file_path
            .as_ref()
            .is_some_and(|p| p.ends_with(MARKER_FILE)));
    }

    #[test]
    fn test_config_defaults_when_unparsable() {
        let temp = TempDir::new().unwrap();
        let root = make_project(&temp);
        write(&root, CONFIG_FILE, "{ not json !");
        let config = find_project_config(temp.path()).unwrap();
        assert_eq!(config.include_patterns, DEFAULT_INCLUDE);
        assert_eq!(config.exclude_patterns, DEFAULT_EXCLUDE);
    }

    #[test]
    fn test_config_custom_patterns() {
        let temp = TempDir::new().unwrap();
        let root = make_project(&temp);
        write(
            &root,
            CONFIG_FILE,
            r#"{ "include": ["functions/**/*.ts"], "exclude": ["**/*.test.ts"] }"#,
        );
        let config = find_project_config(temp.path()).unwrap();
        assert_eq!(config.include_patterns, vec!["functions/**/*.ts"]);
        assert_eq!(config.exclude_patterns, vec!["**/*.test.ts"]);
    }

    #[test]
    fn test_should_include_file() {
        let config = ProjectConfig {
            root_path: PathBuf::from("/p"),
            marker_file_path: None,
            include_patterns: vec!["**/*.ts".to_string()],
            exclude_patterns: vec![
                "node_modules/**".to_string(),
                "**/*.test.ts".to_string(),
            ],
        };
        assert!(should_include_file("functions/upload.ts", &config));
        assert!(!should_include_file("functions/upload.test.ts", &config));
        assert!(!should_include_file("node_modules/x/index.ts", &config));
    }

    #[test]
    fn test_scan_collects_exporting_files_only() {
        let temp = TempDir::new().unwrap();
        let root = make_project(&temp);
        write(
            &root,
            "functions/upload.ts",
            "export const handler = async () => {};\n",
        );
        write(&root, "functions/helpers.ts", "const util = () => {};\n");
        write(&root, "types.d.ts", "export declare const handler: unknown;\n");

        let config = find_project_config(temp.path()).unwrap();
        let catalog = scan_handlers(&config);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].relative_path, "functions/upload");
        assert_eq!(catalog[0].exported_functions, vec!["handler"]);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let root = make_project(&temp);
        write(&root, "a.ts", "export const one = () => {};\n");
        write(&root, "b/c.ts", "export const two = () => {};\n");

        let config = find_project_config(temp.path()).unwrap();
        let first = scan_handlers(&config);
        let second = scan_handlers(&config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_default_exporting_marker_catalogued_unless_excluded() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("app");
        std::fs::create_dir_all(&root).unwrap();
        // A real sst.config.ts default-exports its config object, which
        // counts as an export like any other; only the glob patterns can
        // keep it out of the catalog.
        write(&root, MARKER_FILE, "export default $config({ app: {} });\n");

        let config = find_project_config(temp.path()).unwrap();
        let catalog = scan_handlers(&config);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].relative_path, "sst.config");
        assert_eq!(catalog[0].exported_functions, vec!["default"]);

        write(&root, CONFIG_FILE, r#"{ "exclude": ["sst.config.ts"] }"#);
        let config = find_project_config(temp.path()).unwrap();
        assert!(scan_handlers(&config).is_empty());
    }

    #[test]
    fn test_excluded_files_not_scanned() {
        let temp = TempDir::new().unwrap();
        let root = make_project(&temp);
        write(&root, "api.test.ts", "export const handler = () => {};\n");
        write(
            &root,
            "node_modules/lib/index.ts",
            "export const handler = () => {};\n",
        );

        let config = find_project_config(temp.path()).unwrap();
        let catalog = scan_handlers(&config);
        assert!(catalog.is_empty());
    }
}
