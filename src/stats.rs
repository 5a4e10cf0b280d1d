//! Project-wide handler usage statistics.
//!
//! Inverts context extraction: instead of asking "is this reference valid",
//! counts how often every catalog handler is referenced and where. Handlers
//! referenced but absent from the catalog still appear, so "used but
//! undeclared" is visible alongside "declared but unused".

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::extract::{self, ContextKind};
use crate::parser;
use crate::project::{self, ProjectConfig};

/// How many entries `most_used_handlers` keeps.
const TOP_USED: usize = 10;

/// One reference to a handler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLocation {
    pub file_path: String,
    pub line: usize,
    pub column: usize,
    pub context_kind: ContextKind,
    /// Best-effort human-readable annotation (construct display name or
    /// route string), not required for correctness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_info: Option<String>,
}

/// Aggregate usage of a single handler path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerUsage {
    pub handler_path: String,
    pub usage_count: usize,
    pub locations: Vec<UsageLocation>,
}

/// Whole-project usage statistics, built fresh per call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatistics {
    /// Number of catalog `<path>.<function>` combinations.
    pub total_handlers: usize,
    /// Sum of all usage counts.
    pub total_usages: usize,
    pub handler_usages: Vec<HandlerUsage>,
    /// Usages with count > 0, descending, capped.
    pub most_used_handlers: Vec<HandlerUsage>,
    /// Catalog combinations never referenced anywhere.
    pub unused_handlers: Vec<String>,
}

/// Analyze handler usage across the whole project.
pub fn analyze_usage_statistics(config: &ProjectConfig) -> UsageStatistics {
    let catalog = project::scan_handlers(config);

    // Seed every catalog combination at zero so unused handlers are visible.
    let mut usages: Vec<HandlerUsage> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for info in &catalog {
        for function in &info.exported_functions {
            let path = format!("{}.{}", info.relative_path, function);
            index.insert(path.clone(), usages.len());
            usages.push(HandlerUsage {
                handler_path: path,
                usage_count: 0,
                locations: Vec::new(),
            });
        }
    }
    let seeded = usages.len();

    for file in project::project_source_files(config) {
        let source = match std::fs::read(&file) {
            Ok(s) => s,
            Err(_) => continue,
        };
        let parsed = match parser::parse(&file, &source) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let source_text = parsed.source_str().to_string();

        for ctx in extract::extract_contexts(&parsed) {
            let path = match &ctx.expected_path {
                Some(p) => p.clone(),
                None => continue,
            };
            let location = UsageLocation {
                file_path: file.to_string_lossy().to_string(),
                line: ctx.span.line,
                column: ctx.span.column,
                context_kind: ctx.kind,
                context_info: context_info(&source_text, ctx.span.line, &path),
            };
            match index.get(&path) {
                Some(&i) => {
                    usages[i].usage_count += 1;
                    usages[i].locations.push(location);
                }
                None => {
                    // Referenced but not in the catalog: starts at 1.
                    index.insert(path.clone(), usages.len());
                    usages.push(HandlerUsage {
                        handler_path: path,
                        usage_count: 1,
                        locations: vec![location],
                    });
                }
            }
        }
    }

    let mut most_used: Vec<HandlerUsage> = usages
        .iter()
        .filter(|u| u.usage_count > 0)
        .cloned()
        .collect();
    most_used.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then_with(|| a.handler_path.cmp(&b.handler_path))
    });
    most_used.truncate(TOP_USED);

    let unused_handlers: Vec<String> = usages
        .iter()
        .take(seeded)
        .filter(|u| u.usage_count == 0)
        .map(|u| u.handler_path.clone())
        .collect();

    let total_usages = usages.iter().map(|u| u.usage_count).sum();

    UsageStatistics {
        total_handlers: seeded,
        total_usages,
        handler_usages: usages,
        most_used_handlers: most_used,
        unused_handlers,
    }
}

static QUOTED_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("literal regex"));

/// Scan a small window of lines around a reference for a recognizable quoted
/// literal that is not the handler path itself - typically the construct's
/// display name or the route string.
fn context_info(source: &str, line: usize, handler_path: &str) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    let end = line.min(lines.len());
    let start = end.saturating_sub(3);

    for candidate_line in &lines[start..end] {
        for capture in QUOTED_LITERAL.captures_iter(candidate_line) {
            let literal = capture
                .get(1)
                .or_else(|| capture.get(2))
                .map(|m| m.as_str())?;
            if literal != handler_path && !literal.is_empty() {
                return Some(literal.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{find_project_config, MARKER_FILE};
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    fn project_with(files: &[(&str, &str)]) -> (TempDir, ProjectConfig) {
        let temp = TempDir::new().unwrap();
        write(temp.path(), MARKER_FILE, "const app = {};\n");
        for (rel, contents) in files {
            write(temp.path(), rel, contents);
        }
        let config = find_project_config(temp.path()).unwrap();
        (temp, config)
    }

    #[test]
    fn test_counts_and_locations() {
        let (_temp, config) = project_with(&[
            (
                "functions/upload.ts",
                "export const handler = async () => {};\n",
            ),
            (
                "infra/api.ts",
                r#"
new sst.aws.Function("Upload", { handler: "functions/upload.handler" });
queue.subscribe("functions/upload.handler");
"#,
            ),
        ]);

        let stats = analyze_usage_statistics(&config);
        let usage = stats
            .handler_usages
            .iter()
            .find(|u| u.handler_path == "functions/upload.handler")
            .unwrap();
        assert_eq!(usage.usage_count, 2);
        assert_eq!(usage.locations.len(), 2);
        assert_eq!(stats.total_usages, 2);
    }

    #[test]
    fn test_unused_handler_listed_and_not_most_used() {
        let (_temp, config) = project_with(&[
            (
                "functions/orphan.ts",
                "export const handler = async () => {};\n",
            ),
            (
                "functions/upload.ts",
                "export const handler = async () => {};\n",
            ),
            (
                "infra/api.ts",
                r#"queue.subscribe("functions/upload.handler");"#,
            ),
        ]);

        let stats = analyze_usage_statistics(&config);
        assert!(stats
            .unused_handlers
            .contains(&"functions/orphan.handler".to_string()));
        assert!(!stats
            .most_used_handlers
            .iter()
            .any(|u| u.handler_path == "functions/orphan.handler"));
    }

    #[test]
    fn test_undeclared_reference_counts_from_one() {
        let (_temp, config) = project_with(&[(
            "infra/api.ts",
            r#"queue.subscribe("functions/ghost.handler");"#,
        )]);

        let stats = analyze_usage_statistics(&config);
        assert_eq!(stats.total_handlers, 0);
        let ghost = stats
            .handler_usages
            .iter()
            .find(|u| u.handler_path == "functions/ghost.handler")
            .unwrap();
        assert_eq!(ghost.usage_count, 1);
        assert!(!stats.unused_handlers.contains(&ghost.handler_path));
    }

    #[test]
    fn test_context_info_picks_display_name() {
        let source = r#"new sst.aws.Function("Upload", { handler: "functions/upload.handler" });"#;
        let info = context_info(source, 1, "functions/upload.handler");
        assert_eq!(info.as_deref(), Some("Upload"));
    }

    #[test]
    fn test_context_info_none_when_only_handler_path_quoted() {
        let source = r#"queue.subscribe("functions/upload.handler");"#;
        let info = context_info(source, 1, "functions/upload.handler");
        assert_eq!(info, None);
    }
}
