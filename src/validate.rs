//! Handler-path validation against the project catalog.
//!
//! Each extracted context with a resolvable path is split on its last `.`
//! into a file part and a function name, then cross-referenced against the
//! catalog. Failures are data, not panics: a typed kind, a human-readable
//! message, and ranked suggestions where a near-miss is plausible.

use std::path::Path;

use serde::Serialize;

use crate::extract::{self, HandlerContext};
use crate::parser;
use crate::project::{self, HandlerInfo, ProjectConfig, MARKER_FILE};

/// Suggestions below this similarity are not worth showing.
const SUGGESTION_THRESHOLD: f64 = 0.4;

/// Maximum file-path suggestions per error.
const MAX_PATH_SUGGESTIONS: usize = 3;

/// Maximum function-name suggestions per error.
const MAX_FUNCTION_SUGGESTIONS: usize = 5;

/// What went wrong with one handler reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "file-not-found")]
    FileNotFound,
    #[serde(rename = "function-not-found")]
    FunctionNotFound,
    #[serde(rename = "invalid-format")]
    InvalidFormat,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FileNotFound => "file-not-found",
            ErrorKind::FunctionNotFound => "function-not-found",
            ErrorKind::InvalidFormat => "invalid-format",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One invalid handler reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
    /// The file containing the reference.
    pub file_path: String,
    /// The handler path as written (post-resolution).
    pub handler_path: String,
    pub line: usize,
    pub column: usize,
    /// Ranked candidate replacements; callers truncate for display.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Result of validating a whole project.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectValidation {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

impl ProjectValidation {
    /// The expected, common "not actually an SST project" outcome.
    pub fn project_not_found(workspace: &Path) -> Self {
        ProjectValidation {
            is_valid: false,
            errors: vec![ValidationError {
                kind: ErrorKind::FileNotFound,
                message: format!(
                    "No project root found from {} (missing {} marker file)",
                    workspace.display(),
                    MARKER_FILE
                ),
                file_path: workspace.to_string_lossy().to_string(),
                handler_path: String::new(),
                line: 0,
                column: 0,
                suggestions: Vec::new(),
            }],
            warnings: Vec::new(),
        }
    }
}

/// Validate every handler reference in one file's source text.
///
/// Contexts whose path could not be resolved statically are skipped; a file
/// that fails to parse yields no errors rather than failing the caller.
pub fn validate_file(
    file_path: &Path,
    source: &str,
    catalog: &[HandlerInfo],
) -> Vec<ValidationError> {
    let parsed = match parser::parse(file_path, source.as_bytes()) {
        Ok(p) => p,
        Err(_) => return Vec::new(),
    };

    extract::extract_contexts(&parsed)
        .iter()
        .filter_map(|ctx| validate_context(file_path, ctx, catalog))
        .collect()
}

fn validate_context(
    file_path: &Path,
    ctx: &HandlerContext,
    catalog: &[HandlerInfo],
) -> Option<ValidationError> {
    let handler_path = ctx.expected_path.as_deref()?;

    let error = |kind: ErrorKind, message: String, suggestions: Vec<String>| ValidationError {
        kind,
        message,
        file_path: file_path.to_string_lossy().to_string(),
        handler_path: handler_path.to_string(),
        line: ctx.span.line,
        column: ctx.span.column,
        suggestions,
    };

    // Split on the LAST dot: file paths routinely contain dots of their own.
    let (file_part, function_name) = match handler_path.rsplit_once('.') {
        Some(parts) => parts,
        None => {
            return Some(error(
                ErrorKind::InvalidFormat,
                format!(
                    "Invalid handler path \"{}\": expected \"path.functionName\"",
                    handler_path
                ),
                Vec::new(),
            ));
        }
    };

    let entry = match catalog.iter().find(|h| h.relative_path == file_part) {
        Some(e) => e,
        None => {
            return Some(error(
                ErrorKind::FileNotFound,
                format!("Handler file not found: \"{}\"", file_part),
                rank_suggestions(file_part, catalog),
            ));
        }
    };

    if !entry.exported_functions.iter().any(|f| f == function_name) {
        return Some(error(
            ErrorKind::FunctionNotFound,
            format!(
                "Function \"{}\" not found in \"{}\". Available functions: {}",
                function_name,
                file_part,
                entry.exported_functions.join(", ")
            ),
            entry
                .exported_functions
                .iter()
                .take(MAX_FUNCTION_SUGGESTIONS)
                .cloned()
                .collect(),
        ));
    }

    None
}

/// Validate every handler reference in the whole project.
///
/// Format violations are routed to warnings; unresolvable references to
/// errors. Unreadable files are skipped, never fatal.
pub fn validate_project(config: &ProjectConfig) -> ProjectValidation {
    let catalog = project::scan_handlers(config);
    let files = project::project_source_files(config);

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for path in files {
        let source = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(_) => continue,
        };
        for err in validate_file(&path, &source, &catalog) {
            match err.kind {
                ErrorKind::InvalidFormat => warnings.push(err),
                _ => errors.push(err),
            }
        }
    }

    ProjectValidation {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Rank catalog paths by similarity to a missing file part.
fn rank_suggestions(file_part: &str, catalog: &[HandlerInfo]) -> Vec<String> {
    let mut scored: Vec<(f64, &str)> = catalog
        .iter()
        .map(|h| {
            (
                calculate_similarity(file_part, &h.relative_path),
                h.relative_path.as_str(),
            )
        })
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .collect();

    // Descending by score, path as a deterministic tie-break.
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.cmp(b.1))
    });

    scored
        .into_iter()
        .take(MAX_PATH_SUGGESTIONS)
        .map(|(_, path)| path.to_string())
        .collect()
}

/// Cheap, order-insensitive string similarity in [0, 1].
///
/// Containment is scored by length ratio (a short fragment buried in a much
/// longer path scores lower than a near-equal-length containment); everything
/// else falls back to character-set overlap. Chosen over edit distance for
/// speed on typical handler-path vocabularies.
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let len_a = a.chars().count() as f64;
    let len_b = b.chars().count() as f64;

    if a.contains(b) || b.contains(a) {
        return (len_a.min(len_b) / len_a.max(len_b)) * 0.8;
    }

    let set_a: std::collections::HashSet<char> = a.chars().collect();
    let set_b: std::collections::HashSet<char> = b.chars().collect();
    let intersection = set_a.intersection(&set_b).count() as f64;
    let larger = set_a.len().max(set_b.len()) as f64;
    intersection / larger
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn catalog() -> Vec<HandlerInfo> {
        vec![
            HandlerInfo {
                file_path: PathBuf::from("/p/functions/upload.ts"),
                relative_path: "functions/upload".to_string(),
                exported_functions: vec!["handler".to_string()],
            },
            HandlerInfo {
                file_path: PathBuf::from("/p/functions/details.ts"),
                relative_path: "functions/details".to_string(),
                exported_functions: vec!["handler".to_string(), "list".to_string()],
            },
        ]
    }

    fn check(source: &str) -> Vec<ValidationError> {
        validate_file(Path::new("/p/infra/api.ts"), source, &catalog())
    }

    #[test]
    fn test_valid_reference_produces_no_error() {
        let errors = check(
            r#"new sst.aws.Function("U", { handler: "functions/upload.handler" });"#,
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_missing_function_lists_available() {
        let errors = check(
            r#"new sst.aws.Function("X", { handler: "functions/upload.nonexistentFn" });"#,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::FunctionNotFound);
        assert!(errors[0].message.contains("handler"));
        assert_eq!(errors[0].suggestions, vec!["handler"]);
    }

    #[test]
    fn test_missing_file_suggests_close_match() {
        let errors = check(r#"queue.subscribe("functions/uplod.handler");"#);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::FileNotFound);
        assert!(errors[0]
            .suggestions
            .contains(&"functions/upload".to_string()));
    }

    #[test]
    fn test_no_dot_is_invalid_format_never_file_not_found() {
        let errors = check(r#"queue.subscribe("invalid-format-string");"#);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::InvalidFormat);
        assert!(errors[0].message.contains("path.functionName"));
    }

    #[test]
    fn test_unresolvable_path_skipped() {
        let errors = check(r#"queue.subscribe(buildPath("x"));"#);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_unparsable_source_yields_no_errors() {
        let errors = check("}}} not typescript {{{");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_similarity_identical_and_empty() {
        assert_eq!(calculate_similarity("a/b", "a/b"), 1.0);
        assert_eq!(calculate_similarity("", "a"), 0.0);
        assert_eq!(calculate_similarity("a", ""), 0.0);
    }

    #[test]
    fn test_similarity_containment_penalizes_length_gap() {
        let near = calculate_similarity("functions/upload", "functions/uploads");
        let far = calculate_similarity("up", "functions/upload");
        assert!(near > far);
        assert!(near <= 0.8);
    }

    #[test]
    fn test_similarity_charset_overlap() {
        // Typo: not a containment, but nearly the same character set.
        let score = calculate_similarity("functions/uplod", "functions/upload");
        assert!(score > SUGGESTION_THRESHOLD);
    }

    #[test]
    fn test_suggestions_capped_at_three() {
        let many: Vec<HandlerInfo> = (0..10)
            .map(|i| HandlerInfo {
                file_path: PathBuf::from(format!("/p/functions/h{}.ts", i)),
                relative_path: format!("functions/h{}", i),
                exported_functions: vec!["handler".to_string()],
            })
            .collect();
        let suggestions = rank_suggestions("functions/h", &many);
        assert_eq!(suggestions.len(), 3);
    }
}
