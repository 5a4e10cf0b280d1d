//! Handlercheck - handler reference checker for SST TypeScript projects.
//!
//! Handlercheck statically analyzes infrastructure-as-code TypeScript for
//! "handler path" string references (e.g. `"functions/upload.handler"`)
//! embedded in construct call sites, resolves them against the functions
//! actually exported on disk, and reports mismatches with fuzzy-matched
//! suggestions.
//!
//! # Architecture
//!
//! The codebase uses tree-sitter for AST-based analysis:
//!
//! - `parser`: TypeScript parsing, `ParsedFile` and `Span`
//! - `glob`: include/exclude glob matching (hand-rolled, `**`-aware)
//! - `exports`: exported-function scanning with the factory heuristic
//! - `extract`: construct call-site recognition and path resolution
//! - `project`: root discovery, configuration, handler cataloging
//! - `validate`: per-reference validation with ranked suggestions
//! - `stats`: project-wide usage aggregation
//! - `report`: output formatting (pretty, JSON)
//!
//! # Library surface
//!
//! Editor integrations call exactly five operations: [`extract_contexts`],
//! [`context_at`], [`scan_handlers`], [`validate_file`], and
//! [`analyze_usage_statistics`]. Everything else (rendering, debouncing,
//! file watching) belongs to the caller. Every scan re-walks the filesystem
//! from scratch, so results are always consistent with current disk state.

pub mod cli;
pub mod exports;
pub mod extract;
pub mod glob;
pub mod parser;
pub mod project;
pub mod report;
pub mod stats;
pub mod validate;

pub use exports::exported_names;
pub use extract::{context_at, extract_contexts, ContextKind, HandlerContext};
pub use parser::{parse, ParsedFile, Span};
pub use project::{
    find_project_config, scan_handlers, HandlerInfo, ProjectConfig, CONFIG_FILE, MARKER_FILE,
};
pub use stats::{analyze_usage_statistics, HandlerUsage, UsageLocation, UsageStatistics};
pub use validate::{
    calculate_similarity, validate_file, validate_project, ErrorKind, ProjectValidation,
    ValidationError,
};
