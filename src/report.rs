//! Output formatting for handlercheck results.
//!
//! Two modes per command:
//! - Pretty: colored terminal output, errors grouped by file
//! - JSON: the underlying data structure, emitted verbatim as the sole
//!   stdout payload for machine consumption

use colored::*;
use serde::Serialize;

use crate::project::HandlerInfo;
use crate::stats::{HandlerUsage, UsageStatistics};
use crate::validate::{ErrorKind, ProjectValidation, ValidationError};

/// Emit any serializable result as pretty-printed JSON on stdout.
pub fn write_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

fn header() {
    println!();
    print!("  ");
    print!("{}", "handlercheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
}

/// Group errors by file, preserving first-seen file order.
fn group_by_file(errors: &[ValidationError]) -> Vec<(&str, Vec<&ValidationError>)> {
    let mut groups: Vec<(&str, Vec<&ValidationError>)> = Vec::new();
    for err in errors {
        match groups.iter_mut().find(|(file, _)| *file == err.file_path) {
            Some((_, list)) => list.push(err),
            None => groups.push((err.file_path.as_str(), vec![err])),
        }
    }
    groups
}

fn print_error(err: &ValidationError, severity: &str) {
    let severity_colored = match severity {
        "error" => severity.red().bold(),
        _ => severity.yellow().bold(),
    };
    println!(
        "    {}:{}  {}  {}  {}",
        err.line,
        err.column,
        severity_colored,
        err.kind.to_string().dimmed(),
        err.message
    );
    if !err.suggestions.is_empty() {
        println!(
            "          {} {}",
            "did you mean:".dimmed(),
            err.suggestions.join(", ").dimmed()
        );
    }
}

/// Write a project validation result in pretty format.
pub fn write_validation_pretty(path: &str, validation: &ProjectValidation) {
    header();
    print!("  {}", "Checking: ".dimmed());
    println!("{}", path);
    println!();

    if validation.errors.is_empty() && validation.warnings.is_empty() {
        println!("  {}", "No handler reference problems found".green());
        println!();
        return;
    }

    for (file, errors) in group_by_file(&validation.errors) {
        println!("  {}", file.bold());
        for err in errors {
            print_error(err, "error");
        }
        println!();
    }

    for (file, warnings) in group_by_file(&validation.warnings) {
        println!("  {}", file.bold());
        for warn in warnings {
            print_error(warn, "warning");
        }
        println!();
    }

    let summary = format!(
        "{} error(s), {} warning(s)",
        validation.errors.len(),
        validation.warnings.len()
    );
    if validation.is_valid {
        println!("  {}", summary.yellow());
    } else {
        println!("  {}", summary.red().bold());
    }
    println!();
}

/// Write single-file validation results in pretty format.
pub fn write_file_errors_pretty(file: &str, errors: &[ValidationError]) {
    header();
    print!("  {}", "Checking: ".dimmed());
    println!("{}", file);
    println!();

    if errors.is_empty() {
        println!("  {}", "No handler reference problems found".green());
        println!();
        return;
    }

    for err in errors {
        let severity = match err.kind {
            ErrorKind::InvalidFormat => "warning",
            _ => "error",
        };
        print_error(err, severity);
    }
    println!();
}

/// Write the handler catalog in pretty format.
pub fn write_catalog_pretty(root: &str, catalog: &[HandlerInfo]) {
    header();
    print!("  {}", "Project: ".dimmed());
    println!("{}", root);
    println!();

    if catalog.is_empty() {
        println!("  {}", "No handler files found".yellow());
        println!();
        return;
    }

    for info in catalog {
        println!("  {}", info.relative_path.bold());
        for function in &info.exported_functions {
            println!("    {}", function);
        }
    }
    println!();
    println!("  {} handler file(s)", catalog.len());
    println!();
}

fn print_usage(usage: &HandlerUsage, with_locations: bool) {
    let count = if usage.usage_count == 0 {
        "unused".yellow().to_string()
    } else {
        format!("{} usage(s)", usage.usage_count)
    };
    println!("  {}  {}", usage.handler_path.bold(), count);

    if with_locations {
        for loc in &usage.locations {
            let info = loc
                .context_info
                .as_deref()
                .map(|i| format!(" ({})", i))
                .unwrap_or_default();
            println!(
                "    {}:{}:{}  {}{}",
                loc.file_path,
                loc.line,
                loc.column,
                loc.context_kind.to_string().dimmed(),
                info.dimmed()
            );
        }
    }
}

/// Write usage statistics in pretty format.
///
/// With a handler filter, prints full location detail for that handler only.
pub fn write_stats_pretty(root: &str, stats: &UsageStatistics, filter: Option<&str>) {
    header();
    print!("  {}", "Project: ".dimmed());
    println!("{}", root);
    println!();

    if let Some(name) = filter {
        match stats.handler_usages.iter().find(|u| u.handler_path == name) {
            Some(usage) => print_usage(usage, true),
            None => println!("  {} {}", "unknown handler:".red(), name),
        }
        println!();
        return;
    }

    println!(
        "  {} handler(s), {} usage(s) total",
        stats.total_handlers, stats.total_usages
    );
    println!();

    if !stats.most_used_handlers.is_empty() {
        println!("  {}", "Most used".bold());
        for usage in &stats.most_used_handlers {
            print_usage(usage, false);
        }
        println!();
    }

    if !stats.unused_handlers.is_empty() {
        println!("  {}", "Unused".bold());
        for path in &stats.unused_handlers {
            println!("  {}", path.yellow());
        }
        println!();
    }
}
