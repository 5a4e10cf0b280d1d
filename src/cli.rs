//! Command-line interface for handlercheck.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::project::{self, MARKER_FILE};
use crate::report;
use crate::stats;
use crate::validate::{self, ProjectValidation};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Handler reference checker for SST TypeScript projects.
///
/// Handlercheck statically analyzes infrastructure code for handler path
/// strings like "functions/upload.handler", resolves them against the
/// functions actually exported on disk, and reports broken references with
/// fuzzy-matched suggestions.
#[derive(Parser)]
#[command(name = "handlercheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate all handler references in a project
    Validate(ValidateArgs),
    /// List handler files and their exported functions
    Scan(ScanArgs),
    /// Validate handler references in a single file
    CheckFile(CheckFileArgs),
    /// Report handler usage statistics across a project
    Stats(StatsArgs),
}

/// Arguments for the validate command.
#[derive(Parser)]
pub struct ValidateArgs {
    /// Workspace path to search for the project root
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Emit raw JSON instead of pretty output
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the scan command.
#[derive(Parser)]
pub struct ScanArgs {
    /// Workspace path to search for the project root
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Emit raw JSON instead of pretty output
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the check-file command.
#[derive(Parser)]
pub struct CheckFileArgs {
    /// The TypeScript file to check
    pub file: PathBuf,

    /// Project root override (default: discovered from the file's directory)
    #[arg(long)]
    pub project: Option<PathBuf>,

    /// Emit raw JSON instead of pretty output
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the stats command.
#[derive(Parser)]
pub struct StatsArgs {
    /// Workspace path to search for the project root
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Restrict the report to a single handler path
    #[arg(long)]
    pub handler: Option<String>,

    /// Emit raw JSON instead of pretty output
    #[arg(long)]
    pub json: bool,
}

/// Run the validate command.
pub fn run_validate(args: &ValidateArgs) -> anyhow::Result<i32> {
    let validation = match project::find_project_config(&args.path) {
        Some(config) => validate::validate_project(&config),
        None => ProjectValidation::project_not_found(&args.path),
    };

    if args.json {
        report::write_json(&validation)?;
    } else {
        report::write_validation_pretty(&args.path.to_string_lossy(), &validation);
    }

    if validation.is_valid {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    let config = match project::find_project_config(&args.path) {
        Some(c) => c,
        None => {
            eprintln!(
                "Error: no project root found from {} (missing {})",
                args.path.display(),
                MARKER_FILE
            );
            return Ok(EXIT_ERROR);
        }
    };

    let catalog = project::scan_handlers(&config);

    if args.json {
        report::write_json(&catalog)?;
    } else {
        report::write_catalog_pretty(&config.root_path.to_string_lossy(), &catalog);
    }

    Ok(EXIT_SUCCESS)
}

/// Run the check-file command.
pub fn run_check_file(args: &CheckFileArgs) -> anyhow::Result<i32> {
    let source = std::fs::read_to_string(&args.file)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", args.file.display(), e))?;

    let workspace: &Path = match &args.project {
        Some(p) => p,
        None => args.file.parent().unwrap_or(Path::new(".")),
    };
    let config = match project::find_project_config(workspace) {
        Some(c) => c,
        None => {
            eprintln!(
                "Error: no project root found from {} (missing {})",
                workspace.display(),
                MARKER_FILE
            );
            return Ok(EXIT_ERROR);
        }
    };

    let catalog = project::scan_handlers(&config);
    let errors = validate::validate_file(&args.file, &source, &catalog);

    if args.json {
        report::write_json(&errors)?;
    } else {
        report::write_file_errors_pretty(&args.file.to_string_lossy(), &errors);
    }

    if errors.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the stats command.
pub fn run_stats(args: &StatsArgs) -> anyhow::Result<i32> {
    let config = match project::find_project_config(&args.path) {
        Some(c) => c,
        None => {
            eprintln!(
                "Error: no project root found from {} (missing {})",
                args.path.display(),
                MARKER_FILE
            );
            return Ok(EXIT_ERROR);
        }
    };

    let statistics = stats::analyze_usage_statistics(&config);

    if args.json {
        match &args.handler {
            Some(name) => {
                let usage = statistics
                    .handler_usages
                    .iter()
                    .find(|u| &u.handler_path == name);
                match usage {
                    Some(u) => report::write_json(u)?,
                    None => {
                        eprintln!("Error: unknown handler {:?}", name);
                        return Ok(EXIT_ERROR);
                    }
                }
            }
            None => report::write_json(&statistics)?,
        }
    } else {
        report::write_stats_pretty(
            &config.root_path.to_string_lossy(),
            &statistics,
            args.handler.as_deref(),
        );
    }

    Ok(EXIT_SUCCESS)
}
