//! Command-line interface for deadcheck.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analyzer::{AnalysisMode, Analyzer};
use crate::config::Config;
use crate::diagnostics::{self, DiagnosticDocument};
use crate::report;
use crate::tools::ToolContext;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Cross-language dead-code detection and clang-tidy report aggregation.
///
/// Deadcheck runs each language's own dead-code analyzer and normalizes the
/// findings. C++ projects are analyzed by comparing a plain build with a
/// link-time-optimized build. clang-tidy fix documents can be merged, scored
/// and converted.
#[derive(Parser)]
#[command(name = "deadcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize a file or directory and optionally detect dead code
    Analyze(AnalyzeArgs),
    /// Merge clang-tidy fix documents into one
    Merge(MergeArgs),
    /// Show per-type statistics and the health score of a fix document
    Stats(StatsArgs),
    /// Convert a fix document into a per-file quality report
    Convert(ConvertArgs),
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// File or directory to analyze
    pub path: PathBuf,

    /// Also run dead-code detection
    #[arg(long)]
    pub complete: bool,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Fix documents to merge, in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Where to write the merged document
    #[arg(short, long, default_value = "merged.yaml")]
    pub output: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Fix document to inspect
    pub file: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Fix document to convert
    pub file: PathBuf,

    /// Where to write the JSON report
    #[arg(short, long, default_value = "report.json")]
    pub output: PathBuf,
}

fn check_format(format: &str) -> bool {
    if format != "pretty" && format != "json" {
        eprintln!("Error: invalid format {:?}, must be 'pretty' or 'json'", format);
        return false;
    }
    true
}

fn load_config(explicit: Option<&Path>) -> Option<Config> {
    match Config::load(explicit) {
        Ok((config, path)) => {
            if let Some(p) = path {
                info!(config = %p.display(), "loaded config");
            }
            Some(config)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    if !check_format(&args.format) {
        return Ok(EXIT_ERROR);
    }
    let Some(config) = load_config(config_path) else {
        return Ok(EXIT_ERROR);
    };

    if !args.path.exists() {
        eprintln!("Error: cannot access path {:?}", args.path);
        return Ok(EXIT_ERROR);
    }

    let ctx = ToolContext::new(config)?;
    let mode = if args.complete {
        AnalysisMode::Complete
    } else {
        AnalysisMode::Normal
    };
    let result = Analyzer::new(&ctx).analyze(&args.path, mode);

    match args.format.as_str() {
        "json" => report::write_json(&result)?,
        _ => report::write_analysis_pretty(&result),
    }

    if result.found_dead_code() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Load every readable document, skipping the rest with a warning.
fn load_documents(files: &[PathBuf]) -> Vec<DiagnosticDocument> {
    let mut documents = Vec::new();
    for file in files {
        match DiagnosticDocument::load(file) {
            Ok(doc) => documents.push(doc),
            Err(e) => warn!("skipping {}: {}", file.display(), e),
        }
    }
    documents
}

/// Run the merge command.
pub fn run_merge(args: &MergeArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    if !check_format(&args.format) {
        return Ok(EXIT_ERROR);
    }
    let Some(config) = load_config(config_path) else {
        return Ok(EXIT_ERROR);
    };

    let documents = load_documents(&args.files);
    if documents.is_empty() {
        eprintln!("Error: none of the {} input documents could be read", args.files.len());
        return Ok(EXIT_ERROR);
    }

    let merged = diagnostics::merge_with(&documents, &config.health);
    if let Err(e) = std::fs::write(&args.output, merged.to_yaml()?) {
        eprintln!("Error: failed to write {}: {}", args.output.display(), e);
        return Ok(EXIT_ERROR);
    }
    info!(output = %args.output.display(), "wrote merged document");

    match args.format.as_str() {
        "json" => report::write_json(&merged)?,
        _ => report::write_merge_pretty(&merged, &args.output),
    }
    Ok(EXIT_SUCCESS)
}

/// Run the stats command.
pub fn run_stats(args: &StatsArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    if !check_format(&args.format) {
        return Ok(EXIT_ERROR);
    }
    let Some(config) = load_config(config_path) else {
        return Ok(EXIT_ERROR);
    };

    let document = match DiagnosticDocument::load(&args.file) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let source = document.source.clone();
    let stats = diagnostics::merge_with(&[document], &config.health);
    match args.format.as_str() {
        "json" => report::write_json(&stats)?,
        _ => report::write_stats_pretty(&source, &stats),
    }

    if stats.health.is_failing() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the convert command.
pub fn run_convert(args: &ConvertArgs) -> anyhow::Result<i32> {
    let document = match DiagnosticDocument::load(&args.file) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let quality = diagnostics::convert(&document.canonical());
    if let Err(e) = std::fs::write(&args.output, report::to_json(&quality)?) {
        eprintln!("Error: failed to write {}: {}", args.output.display(), e);
        return Ok(EXIT_ERROR);
    }

    report::write_convert_summary(&quality, &args.output);
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOC: &str = "Diagnostics:\n  - DiagnosticName: bugprone-x\n    DiagnosticMessage:\n      Message: m\n      FilePath: a.cpp\n";

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["deadcheck", "-vv", "analyze", "src", "--complete", "--format", "json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Analyze(args) => {
                assert!(args.complete);
                assert_eq!(args.format, "json");
            }
            _ => panic!("expected analyze"),
        }

        let cli = Cli::try_parse_from(["deadcheck", "merge", "a.yaml", "b.yaml"]).unwrap();
        match cli.command {
            Commands::Merge(args) => {
                assert_eq!(args.files.len(), 2);
                assert_eq!(args.output, PathBuf::from("merged.yaml"));
            }
            _ => panic!("expected merge"),
        }

        assert!(Cli::try_parse_from(["deadcheck", "merge"]).is_err());
    }

    #[test]
    fn test_merge_skips_unreadable_inputs() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.yaml");
        let bad = temp.path().join("bad.yaml");
        std::fs::write(&good, DOC).unwrap();
        std::fs::write(&bad, "MainSourceFile: x\n").unwrap();

        let docs = load_documents(&[good, bad, temp.path().join("missing.yaml")]);
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_convert_writes_report() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("fixes.yaml");
        let output = temp.path().join("out.json");
        std::fs::write(&input, DOC).unwrap();

        let code = run_convert(&ConvertArgs {
            file: input,
            output: output.clone(),
        })
        .unwrap();
        assert_eq!(code, EXIT_SUCCESS);

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(json["project_stats"]["total_issues"], 1);
        assert_eq!(json["files"]["a.cpp"]["stats"]["bug_risk"], 1);
    }

    #[test]
    fn test_invalid_format_is_error() {
        let args = StatsArgs {
            file: PathBuf::from("whatever.yaml"),
            format: "xml".to_string(),
        };
        assert_eq!(run_stats(&args, None).unwrap(), EXIT_ERROR);
    }
}
