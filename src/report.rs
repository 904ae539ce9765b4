//! Output formatting for deadcheck results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;
use std::path::Path;

use crate::analyzer::AnalysisReport;
use crate::deadcode::{DeadCodeReport, Status, UnusedItem};
use crate::diagnostics::{Category, HealthScore, MergedDiagnosticDocument, QualityReport};
use crate::structure::Structure;

// =============================================================================
// JSON Format
// =============================================================================

/// Serialize any report as pretty-printed JSON.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write any report to stdout as JSON.
pub fn write_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

fn write_header(label: &str, value: &str) {
    println!();
    print!("  ");
    print!("{}", "deadcheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print!("  {}", format!("{:<10}", label).dimmed());
    println!("{}", value);
}

/// Write an analysis report in pretty format.
pub fn write_analysis_pretty(report: &AnalysisReport) {
    write_header("Target:", &report.target);
    print!("  {}", "Language: ".dimmed());
    println!("{}", report.language);
    print!("  {}", "Mode:     ".dimmed());
    println!("{:?}", report.analysis_mode);
    println!();

    write_structure(&report.structure);
    println!();

    if let Some(dead) = &report.dead_code {
        write_dead_code(dead);
        println!();
    }
}

fn write_structure(structure: &Structure) {
    println!("  {}", "Structure:".bold());
    match structure {
        Structure::Summary {
            total_functions,
            total_classes,
            cyclomatic_complexity,
        } => {
            println!("    {:<22} {}", "functions", total_functions);
            println!("    {:<22} {}", "classes", total_classes);
            if let Some(cc) = cyclomatic_complexity {
                println!("    {:<22} {}", "cyclomatic complexity", cc);
            }
        }
        Structure::Unavailable { error } => {
            println!("    {}", format!("unavailable: {}", error).dimmed());
        }
    }
}

fn write_status(status: Status) {
    let label = status.as_str();
    match status {
        Status::Success => print!("{}", label.green()),
        Status::PartialSuccess => print!("{}", label.yellow()),
        Status::ToolMissing | Status::NotImplemented | Status::Unsupported => {
            print!("{}", label.blue())
        }
        Status::Error | Status::Timeout => print!("{}", label.red()),
    }
}

fn write_dead_code(dead: &DeadCodeReport) {
    print!("  {} ", "Dead code:".bold());
    write_status(dead.status);
    print!("  {}", format!("({})", dead.tool).dimmed());
    if let Some(method) = &dead.method {
        print!(" {}", method.dimmed());
    }
    println!();

    if let Some(message) = &dead.message {
        println!("    {}", message);
    }
    if let Some(phase) = dead.phase {
        println!("    {}", format!("failed phase: {:?}", phase).to_lowercase().dimmed());
    }
    for advisory in &dead.advisories {
        println!("    {} {}", "note:".yellow(), advisory);
    }

    if !dead.items().is_empty() {
        println!();
        write_items(dead.items());
    }

    if let Some(size) = &dead.size_analysis {
        println!();
        println!(
            "    {:<22} {} -> {} bytes ({:+.1}%)",
            "text size",
            size.baseline_bytes,
            size.candidate_bytes,
            -size.reduction_percent
        );
    }

    println!();
    let total = dead.total_found();
    let summary = format!("{} unused item{}", total, if total != 1 { "s" } else { "" });
    if total > 0 {
        println!("  {}", summary.red());
    } else {
        println!("  {}", summary.green());
    }
}

fn write_items(items: &[UnusedItem]) {
    for item in items {
        print!("    {:<10}", item.kind.as_str().dimmed());
        match &item.location {
            Some(loc) => print!("{}", loc.to_string().blue()),
            None => print!("{}", item.name.blue()),
        }
        println!();
        println!("              {}", item.message);
    }
}

// -----------------------------------------------------------------------------
// Diagnostic documents
// -----------------------------------------------------------------------------

fn write_colored_score(score: f64) {
    let text = format!("{:.1}", score);
    match score {
        s if s >= 90.0 => print!("{}", text.green().bold()),
        s if s >= 80.0 => print!("{}", text.green()),
        s if s >= 70.0 => print!("{}", text.yellow()),
        s if s >= 60.0 => print!("{}", text.yellow().bold()),
        _ => print!("{}", text.red()),
    }
}

fn write_colored_grade(grade: &str) {
    match grade {
        "A" => print!("{}", grade.green().bold()),
        "B" => print!("{}", grade.green()),
        "C" => print!("{}", grade.yellow()),
        "D" => print!("{}", grade.yellow().bold()),
        _ => print!("{}", grade.red()),
    }
}

fn write_health(health: &HealthScore) {
    print!("  Health: ");
    write_colored_score(health.score);
    print!("  Grade: ");
    write_colored_grade(&health.grade);
    println!();

    if !health.deductions.is_empty() {
        println!();
        println!("  {}", "Deductions:".bold());
        let mut rows: Vec<(&Category, &f64)> = health.deductions.iter().collect();
        rows.sort_by(|a, b| b.1.total_cmp(a.1));
        for (category, points) in rows {
            println!("    {:<16} {:>6.1} pts", category.as_str(), points);
        }
    }
}

/// Write a merge summary in pretty format.
pub fn write_merge_pretty(merged: &MergedDiagnosticDocument, output: &Path) {
    let meta = &merged.metadata;
    write_header("Merged:", &format!("{} documents", meta.source_count));
    for source in &meta.merged_from {
        println!("    {}", source.dimmed());
    }
    println!();

    println!("    {:<22} {}", "diagnostics", meta.total_diagnostics);
    println!("    {:<22} {}", "replacements", meta.total_replacements);
    println!("    {:<22} {}", "files affected", meta.affected_file_count);
    println!();

    write_health(&merged.health);
    println!();
    print!("  {}", "Output: ".dimmed());
    println!("{}", output.display());
    println!();
}

/// Write per-type statistics in pretty format.
pub fn write_stats_pretty(source: &str, stats: &MergedDiagnosticDocument) {
    write_header("Document:", source);
    println!();

    if !stats.type_stats.is_empty() {
        println!("  {} ({}):", "Diagnostic types".bold(), stats.type_stats.len());
        for (name, t) in &stats.type_stats {
            let plural = if t.files.len() != 1 { "s" } else { "" };
            println!(
                "    {:<44} {:>4} issues, {:>4} fixes in {} file{}",
                name,
                t.diagnostics,
                t.replacements,
                t.files.len(),
                plural
            );
        }
        println!();
    }

    if !stats.category_totals.is_empty() {
        println!("  {}", "Categories:".bold());
        let total: usize = stats.category_totals.values().sum();
        let mut rows: Vec<(&Category, &usize)> = stats.category_totals.iter().collect();
        rows.sort_by(|a, b| b.1.cmp(a.1));
        for (category, count) in rows {
            let pct = *count as f64 / total as f64 * 100.0;
            println!("    {:<16} {:>4} ({:.1}%)", category.as_str(), count, pct);
        }
        println!();
    }

    let fix = &stats.fix_complexity;
    println!("  {}", "Fix complexity:".bold());
    println!("    {:<16} {:>4}", "simple", fix.simple);
    println!("    {:<16} {:>4}", "moderate", fix.moderate);
    println!("    {:<16} {:>4}", "complex", fix.complex);
    println!("    {:<16} {:>4}", "manual", fix.manual);
    println!();

    write_health(&stats.health);
    println!();
}

/// Write a one-line conversion summary.
pub fn write_convert_summary(report: &QualityReport, output: &Path) {
    println!(
        "Wrote {} issues across {} files to {}",
        report.project_stats.total_issues,
        report.project_stats.total_files,
        output.display()
    );
}
