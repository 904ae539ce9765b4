//! Per-language dead-code detectors.
//!
//! Each detector wraps one external analyzer: it checks that the tool can be
//! located, runs it, and normalizes its output into [`UnusedItem`]s. Parsing
//! is line-local and never fails; malformed lines are skipped.
//!
//! # Adding a Language
//!
//! Implement [`DeadCodeDetector`] and register it in [`get_detector`].

mod cpp;
mod csharp;
mod go;
mod javascript;
mod python;
mod rust_lang;
mod types;

pub use cpp::CppDetector;
pub use csharp::CsharpDetector;
pub use go::GoDetector;
pub use javascript::JavascriptDetector;
pub use python::PythonDetector;
pub use rust_lang::RustDetector;
pub use types::{
    BuildPhase, DeadCodeReport, ItemKind, Location, SizeAnalysis, Status, UnusedItem,
};

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::language::{AnalysisTarget, Language};
use crate::process::CommandOutput;
use crate::tools::ToolContext;

/// Common contract of all detectors.
pub trait DeadCodeDetector: Send + Sync {
    /// Name reported in [`DeadCodeReport::tool`].
    fn tool_name(&self) -> &'static str;

    /// Languages this detector is registered for.
    fn languages(&self) -> &'static [Language];

    /// Normalize raw tool output. Never fails.
    fn parse_output(&self, output: &str) -> Vec<UnusedItem>;

    /// Locate the tool, run it against the target and build the report.
    fn detect(&self, target: &AnalysisTarget, ctx: &ToolContext) -> DeadCodeReport;
}

static PYTHON_DETECTOR: OnceCell<PythonDetector> = OnceCell::new();
static GO_DETECTOR: OnceCell<GoDetector> = OnceCell::new();
static CSHARP_DETECTOR: OnceCell<CsharpDetector> = OnceCell::new();
static RUST_DETECTOR: OnceCell<RustDetector> = OnceCell::new();
static JAVASCRIPT_DETECTOR: OnceCell<JavascriptDetector> = OnceCell::new();
static CPP_DETECTOR: OnceCell<CppDetector> = OnceCell::new();

/// Look up the detector for a language.
pub fn get_detector(language: Language) -> Option<&'static dyn DeadCodeDetector> {
    match language {
        Language::Python => Some(PYTHON_DETECTOR.get_or_init(PythonDetector::new)),
        Language::Go => Some(GO_DETECTOR.get_or_init(GoDetector::new)),
        Language::Csharp => Some(CSHARP_DETECTOR.get_or_init(CsharpDetector::new)),
        Language::Rust => Some(RUST_DETECTOR.get_or_init(RustDetector::new)),
        Language::Javascript | Language::Typescript => {
            Some(JAVASCRIPT_DETECTOR.get_or_init(JavascriptDetector::new))
        }
        Language::Cpp => Some(CPP_DETECTOR.get_or_init(CppDetector::new)),
        Language::Unknown => None,
    }
}

/// Languages that have a detector.
pub fn registered_languages() -> Vec<Language> {
    [
        Language::Cpp,
        Language::Python,
        Language::Go,
        Language::Csharp,
        Language::Rust,
        Language::Javascript,
        Language::Typescript,
        Language::Unknown,
    ]
    .into_iter()
    .filter(|l| get_detector(*l).is_some_and(|d| d.languages().contains(l)))
    .collect()
}

/// Route a classified target to its detector; unknown languages are `unsupported`.
pub fn dispatch(target: &AnalysisTarget, ctx: &ToolContext) -> DeadCodeReport {
    match get_detector(target.language) {
        Some(detector) => {
            info!(tool = detector.tool_name(), target = %target.path.display(), "running dead-code detector");
            detector.detect(target, ctx)
        }
        None => {
            debug!(language = %target.language, "no detector registered");
            DeadCodeReport::unsupported(&target.path, target.language)
        }
    }
}

lazy_static! {
    static ref QUOTED_NAME: Regex = Regex::new(r#"['`"]([^'`"]+)['`"]"#).unwrap();
}

/// First quoted identifier in a message.
pub(crate) fn extract_quoted_name(message: &str) -> Option<String> {
    QUOTED_NAME
        .captures(message)
        .map(|c| c[1].to_string())
}

/// Infer an item kind from the wording of a tool message.
pub(crate) fn infer_kind(message: &str) -> ItemKind {
    let lower = message.to_lowercase();
    let has_word = |w: &str| {
        lower
            .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .any(|t| t == w)
    };
    if has_word("import") || has_word("using") {
        ItemKind::Import
    } else if has_word("method") {
        ItemKind::Method
    } else if has_word("function") || has_word("func") {
        ItemKind::Function
    } else if has_word("variable") || has_word("field") || has_word("attribute") {
        ItemKind::Variable
    } else {
        ItemKind::Symbol
    }
}

/// Nearest ancestor of `start` (inclusive) containing any of `markers`.
pub(crate) fn find_project_root(start: &Path, markers: &[&str]) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| markers.iter().any(|m| dir.join(m).exists()))
        .map(Path::to_path_buf)
}

/// Last path component, for messages that only show file names.
pub(crate) fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

const EXCERPT_LEN: usize = 200;

/// First characters of a tool's output, for error messages.
pub(crate) fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= EXCERPT_LEN {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(EXCERPT_LEN).collect();
    format!("{}...", cut)
}

/// Build the report for a completed tool run whose findings are on `stream`.
///
/// Analyzers exit non-zero when they report findings, so the exit code alone
/// is not a failure. A run that exited non-zero without producing any
/// parseable output is an error.
pub(crate) fn finish_report(
    target: &Path,
    tool: &str,
    output: &CommandOutput,
    items: Vec<UnusedItem>,
) -> DeadCodeReport {
    if items.is_empty() && !output.success && output.stdout.trim().is_empty() {
        return DeadCodeReport::failure(
            target,
            tool,
            format!(
                "{} exited with code {}: {}",
                tool,
                output.code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()),
                excerpt(&output.stderr)
            ),
        );
    }
    debug!(tool, found = items.len(), "normalized tool output");
    DeadCodeReport::success(target, tool, items)
}
