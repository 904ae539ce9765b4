//! Core types for dead-code results.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::language::Language;
use crate::process::ProcessError;

/// What kind of program entity an unused item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Function,
    Variable,
    Method,
    Import,
    Export,
    Symbol,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Function => "function",
            ItemKind::Variable => "variable",
            ItemKind::Method => "method",
            ItemKind::Import => "import",
            ItemKind::Export => "export",
            ItemKind::Symbol => "symbol",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an item was reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => write!(f, "{}", self.file),
        }
    }
}

/// One normalized finding. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusedItem {
    pub name: String,
    pub kind: ItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub tool: String,
    /// Normalized single-line message, e.g. `unused import 'os' (90%) [test.py:6]`
    pub message: String,
}

impl UnusedItem {
    pub fn new(
        name: impl Into<String>,
        kind: ItemKind,
        tool: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            location: None,
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.location = Some(Location {
            file: file.into(),
            line: Some(line),
        });
        self
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.location = Some(Location {
            file: file.into(),
            line: None,
        });
        self
    }
}

/// Terminal outcome of analyzing one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    ToolMissing,
    Error,
    Timeout,
    PartialSuccess,
    NotImplemented,
    Unsupported,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::ToolMissing => "tool_missing",
            Status::Error => "error",
            Status::Timeout => "timeout",
            Status::PartialSuccess => "partial_success",
            Status::NotImplemented => "not_implemented",
            Status::Unsupported => "unsupported",
        }
    }

    /// Whether the item list can be trusted (fully or partially).
    pub fn has_results(&self) -> bool {
        matches!(self, Status::Success | Status::PartialSuccess)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build step that failed or ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildPhase {
    Configure,
    Compile,
    Link,
    Inspect,
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BuildPhase::Configure => "configure",
            BuildPhase::Compile => "compile",
            BuildPhase::Link => "link",
            BuildPhase::Inspect => "inspect",
        };
        write!(f, "{}", s)
    }
}

/// Text-section size comparison between the two builds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeAnalysis {
    pub baseline_bytes: u64,
    pub candidate_bytes: u64,
    pub reduction_bytes: i64,
    pub reduction_percent: f64,
}

impl SizeAnalysis {
    pub fn compute(baseline_bytes: u64, candidate_bytes: u64) -> Self {
        let reduction_bytes = baseline_bytes as i64 - candidate_bytes as i64;
        let reduction_percent = if baseline_bytes == 0 {
            0.0
        } else {
            reduction_bytes as f64 / baseline_bytes as f64 * 100.0
        };
        Self {
            baseline_bytes,
            candidate_bytes,
            reduction_bytes,
            reduction_percent,
        }
    }
}

/// Result of dead-code detection for one target.
///
/// `total_found` always equals the number of items; both are only reachable
/// through the constructors.
#[derive(Debug, Clone, Serialize)]
pub struct DeadCodeReport {
    pub target: String,
    pub tool: String,
    pub status: Status,
    #[serde(rename = "unused_items")]
    items: Vec<UnusedItem>,
    total_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_analysis: Option<SizeAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<BuildPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_analyzed: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<String>,
}

impl DeadCodeReport {
    fn base(target: &Path, tool: &str, status: Status, items: Vec<UnusedItem>) -> Self {
        let total_found = items.len();
        Self {
            target: target.to_string_lossy().to_string(),
            tool: tool.to_string(),
            status,
            items,
            total_found,
            size_analysis: None,
            message: None,
            method: None,
            phase: None,
            files_analyzed: None,
            advisories: Vec::new(),
        }
    }

    pub fn success(target: &Path, tool: &str, items: Vec<UnusedItem>) -> Self {
        Self::base(target, tool, Status::Success, items)
    }

    /// A late failure that still produced usable items.
    pub fn partial(target: &Path, tool: &str, items: Vec<UnusedItem>, message: impl Into<String>) -> Self {
        Self::base(target, tool, Status::PartialSuccess, items).with_message(message)
    }

    pub fn failure(target: &Path, tool: &str, message: impl Into<String>) -> Self {
        Self::base(target, tool, Status::Error, Vec::new()).with_message(message)
    }

    pub fn timeout(target: &Path, tool: &str, message: impl Into<String>) -> Self {
        Self::base(target, tool, Status::Timeout, Vec::new()).with_message(message)
    }

    pub fn tool_missing(target: &Path, tool: &str, install_hint: impl Into<String>) -> Self {
        Self::base(target, tool, Status::ToolMissing, Vec::new()).with_message(install_hint)
    }

    pub fn not_implemented(target: &Path, tool: &str, message: impl Into<String>) -> Self {
        Self::base(target, tool, Status::NotImplemented, Vec::new()).with_message(message)
    }

    pub fn unsupported(target: &Path, language: Language) -> Self {
        Self::base(target, "none", Status::Unsupported, Vec::new())
            .with_message(format!("no dead-code detector for language '{}'", language))
    }

    /// Map a process failure to `timeout` or `error`.
    pub fn from_process_error(target: &Path, tool: &str, err: &ProcessError) -> Self {
        if err.is_timeout() {
            Self::timeout(target, tool, err.to_string())
        } else {
            Self::failure(target, tool, err.to_string())
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn with_phase(mut self, phase: BuildPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_size_analysis(mut self, size: SizeAnalysis) -> Self {
        self.size_analysis = Some(size);
        self
    }

    pub fn with_files_analyzed(mut self, count: usize) -> Self {
        self.files_analyzed = Some(count);
        self
    }

    pub fn with_advisories(mut self, advisories: Vec<String>) -> Self {
        self.advisories.extend(advisories);
        self
    }

    pub fn items(&self) -> &[UnusedItem] {
        &self.items
    }

    pub fn total_found(&self) -> usize {
        self.total_found
    }

    /// True when the detector ran and found at least one item.
    pub fn found_dead_code(&self) -> bool {
        self.status.has_results() && self.total_found > 0
    }
}
