//! Deadcheck - cross-language dead code aggregation.
//!
//! Deadcheck does not analyze code itself. It classifies a target by
//! language, runs that language's own dead-code analyzer, and normalizes the
//! findings into one report shape. C++ projects without a usable per-file
//! linter are analyzed by building them twice, once plainly and once with
//! link-time optimization and section garbage collection, and diffing the
//! surviving symbols.
//!
//! # Architecture
//!
//! - `language`: target classification by file suffix and directory contents
//! - `tools`, `process`: tool lookup and timed, blocking process execution
//! - `deadcode`: per-language detectors and the dispatch registry
//! - `lto`: build-system detection and the differential LTO engine
//! - `diagnostics`: clang-tidy fix document merge, statistics and health score
//! - `structure`: function/class counts from the structure-analysis binary
//! - `analyzer`: orchestration of one analysis run
//! - `config`: YAML configuration
//! - `report`: output formatting (pretty, JSON)
//!
//! # Adding a Language
//!
//! Implement `DeadCodeDetector` in `src/deadcode/` and register it in
//! `deadcode::get_detector`.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod deadcode;
pub mod diagnostics;
pub mod language;
pub mod lto;
pub mod process;
pub mod report;
pub mod structure;
pub mod tools;

pub use analyzer::{AnalysisMode, AnalysisReport, Analyzer};
pub use config::Config;
pub use deadcode::{dispatch, DeadCodeDetector, DeadCodeReport, Status, UnusedItem};
pub use diagnostics::{merge, DiagnosticDocument, MergedDiagnosticDocument};
pub use language::{AnalysisTarget, Language, TargetClassifier};
pub use tools::{Capability, ToolContext, ToolLocator};
