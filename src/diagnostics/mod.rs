//! clang-tidy diagnostic documents: merging, statistics and health scoring.
//!
//! Documents come in two shapes. The modern `--export-fixes` layout lists
//! `Diagnostics`, each owning its replacements; the legacy layout is a flat
//! list of `Replacements` that describe themselves. Both are normalized into
//! [`CanonicalDiagnostic`]s before anything is counted, so statistics, the
//! health score and conversion have a single code path.

mod category;
mod convert;
mod document;
mod health;
mod merge;

pub use category::{Category, FixComplexity, FixComplexityCounts};
pub use convert::{convert, FileIssues, Issue, ProjectStats, QualityReport, ANALYSIS_TYPE};
pub use document::{
    CanonicalDiagnostic, Diagnostic, DiagnosticDocument, DiagnosticMessage,
    DiagnosticRecord, LegacyReplacement, Replacement, Section,
};
pub use health::{calculate_grade, HealthScore, BASE_SCORE};
pub use merge::{merge, merge_with, MergeMetadata, MergedDiagnosticDocument, TypeStats};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiagnosticsError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {source_name}: {source}")]
    Yaml {
        source_name: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{0}: neither Diagnostics nor Replacements present")]
    UnknownSchema(String),
    #[error("cannot serialize merged document: {0}")]
    Serialize(#[source] serde_yaml::Error),
}
