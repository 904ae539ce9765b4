//! Per-file grouping of diagnostics for external quality dashboards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::category::Category;
use super::document::CanonicalDiagnostic;

pub const ANALYSIS_TYPE: &str = "clang-tidy-quality";
const ISSUE_TYPE: &str = "clang-tidy";
const UNKNOWN_FILE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub diagnostic: String,
    pub message: String,
    pub offset: u64,
    pub length: u64,
    pub replacement: String,
    pub category: Category,
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileIssues {
    pub issues: Vec<Issue>,
    pub stats: BTreeMap<Category, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub total_files: usize,
    pub total_issues: usize,
    pub categories: BTreeMap<Category, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub analysis_type: String,
    pub project_stats: ProjectStats,
    pub files: BTreeMap<String, FileIssues>,
}

/// Group every diagnostic record under the file it points at.
pub fn convert(diagnostics: &[CanonicalDiagnostic]) -> QualityReport {
    let mut files: BTreeMap<String, FileIssues> = BTreeMap::new();

    for record in diagnostics.iter().flat_map(CanonicalDiagnostic::records) {
        let path = if record.file_path.is_empty() {
            UNKNOWN_FILE.to_string()
        } else {
            record.file_path
        };
        let entry = files.entry(path).or_default();
        *entry.stats.entry(record.category).or_insert(0) += 1;
        entry.issues.push(Issue {
            issue_type: ISSUE_TYPE.to_string(),
            diagnostic: record.name,
            message: record.message,
            offset: record.offset,
            length: record.length,
            replacement: record.replacement.unwrap_or_default(),
            category: record.category,
            level: record.level,
        });
    }

    let mut categories: BTreeMap<Category, usize> = BTreeMap::new();
    for file in files.values() {
        for (category, count) in &file.stats {
            *categories.entry(*category).or_insert(0) += count;
        }
    }

    QualityReport {
        analysis_type: ANALYSIS_TYPE.to_string(),
        project_stats: ProjectStats {
            total_files: files.len(),
            total_issues: files.values().map(|f| f.issues.len()).sum(),
            categories,
        },
        files,
    }
}
