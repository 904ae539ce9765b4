//! Merging diagnostic documents and aggregating their statistics.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::category::{Category, FixComplexity, FixComplexityCounts};
use super::document::{
    CanonicalDiagnostic, Diagnostic, DiagnosticDocument, LegacyReplacement, Section,
};
use super::health::{self, HealthScore};
use super::DiagnosticsError;
use crate::config::HealthConfig;

/// Source name given to a merged document when fed back into a merge.
pub const MERGED_SOURCE: &str = "merged";

/// Counts for one diagnostic name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeStats {
    pub diagnostics: usize,
    pub replacements: usize,
    pub files: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeMetadata {
    pub merged_from: Vec<String>,
    pub source_count: usize,
    pub total_diagnostics: usize,
    pub total_replacements: usize,
    pub affected_file_count: usize,
    /// Sorted, deduplicated
    pub affected_files: Vec<String>,
}

/// Result of one merge call. Built fresh from its inputs and never updated.
#[derive(Debug, Clone, Serialize)]
pub struct MergedDiagnosticDocument {
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    pub replacements: Vec<LegacyReplacement>,
    /// Which sections the inputs carried, even when empty
    #[serde(skip)]
    has_modern: bool,
    #[serde(skip)]
    has_legacy: bool,
    pub metadata: MergeMetadata,
    pub type_stats: BTreeMap<String, TypeStats>,
    pub category_totals: BTreeMap<Category, usize>,
    pub fix_complexity: FixComplexityCounts,
    pub health: HealthScore,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct YamlMetadata<'a> {
    merged_from: &'a [String],
    source_count: usize,
    total_diagnostics: usize,
    total_replacements: usize,
    files_affected: usize,
    affected_files: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct YamlDocument<'a> {
    main_source_file: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<&'a [Diagnostic]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replacements: Option<&'a [LegacyReplacement]>,
    metadata: YamlMetadata<'a>,
}

impl MergedDiagnosticDocument {
    /// The merged lists as a document that can be merged again.
    pub fn to_document(&self) -> DiagnosticDocument {
        let mut sections = Vec::new();
        if self.has_modern {
            sections.push(Section::Modern(self.diagnostics.clone()));
        }
        if self.has_legacy {
            sections.push(Section::Legacy(self.replacements.clone()));
        }
        DiagnosticDocument {
            source: MERGED_SOURCE.to_string(),
            sections,
        }
    }

    /// Serialize in clang-tidy layout with a `Metadata` block. Every section
    /// an input had is written, so the result can be read back; a merge of
    /// nothing is written as an empty `Diagnostics` list.
    pub fn to_yaml(&self) -> Result<String, DiagnosticsError> {
        let modern = self.has_modern || !self.has_legacy;
        let doc = YamlDocument {
            main_source_file: "",
            diagnostics: modern.then_some(self.diagnostics.as_slice()),
            replacements: self.has_legacy.then_some(self.replacements.as_slice()),
            metadata: YamlMetadata {
                merged_from: &self.metadata.merged_from,
                source_count: self.metadata.source_count,
                total_diagnostics: self.metadata.total_diagnostics,
                total_replacements: self.metadata.total_replacements,
                files_affected: self.metadata.affected_file_count,
                affected_files: &self.metadata.affected_files,
            },
        };
        serde_yaml::to_string(&doc).map_err(DiagnosticsError::Serialize)
    }
}

/// Merge with the default health weights.
pub fn merge(documents: &[DiagnosticDocument]) -> MergedDiagnosticDocument {
    merge_with(documents, &HealthConfig::default())
}

/// Concatenate the documents' lists in input order and aggregate them.
pub fn merge_with(documents: &[DiagnosticDocument], health_config: &HealthConfig) -> MergedDiagnosticDocument {
    let mut diagnostics = Vec::new();
    let mut replacements = Vec::new();
    let (mut has_modern, mut has_legacy) = (false, false);
    for doc in documents {
        for section in &doc.sections {
            match section {
                Section::Modern(d) => {
                    has_modern = true;
                    diagnostics.extend(d.iter().cloned());
                }
                Section::Legacy(r) => {
                    has_legacy = true;
                    replacements.extend(r.iter().cloned());
                }
            }
        }
        debug!(source = %doc.source, sections = doc.sections.len(), "merged document");
    }

    let canonical: Vec<CanonicalDiagnostic> = diagnostics
        .iter()
        .map(CanonicalDiagnostic::from_modern)
        .chain(replacements.iter().map(CanonicalDiagnostic::from_legacy))
        .collect();

    let mut affected = BTreeSet::new();
    let mut type_stats: BTreeMap<String, TypeStats> = BTreeMap::new();
    let mut category_totals: BTreeMap<Category, usize> = BTreeMap::new();
    let mut fix_complexity = FixComplexityCounts::default();
    let mut total_replacements = 0;

    for diag in &canonical {
        affected.extend(diag.affected_files().map(str::to_string));
        total_replacements += diag.replacements.len();

        let stats = type_stats.entry(diag.name.clone()).or_default();
        stats.diagnostics += 1;
        stats.replacements += diag.replacements.len();
        stats.files.extend(
            diag.replacements
                .iter()
                .map(|r| r.file_path.as_str())
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        );

        *category_totals.entry(diag.category).or_insert(0) += 1;
        fix_complexity.add(FixComplexity::from_replacements(diag.replacements.len()));
    }

    let health = health::calculate(canonical.iter().map(|d| d.category), health_config);
    let affected_files: Vec<String> = affected.into_iter().collect();

    MergedDiagnosticDocument {
        metadata: MergeMetadata {
            merged_from: documents.iter().map(|d| d.source.clone()).collect(),
            source_count: documents.len(),
            total_diagnostics: canonical.len(),
            total_replacements,
            affected_file_count: affected_files.len(),
            affected_files,
        },
        diagnostics,
        replacements,
        has_modern,
        has_legacy,
        type_stats,
        category_totals,
        fix_complexity,
        health,
    }
}
