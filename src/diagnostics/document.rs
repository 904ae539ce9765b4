//! clang-tidy document schema and its canonical form.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::category::Category;
use super::DiagnosticsError;

const UNKNOWN_NAME: &str = "unknown";
const DEFAULT_LEVEL: &str = "Warning";

fn default_level() -> String {
    DEFAULT_LEVEL.to_string()
}

/// One suggested text edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Replacement {
    pub file_path: String,
    pub offset: u64,
    pub length: u64,
    pub replacement_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DiagnosticMessage {
    pub message: String,
    pub file_path: String,
    pub file_offset: u64,
    pub replacements: Vec<Replacement>,
}

/// A modern `Diagnostics` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Diagnostic {
    #[serde(default)]
    pub diagnostic_name: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub diagnostic_message: DiagnosticMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<DiagnosticMessage>,
}

/// A legacy `Replacements` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegacyReplacement {
    pub diagnostic_name: String,
    pub file_path: String,
    pub offset: u64,
    pub length: u64,
    pub replacement_text: String,
    pub diagnostic_message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDocument {
    diagnostics: Option<Vec<Diagnostic>>,
    replacements: Option<Vec<LegacyReplacement>>,
}

/// One schema variant found in a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Modern(Vec<Diagnostic>),
    Legacy(Vec<LegacyReplacement>),
}

/// A parsed input document. Usually one section; a previously merged
/// document may carry both.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticDocument {
    pub source: String,
    pub sections: Vec<Section>,
}

impl DiagnosticDocument {
    pub fn modern(source: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            source: source.into(),
            sections: vec![Section::Modern(diagnostics)],
        }
    }

    pub fn legacy(source: impl Into<String>, replacements: Vec<LegacyReplacement>) -> Self {
        Self {
            source: source.into(),
            sections: vec![Section::Legacy(replacements)],
        }
    }

    /// Parse YAML (or JSON) text. `source` names the document in errors and
    /// merge metadata.
    pub fn from_yaml_str(source: &str, content: &str) -> Result<Self, DiagnosticsError> {
        let raw: Option<RawDocument> =
            serde_yaml::from_str(content).map_err(|e| DiagnosticsError::Yaml {
                source_name: source.to_string(),
                source: e,
            })?;
        let Some(raw) = raw else {
            return Err(DiagnosticsError::UnknownSchema(source.to_string()));
        };

        let mut sections = Vec::new();
        if let Some(diagnostics) = raw.diagnostics {
            sections.push(Section::Modern(diagnostics));
        }
        if let Some(replacements) = raw.replacements {
            sections.push(Section::Legacy(replacements));
        }
        if sections.is_empty() {
            return Err(DiagnosticsError::UnknownSchema(source.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            sections,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DiagnosticsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| DiagnosticsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&path.to_string_lossy(), &content)
    }

    /// The document as canonical diagnostics, in section order.
    pub fn canonical(&self) -> Vec<CanonicalDiagnostic> {
        let mut out = Vec::new();
        for section in &self.sections {
            match section {
                Section::Modern(diagnostics) => {
                    out.extend(diagnostics.iter().map(CanonicalDiagnostic::from_modern))
                }
                Section::Legacy(replacements) => {
                    out.extend(replacements.iter().map(CanonicalDiagnostic::from_legacy))
                }
            }
        }
        out
    }
}

/// Schema-independent diagnostic. A legacy replacement becomes a diagnostic
/// whose only replacement is itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalDiagnostic {
    pub name: String,
    pub level: String,
    pub message: String,
    pub file_path: String,
    pub file_offset: u64,
    pub replacements: Vec<Replacement>,
    pub category: Category,
}

impl CanonicalDiagnostic {
    fn new(name: &str, level: String, message: String, file_path: String, file_offset: u64, replacements: Vec<Replacement>) -> Self {
        let name = if name.is_empty() { UNKNOWN_NAME } else { name };
        Self {
            category: Category::categorize(name),
            name: name.to_string(),
            level,
            message,
            file_path,
            file_offset,
            replacements,
        }
    }

    pub fn from_modern(diag: &Diagnostic) -> Self {
        let msg = &diag.diagnostic_message;
        Self::new(
            &diag.diagnostic_name,
            diag.level.clone(),
            msg.message.clone(),
            msg.file_path.clone(),
            msg.file_offset,
            msg.replacements.clone(),
        )
    }

    pub fn from_legacy(repl: &LegacyReplacement) -> Self {
        Self::new(
            &repl.diagnostic_name,
            default_level(),
            repl.diagnostic_message.clone(),
            repl.file_path.clone(),
            repl.offset,
            vec![Replacement {
                file_path: repl.file_path.clone(),
                offset: repl.offset,
                length: repl.length,
                replacement_text: repl.replacement_text.clone(),
            }],
        )
    }

    /// Non-empty file paths touched by this diagnostic.
    pub fn affected_files(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.file_path.as_str())
            .chain(self.replacements.iter().map(|r| r.file_path.as_str()))
            .filter(|p| !p.is_empty())
    }

    /// One record per replacement, or a single record without replacement
    /// text when none is offered.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        if self.replacements.is_empty() {
            return vec![DiagnosticRecord {
                name: self.name.clone(),
                level: self.level.clone(),
                message: self.message.clone(),
                file_path: self.file_path.clone(),
                offset: self.file_offset,
                length: 0,
                replacement: None,
                category: self.category,
            }];
        }
        self.replacements
            .iter()
            .map(|r| DiagnosticRecord {
                name: self.name.clone(),
                level: self.level.clone(),
                message: self.message.clone(),
                file_path: r.file_path.clone(),
                offset: r.offset,
                length: r.length,
                replacement: Some(r.replacement_text.clone()),
                category: self.category,
            })
            .collect()
    }
}

/// Flat view of a single finding at one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRecord {
    pub name: String,
    pub level: String,
    pub message: String,
    pub file_path: String,
    pub offset: u64,
    pub length: u64,
    pub replacement: Option<String>,
    pub category: Category,
}
