//! Diagnostic categories and fix-complexity buckets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse grouping of clang-tidy check names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Modernization,
    Performance,
    Readability,
    UnusedCode,
    BugRisk,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::BugRisk,
        Category::Performance,
        Category::Readability,
        Category::Modernization,
        Category::UnusedCode,
        Category::Other,
    ];

    /// Categorize a check name. Rules are tried in order, so
    /// `readability-unused-x` is readability and `bugprone-unused-x` is
    /// unused_code.
    pub fn categorize(name: &str) -> Self {
        if name.starts_with("modernize-") {
            Category::Modernization
        } else if name.starts_with("performance-") {
            Category::Performance
        } else if name.starts_with("readability-") {
            Category::Readability
        } else if name.contains("unused") {
            Category::UnusedCode
        } else if name.starts_with("bugprone-") {
            Category::BugRisk
        } else {
            Category::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Modernization => "modernization",
            Category::Performance => "performance",
            Category::Readability => "readability",
            Category::UnusedCode => "unused_code",
            Category::BugRisk => "bug_risk",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How much editing a suggested fix involves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixComplexity {
    /// No replacement offered.
    Manual,
    Simple,
    Moderate,
    Complex,
}

impl FixComplexity {
    pub fn from_replacements(count: usize) -> Self {
        match count {
            0 => FixComplexity::Manual,
            1 => FixComplexity::Simple,
            2..=3 => FixComplexity::Moderate,
            _ => FixComplexity::Complex,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixComplexityCounts {
    pub simple: usize,
    pub moderate: usize,
    pub complex: usize,
    pub manual: usize,
}

impl FixComplexityCounts {
    pub fn add(&mut self, complexity: FixComplexity) {
        match complexity {
            FixComplexity::Manual => self.manual += 1,
            FixComplexity::Simple => self.simple += 1,
            FixComplexity::Moderate => self.moderate += 1,
            FixComplexity::Complex => self.complex += 1,
        }
    }

    /// Diagnostics that carry at least one replacement.
    pub fn auto_fixable(&self) -> usize {
        self.simple + self.moderate + self.complex
    }
}
