//! Language classification for analysis targets.
//!
//! A single file is classified by its suffix. A directory is scanned
//! recursively and classified by the first extension group, in priority
//! order, that has at least one matching file.

use globset::{Glob, GlobSet, GlobSetBuilder};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Language tag resolved for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    Python,
    Go,
    Csharp,
    Rust,
    Javascript,
    Typescript,
    Unknown,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Python => "python",
            Language::Go => "go",
            Language::Csharp => "csharp",
            Language::Rust => "rust",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Suffix table for single files (extension without the dot).
static SUFFIX_TABLE: phf::Map<&'static str, Language> = phf_map! {
    "cpp" => Language::Cpp,
    "cc" => Language::Cpp,
    "cxx" => Language::Cpp,
    "C" => Language::Cpp,
    "hpp" => Language::Cpp,
    "hxx" => Language::Cpp,
    "hh" => Language::Cpp,
    "h" => Language::Cpp,
    "py" => Language::Python,
    "go" => Language::Go,
    "cs" => Language::Csharp,
    "rs" => Language::Rust,
    "js" => Language::Javascript,
    "ts" => Language::Typescript,
};

/// Extension groups for directory scans, in priority order.
const DIRECTORY_GROUPS: &[(Language, &[&str])] = &[
    (
        Language::Cpp,
        &["cpp", "cxx", "cc", "C", "hpp", "hxx", "hh", "h"],
    ),
    (Language::Python, &["py"]),
    (Language::Go, &["go"]),
    (Language::Csharp, &["cs"]),
    (Language::Rust, &["rs"]),
    // One normalizer serves both, so a mixed tree is tagged javascript.
    (Language::Javascript, &["js", "ts"]),
];

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "vendor", "__pycache__"];

/// Whether the target is a single file or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    File,
    Directory,
}

/// A path together with its resolved language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisTarget {
    pub path: PathBuf,
    pub kind: TargetKind,
    pub language: Language,
}

impl AnalysisTarget {
    pub fn is_directory(&self) -> bool {
        self.kind == TargetKind::Directory
    }

    /// Directory the target lives in (the target itself for directories).
    pub fn base_dir(&self) -> &Path {
        if self.is_directory() {
            &self.path
        } else {
            self.path.parent().unwrap_or_else(|| Path::new("."))
        }
    }
}

/// Look up a single file's language from its suffix.
pub fn language_for_file(path: &Path) -> Language {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return Language::Unknown;
    };
    SUFFIX_TABLE.get(ext).copied().unwrap_or(Language::Unknown)
}

/// Classifies paths and enumerates source files, honoring exclusion globs.
#[derive(Debug, Clone)]
pub struct TargetClassifier {
    excluded: GlobSet,
}

impl Default for TargetClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetClassifier {
    /// Create a classifier with no exclusions.
    pub fn new() -> Self {
        Self {
            excluded: GlobSet::empty(),
        }
    }

    /// Create a classifier that skips paths matching any of the given globs.
    pub fn with_exclusions(patterns: &[String]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            excluded: builder.build()?,
        })
    }

    /// Classify a path. Never fails: unreadable or unmatched paths are `unknown`.
    pub fn classify(&self, path: &Path) -> AnalysisTarget {
        if path.is_dir() {
            AnalysisTarget {
                path: path.to_path_buf(),
                kind: TargetKind::Directory,
                language: self.classify_directory(path),
            }
        } else {
            AnalysisTarget {
                path: path.to_path_buf(),
                kind: TargetKind::File,
                language: language_for_file(path),
            }
        }
    }

    fn classify_directory(&self, dir: &Path) -> Language {
        let mut seen: HashSet<String> = HashSet::new();
        for file in self.walk_files(dir) {
            if let Some(ext) = file.extension().and_then(|e| e.to_str()) {
                seen.insert(ext.to_string());
            }
        }

        DIRECTORY_GROUPS
            .iter()
            .find(|(_, exts)| exts.iter().any(|e| seen.contains(*e)))
            .map(|(lang, _)| *lang)
            .unwrap_or(Language::Unknown)
    }

    /// Collect files under `root` whose extension is one of `extensions`, sorted.
    pub fn source_files(&self, root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .walk_files(root)
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| extensions.contains(&e))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        files
    }

    fn walk_files<'a>(&'a self, root: &Path) -> impl Iterator<Item = PathBuf> + 'a {
        let root = root.to_path_buf();
        WalkDir::new(&root)
            .follow_links(true)
            .into_iter()
            .filter_entry(move |e| e.path() == root || !is_skipped_dir(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(move |p| !self.excluded.is_match(p))
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}
