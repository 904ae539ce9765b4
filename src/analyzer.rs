//! Analysis orchestration: classify, summarize structure, detect dead code.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::deadcode::{self, DeadCodeReport};
use crate::language::Language;
use crate::structure::{self, Structure};
use crate::tools::ToolContext;

/// `normal` only summarizes structure; `complete` also runs dead-code detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Normal,
    Complete,
}

/// Output of analyzing one target.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analysis_mode: AnalysisMode,
    pub target: String,
    pub language: Language,
    pub structure: Structure,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_code: Option<DeadCodeReport>,
}

impl AnalysisReport {
    /// True when complete mode found at least one unused item.
    pub fn found_dead_code(&self) -> bool {
        self.dead_code
            .as_ref()
            .map(DeadCodeReport::found_dead_code)
            .unwrap_or(false)
    }
}

/// Runs the analysis pipeline against targets.
pub struct Analyzer<'a> {
    ctx: &'a ToolContext,
    skip_structure: bool,
}

impl<'a> Analyzer<'a> {
    pub fn new(ctx: &'a ToolContext) -> Self {
        Self {
            ctx,
            skip_structure: false,
        }
    }

    /// Set whether to skip the structure probe.
    pub fn skip_structure(mut self, skip: bool) -> Self {
        self.skip_structure = skip;
        self
    }

    /// Analyze one path. Never fails: every problem ends up in the report.
    pub fn analyze(&self, path: &Path, mode: AnalysisMode) -> AnalysisReport {
        let target = self.ctx.classifier().classify(path);
        info!(target = %path.display(), language = %target.language, ?mode, "analyzing");

        let structure = if self.skip_structure {
            Structure::unavailable("structure analysis skipped")
        } else {
            structure::probe_structure(path, self.ctx)
        };

        let dead_code = match mode {
            AnalysisMode::Complete => Some(deadcode::dispatch(&target, self.ctx)),
            AnalysisMode::Normal => None,
        };

        AnalysisReport {
            analysis_mode: mode,
            target: path.to_string_lossy().to_string(),
            language: target.language,
            structure,
            dead_code,
        }
    }

    /// Analyze targets one after another; each result is independent.
    pub fn analyze_all(&self, paths: &[PathBuf], mode: AnalysisMode) -> Vec<AnalysisReport> {
        paths.iter().map(|p| self.analyze(p, mode)).collect()
    }
}
