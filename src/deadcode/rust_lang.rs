//! Rust dead code from `cargo check --message-format=json`.

use serde::Deserialize;
use tracing::trace;

use super::{
    basename, extract_quoted_name, find_project_root, finish_report, infer_kind, DeadCodeDetector,
    DeadCodeReport, UnusedItem,
};
use crate::language::{AnalysisTarget, Language};
use crate::process::Invocation;
use crate::tools::{Capability, ToolContext, CARGO};

/// One line of cargo's JSON message stream. Only compiler messages carry `message`.
#[derive(Debug, Deserialize)]
struct CargoMessage {
    #[serde(default)]
    message: Option<RustcDiagnostic>,
}

#[derive(Debug, Deserialize)]
struct RustcDiagnostic {
    message: String,
    #[serde(default)]
    code: Option<DiagnosticCode>,
    #[serde(default)]
    spans: Vec<DiagnosticSpan>,
}

#[derive(Debug, Deserialize)]
struct DiagnosticCode {
    code: String,
}

#[derive(Debug, Deserialize)]
struct DiagnosticSpan {
    file_name: String,
    line_start: u32,
    #[serde(default)]
    is_primary: bool,
}

pub struct RustDetector;

impl RustDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadCodeDetector for RustDetector {
    fn tool_name(&self) -> &'static str {
        "cargo"
    }

    fn languages(&self) -> &'static [Language] {
        &[Language::Rust]
    }

    fn parse_output(&self, output: &str) -> Vec<UnusedItem> {
        let mut items = Vec::new();
        for line in output.lines().filter(|l| !l.trim().is_empty()) {
            let msg: CargoMessage = match serde_json::from_str(line) {
                Ok(m) => m,
                Err(e) => {
                    trace!(error = %e, "skipping non-JSON cargo line");
                    continue;
                }
            };
            let Some(diag) = msg.message else {
                continue;
            };
            let Some(code) = diag.code.as_ref().map(|c| c.code.as_str()) else {
                continue;
            };
            if !(code.contains("unused") || code.contains("dead_code")) {
                continue;
            }

            let name = extract_quoted_name(&diag.message).unwrap_or_else(|| code.to_string());
            let kind = infer_kind(&diag.message);
            let span = diag
                .spans
                .iter()
                .find(|s| s.is_primary)
                .or_else(|| diag.spans.first());

            let item = match span {
                Some(span) => {
                    let file = basename(&span.file_name);
                    let message = format!("{} [{}:{}]", diag.message, file, span.line_start);
                    UnusedItem::new(name, kind, self.tool_name(), message).at(file, span.line_start)
                }
                None => UnusedItem::new(name, kind, self.tool_name(), diag.message.clone()),
            };
            items.push(item);
        }
        items
    }

    fn detect(&self, target: &AnalysisTarget, ctx: &ToolContext) -> DeadCodeReport {
        let Capability::Found(cargo) = ctx.locate(&CARGO) else {
            return DeadCodeReport::tool_missing(&target.path, self.tool_name(), CARGO.install_hint);
        };

        let Some(root) = find_project_root(target.base_dir(), &["Cargo.toml"]) else {
            return DeadCodeReport::failure(
                &target.path,
                self.tool_name(),
                "Cargo.toml not found. Run in a Rust project directory.",
            );
        };

        let invocation = Invocation::new(cargo)
            .args(["check", "--message-format=json"])
            .current_dir(&root)
            .timeout(ctx.config().timeouts.build());

        match ctx.run(&invocation) {
            Ok(output) => {
                let items = self.parse_output(&output.stdout);
                finish_report(&target.path, self.tool_name(), &output, items)
            }
            Err(e) => DeadCodeReport::from_process_error(&target.path, self.tool_name(), &e),
        }
    }
}
