//! Python dead code via vulture.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use super::{extract_quoted_name, finish_report, infer_kind, DeadCodeDetector, DeadCodeReport, UnusedItem};
use crate::language::{AnalysisTarget, Language};
use crate::process::Invocation;
use crate::tools::{Capability, ToolContext, VULTURE};

lazy_static! {
    // test.py:6: unused import 'os' (90% confidence)
    static ref VULTURE_LINE: Regex =
        Regex::new(r"^(.+?):(\d+): (.+?)(?: \((\d+)% confidence\))?$").unwrap();
}

pub struct PythonDetector;

impl PythonDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PythonDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadCodeDetector for PythonDetector {
    fn tool_name(&self) -> &'static str {
        "vulture"
    }

    fn languages(&self) -> &'static [Language] {
        &[Language::Python]
    }

    fn parse_output(&self, output: &str) -> Vec<UnusedItem> {
        let mut items = Vec::new();
        for line in output.lines() {
            let line = line.trim_end();
            let Some(caps) = VULTURE_LINE.captures(line) else {
                if !line.is_empty() {
                    trace!(line, "skipping vulture line");
                }
                continue;
            };
            let file = &caps[1];
            let Ok(line_no) = caps[2].parse::<u32>() else {
                continue;
            };
            let msg = &caps[3];
            let message = match caps.get(4) {
                Some(pct) => format!("{} ({}%) [{}:{}]", msg, pct.as_str(), file, line_no),
                None => format!("{} [{}:{}]", msg, file, line_no),
            };
            let name = extract_quoted_name(msg).unwrap_or_else(|| msg.to_string());
            items.push(UnusedItem::new(name, infer_kind(msg), self.tool_name(), message).at(file, line_no));
        }
        items
    }

    fn detect(&self, target: &AnalysisTarget, ctx: &ToolContext) -> DeadCodeReport {
        let Capability::Found(vulture) = ctx.locate(&VULTURE) else {
            return DeadCodeReport::tool_missing(&target.path, self.tool_name(), VULTURE.install_hint);
        };

        let invocation = Invocation::new(vulture)
            .arg(&target.path)
            .args(["--min-confidence", "60"])
            .timeout(ctx.config().timeouts.tool());

        match ctx.run(&invocation) {
            Ok(output) => {
                let items = self.parse_output(&output.stdout);
                finish_report(&target.path, self.tool_name(), &output, items)
            }
            Err(e) => DeadCodeReport::from_process_error(&target.path, self.tool_name(), &e),
        }
    }
}
