//! JavaScript/TypeScript unused exports via ts-prune.

use lazy_static::lazy_static;
use regex::Regex;

use super::{find_project_root, finish_report, DeadCodeDetector, DeadCodeReport, ItemKind, UnusedItem};
use crate::language::{AnalysisTarget, Language};
use crate::process::Invocation;
use crate::tools::{Capability, ToolContext, NPX};

const PROJECT_MARKERS: &[&str] = &["tsconfig.json", "package.json"];

lazy_static! {
    static ref LOCATION: Regex = Regex::new(r"^(.+?):(\d+)$").unwrap();
}

pub struct JavascriptDetector;

impl JavascriptDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JavascriptDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadCodeDetector for JavascriptDetector {
    fn tool_name(&self) -> &'static str {
        "ts-prune"
    }

    fn languages(&self) -> &'static [Language] {
        &[Language::Javascript, Language::Typescript]
    }

    fn parse_output(&self, output: &str) -> Vec<UnusedItem> {
        let mut items = Vec::new();
        for line in output.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("ts-prune") {
                continue;
            }
            // src/utils.ts:10 - myFunction (used in module)
            let Some((location, export)) = line.split_once(" - ") else {
                items.push(UnusedItem::new(line, ItemKind::Export, self.tool_name(), line));
                continue;
            };
            let (location, export) = (location.trim(), export.trim());
            let name = export.split_whitespace().next().unwrap_or(export);
            let item = UnusedItem::new(
                name,
                ItemKind::Export,
                self.tool_name(),
                format!("{} [{}]", export, location),
            );
            let item = match LOCATION.captures(location) {
                Some(caps) => match caps[2].parse::<u32>() {
                    Ok(n) => item.at(&caps[1], n),
                    Err(_) => item.in_file(location),
                },
                None => item.in_file(location),
            };
            items.push(item);
        }
        items
    }

    fn detect(&self, target: &AnalysisTarget, ctx: &ToolContext) -> DeadCodeReport {
        let Capability::Found(npx) = ctx.locate(&NPX) else {
            return DeadCodeReport::tool_missing(&target.path, self.tool_name(), NPX.install_hint);
        };

        let Some(root) = find_project_root(target.base_dir(), PROJECT_MARKERS) else {
            return DeadCodeReport::failure(
                &target.path,
                self.tool_name(),
                "tsconfig.json or package.json not found. Run in a TypeScript/JavaScript project directory.",
            );
        };

        let invocation = Invocation::new(npx)
            .arg("ts-prune")
            .current_dir(&root)
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
