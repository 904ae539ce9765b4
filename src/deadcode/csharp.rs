//! C# dead code from .NET compiler warnings.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{extract_quoted_name, finish_report, DeadCodeDetector, DeadCodeReport, ItemKind, UnusedItem};
use crate::language::{AnalysisTarget, Language};
use crate::process::Invocation;
use crate::tools::{Capability, ToolContext, DOTNET};

lazy_static! {
    // /src/App/Program.cs(12,17): warning CS0169: The field 'Program._unused' is never used [/src/App/App.csproj]
    static ref BUILD_WARNING: Regex =
        Regex::new(r"([^/\\\s]+\.cs)\((\d+),(\d+)\): warning (CS\d+): (.+?) \[").unwrap();
}

/// Warnings that indicate unused code, with the kind each one reports.
const UNUSED_CODES: &[(&str, ItemKind)] = &[
    // field assigned but its value is never used
    ("CS0414", ItemKind::Variable),
    // field is never used
    ("CS0169", ItemKind::Variable),
    // unnecessary using directive
    ("CS8019", ItemKind::Import),
];

pub struct CsharpDetector;

impl CsharpDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsharpDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn find_project_file(dir: &Path) -> Option<PathBuf> {
    let mut projects: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("csproj"))
        .collect();
    projects.sort();
    projects.into_iter().next()
}

impl DeadCodeDetector for CsharpDetector {
    fn tool_name(&self) -> &'static str {
        "dotnet"
    }

    fn languages(&self) -> &'static [Language] {
        &[Language::Csharp]
    }

    fn parse_output(&self, output: &str) -> Vec<UnusedItem> {
        let mut seen: HashSet<(String, String, u32)> = HashSet::new();
        let mut items = Vec::new();

        for line in output.lines() {
            if !line.contains("warning CS") {
                continue;
            }
            let Some(caps) = BUILD_WARNING.captures(line) else {
                continue;
            };
            let code = &caps[4];
            let Some((_, kind)) = UNUSED_CODES.iter().find(|(c, _)| *c == code) else {
                continue;
            };
            let file = caps[1].to_string();
            let Ok(line_no) = caps[2].parse::<u32>() else {
                continue;
            };
            // MSBuild repeats warnings in its summary section.
            if !seen.insert((code.to_string(), file.clone(), line_no)) {
                continue;
            }
            let msg = &caps[5];
            let name = extract_quoted_name(msg).unwrap_or_else(|| code.to_string());
            let message = format!("{} [{}:{}]", msg, file, line_no);
            items.push(UnusedItem::new(name, *kind, self.tool_name(), message).at(file, line_no));
        }
        items
    }

    fn detect(&self, target: &AnalysisTarget, ctx: &ToolContext) -> DeadCodeReport {
        let Capability::Found(dotnet) = ctx.locate(&DOTNET) else {
            return DeadCodeReport::tool_missing(&target.path, self.tool_name(), DOTNET.install_hint);
        };

        let project_dir = target.base_dir();
        let Some(project) = find_project_file(project_dir) else {
            return DeadCodeReport::failure(
                &target.path,
                self.tool_name(),
                "No .csproj file found. Run in a C# project directory.",
            );
        };
        debug!(project = %project.display(), "found C# project");

        let timeout = ctx.config().timeouts.build();

        // A clean build is required for warnings to be emitted again.
        let clean = Invocation::new(&dotnet)
            .arg("clean")
            .current_dir(project_dir)
            .timeout(timeout);
        if let Err(e) = ctx.run(&clean) {
            return DeadCodeReport::from_process_error(&target.path, self.tool_name(), &e);
        }

        info!("running dotnet build");
        let build = Invocation::new(&dotnet)
            .args(["build", "--verbosity", "normal"])
            .current_dir(project_dir)
            .timeout(timeout);

        match ctx.run(&build) {
            Ok(output) => {
                let items = self.parse_output(&output.stdout);
                finish_report(&target.path, self.tool_name(), &output, items)
            }
            Err(e) => DeadCodeReport::from_process_error(&target.path, self.tool_name(), &e),
        }
    }
}
