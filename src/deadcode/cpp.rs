//! C++ dead code.
//!
//! Single files go through clang-tidy with a restricted check set, falling
//! back to clang++ unused-symbol warnings. Directories are handed to the LTO
//! differential engine.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{basename, extract_quoted_name, infer_kind, DeadCodeDetector, DeadCodeReport, UnusedItem};
use crate::language::{AnalysisTarget, Language};
use crate::lto;
use crate::process::Invocation;
use crate::tools::{Capability, ToolContext, CLANGXX, CLANG_TIDY};

const TIDY_CHECKS: &str = "-checks=-*,misc-unused-*,readability-redundant-*,bugprone-*";

const CPP_INSTALL_HINT: &str = "No C++ analysis tool is installed. Install one of:\n\
- clang-tidy: sudo apt install clang-tidy\n\
- clang++: sudo apt install clang";

lazy_static! {
    // main.cpp:12:6: warning: unused function 'helper' [-Wunused-function]
    static ref DIAGNOSTIC_LINE: Regex =
        Regex::new(r"^(.+?):(\d+):\d+: warning: (.+?)(?:\s+\[[^\]\s]+\])?$").unwrap();
}

/// Which parse mode a line comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Tidy,
    Compiler,
}

pub struct CppDetector;

impl CppDetector {
    pub fn new() -> Self {
        Self
    }

    fn parse_lines(&self, output: &str, source: Source) -> Vec<UnusedItem> {
        let tool = match source {
            Source::Tidy => "clang-tidy",
            Source::Compiler => "clang++",
        };
        let mut items = Vec::new();
        for line in output.lines().map(str::trim_end) {
            if !line.contains("warning:") {
                continue;
            }
            let relevant = match source {
                Source::Tidy => line.contains("unused") || line.contains("redundant"),
                Source::Compiler => line.contains("unused"),
            };
            if !relevant {
                continue;
            }
            let Some(caps) = DIAGNOSTIC_LINE.captures(line) else {
                continue;
            };
            let file = basename(&caps[1]);
            let Ok(line_no) = caps[2].parse::<u32>() else {
                continue;
            };
            let msg = &caps[3];
            let name = extract_quoted_name(msg).unwrap_or_else(|| msg.to_string());
            let message = format!("{} [{}:{}]", msg, file, line_no);
            items.push(UnusedItem::new(name, infer_kind(msg), tool, message).at(file, line_no));
        }
        items
    }

    /// Parse clang-tidy stdout.
    pub fn parse_tidy_output(&self, output: &str) -> Vec<UnusedItem> {
        self.parse_lines(output, Source::Tidy)
    }

    /// Parse clang++ stderr.
    pub fn parse_compiler_output(&self, output: &str) -> Vec<UnusedItem> {
        self.parse_lines(output, Source::Compiler)
    }

    fn detect_file(&self, target: &AnalysisTarget, ctx: &ToolContext) -> DeadCodeReport {
        let timeout = ctx.config().timeouts.tool();
        let tidy = ctx.locate(&CLANG_TIDY);
        let compiler = ctx.locate(&CLANGXX);

        if let Capability::Found(clang_tidy) = &tidy {
            info!("running clang-tidy");
            let invocation = Invocation::new(clang_tidy)
                .arg(TIDY_CHECKS)
                .arg(&target.path)
                .args(["--", "-std=c++17"])
                .timeout(timeout);
            match ctx.run(&invocation) {
                Ok(output) => {
                    let items = self.parse_tidy_output(&output.stdout);
                    if !items.is_empty() {
                        return DeadCodeReport::success(&target.path, "clang-tidy", items);
                    }
                }
                Err(e) => warn!(error = %e, "clang-tidy failed, falling back to compiler warnings"),
            }
        }

        let Capability::Found(clangxx) = compiler else {
            if tidy.is_found() {
                return DeadCodeReport::success(&target.path, "clang-tidy", Vec::new());
            }
            return DeadCodeReport::tool_missing(&target.path, "clang-tidy/clang++", CPP_INSTALL_HINT);
        };

        info!("using compiler warnings");
        let invocation = Invocation::new(clangxx)
            .args([
                "-std=c++17",
                "-Wunused-function",
                "-Wunused-variable",
                "-Wunused-member-function",
                "-c",
            ])
            .arg(&target.path)
            .args(["-o", "/dev/null"])
            .current_dir(target.base_dir())
            .timeout(timeout);

        match ctx.run(&invocation) {
            Ok(output) => {
                let items = self.parse_compiler_output(&output.stderr);
                DeadCodeReport::success(&target.path, "clang++", items)
            }
            Err(e) => DeadCodeReport::from_process_error(&target.path, "clang++", &e),
        }
    }
}

impl Default for CppDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadCodeDetector for CppDetector {
    fn tool_name(&self) -> &'static str {
        "clang-tidy"
    }

    fn languages(&self) -> &'static [Language] {
        &[Language::Cpp]
    }

    fn parse_output(&self, output: &str) -> Vec<UnusedItem> {
        self.parse_tidy_output(output)
    }

    fn detect(&self, target: &AnalysisTarget, ctx: &ToolContext) -> DeadCodeReport {
        if target.is_directory() {
            lto::analyze_project(&target.path, ctx)
        } else {
            self.detect_file(target, ctx)
        }
    }
}
