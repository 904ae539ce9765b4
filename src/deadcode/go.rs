//! Go dead code via staticcheck (U1000/U1001).

use lazy_static::lazy_static;
use regex::Regex;
use std::ffi::OsString;

use super::{finish_report, DeadCodeDetector, DeadCodeReport, ItemKind, UnusedItem};
use crate::language::{AnalysisTarget, Language};
use crate::process::Invocation;
use crate::tools::{Capability, ToolContext, STATICCHECK};

const GO_TOOLCHAIN_BIN: &str = "/usr/local/go/bin";

lazy_static! {
    // test.go:15:6: func unusedFunction is unused (U1000)
    static ref STATICCHECK_LINE: Regex = Regex::new(r"^(.+?):(\d+):\d+: (.+)$").unwrap();
    static ref CHECK_CODE: Regex = Regex::new(r"\s*\([A-Z]+\d+\)\s*$").unwrap();
    static ref GO_ENTITY: Regex = Regex::new(r"^(func|field|type|var|const)\s+(\S+)").unwrap();
}

pub struct GoDetector;

impl GoDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn entity(message: &str) -> (String, ItemKind) {
    let Some(caps) = GO_ENTITY.captures(message) else {
        return (message.to_string(), ItemKind::Symbol);
    };
    let name = caps[2].to_string();
    let kind = match &caps[1] {
        // func (*T).method is unused
        "func" if name.starts_with('(') => ItemKind::Method,
        "func" => ItemKind::Function,
        "field" | "var" | "const" => ItemKind::Variable,
        _ => ItemKind::Symbol,
    };
    (name, kind)
}

fn search_path_with_toolchain() -> OsString {
    let mut path = std::env::var_os("PATH").unwrap_or_default();
    if !path.is_empty() {
        path.push(":");
    }
    path.push(GO_TOOLCHAIN_BIN);
    path
}

impl DeadCodeDetector for GoDetector {
    fn tool_name(&self) -> &'static str {
        "staticcheck"
    }

    fn languages(&self) -> &'static [Language] {
        &[Language::Go]
    }

    fn parse_output(&self, output: &str) -> Vec<UnusedItem> {
        output
            .lines()
            .filter(|line| line.contains("is unused"))
            .filter_map(|line| STATICCHECK_LINE.captures(line.trim_end()))
            .filter_map(|caps| {
                let file = caps[1].to_string();
                let line_no = caps[2].parse::<u32>().ok()?;
                let msg = CHECK_CODE.replace(&caps[3], "").to_string();
                let (name, kind) = entity(&msg);
                let message = format!("{} [{}:{}]", msg, file, line_no);
                Some(UnusedItem::new(name, kind, self.tool_name(), message).at(file, line_no))
            })
            .collect()
    }

    fn detect(&self, target: &AnalysisTarget, ctx: &ToolContext) -> DeadCodeReport {
        let Capability::Found(staticcheck) = ctx.locate(&STATICCHECK) else {
            return DeadCodeReport::tool_missing(&target.path, self.tool_name(), STATICCHECK.install_hint);
        };

        let invocation = Invocation::new(staticcheck)
            .arg("-checks=U1000,U1001")
            .arg(&target.path)
            .env("PATH", search_path_with_toolchain())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unused_function() {
        let items =
            GoDetector::new().parse_output("test.go:15:6: func unusedFunction is unused (U1000)\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].message, "func unusedFunction is unused [test.go:15]");
        assert_eq!(items[0].name, "unusedFunction");
        assert_eq!(items[0].kind, ItemKind::Function);
    }

    #[test]
    fn test_parse_filters_other_diagnostics() {
        let output = "\
main.go:3:2: \"fmt\" imported and not used
main.go:20:2: field count is unused (U1000)
main.go:31:6: func (*server).drain is unused (U1000)
main.go:40:7: const retries is unused (U1000)
main.go:44:6: type legacy is unused (U1000)
";
        let items = GoDetector::new().parse_output(output);
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].kind, ItemKind::Variable);
        assert_eq!(items[0].name, "count");
        assert_eq!(items[1].kind, ItemKind::Method);
        assert_eq!(items[1].name, "(*server).drain");
        assert_eq!(items[2].kind, ItemKind::Variable);
        assert_eq!(items[3].kind, ItemKind::Symbol);
        assert_eq!(items[3].message, "type legacy is unused [main.go:44]");
    }

    #[test]
    fn test_toolchain_appended_to_path() {
        let path = search_path_with_toolchain();
        assert!(path.to_string_lossy().ends_with(GO_TOOLCHAIN_BIN));
    }
}
