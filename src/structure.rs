//! Structural summary from the external structure-analysis binary.
//!
//! The numbers are contextual only; a missing binary or unusable output is
//! recorded as an `error` entry and never stops the analysis.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::process::Invocation;
use crate::tools::{Capability, ToolContext, STRUCTURE};

/// Function/class counts, or why they are unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Structure {
    Summary {
        total_functions: u64,
        total_classes: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        cyclomatic_complexity: Option<u64>,
    },
    Unavailable {
        error: String,
    },
}

impl Structure {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Structure::Unavailable { error: error.into() }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Structure::Summary { .. })
    }
}

fn count(root: &Value, stat: &str, list: &str) -> Option<u64> {
    root.pointer(&format!("/statistics/{}", stat))
        .and_then(Value::as_u64)
        .or_else(|| root.get(list).and_then(Value::as_array).map(|a| a.len() as u64))
}

/// Read counts from the binary's JSON output.
pub fn parse_structure_output(output: &str) -> Structure {
    let root: Value = match serde_json::from_str(output.trim()) {
        Ok(v) => v,
        Err(e) => return Structure::unavailable(format!("structure output is not JSON: {}", e)),
    };

    let functions = count(&root, "total_functions", "functions");
    let classes = count(&root, "total_classes", "classes");
    if functions.is_none() && classes.is_none() {
        return Structure::unavailable("structure output has no function or class counts");
    }

    Structure::Summary {
        total_functions: functions.unwrap_or(0),
        total_classes: classes.unwrap_or(0),
        cyclomatic_complexity: root
            .pointer("/complexity/cyclomatic_complexity")
            .and_then(Value::as_u64),
    }
}

/// Run `<binary> analyze <path>` and summarize the result.
pub fn probe_structure(path: &Path, ctx: &ToolContext) -> Structure {
    let configured = ctx
        .config()
        .structure_binary
        .as_ref()
        .filter(|p| p.is_file())
        .cloned();
    let binary = match configured {
        Some(p) => p,
        None => match ctx.locate(&STRUCTURE) {
            Capability::Found(p) => p,
            Capability::Missing => return Structure::unavailable(STRUCTURE.install_hint),
        },
    };

    info!(binary = %binary.display(), "running structure analysis");
    let invocation = Invocation::new(binary)
        .arg("analyze")
        .arg(path)
        .args(["--io-threads", "8"])
        .timeout(ctx.config().timeouts.structure());

    match ctx.run(&invocation) {
        Ok(output) => {
            let structure = parse_structure_output(&output.stdout);
            debug!(?structure, "structure summary");
            structure
        }
        Err(e) => Structure::unavailable(format!("structure analysis failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_block() {
        let output = r#"{"statistics":{"total_functions":12,"total_classes":3},"complexity":{"cyclomatic_complexity":27}}"#;
        assert_eq!(
            parse_structure_output(output),
            Structure::Summary {
                total_functions: 12,
                total_classes: 3,
                cyclomatic_complexity: Some(27),
            }
        );
    }

    #[test]
    fn test_array_fallback() {
        let output = r#"{"functions":[{"name":"a"},{"name":"b"}],"classes":[]}"#;
        assert_eq!(
            parse_structure_output(output),
            Structure::Summary {
                total_functions: 2,
                total_classes: 0,
                cyclomatic_complexity: None,
            }
        );
    }

    #[test]
    fn test_unusable_output() {
        assert!(!parse_structure_output("segfault").is_available());
        assert!(!parse_structure_output(r#"{"version":"1"}"#).is_available());
    }

    #[test]
    fn test_serialized_forms() {
        let ok = serde_json::to_value(Structure::Summary {
            total_functions: 1,
            total_classes: 2,
            cyclomatic_complexity: None,
        })
        .unwrap();
        assert_eq!(ok["total_functions"], 1);
        assert!(ok.get("cyclomatic_complexity").is_none());

        let err = serde_json::to_value(Structure::unavailable("missing")).unwrap();
        assert_eq!(err["error"], "missing");
    }
}
