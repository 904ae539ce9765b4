//! Manual LTO build: compile each source, link once with section GC, and
//! read the linker's `--print-gc-sections` diagnostics.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::diff::LTO_TOOL;
use super::symbols::demangle_one;
use crate::deadcode::{excerpt, BuildPhase, DeadCodeReport, ItemKind, UnusedItem};
use crate::process::{Invocation, ProcessError};
use crate::tools::ToolContext;

pub const METHOD: &str = "link_time_gc_sections";

lazy_static! {
    static ref GC_SECTION: Regex =
        Regex::new(r"removing unused section '(.+?)' in file '(.+?)'").unwrap();
}

/// One section discarded by the linker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcSection {
    pub section: String,
    pub file: String,
}

/// Extract discarded sections from linker output.
pub fn parse_gc_sections(output: &str) -> Vec<GcSection> {
    output
        .lines()
        .filter_map(|line| GC_SECTION.captures(line))
        .map(|caps| GcSection {
            section: caps[1].to_string(),
            file: caps[2].to_string(),
        })
        .collect()
}

/// Turn discarded sections into items. `demangle` returns `None` when a
/// name does not demangle.
pub fn gc_items<F>(sections: &[GcSection], demangle: F) -> Vec<UnusedItem>
where
    F: Fn(&str) -> Option<String>,
{
    let mut items = Vec::new();
    for gc in sections {
        let (symbol, is_data) = if let Some(sym) = gc.section.strip_prefix(".text.") {
            (sym, false)
        } else if let Some(sym) = gc
            .section
            .strip_prefix(".data.")
            .or_else(|| gc.section.strip_prefix(".bss."))
        {
            (sym, true)
        } else {
            continue;
        };
        if symbol.is_empty() {
            continue;
        }

        let demangled = demangle(symbol);
        let (kind, name) = match (is_data, demangled) {
            (true, d) => (ItemKind::Variable, d.unwrap_or_else(|| symbol.to_string())),
            (false, Some(d)) => (ItemKind::Function, d),
            (false, None) => (ItemKind::Symbol, symbol.to_string()),
        };
        let message = format!("unused {} '{}' [{}]", kind, name, gc.file);
        items.push(UnusedItem::new(name, kind, LTO_TOOL, message).in_file(gc.file.clone()));
    }
    items
}

fn object_name(index: usize, source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "source".to_string());
    format!("{}_{}.o", index, stem)
}

/// Compile and link `sources` inside `workdir`.
pub fn analyze(project: &Path, sources: &[PathBuf], gxx: &Path, workdir: &Path, ctx: &ToolContext) -> DeadCodeReport {
    let timeouts = &ctx.config().timeouts;
    info!(files = sources.len(), "manual LTO build");

    let mut objects = Vec::new();
    for (index, source) in sources.iter().enumerate() {
        let object = workdir.join(object_name(index, source));
        let compile = Invocation::new(gxx)
            .args(["-flto", "-O2", "-ffunction-sections", "-fdata-sections", "-c"])
            .arg(source)
            .arg("-o")
            .arg(&object)
            .current_dir(project)
            .timeout(timeouts.compile());

        match ctx.run(&compile) {
            Ok(out) if out.success => objects.push(object),
            Ok(out) => debug!(source = %source.display(), stderr = %excerpt(&out.stderr), "compile failed, skipping"),
            Err(e) => return compile_error(project, &e),
        }
    }

    if objects.is_empty() {
        return DeadCodeReport::failure(project, LTO_TOOL, "No object files compiled successfully")
            .with_phase(BuildPhase::Compile)
            .with_method(METHOD);
    }
    if objects.len() < sources.len() {
        warn!(compiled = objects.len(), total = sources.len(), "some sources failed to compile");
    }

    let link = Invocation::new(gxx)
        .args(["-flto", "-O2", "-Wl,--gc-sections", "-Wl,--print-gc-sections"])
        .args(&objects)
        .arg("-o")
        .arg(workdir.join("lto_analysis"))
        .current_dir(project)
        .timeout(timeouts.link());

    let output = match ctx.run(&link) {
        Ok(out) => out,
        Err(e) => {
            return DeadCodeReport::from_process_error(project, LTO_TOOL, &e)
                .with_phase(BuildPhase::Link)
                .with_method(METHOD)
        }
    };

    let sections = parse_gc_sections(&output.stderr);
    let items = gc_items(&sections, |sym| demangle_one(sym, ctx));

    if output.success {
        DeadCodeReport::success(project, LTO_TOOL, items).with_method(METHOD)
    } else if !items.is_empty() {
        let count = items.len();
        DeadCodeReport::partial(
            project,
            LTO_TOOL,
            items,
            format!("LTO link failed but found {} unused items", count),
        )
        .with_phase(BuildPhase::Link)
        .with_method(METHOD)
    } else {
        DeadCodeReport::failure(
            project,
            LTO_TOOL,
            format!("LTO link failed: {}", excerpt(&output.stderr)),
        )
        .with_phase(BuildPhase::Link)
        .with_method(METHOD)
    }
}

fn compile_error(project: &Path, err: &ProcessError) -> DeadCodeReport {
    DeadCodeReport::from_process_error(project, LTO_TOOL, err)
        .with_phase(BuildPhase::Compile)
        .with_method(METHOD)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK_STDERR: &str = "\
/usr/bin/ld: removing unused section '.text._Z15unused_functionv' in file '/tmp/x/0_main.o'
/usr/bin/ld: removing unused section '.rodata.cst8' in file '/tmp/x/0_main.o'
/usr/bin/ld: removing unused section '.data._ZL7counter' in file '/tmp/x/1_util.o'
/usr/bin/ld: removing unused section '.bss.scratch' in file '/tmp/x/1_util.o'
/usr/bin/ld: removing unused section '.text.plain_c_symbol' in file '/tmp/x/1_util.o'
collect2: error: ld returned 1 exit status
";

    fn fake_demangle(sym: &str) -> Option<String> {
        match sym {
            "_Z15unused_functionv" => Some("unused_function()".to_string()),
            "_ZL7counter" => Some("counter".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_parse_gc_sections() {
        let sections = parse_gc_sections(LINK_STDERR);
        assert_eq!(sections.len(), 5);
        assert_eq!(sections[0].section, ".text._Z15unused_functionv");
        assert_eq!(sections[0].file, "/tmp/x/0_main.o");
    }

    #[test]
    fn test_gc_items() {
        let items = gc_items(&parse_gc_sections(LINK_STDERR), fake_demangle);
        assert_eq!(items.len(), 4);

        assert_eq!(items[0].kind, ItemKind::Function);
        assert_eq!(items[0].message, "unused function 'unused_function()' [/tmp/x/0_main.o]");

        assert_eq!(items[1].kind, ItemKind::Variable);
        assert_eq!(items[1].name, "counter");

        assert_eq!(items[2].kind, ItemKind::Variable);
        assert_eq!(items[2].name, "scratch");

        assert_eq!(items[3].kind, ItemKind::Symbol);
        assert_eq!(items[3].message, "unused symbol 'plain_c_symbol' [/tmp/x/1_util.o]");
    }

    #[test]
    fn test_object_name() {
        assert_eq!(object_name(3, Path::new("src/main.cpp")), "3_main.o");
    }
}
