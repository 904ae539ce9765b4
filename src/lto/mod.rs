//! Project-level C++ dead-code detection through link-time optimization.
//!
//! Two builds of the same sources are compared: a plain optimized baseline and
//! a candidate built with function/data sections, LTO and linker section GC.
//! Symbols present in the baseline but gone from the candidate are reported as
//! dead. Projects without a CMake descriptor are compiled file by file and the
//! linker's own GC diagnostics are reported instead.
//!
//! All build output lives in a temporary directory removed on every return path.

mod build_system;
mod cmake;
mod diff;
mod manual;
mod symbols;

pub use build_system::{detect_build_system, BuildSystem};
pub use cmake::{failed_phase, find_binary, BuildVariant};
pub use diff::{classify_symbol, removed_items, InlineHeuristic, SymbolDiff, LTO_TOOL};
pub use manual::{gc_items, parse_gc_sections, GcSection};
pub use symbols::{
    inspect_binary, parse_nm_output, parse_objdump_output, parse_size_output, BuildArtifact,
    SymbolSet,
};

use std::path::Path;
use tempfile::TempDir;
use tracing::{info, warn};

use crate::deadcode::{BuildPhase, DeadCodeReport};
use crate::tools::{Capability, ToolContext, CMAKE, CXXFILT, GXX, NM, OBJDUMP};

/// Source suffixes compiled by the project analysis.
pub const SOURCE_EXTENSIONS: &[&str] = &["cpp", "cxx", "cc", "C"];

/// Analyze a C++ project directory.
pub fn analyze_project(project: &Path, ctx: &ToolContext) -> DeadCodeReport {
    let Capability::Found(gxx) = ctx.locate(&GXX) else {
        return DeadCodeReport::tool_missing(project, LTO_TOOL, GXX.install_hint);
    };

    let sources = ctx.classifier().source_files(project, SOURCE_EXTENSIONS);
    if sources.is_empty() {
        return DeadCodeReport::failure(project, LTO_TOOL, "No C++ source files found in project");
    }

    let mut advisories = Vec::new();
    let threshold = ctx.config().lto.large_project_threshold;
    if sources.len() > threshold {
        warn!(files = sources.len(), "large project detected, LTO analysis may take several minutes");
        advisories.push(format!(
            "Large project detected: {} C++ files; LTO analysis may take several minutes",
            sources.len()
        ));
    }

    let build_system = detect_build_system(project);
    info!(%build_system, files = sources.len(), "starting LTO analysis");

    let workdir = match TempDir::new() {
        Ok(dir) => dir,
        Err(e) => {
            return DeadCodeReport::failure(project, LTO_TOOL, format!("cannot create build directory: {}", e))
                .with_phase(BuildPhase::Configure)
        }
    };

    let report = match build_system {
        BuildSystem::Cmake => {
            let Capability::Found(cmake) = ctx.locate(&CMAKE) else {
                return DeadCodeReport::tool_missing(project, LTO_TOOL, CMAKE.install_hint)
                    .with_advisories(advisories);
            };
            if !ctx.locate(&NM).is_found() && !ctx.locate(&OBJDUMP).is_found() {
                return DeadCodeReport::tool_missing(project, LTO_TOOL, NM.install_hint)
                    .with_advisories(advisories);
            }
            // Undemangled names are dropped, so without c++filt both symbol sets are empty.
            if !ctx.locate(&CXXFILT).is_found() {
                return DeadCodeReport::tool_missing(project, LTO_TOOL, CXXFILT.install_hint)
                    .with_advisories(advisories);
            }
            cmake::analyze(project, &cmake, workdir.path(), ctx)
        }
        BuildSystem::Makefile => {
            info!("makefile project, compiling discovered sources directly");
            manual::analyze(project, &sources, &gxx, workdir.path(), ctx)
        }
        BuildSystem::Manual => manual::analyze(project, &sources, &gxx, workdir.path(), ctx),
    };

    report
        .with_files_analyzed(sources.len())
        .with_advisories(advisories)
}
