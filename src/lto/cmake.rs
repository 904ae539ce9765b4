//! Differential CMake build: baseline vs. LTO + section GC.

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::diff::{InlineHeuristic, SymbolDiff, LTO_TOOL};
use super::manual::{gc_items, parse_gc_sections};
use super::symbols::{demangle_one, inspect_binary, BuildArtifact};
use crate::deadcode::{excerpt, BuildPhase, DeadCodeReport};
use crate::process::{CommandOutput, Invocation};
use crate::tools::ToolContext;

pub const METHOD: &str = "symbol_comparison_analysis";

/// Flags for one of the two builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildVariant {
    Baseline,
    Candidate,
}

impl BuildVariant {
    fn dir_name(&self) -> &'static str {
        match self {
            BuildVariant::Baseline => "baseline",
            BuildVariant::Candidate => "candidate",
        }
    }

    /// Cache definitions passed to `cmake -S .. -B ..`.
    pub fn cmake_defines(&self) -> Vec<&'static str> {
        match self {
            BuildVariant::Baseline => vec!["-DCMAKE_CXX_FLAGS=-O2 -g"],
            BuildVariant::Candidate => vec![
                "-DCMAKE_CXX_FLAGS=-flto -O2 -ffunction-sections -fdata-sections",
                "-DCMAKE_EXE_LINKER_FLAGS=-flto -Wl,--gc-sections -Wl,--print-gc-sections",
            ],
        }
    }
}

impl std::fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// A failed build step, already mapped to a report.
type StepResult<T> = Result<T, DeadCodeReport>;

/// Decide whether a failed build broke while compiling or while linking.
pub fn failed_phase(output: &CommandOutput) -> BuildPhase {
    let text = output.combined();
    let link_markers = ["ld returned", "undefined reference", "collect2", "linker command failed"];
    if link_markers.iter().any(|m| text.contains(m)) {
        BuildPhase::Link
    } else {
        BuildPhase::Compile
    }
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.extension().and_then(|e| e.to_str()) == Some("exe")
    }
}

/// Find the built executable: the configured name, or the first executable
/// (by path) outside `CMakeFiles/`.
pub fn find_binary(build_dir: &Path, binary_name: Option<&str>) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(build_dir)
        .into_iter()
        .filter_entry(|e| e.file_name() != "CMakeFiles")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| match binary_name {
            Some(name) => p.file_name().map(|n| n == name).unwrap_or(false),
            None => is_executable(p),
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

struct Builder<'a> {
    project: &'a Path,
    cmake: &'a Path,
    workdir: &'a Path,
    ctx: &'a ToolContext,
}

impl Builder<'_> {
    fn fail(&self, phase: BuildPhase, message: String) -> DeadCodeReport {
        DeadCodeReport::failure(self.project, LTO_TOOL, message)
            .with_phase(phase)
            .with_method(METHOD)
    }

    fn configure(&self, variant: BuildVariant) -> StepResult<PathBuf> {
        let build_dir = self.workdir.join(variant.dir_name());
        info!(%variant, "configuring");
        let invocation = Invocation::new(self.cmake)
            .arg("-S")
            .arg(self.project)
            .arg("-B")
            .arg(&build_dir)
            .args(variant.cmake_defines())
            .timeout(self.ctx.config().timeouts.configure());

        match self.ctx.run(&invocation) {
            Ok(out) if out.success => Ok(build_dir),
            Ok(out) => Err(self.fail(
                BuildPhase::Configure,
                format!("{} cmake configure failed: {}", variant, excerpt(&out.stderr)),
            )),
            Err(e) => Err(DeadCodeReport::from_process_error(self.project, LTO_TOOL, &e)
                .with_phase(BuildPhase::Configure)
                .with_method(METHOD)),
        }
    }

    fn build(&self, variant: BuildVariant, build_dir: &Path) -> StepResult<CommandOutput> {
        info!(%variant, "building");
        let invocation = Invocation::new(self.cmake)
            .arg("--build")
            .arg(build_dir)
            .timeout(self.ctx.config().timeouts.build());

        self.ctx.run(&invocation).map_err(|e| {
            DeadCodeReport::from_process_error(self.project, LTO_TOOL, &e)
                .with_phase(BuildPhase::Compile)
                .with_method(METHOD)
        })
    }

    fn inspect(&self, variant: BuildVariant, build_dir: &Path, binary_name: Option<&str>) -> StepResult<BuildArtifact> {
        let Some(binary) = find_binary(build_dir, binary_name) else {
            return Err(self.fail(
                BuildPhase::Inspect,
                format!("no executable produced by the {} build", variant),
            ));
        };
        debug!(%variant, binary = %binary.display(), "inspecting");
        inspect_binary(&binary, self.ctx).map_err(|e| {
            DeadCodeReport::from_process_error(self.project, LTO_TOOL, &e)
                .with_phase(BuildPhase::Inspect)
                .with_method(METHOD)
        })
    }

    fn run(&self) -> StepResult<DeadCodeReport> {
        let lto = &self.ctx.config().lto;

        // Baseline first; the two builds never overlap.
        let baseline_dir = self.configure(BuildVariant::Baseline)?;
        let out = self.build(BuildVariant::Baseline, &baseline_dir)?;
        if !out.success {
            return Err(self.fail(
                failed_phase(&out),
                format!("baseline build failed: {}", excerpt(&out.combined())),
            ));
        }
        let baseline = self.inspect(BuildVariant::Baseline, &baseline_dir, lto.binary_name.as_deref())?;

        // Look for the same executable name in the candidate tree.
        let binary_name = lto.binary_name.clone().or_else(|| {
            baseline
                .binary
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
        });

        let candidate_dir = self.configure(BuildVariant::Candidate)?;
        let out = self.build(BuildVariant::Candidate, &candidate_dir)?;
        if !out.success {
            let phase = failed_phase(&out);
            let sections = parse_gc_sections(&out.combined());
            let items = gc_items(&sections, |sym| demangle_one(sym, self.ctx));
            if phase == BuildPhase::Link && !items.is_empty() {
                let count = items.len();
                return Ok(DeadCodeReport::partial(
                    self.project,
                    LTO_TOOL,
                    items,
                    format!("LTO link failed but found {} unused items", count),
                )
                .with_phase(BuildPhase::Link)
                .with_method(METHOD));
            }
            return Err(self.fail(
                phase,
                format!("LTO build failed: {}", excerpt(&out.combined())),
            ));
        }
        let candidate = self.inspect(BuildVariant::Candidate, &candidate_dir, binary_name.as_deref())?;

        let heuristic = InlineHeuristic::new(lto.inline_denylist.clone());
        let diff = SymbolDiff::compute(&baseline, &candidate, &heuristic);
        Ok(DeadCodeReport::success(self.project, LTO_TOOL, diff.items)
            .with_size_analysis(diff.size)
            .with_method(METHOD))
    }
}

/// Run both builds under `workdir` and diff their symbols.
pub fn analyze(project: &Path, cmake: &Path, workdir: &Path, ctx: &ToolContext) -> DeadCodeReport {
    let builder = Builder {
        project,
        cmake,
        workdir,
        ctx,
    };
    match builder.run() {
        Ok(report) | Err(report) => report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_flags() {
        assert_eq!(BuildVariant::Baseline.cmake_defines(), vec!["-DCMAKE_CXX_FLAGS=-O2 -g"]);
        let candidate = BuildVariant::Candidate.cmake_defines();
        assert!(candidate[0].contains("-ffunction-sections"));
        assert!(candidate[1].contains("--gc-sections"));
    }

    #[test]
    fn test_failed_phase() {
        let link = CommandOutput {
            stderr: "main.cpp:(.text+0x5): undefined reference to `foo()'\ncollect2: error: ld returned 1 exit status".to_string(),
            ..Default::default()
        };
        assert_eq!(failed_phase(&link), BuildPhase::Link);

        let compile = CommandOutput {
            stderr: "main.cpp:3:1: error: expected ';' before '}' token".to_string(),
            ..Default::default()
        };
        assert_eq!(failed_phase(&compile), BuildPhase::Compile);
    }

    #[cfg(unix)]
    #[test]
    fn test_find_binary_skips_cmake_files() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let cmake_files = temp.path().join("CMakeFiles").join("3.28");
        std::fs::create_dir_all(&cmake_files).unwrap();
        let scratch_binary = cmake_files.join("a.out");
        std::fs::write(&scratch_binary, "").unwrap();
        std::fs::set_permissions(&scratch_binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        std::fs::write(temp.path().join("Makefile"), "").unwrap();
        assert!(find_binary(temp.path(), None).is_none());

        let app = temp.path().join("app");
        std::fs::write(&app, "").unwrap();
        std::fs::set_permissions(&app, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_binary(temp.path(), None), Some(app.clone()));
        assert_eq!(find_binary(temp.path(), Some("app")), Some(app));
        assert!(find_binary(temp.path(), Some("other")).is_none());
    }
}
