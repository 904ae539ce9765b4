//! Integration tests for classification and dispatch.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tempfile::TempDir;

use deadcheck::config::Config;
use deadcheck::deadcode::{dispatch, get_detector, registered_languages, BuildPhase, ItemKind, Status};
use deadcheck::language::{Language, TargetClassifier, TargetKind};
use deadcheck::lto::{detect_build_system, BuildSystem};
use deadcheck::tools::{ToolContext, ToolLocator};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn offline_context(config: Config) -> ToolContext {
    let locator = ToolLocator::default()
        .with_search_path("")
        .with_overrides(config.tools.clone());
    ToolContext::with_locator(config, locator).expect("should build context")
}

#[test]
fn test_unknown_directory_is_unsupported() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("README.txt"), "notes\n").unwrap();
    std::fs::write(temp.path().join("data.csv"), "a,b\n").unwrap();

    let ctx = offline_context(Config::default());
    let target = ctx.classifier().classify(temp.path());
    assert_eq!(target.kind, TargetKind::Directory);
    assert_eq!(target.language, Language::Unknown);

    let report = dispatch(&target, &ctx);
    assert_eq!(report.status, Status::Unsupported);
    assert_eq!(report.total_found(), 0);
}

#[test]
fn test_missing_tools_are_reported_per_language() {
    let temp = TempDir::new().unwrap();
    let ctx = offline_context(Config::default());

    for (file, hint) in [
        ("app.py", "pip install vulture"),
        ("main.go", "staticcheck"),
        ("lib.rs", "rustup"),
        ("index.ts", "ts-prune"),
        ("Program.cs", ".NET SDK"),
    ] {
        let path = temp.path().join(file);
        std::fs::write(&path, "\n").unwrap();
        let report = dispatch(&ctx.classifier().classify(&path), &ctx);
        assert_eq!(report.status, Status::ToolMissing, "{}", file);
        assert!(report.message.as_deref().unwrap_or("").contains(hint), "{}", file);
    }
}

#[test]
fn test_cpp_file_without_compilers() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("engine.cpp");
    std::fs::write(&path, "int main() { return 0; }\n").unwrap();

    let ctx = offline_context(Config::default());
    let report = dispatch(&ctx.classifier().classify(&path), &ctx);
    assert_eq!(report.status, Status::ToolMissing);
}

#[test]
fn test_cmake_fixture_classification() {
    let project = testdata_path().join("projects").join("cmake");
    assert_eq!(detect_build_system(&project), BuildSystem::Cmake);

    let classifier = TargetClassifier::new();
    assert_eq!(classifier.classify(&project).language, Language::Cpp);

    let report = dispatch(&classifier.classify(&project), &offline_context(Config::default()));
    assert_eq!(report.status, Status::ToolMissing);
    assert_eq!(report.tool, "lto");
}

#[test]
fn test_every_known_language_has_a_detector() {
    for lang in registered_languages() {
        assert!(get_detector(lang).is_some());
    }
    assert!(get_detector(Language::Unknown).is_none());
}

#[test]
fn test_excluded_paths_affect_classification() {
    let temp = TempDir::new().unwrap();
    let third_party = temp.path().join("third_party");
    std::fs::create_dir_all(&third_party).unwrap();
    std::fs::write(third_party.join("lib.cpp"), "\n").unwrap();
    std::fs::write(temp.path().join("tool.py"), "\n").unwrap();

    let classifier = TargetClassifier::with_exclusions(&["**/third_party/**".to_string()]).unwrap();
    assert_eq!(classifier.classify(temp.path()).language, Language::Python);
    assert_eq!(TargetClassifier::new().classify(temp.path()).language, Language::Cpp);
}

#[cfg(unix)]
fn fake_tool(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
fn with_tool(name: &str, path: &std::path::Path) -> Config {
    with_tools(&[(name, path)])
}

#[cfg(unix)]
fn with_tools(entries: &[(&str, &std::path::Path)]) -> Config {
    let tools: BTreeMap<String, Vec<String>> = entries
        .iter()
        .map(|(name, path)| (name.to_string(), vec![path.to_string_lossy().to_string()]))
        .collect();
    Config {
        tools,
        ..Config::default()
    }
}

#[cfg(unix)]
#[test]
fn test_configured_tool_is_run_and_normalized() {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let vulture = fake_tool(
        &bin,
        "vulture",
        "echo \"$1:1: unused import 'os' (90% confidence)\"\necho \"$1:4: unused function 'old' (60% confidence)\"\nexit 3",
    );

    let src = temp.path().join("app.py");
    std::fs::write(&src, "import os\n\n\ndef old():\n    pass\n").unwrap();

    let ctx = offline_context(with_tool("vulture", &vulture));
    let report = dispatch(&ctx.classifier().classify(&src), &ctx);

    assert_eq!(report.status, Status::Success);
    assert_eq!(report.tool, "vulture");
    assert_eq!(report.total_found(), 2);
    assert_eq!(
        report.items()[0].message,
        format!("unused import 'os' (90%) [{}:1]", src.display())
    );
}

#[cfg(unix)]
#[test]
fn test_tool_failure_without_output_is_error() {
    let temp = TempDir::new().unwrap();
    let vulture = fake_tool(temp.path(), "vulture", "echo 'boom' >&2\nexit 1");
    let src = temp.path().join("app.py");
    std::fs::write(&src, "x = 1\n").unwrap();

    let ctx = offline_context(with_tool("vulture", &vulture));
    let report = dispatch(&ctx.classifier().classify(&src), &ctx);
    assert_eq!(report.status, Status::Error);
    assert!(report.message.unwrap().contains("boom"));
}

#[cfg(unix)]
#[test]
fn test_tool_timeout_maps_to_timeout_status() {
    let temp = TempDir::new().unwrap();
    let vulture = fake_tool(temp.path(), "vulture", "sleep 5");
    let src = temp.path().join("app.py");
    std::fs::write(&src, "x = 1\n").unwrap();

    let mut config = with_tool("vulture", &vulture);
    config.timeouts.tool = 1;
    let ctx = offline_context(config);

    let started = std::time::Instant::now();
    let report = dispatch(&ctx.classifier().classify(&src), &ctx);
    assert_eq!(report.status, Status::Timeout);
    assert!(started.elapsed() < std::time::Duration::from_secs(4));
}

// A fake toolchain for the LTO paths. The baseline binary defines `used()`
// and `unused_function()`; the LTO candidate only keeps `used()`.

#[cfg(unix)]
const FAKE_CMAKE: &str = r#"if [ "$1" = "--build" ]; then
  printf '#!/bin/sh\n' > "$2/app"
  chmod +x "$2/app"
  exit 0
fi
while [ $# -gt 0 ]; do
  if [ "$1" = "-B" ]; then mkdir -p "$2"; fi
  shift
done"#;

#[cfg(unix)]
const FAKE_NM: &str = r#"case "$*" in
  *baseline*) printf '0000000000001139 T _Z4usedv\n0000000000001150 T _Z15unused_functionv\n' ;;
  *) printf '0000000000001139 T _Z4usedv\n' ;;
esac"#;

#[cfg(unix)]
const FAKE_SIZE: &str = r#"printf '   text\t   data\t    bss\t    dec\t    hex\tfilename\n'
case "$*" in
  *baseline*) printf '   2143\t    616\t      8\t   2767\t    acf\t%s\n' "$1" ;;
  *) printf '   2011\t    616\t      8\t   2635\t    a4b\t%s\n' "$1" ;;
esac"#;

#[cfg(unix)]
const FAKE_CXXFILT: &str = r#"for name in "$@"; do
  case "$name" in
    _Z15unused_functionv) echo 'unused_function()' ;;
    _Z4usedv) echo 'used()' ;;
    *) echo "$name" ;;
  esac
done"#;

/// g++ that compiles anything but `broken*.cpp` and runs `link` as the link step.
#[cfg(unix)]
fn fake_gxx(dir: &std::path::Path, link: &str) -> PathBuf {
    let body = format!(
        r#"out=""
src=""
compile=0
while [ $# -gt 0 ]; do
  case "$1" in
    -c) compile=1 ;;
    -o) out="$2"; shift ;;
    *.cpp) src="$1" ;;
  esac
  shift
done
if [ "$compile" = 1 ]; then
  case "$src" in
    *broken*) echo "$src:1:1: error: expected ';'" >&2; exit 1 ;;
  esac
  : > "$out"
  exit 0
fi
{}"#,
        link
    );
    fake_tool(dir, "g++", &body)
}

#[cfg(unix)]
const GC_LINE: &str =
    r#"echo "/usr/bin/ld: removing unused section '.text._Z15unused_functionv' in file '0_main.o'" >&2"#;

#[cfg(unix)]
struct FakeToolchain {
    _dir: TempDir,
    gxx: PathBuf,
    cmake: PathBuf,
    nm: PathBuf,
    size: PathBuf,
    cxxfilt: PathBuf,
}

#[cfg(unix)]
impl FakeToolchain {
    fn new(cmake_body: &str, link: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let gxx = fake_gxx(dir.path(), link);
        let cmake = fake_tool(dir.path(), "cmake", cmake_body);
        let nm = fake_tool(dir.path(), "nm", FAKE_NM);
        let size = fake_tool(dir.path(), "size", FAKE_SIZE);
        let cxxfilt = fake_tool(dir.path(), "c++filt", FAKE_CXXFILT);
        Self {
            _dir: dir,
            gxx,
            cmake,
            nm,
            size,
            cxxfilt,
        }
    }

    fn config(&self) -> Config {
        with_tools(&[
            ("g++", &self.gxx),
            ("cmake", &self.cmake),
            ("nm", &self.nm),
            ("size", &self.size),
            ("c++filt", &self.cxxfilt),
        ])
    }
}

#[cfg(unix)]
fn cmake_project() -> PathBuf {
    testdata_path().join("projects").join("cmake")
}

#[cfg(unix)]
fn manual_project(files: &[&str]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for file in files {
        std::fs::write(temp.path().join(file), "int f() { return 0; }\n").unwrap();
    }
    temp
}

#[cfg(unix)]
#[test]
fn test_cmake_symbol_diff_reports_removed_function() {
    let tools = FakeToolchain::new(FAKE_CMAKE, "exit 0");
    let ctx = offline_context(tools.config());
    let report = dispatch(&ctx.classifier().classify(&cmake_project()), &ctx);

    assert_eq!(report.status, Status::Success, "{:?}", report.message);
    assert_eq!(report.tool, "lto");
    assert_eq!(report.method.as_deref(), Some("symbol_comparison_analysis"));
    assert_eq!(report.files_analyzed, Some(2));
    assert!(report.advisories.is_empty());
    assert_eq!(report.total_found(), 1);
    assert_eq!(report.items()[0].name, "unused_function()");
    assert_eq!(report.items()[0].kind, ItemKind::Function);

    let size = report.size_analysis.unwrap();
    assert_eq!(size.baseline_bytes, 2143);
    assert_eq!(size.candidate_bytes, 2011);
    assert_eq!(size.reduction_bytes, 132);
}

#[cfg(unix)]
#[test]
fn test_cmake_large_project_advisory() {
    let tools = FakeToolchain::new(FAKE_CMAKE, "exit 0");
    let mut config = tools.config();
    config.lto.large_project_threshold = 1;
    let ctx = offline_context(config);
    let report = dispatch(&ctx.classifier().classify(&cmake_project()), &ctx);

    assert_eq!(report.status, Status::Success);
    assert_eq!(report.advisories.len(), 1);
    assert!(report.advisories[0].contains("2 C++ files"));
}

#[cfg(unix)]
#[test]
fn test_cmake_without_demangler_is_tool_missing() {
    let tools = FakeToolchain::new(FAKE_CMAKE, "exit 0");
    let mut config = tools.config();
    config.tools.remove("c++filt");
    let ctx = offline_context(config);
    let report = dispatch(&ctx.classifier().classify(&cmake_project()), &ctx);

    assert_eq!(report.status, Status::ToolMissing);
    assert!(report.message.as_ref().unwrap().contains("c++filt"));
    assert_eq!(report.total_found(), 0);
}

#[cfg(unix)]
#[test]
fn test_cmake_configure_failure_is_error() {
    let tools = FakeToolchain::new("echo 'CMake Error: no compiler' >&2\nexit 1", "exit 0");
    let ctx = offline_context(tools.config());
    let report = dispatch(&ctx.classifier().classify(&cmake_project()), &ctx);

    assert_eq!(report.status, Status::Error);
    assert_eq!(report.phase, Some(BuildPhase::Configure));
    assert!(report.message.unwrap().contains("CMake Error"));
}

#[cfg(unix)]
#[test]
fn test_cmake_configure_timeout() {
    let tools = FakeToolchain::new("sleep 5", "exit 0");
    let mut config = tools.config();
    config.timeouts.configure = 1;
    let ctx = offline_context(config);

    let started = std::time::Instant::now();
    let report = dispatch(&ctx.classifier().classify(&cmake_project()), &ctx);
    assert_eq!(report.status, Status::Timeout);
    assert_eq!(report.phase, Some(BuildPhase::Configure));
    assert!(started.elapsed() < std::time::Duration::from_secs(4));
}

#[cfg(unix)]
#[test]
fn test_manual_build_skips_failed_sources() {
    let tools = FakeToolchain::new(FAKE_CMAKE, &format!("{}\nexit 0", GC_LINE));
    let project = manual_project(&["broken.cpp", "main.cpp", "util.cpp"]);
    assert_eq!(detect_build_system(project.path()), BuildSystem::Manual);

    let ctx = offline_context(tools.config());
    let report = dispatch(&ctx.classifier().classify(project.path()), &ctx);

    assert_eq!(report.status, Status::Success, "{:?}", report.message);
    assert_eq!(report.method.as_deref(), Some("link_time_gc_sections"));
    assert_eq!(report.files_analyzed, Some(3));
    assert_eq!(report.total_found(), 1);
    assert_eq!(report.items()[0].name, "unused_function()");
    assert_eq!(report.items()[0].kind, ItemKind::Function);
    assert_eq!(report.items()[0].message, "unused function 'unused_function()' [0_main.o]");
}

#[cfg(unix)]
#[test]
fn test_manual_build_without_demangler_reports_symbols() {
    let tools = FakeToolchain::new(FAKE_CMAKE, &format!("{}\nexit 0", GC_LINE));
    let project = manual_project(&["main.cpp"]);
    let ctx = offline_context(with_tool("g++", &tools.gxx));
    let report = dispatch(&ctx.classifier().classify(project.path()), &ctx);

    assert_eq!(report.status, Status::Success);
    assert_eq!(report.total_found(), 1);
    assert_eq!(report.items()[0].name, "_Z15unused_functionv");
    assert_eq!(report.items()[0].kind, ItemKind::Symbol);
}

#[cfg(unix)]
#[test]
fn test_manual_build_with_no_objects_is_compile_error() {
    let tools = FakeToolchain::new(FAKE_CMAKE, "exit 0");
    let project = manual_project(&["broken.cpp", "broken_too.cpp"]);
    let ctx = offline_context(tools.config());
    let report = dispatch(&ctx.classifier().classify(project.path()), &ctx);

    assert_eq!(report.status, Status::Error);
    assert_eq!(report.phase, Some(BuildPhase::Compile));
    assert_eq!(report.method.as_deref(), Some("link_time_gc_sections"));
}

#[cfg(unix)]
#[test]
fn test_manual_link_failure_with_gc_output_is_partial() {
    let tools = FakeToolchain::new(
        FAKE_CMAKE,
        &format!("{}\necho 'collect2: error: ld returned 1 exit status' >&2\nexit 1", GC_LINE),
    );
    let project = manual_project(&["main.cpp", "util.cpp"]);
    let ctx = offline_context(tools.config());
    let report = dispatch(&ctx.classifier().classify(project.path()), &ctx);

    assert_eq!(report.status, Status::PartialSuccess);
    assert_eq!(report.phase, Some(BuildPhase::Link));
    assert_eq!(report.total_found(), 1);
    assert!(report.message.unwrap().contains("found 1 unused items"));
}

#[cfg(unix)]
#[test]
fn test_manual_link_failure_without_gc_output_is_error() {
    let tools = FakeToolchain::new(
        FAKE_CMAKE,
        "echo \"main.cpp:(.text+0x5): undefined reference to 'g()'\" >&2\nexit 1",
    );
    let project = manual_project(&["main.cpp"]);
    let ctx = offline_context(tools.config());
    let report = dispatch(&ctx.classifier().classify(project.path()), &ctx);

    assert_eq!(report.status, Status::Error);
    assert_eq!(report.phase, Some(BuildPhase::Link));
    assert_eq!(report.total_found(), 0);
    assert!(report.message.unwrap().contains("undefined reference"));
}
