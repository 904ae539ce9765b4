//! Build-system detection for C++ projects.

use serde::Serialize;
use std::path::Path;

/// Orchestration strategy for a C++ project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    /// CMakeLists.txt at the project root
    Cmake,
    /// Makefile / makefile / GNUmakefile at the project root
    Makefile,
    /// Compile each source by hand
    Manual,
}

impl std::fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildSystem::Cmake => write!(f, "cmake"),
            BuildSystem::Makefile => write!(f, "makefile"),
            BuildSystem::Manual => write!(f, "manual"),
        }
    }
}

const MAKEFILE_NAMES: &[&str] = &["Makefile", "makefile", "GNUmakefile"];

/// Probe `dir` for a build descriptor: CMake first, then make.
pub fn detect_build_system(dir: &Path) -> BuildSystem {
    if dir.join("CMakeLists.txt").is_file() {
        return BuildSystem::Cmake;
    }

    if MAKEFILE_NAMES.iter().any(|name| dir.join(name).is_file()) {
        return BuildSystem::Makefile;
    }

    BuildSystem::Manual
}
