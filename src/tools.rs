//! Locating external tools and running them.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::language::TargetClassifier;
use crate::process::{CommandOutput, Invocation, ProcessError, ProcessRunner};

/// Outcome of looking up an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Found(PathBuf),
    Missing,
}

impl Capability {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Capability::Found(p) => Some(p),
            Capability::Missing => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Capability::Found(_))
    }
}

/// Static description of an external tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    /// Key used for config overrides and in reports
    pub name: &'static str,
    /// Locations tried in order: bare names are searched on PATH
    pub candidates: &'static [&'static str],
    pub install_hint: &'static str,
}

pub const VULTURE: ToolSpec = ToolSpec {
    name: "vulture",
    candidates: &["vulture"],
    install_hint: "vulture is not installed. Install with: pip install vulture",
};

pub const STATICCHECK: ToolSpec = ToolSpec {
    name: "staticcheck",
    candidates: &["staticcheck", "~/go/bin/staticcheck"],
    install_hint: "staticcheck is not installed. Install with: go install honnef.co/go/tools/cmd/staticcheck@latest",
};

pub const DOTNET: ToolSpec = ToolSpec {
    name: "dotnet",
    candidates: &["dotnet"],
    install_hint: ".NET SDK is not installed. Download from https://dotnet.microsoft.com/download",
};

pub const CARGO: ToolSpec = ToolSpec {
    name: "cargo",
    candidates: &["cargo"],
    install_hint: "Rust/Cargo is not installed. Install from https://rustup.rs/",
};

pub const NPX: ToolSpec = ToolSpec {
    name: "npx",
    candidates: &["npx"],
    install_hint: "Node.js is not installed. Install from https://nodejs.org/ and then: npm install -g ts-prune",
};

pub const CLANG_TIDY: ToolSpec = ToolSpec {
    name: "clang-tidy",
    candidates: &["clang-tidy"],
    install_hint: "clang-tidy: sudo apt install clang-tidy",
};

pub const CLANGXX: ToolSpec = ToolSpec {
    name: "clang++",
    candidates: &["clang++"],
    install_hint: "clang++: sudo apt install clang",
};

pub const GXX: ToolSpec = ToolSpec {
    name: "g++",
    candidates: &["g++"],
    install_hint: "g++ is required for LTO analysis. Install with: sudo apt install gcc g++",
};

pub const CMAKE: ToolSpec = ToolSpec {
    name: "cmake",
    candidates: &["cmake"],
    install_hint: "cmake is not installed. Install with: sudo apt install cmake",
};

pub const NM: ToolSpec = ToolSpec {
    name: "nm",
    candidates: &["nm"],
    install_hint: "nm is not installed. Install with: sudo apt install binutils",
};

pub const OBJDUMP: ToolSpec = ToolSpec {
    name: "objdump",
    candidates: &["objdump"],
    install_hint: "objdump is not installed. Install with: sudo apt install binutils",
};

pub const CXXFILT: ToolSpec = ToolSpec {
    name: "c++filt",
    candidates: &["c++filt"],
    install_hint: "c++filt is not installed. Install with: sudo apt install binutils",
};

pub const SIZE: ToolSpec = ToolSpec {
    name: "size",
    candidates: &["size"],
    install_hint: "size is not installed. Install with: sudo apt install binutils",
};

pub const STRUCTURE: ToolSpec = ToolSpec {
    name: "nekocode_ai",
    candidates: &["nekocode_ai", "./bin/nekocode_ai"],
    install_hint: "structural analysis binary not found; set structure_binary in the config",
};

/// Resolves tool names to executables.
#[derive(Debug, Clone, Default)]
pub struct ToolLocator {
    /// PATH to search; `None` means the process environment
    search_path: Option<OsString>,
    home: Option<PathBuf>,
    overrides: BTreeMap<String, Vec<String>>,
}

impl ToolLocator {
    /// Locator over the process PATH and the user's home directory.
    pub fn from_env() -> Self {
        Self {
            search_path: None,
            home: directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()),
            overrides: BTreeMap::new(),
        }
    }

    /// Search only the given PATH-style string. An empty string finds nothing.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn with_overrides(mut self, overrides: BTreeMap<String, Vec<String>>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Try the configured overrides, then the built-in candidates.
    pub fn locate(&self, spec: &ToolSpec) -> Capability {
        let overrides = self.overrides.get(spec.name).into_iter().flatten();
        let builtins = spec.candidates.iter().map(|c| c.to_string());
        for candidate in overrides.cloned().chain(builtins) {
            if let Some(path) = self.resolve(&candidate) {
                return Capability::Found(path);
            }
        }
        Capability::Missing
    }

    fn resolve(&self, candidate: &str) -> Option<PathBuf> {
        if let Some(rest) = candidate.strip_prefix("~/") {
            let path = self.home.as_ref()?.join(rest);
            return path.is_file().then_some(path);
        }
        if candidate.contains('/') {
            let path = PathBuf::from(candidate);
            return path.is_file().then_some(path);
        }
        match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().ok()?;
                which::which_in(candidate, Some(paths), cwd).ok()
            }
            None => which::which(candidate).ok(),
        }
    }
}

/// Everything a detector needs: tool lookup, process execution, config.
pub struct ToolContext {
    locator: ToolLocator,
    runner: ProcessRunner,
    config: Config,
    classifier: TargetClassifier,
}

impl ToolContext {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let locator = ToolLocator::from_env().with_overrides(config.tools.clone());
        Self::with_locator(config, locator)
    }

    pub fn with_locator(config: Config, locator: ToolLocator) -> anyhow::Result<Self> {
        let classifier = TargetClassifier::with_exclusions(&config.excluded_paths)?;
        Ok(Self {
            locator,
            runner: ProcessRunner::new()?,
            config,
            classifier,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn classifier(&self) -> &TargetClassifier {
        &self.classifier
    }

    pub fn locate(&self, spec: &ToolSpec) -> Capability {
        self.locator.locate(spec)
    }

    pub fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ProcessError> {
        self.runner.run(invocation)
    }
}
