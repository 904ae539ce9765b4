//! Configuration schema for deadcheck.
//!
//! Every section is optional; a missing file or an empty document yields the
//! built-in defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file names probed in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["deadcheck.yaml", ".deadcheck.yaml"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// Glob patterns skipped during directory scans (e.g. "**/third_party/**")
    pub excluded_paths: Vec<String>,
    /// Extra candidate locations per tool, tried before the built-in ones
    pub tools: BTreeMap<String, Vec<String>>,
    pub timeouts: Timeouts,
    pub lto: LtoConfig,
    pub health: HealthConfig,
    /// Path to the structural-analysis binary
    pub structure_binary: Option<PathBuf>,
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse_str(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Load the explicit file if given, else the first discovered one, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => discover(Path::new(".")),
        };
        match path {
            Some(p) => {
                let config = Self::parse_file(&p)?;
                config.validate()?;
                Ok((config, Some(p)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Validate value ranges and glob syntax.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for pattern in &self.excluded_paths {
            globset::Glob::new(pattern).map_err(|e| {
                ConfigError::Invalid(format!("invalid excluded_paths pattern {:?}: {}", pattern, e))
            })?;
        }

        for (name, secs) in self.timeouts.entries() {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "timeouts.{} must be greater than zero",
                    name
                )));
            }
        }

        let damping = self.health.damping;
        if !(damping > 0.0 && damping <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "health.damping must be in (0, 1], got {}",
                damping
            )));
        }
        for (name, weight) in self.health.weights.entries() {
            if weight < 0.0 || !weight.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "health.weights.{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }

        if self.lto.large_project_threshold == 0 {
            return Err(ConfigError::Invalid(
                "lto.large_project_threshold must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Find a config file in `dir`, then in the per-user config directory.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    for name in DEFAULT_CONFIG_NAMES {
        let path = dir.join(name);
        if path.is_file() {
            return Some(path);
        }
    }
    directories::ProjectDirs::from("", "", "deadcheck")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
        .filter(|p| p.is_file())
}

/// Per-phase timeouts in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Timeouts {
    /// Quick lint-style analyzers
    pub tool: u64,
    pub configure: u64,
    pub build: u64,
    /// One translation unit in the manual branch
    pub compile: u64,
    pub link: u64,
    /// nm / objdump / size
    pub inspect: u64,
    pub demangle: u64,
    pub structure: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            tool: 120,
            configure: 120,
            build: 300,
            compile: 60,
            link: 120,
            inspect: 30,
            demangle: 5,
            structure: 30,
        }
    }
}

impl Timeouts {
    fn entries(&self) -> [(&'static str, u64); 8] {
        [
            ("tool", self.tool),
            ("configure", self.configure),
            ("build", self.build),
            ("compile", self.compile),
            ("link", self.link),
            ("inspect", self.inspect),
            ("demangle", self.demangle),
            ("structure", self.structure),
        ]
    }

    pub fn tool(&self) -> Duration {
        Duration::from_secs(self.tool)
    }

    pub fn configure(&self) -> Duration {
        Duration::from_secs(self.configure)
    }

    pub fn build(&self) -> Duration {
        Duration::from_secs(self.build)
    }

    pub fn compile(&self) -> Duration {
        Duration::from_secs(self.compile)
    }

    pub fn link(&self) -> Duration {
        Duration::from_secs(self.link)
    }

    pub fn inspect(&self) -> Duration {
        Duration::from_secs(self.inspect)
    }

    pub fn demangle(&self) -> Duration {
        Duration::from_secs(self.demangle)
    }

    pub fn structure(&self) -> Duration {
        Duration::from_secs(self.structure)
    }
}

/// Settings for the C++ differential build.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LtoConfig {
    /// Name substrings of functions that disappear through inlining
    /// while still being referenced; removed symbols matching any are dropped.
    pub inline_denylist: Vec<String>,
    /// Built executable to inspect (default: first executable in the build tree)
    pub binary_name: Option<String>,
    /// Source count above which a large-project advisory is emitted
    pub large_project_threshold: usize,
}

impl Default for LtoConfig {
    fn default() -> Self {
        Self {
            inline_denylist: Vec::new(),
            binary_name: None,
            large_project_threshold: 100,
        }
    }
}

/// Health-score tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    pub damping: f64,
    pub weights: CategoryWeights,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            damping: 0.1,
            weights: CategoryWeights::default(),
        }
    }
}

/// Per-category deduction weights.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub bug_risk: f64,
    pub performance: f64,
    pub readability: f64,
    pub modernization: f64,
    pub unused_code: f64,
    pub other: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            bug_risk: 5.0,
            performance: 3.0,
            readability: 2.0,
            modernization: 1.0,
            unused_code: 0.0,
            other: 0.0,
        }
    }
}

impl CategoryWeights {
    fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("bug_risk", self.bug_risk),
            ("performance", self.performance),
            ("readability", self.readability),
            ("modernization", self.modernization),
            ("unused_code", self.unused_code),
            ("other", self.other),
        ]
    }
}
