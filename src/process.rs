//! Blocking execution of external tools under a hard timeout.
//!
//! Every analyzer, compiler and binary inspector goes through
//! [`ProcessRunner::run`]. The runner owns a current-thread tokio runtime so
//! that callers stay synchronous while the child is still killed when its
//! budget runs out. On unix each child leads its own process group, and the
//! whole group is killed on timeout so build grandchildren go with it.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors raised while running an external command.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {}s", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
    #[error("process runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl ProcessError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProcessError::Timeout { .. })
    }
}

/// One command line to execute.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, OsString>,
    timeout: Duration,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Short program name used in logs and error messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Render the command line for logging.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().to_string()));
        parts.join(" ")
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        if self.stdout.is_empty() {
            return self.stderr.clone();
        }
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Runs commands one at a time, each under its own timeout.
pub struct ProcessRunner {
    runtime: tokio::runtime::Runtime,
}

impl ProcessRunner {
    pub fn new() -> Result<Self, ProcessError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    /// Run an invocation to completion. A non-zero exit is not an error;
    /// inspect [`CommandOutput::success`].
    pub fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ProcessError> {
        let program = invocation.program_name();
        debug!(command = %invocation.display(), timeout_secs = invocation.timeout.as_secs(), "running");

        let mut command = tokio::process::Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }
        #[cfg(unix)]
        command.process_group(0);

        let output = self.runtime.block_on(async {
            let child = command.spawn().map_err(|source| ProcessError::Spawn {
                program: program.clone(),
                source,
            })?;

            let pid = child.id();

            // The future owns the child; dropping it on timeout kills the process.
            match tokio::time::timeout(invocation.timeout, child.wait_with_output()).await {
                Ok(output) => Ok(output?),
                Err(_) => {
                    debug!(program = %program, ?pid, "timed out");
                    if let Some(pid) = pid {
                        kill_process_group(pid);
                    }
                    Err(ProcessError::Timeout {
                        program: program.clone(),
                        timeout: invocation.timeout,
                    })
                }
            }
        })?;

        let out = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        trace!(program = %program, code = ?out.code, stdout_len = out.stdout.len(), "finished");
        Ok(out)
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    // The child was spawned with process_group(0), so its pid is the group id.
    let rc = unsafe { libc::kill(-(pid as i32), libc::SIGKILL) };
    if rc != 0 {
        debug!(pid, error = %std::io::Error::last_os_error(), "failed to kill process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("/usr/bin/vulture")
            .arg("src")
            .args(["--min-confidence", "60"]);
        assert_eq!(inv.display(), "/usr/bin/vulture src --min-confidence 60");
        assert_eq!(inv.program_name(), "vulture");
    }

    #[test]
    fn test_combined_output() {
        let out = CommandOutput {
            success: true,
            code: Some(0),
            stdout: "a".to_string(),
            stderr: "b".to_string(),
        };
        assert_eq!(out.combined(), "a\nb");

        let only_err = CommandOutput {
            stderr: "b".to_string(),
            ..Default::default()
        };
        assert_eq!(only_err.combined(), "b");
    }

    #[test]
    fn test_spawn_failure() {
        let runner = ProcessRunner::new().unwrap();
        let err = runner
            .run(&Invocation::new("/nonexistent/deadcheck-no-such-tool"))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
        assert!(!err.is_timeout());
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_streams_and_exit_code() {
        let runner = ProcessRunner::new().unwrap();
        let out = runner
            .run(
                &Invocation::new("sh")
                    .arg("-c")
                    .arg("echo out; echo err >&2; exit 3"),
            )
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn test_env_and_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let runner = ProcessRunner::new().unwrap();
        let out = runner
            .run(
                &Invocation::new("sh")
                    .arg("-c")
                    .arg("echo $DEADCHECK_TEST_VAR; pwd")
                    .env("DEADCHECK_TEST_VAR", "hello")
                    .current_dir(temp.path()),
            )
            .unwrap();
        let lines: Vec<&str> = out.stdout.lines().collect();
        assert_eq!(lines[0], "hello");
        let reported = std::fs::canonicalize(lines[1]).unwrap();
        assert_eq!(reported, std::fs::canonicalize(temp.path()).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout() {
        let runner = ProcessRunner::new().unwrap();
        let err = runner
            .run(
                &Invocation::new("sleep")
                    .arg("5")
                    .timeout(Duration::from_millis(200)),
            )
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("sleep"));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_grandchildren() {
        let temp = tempfile::TempDir::new().unwrap();
        let pid_file = temp.path().join("grandchild.pid");
        let runner = ProcessRunner::new().unwrap();
        let err = runner
            .run(
                &Invocation::new("sh")
                    .arg("-c")
                    .arg(format!("sleep 30 & echo $! > {}; wait", pid_file.display()))
                    .timeout(Duration::from_millis(500)),
            )
            .unwrap_err();
        assert!(err.is_timeout());

        let pid: i32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
        // An unreaped zombie still answers kill(0); treat it as gone.
        let alive = |pid: i32| {
            if unsafe { libc::kill(pid, 0) } != 0 {
                return false;
            }
            std::fs::read_to_string(format!("/proc/{}/stat", pid))
                .map(|stat| !stat.contains(") Z "))
                .unwrap_or(true)
        };
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while alive(pid) && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!alive(pid), "grandchild {} outlived the timeout", pid);
    }
}
