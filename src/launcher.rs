//! Build launcher module
//!
//! This module provides the low-level process abstraction used to fork a
//! build tool. The [`Launcher`] trait is the seam between the verifier and
//! the operating system: production code uses [`ForkedLauncher`], tests can
//! substitute a stub that records requests or replays canned exit codes.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// Errors that can occur while launching a build process
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LaunchError {
    /// The configured executable does not exist and is not on PATH
    #[error("build executable not found: {executable}")]
    ExecutableNotFound { executable: String },
    /// The log file could not be created or written
    #[error("failed to write log file '{path}': {error}")]
    LogFile { path: String, error: String },
    /// Spawning the process failed
    #[error("failed to spawn '{command}': {error}")]
    SpawnFailed { command: String, error: String },
    /// Waiting for the process failed
    #[error("failed to wait for '{command}': {error}")]
    WaitFailed { command: String, error: String },
}

/// A single build invocation, fully assembled by the verifier
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    /// The executable to invoke
    pub executable: PathBuf,
    /// Command line arguments, already interpolated
    pub args: Vec<String>,
    /// Working directory for the build (the fixture basedir)
    pub working_dir: PathBuf,
    /// Environment variables to set for the child process
    pub env: BTreeMap<String, String>,
    /// Environment variables to remove from the child process
    pub env_removals: Vec<String>,
    /// File receiving the merged stdout/stderr of the build
    pub log_file: PathBuf,
    /// Optional commented header written to the log before the build output
    pub log_header: Option<String>,
}

impl LaunchRequest {
    /// Render the invocation as a single command line for error reporting.
    ///
    /// Arguments containing spaces are quoted, matching what a user would
    /// have to type in a shell to reproduce the build.
    pub fn command_line(&self) -> String {
        let mut line = self.executable.display().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// Trait for running an assembled build invocation
pub trait Launcher {
    /// Run the build to completion and return its exit code
    fn run(&self, request: &LaunchRequest) -> Result<i32, LaunchError>;
}

/// Launcher that forks the build tool as a child process
///
/// Stdout and stderr are merged into the request's log file, preceded by a
/// commented command-line header when one is supplied.
pub struct ForkedLauncher;

impl Launcher for ForkedLauncher {
    fn run(&self, request: &LaunchRequest) -> Result<i32, LaunchError> {
        let mut log = File::create(&request.log_file).map_err(|e| LaunchError::LogFile {
            path: request.log_file.display().to_string(),
            error: e.to_string(),
        })?;

        if let Some(header) = &request.log_header {
            write_log_header(&mut log, header).map_err(|e| LaunchError::LogFile {
                path: request.log_file.display().to_string(),
                error: e.to_string(),
            })?;
        }

        let log_out = log.try_clone().map_err(|e| LaunchError::LogFile {
            path: request.log_file.display().to_string(),
            error: e.to_string(),
        })?;

        let command_line = request.command_line();

        let mut command = Command::new(&request.executable);
        command
            .args(&request.args)
            .current_dir(&request.working_dir)
            .envs(&request.env)
            .stdout(log_out)
            .stderr(log);
        for key in &request.env_removals {
            command.env_remove(key);
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LaunchError::ExecutableNotFound {
                    executable: request.executable.display().to_string(),
                }
            } else {
                LaunchError::SpawnFailed {
                    command: command_line.clone(),
                    error: e.to_string(),
                }
            }
        })?;

        let status = child.wait().map_err(|e| LaunchError::WaitFailed {
            command: command_line,
            error: e.to_string(),
        })?;

        // A signal-terminated child has no exit code; report it as a failure.
        Ok(status.code().unwrap_or(-1))
    }
}

/// Write the command-line header, each line prefixed with `# `
fn write_log_header(log: &mut File, header: &str) -> std::io::Result<()> {
    for line in header.lines() {
        writeln!(log, "# {line}")?;
    }
    log.flush()
}

/// Resolve the executable path for a build invocation.
///
/// Resolution order: wrapper script in the fixture basedir when enabled,
/// `<home>/bin/<command>` when a tool home is known, otherwise the bare
/// command name (resolved against PATH by the OS at spawn time).
pub fn resolve_executable(
    command: &str,
    tool_home: Option<&Path>,
    basedir: &Path,
    use_wrapper: bool,
) -> PathBuf {
    if use_wrapper {
        let wrapper = basedir.join(format!("{command}w"));
        if wrapper.is_file() {
            return wrapper;
        }
    }
    match tool_home {
        Some(home) => home.join("bin").join(command),
        None => PathBuf::from(command),
    }
}

/// Stub launcher for tests: records the last request and replays a fixed
/// exit code without forking anything.
#[cfg(test)]
pub struct StubLauncher {
    exit_code: i32,
    log_content: String,
    pub last_request: std::cell::RefCell<Option<LaunchRequest>>,
}

#[cfg(test)]
impl StubLauncher {
    pub fn new(exit_code: i32, log_content: &str) -> Self {
        Self {
            exit_code,
            log_content: log_content.to_string(),
            last_request: std::cell::RefCell::new(None),
        }
    }
}

#[cfg(test)]
impl Launcher for StubLauncher {
    fn run(&self, request: &LaunchRequest) -> Result<i32, LaunchError> {
        let mut content = String::new();
        if let Some(header) = &request.log_header {
            for line in header.lines() {
                content.push_str("# ");
                content.push_str(line);
                content.push('\n');
            }
        }
        content.push_str(&self.log_content);
        std::fs::write(&request.log_file, content).map_err(|e| LaunchError::LogFile {
            path: request.log_file.display().to_string(),
            error: e.to_string(),
        })?;
        *self.last_request.borrow_mut() = Some(request.clone());
        Ok(self.exit_code)
    }
}
