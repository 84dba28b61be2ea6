//! Error handling module
//!
//! This module provides unified error handling for the build-verifier harness.

use std::fmt;

use crate::config::ConfigError;
use crate::launcher::LaunchError;

/// Result type alias for the harness
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Debug)]
pub enum Error {
    /// IO-related errors
    Io(std::io::Error),
    /// A verification (assertion) failed
    Verification(String),
    /// The forked build exited with a non-zero code
    BuildFailure {
        exit_code: i32,
        command: String,
        log_excerpt: String,
    },
    /// The build process could not be launched
    Launch(LaunchError),
    /// Configuration errors
    Config(ConfigError),
}

impl Error {
    /// Create a verification error with a custom message
    pub fn verification(message: impl Into<String>) -> Self {
        Error::Verification(message.into())
    }

    /// Map the message of this error using a transformation function
    ///
    /// Errors that carry no free-form message are passed through unchanged.
    pub fn map_context<F>(self, f: F) -> Self
    where
        F: FnOnce(String) -> String,
    {
        match self {
            Error::Verification(msg) => Error::Verification(f(msg)),
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {err}"),
            Error::Verification(msg) => write!(f, "Verification error: {msg}"),
            Error::BuildFailure {
                exit_code,
                command,
                log_excerpt,
            } => write!(
                f,
                "Exit code was non-zero: {exit_code}; command line and log =\n{command}\n{log_excerpt}"
            ),
            Error::Launch(err) => write!(f, "Failed to launch build: {err}"),
            Error::Config(err) => write!(f, "Configuration error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Launch(err) => Some(err),
            Error::Config(err) => Some(err),
            Error::Verification(_) | Error::BuildFailure { .. } => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<LaunchError> for Error {
    fn from(err: LaunchError) -> Self {
        Error::Launch(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Functional extensions for Result types to enable better composition
pub trait ResultExt<T> {
    /// Add context to an error using a closure
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Apply a side effect function to the error without changing the Result
    fn inspect_error<F>(self, f: F) -> Result<T>
    where
        F: FnOnce(&Error);
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.map_context(|msg| format!("{}: {}", f(), msg)))
    }

    fn inspect_error<F>(self, f: F) -> Result<T>
    where
        F: FnOnce(&Error),
    {
        if let Err(ref e) = self {
            f(e);
        }
        self
    }
}
