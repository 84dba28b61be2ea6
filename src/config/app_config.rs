//! Application configuration module
//!
//! This module resolves the harness configuration from CLI arguments and the
//! environment using a clear priority system. Resolution is strict: a value
//! that is present but malformed is an error, only absence falls back to the
//! next layer.

use std::fmt;
use std::path::PathBuf;

use super::env_reader::EnvReader;

/// Environment variable naming the build tool installation directory
pub const TOOL_HOME_VAR: &str = "MAVEN_HOME";
/// Environment variable overriding the local repository location
pub const LOCAL_REPO_VAR: &str = "MAVEN_REPO_LOCAL";
/// Environment variable selecting the launch mode
pub const FORK_MODE_VAR: &str = "BUILD_VERIFIER_FORK";

/// Configuration errors with detailed context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A CLI argument was present but malformed
    InvalidCliArgument {
        argument: String,
        value: String,
        expected: String,
    },
    /// The configured settings file cannot be used
    UnreadableSettings { path: String, reason: String },
    /// An unknown launch mode was requested
    UnknownForkMode { value: String },
    /// IO error during configuration resolution
    IoError { source: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCliArgument {
                argument,
                value,
                expected,
            } => write!(
                f,
                "Invalid value '{value}' for argument '{argument}': expected {expected}"
            ),
            ConfigError::UnreadableSettings { path, reason } => {
                write!(f, "Cannot use settings file '{path}': {reason}")
            }
            ConfigError::UnknownForkMode { value } => write!(
                f,
                "Unknown launch mode '{value}' in {FORK_MODE_VAR}: only 'forked' is supported"
            ),
            ConfigError::IoError { source } => write!(f, "IO error: {source}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// CLI arguments structure, decoupled from the clap surface in `main`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliArgs {
    /// Fixture directory the build runs in
    pub basedir: PathBuf,
    /// Log file name relative to the basedir
    pub log_file: Option<String>,
    /// Settings file passed to the build and scraped for the local repo
    pub settings: Option<PathBuf>,
    /// Skip the automatic clean goal
    pub no_autoclean: bool,
    /// System properties as KEY=VALUE
    pub defines: Vec<String>,
    /// Extra child environment variables as KEY=VALUE
    pub env: Vec<String>,
    /// Explicit build executable
    pub executable: Option<PathBuf>,
    /// Skip execution, only run the declarative checks
    pub verify_only: bool,
    /// Suppress the log header
    pub quiet: bool,
    /// Goals and arguments for the build
    pub build_args: Vec<String>,
}

/// Fully resolved harness configuration
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    basedir: PathBuf,
    log_file_name: String,
    settings_file: Option<PathBuf>,
    autoclean: bool,
    system_properties: Vec<(String, String)>,
    environment: Vec<(String, String)>,
    executable: Option<PathBuf>,
    tool_home: Option<PathBuf>,
    local_repo_override: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    verify_only: bool,
    quiet: bool,
    build_args: Vec<String>,
}

impl VerifierConfig {
    /// Resolve configuration from CLI arguments and the real environment.
    ///
    /// Priority order:
    /// 1. CLI parameters (highest priority)
    /// 2. Environment variables
    /// 3. Hardcoded defaults (only when neither is set)
    pub fn resolve(cli_args: CliArgs) -> Result<Self, ConfigError> {
        Self::resolve_with_reader(cli_args, &super::SystemEnvReader)
    }

    /// Resolve configuration against an explicit environment reader
    pub fn resolve_with_reader(
        cli_args: CliArgs,
        env: &impl EnvReader,
    ) -> Result<Self, ConfigError> {
        let log_file_name = resolve_log_file_name(cli_args.log_file)?;
        let system_properties = parse_pairs("--define", &cli_args.defines)?;
        let environment = parse_pairs("--env", &cli_args.env)?;
        let settings_file = validate_settings(cli_args.settings)?;
        validate_fork_mode(env)?;

        Ok(Self {
            basedir: cli_args.basedir,
            log_file_name,
            settings_file,
            autoclean: !cli_args.no_autoclean,
            system_properties,
            environment,
            executable: cli_args.executable,
            tool_home: env.var(TOOL_HOME_VAR).map(PathBuf::from),
            local_repo_override: env.var(LOCAL_REPO_VAR).map(PathBuf::from),
            home_dir: env
                .var("HOME")
                .or_else(|| env.var("USERPROFILE"))
                .map(PathBuf::from),
            verify_only: cli_args.verify_only,
            quiet: cli_args.quiet,
            build_args: cli_args.build_args,
        })
    }

    pub fn basedir(&self) -> &PathBuf {
        &self.basedir
    }

    pub fn log_file_name(&self) -> &str {
        &self.log_file_name
    }

    pub fn settings_file(&self) -> Option<&PathBuf> {
        self.settings_file.as_ref()
    }

    pub fn autoclean(&self) -> bool {
        self.autoclean
    }

    pub fn system_properties(&self) -> &[(String, String)] {
        &self.system_properties
    }

    pub fn environment(&self) -> &[(String, String)] {
        &self.environment
    }

    pub fn executable(&self) -> Option<&PathBuf> {
        self.executable.as_ref()
    }

    pub fn tool_home(&self) -> Option<&PathBuf> {
        self.tool_home.as_ref()
    }

    pub fn local_repo_override(&self) -> Option<&PathBuf> {
        self.local_repo_override.as_ref()
    }

    pub fn home_dir(&self) -> Option<&PathBuf> {
        self.home_dir.as_ref()
    }

    pub fn verify_only(&self) -> bool {
        self.verify_only
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    pub fn build_args(&self) -> &[String] {
        &self.build_args
    }
}

fn resolve_log_file_name(log_file: Option<String>) -> Result<String, ConfigError> {
    match log_file {
        None => Ok("log.txt".to_string()),
        Some(name) if name.trim().is_empty() => Err(ConfigError::InvalidCliArgument {
            argument: "--log-file".to_string(),
            value: name,
            expected: "a non-empty file name".to_string(),
        }),
        Some(name) => Ok(name),
    }
}

fn parse_pairs(argument: &str, raw: &[String]) -> Result<Vec<(String, String)>, ConfigError> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(ConfigError::InvalidCliArgument {
                argument: argument.to_string(),
                value: pair.clone(),
                expected: "KEY=VALUE with a non-empty key".to_string(),
            }),
        })
        .collect()
}

fn validate_settings(settings: Option<PathBuf>) -> Result<Option<PathBuf>, ConfigError> {
    match settings {
        None => Ok(None),
        Some(path) if path.is_file() => Ok(Some(path)),
        Some(path) => Err(ConfigError::UnreadableSettings {
            path: path.display().to_string(),
            reason: "not a readable file".to_string(),
        }),
    }
}

/// Only forked launching exists; an explicit request for anything else is
/// an error rather than a silent fallback.
fn validate_fork_mode(env: &impl EnvReader) -> Result<(), ConfigError> {
    match env.var(FORK_MODE_VAR) {
        None => Ok(()),
        Some(mode) if mode.eq_ignore_ascii_case("forked") => Ok(()),
        Some(mode) => Err(ConfigError::UnknownForkMode { value: mode }),
    }
}
