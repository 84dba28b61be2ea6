//! CLI entry point for build-verifier
//!
//! Runs a Maven-compatible build over a fixture directory, captures its log
//! and checks the declared expectations, the way a scripted integration
//! test would.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};

use build_verifier::{ConfigError, Result, Verifier, VerifierConfig};

/// Fork a Maven-compatible build over a fixture directory and verify the results
#[derive(Parser)]
#[command(name = "build-verifier")]
#[command(version, about, long_about = None)]
struct Args {
    /// Goals and arguments passed to the build tool
    #[arg(value_name = "ARG", trailing_var_arg = true)]
    build_args: Vec<String>,

    /// Fixture directory the build runs in
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    basedir: PathBuf,

    /// Log file name, relative to the fixture directory
    #[arg(long, value_name = "FILE")]
    log_file: Option<String>,

    /// Settings file passed to the build and used to locate the local repository
    #[arg(short, long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Do not prepend the clean goal
    #[arg(long, action = ArgAction::SetTrue)]
    no_autoclean: bool,

    /// System property for the build (repeatable)
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", action = ArgAction::Append)]
    define: Vec<String>,

    /// Environment variable for the forked build (repeatable)
    #[arg(long, value_name = "KEY=VALUE", action = ArgAction::Append)]
    env: Vec<String>,

    /// Explicit build executable instead of discovery
    #[arg(short, long, value_name = "PATH")]
    executable: Option<PathBuf>,

    /// Skip the build, only check the declared expectations
    #[arg(long, action = ArgAction::SetTrue)]
    verify_only: bool,

    /// Suppress the command-line header in the log
    #[arg(short, long, action = ArgAction::SetTrue)]
    quiet: bool,
}

/// Convert CLI args to CliArgs struct for VerifierConfig
impl From<Args> for build_verifier::config::CliArgs {
    fn from(args: Args) -> Self {
        Self {
            basedir: args.basedir,
            log_file: args.log_file,
            settings: args.settings,
            no_autoclean: args.no_autoclean,
            defines: args.define,
            env: args.env,
            executable: args.executable,
            verify_only: args.verify_only,
            quiet: args.quiet,
            build_args: args.build_args,
        }
    }
}

/// Run the build (unless skipped) and check the fixture's expectations
fn run(config: VerifierConfig) -> Result<()> {
    let verify_only = config.verify_only();
    let build_args: Vec<String> = config.build_args().to_vec();

    let mut verifier = Verifier::from_config(config)?;
    verifier.add_cli_arguments(build_args);

    if !verify_only {
        verifier.execute()?;
    }
    // Without a build there is no log to choke on
    verifier.verify(!verify_only)
}

/// Handle configuration errors with user-friendly messages
fn handle_config_error(error: ConfigError) -> ! {
    let error_message = match error {
        ConfigError::InvalidCliArgument { .. } => "Invalid CLI argument",
        ConfigError::UnreadableSettings { .. } => "Cannot read settings file",
        ConfigError::UnknownForkMode { .. } => "Unknown launch mode",
        ConfigError::IoError { .. } => "Configuration error",
    };

    eprintln!("{error_message}: {error}");
    process::exit(1);
}

fn main() {
    let config = Args::parse()
        .pipe(build_verifier::config::CliArgs::from)
        .pipe(VerifierConfig::resolve)
        .unwrap_or_else(|error| handle_config_error(error));

    if let Err(error) = run(config) {
        eprintln!("{error}");
        process::exit(1);
    }
}

/// Helper trait for functional pipeline composition
trait Pipe<T> {
    fn pipe<U, F>(self, f: F) -> U
    where
        F: FnOnce(Self) -> U,
        Self: Sized;
}

impl<T> Pipe<T> for T {
    fn pipe<U, F>(self, f: F) -> U
    where
        F: FnOnce(Self) -> U,
    {
        f(self)
    }
}
