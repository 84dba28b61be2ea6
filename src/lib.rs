//! build-verifier library
//!
//! A harness for integration-testing Maven-compatible build tools: fork a
//! build over a fixture directory, capture its log, and assert on the log,
//! the produced files and the local repository.
//!
//! # Examples
//!
//! Basic usage:
//!
//! ```rust,no_run
//! use build_verifier::Verifier;
//!
//! let mut verifier = Verifier::new("/path/to/fixture")?;
//! verifier.set_autoclean(false);
//! verifier.add_cli_argument("validate");
//!
//! verifier.execute()?;
//! verifier.verify_error_free_log()?;
//! verifier.verify_file_present("target/classes")?;
//! # Ok::<(), build_verifier::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod fixture;
pub mod launcher;
pub mod properties;
pub mod repository;
pub mod verifier;

pub use config::{CliArgs, ConfigError, EnvReader, SystemEnvReader, VerifierConfig};
pub use error::{Error, Result};
pub use fixture::{extract_resources, Fixture};
pub use launcher::{ForkedLauncher, LaunchError, LaunchRequest, Launcher};
pub use properties::Properties;
pub use repository::{Layout, LocalRepository};
pub use verifier::{strip_ansi, Verifier};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// **What is tested:** Basic library functionality integration test
    /// **Why it is tested:** Ensures that the main library components work together for a fixture lifecycle without forking a real build
    /// **Test conditions:** Extracts a fixture into a workspace, writes files through the verifier, runs file assertions
    /// **Expectations:** Fixture extraction and file assertions compose without errors
    #[test]
    fn test_basic_functionality() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let resources = TempDir::new()?;
        fs::create_dir_all(resources.path().join("demo"))?;
        fs::write(resources.path().join("demo/pom.xml"), "<project/>")?;

        let fixture = extract_resources(resources.path(), "demo")?;

        let repo = TempDir::new()?;
        let config = VerifierConfig::resolve_with_reader(
            CliArgs {
                basedir: fixture.basedir().to_path_buf(),
                ..Default::default()
            },
            &config::MockEnvReader::new()
                .with_var(config::LOCAL_REPO_VAR, &repo.path().display().to_string()),
        )?;
        let verifier = Verifier::from_config(config)?;

        verifier.write_file("target/out.txt", "hello")?;
        verifier.verify_file_present("target/out.txt")?;
        verifier.verify_file_not_present("target/absent.txt")?;

        Ok(())
    }
}
