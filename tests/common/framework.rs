//! Unified test framework
//!
//! A [`TestProject`] bundles everything one harness test needs: a fixture
//! basedir, a sandboxed local repository, a settings file pointing at that
//! repository, and fake build tools implemented as shell scripts. Nothing
//! here touches the user's real environment or `~/.m2`.

use std::fs;
use std::path::{Path, PathBuf};

use build_verifier::config::CliArgs;
use build_verifier::{Verifier, VerifierConfig};
use tempfile::TempDir;

/// Main result type for the framework
pub type Result<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

/// A self-contained fixture workspace for one test
#[derive(Debug)]
pub struct TestProject {
    #[allow(dead_code)]
    temp_dir: TempDir,
    basedir: PathBuf,
    settings: PathBuf,
    repo: PathBuf,
}

impl TestProject {
    /// Create a project directory, a sandbox repository and a settings file
    /// wiring the two together.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let basedir = temp_dir.path().join("project");
        let repo = temp_dir.path().join("repo");
        fs::create_dir_all(&basedir)?;
        fs::create_dir_all(&repo)?;

        let settings = temp_dir.path().join("settings.xml");
        fs::write(
            &settings,
            format!(
                "<settings>\n  <localRepository>{}</localRepository>\n</settings>\n",
                repo.display()
            ),
        )?;

        Ok(Self {
            temp_dir,
            basedir,
            settings,
            repo,
        })
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    pub fn settings(&self) -> &Path {
        &self.settings
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Write a file under the basedir, creating parent directories
    pub fn write_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.basedir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Install a fake build tool as an executable shell script.
    ///
    /// The script body runs with the fixture basedir as working directory
    /// and receives the assembled command line as `"$@"`.
    #[cfg(unix)]
    pub fn fake_tool(&self, name: &str, body: &str) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let path = self.temp_dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    /// Build a verifier over this project, sandboxed via the settings file
    pub fn verifier(&self) -> Result<Verifier> {
        let config = VerifierConfig::resolve(CliArgs {
            basedir: self.basedir.clone(),
            settings: Some(self.settings.clone()),
            ..Default::default()
        })?;
        Ok(Verifier::from_config(config)?)
    }
}
