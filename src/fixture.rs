//! Fixture workspace module
//!
//! Test fixtures are project trees checked into a resources directory. To
//! keep runs independent, each fixture is copied into a fresh temporary
//! workspace before a build touches it. The returned handle owns the
//! temporary directory; dropping it removes the workspace.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{Error, Result};

/// A fixture project copied into a private temporary workspace
#[derive(Debug)]
pub struct Fixture {
    // Held for its Drop; the workspace lives as long as the fixture.
    _temp_dir: TempDir,
    basedir: PathBuf,
}

impl Fixture {
    /// Directory of the extracted project, suitable as a verifier basedir
    pub fn basedir(&self) -> &Path {
        &self.basedir
    }
}

/// Copy the named project tree out of a resources directory into a fresh
/// temporary workspace.
pub fn extract_resources(resources_root: &Path, name: &str) -> Result<Fixture> {
    let source = resources_root.join(name);
    if !source.is_dir() {
        return Err(Error::verification(format!(
            "fixture project '{}' not found under {}",
            name,
            resources_root.display()
        )));
    }

    let temp_dir = TempDir::new()?;
    let basedir = temp_dir.path().join(
        source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "project".into()),
    );
    copy_dir_recursive(&source, &basedir)?;

    Ok(Fixture {
        _temp_dir: temp_dir,
        basedir,
    })
}

/// Recursively copy a directory tree, preserving relative structure
pub fn copy_dir_recursive(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// **What is tested:** Fixture extraction into a private workspace
    /// **Why it is tested:** Builds mutate their basedir; runs must not interfere with the checked-in resources or each other
    /// **Test conditions:** Resources root with a nested project tree, extracted twice
    /// **Expectations:** Full tree copied, both extractions are distinct directories, sources untouched
    #[test]
    fn test_extract_resources() {
        let resources = TempDir::new().unwrap();
        write(&resources.path().join("demo/pom.xml"), "<project/>");
        write(
            &resources.path().join("demo/src/main/java/App.java"),
            "class App {}",
        );

        let first = extract_resources(resources.path(), "demo").unwrap();
        let second = extract_resources(resources.path(), "demo").unwrap();

        assert!(first.basedir().join("pom.xml").is_file());
        assert!(first.basedir().join("src/main/java/App.java").is_file());
        assert_ne!(first.basedir(), second.basedir());

        fs::write(first.basedir().join("pom.xml"), "changed").unwrap();
        assert_eq!(
            fs::read_to_string(resources.path().join("demo/pom.xml")).unwrap(),
            "<project/>"
        );
    }

    #[test]
    fn test_extract_missing_fixture_fails() {
        let resources = TempDir::new().unwrap();
        let result = extract_resources(resources.path(), "nope");
        assert!(matches!(result, Err(Error::Verification(msg)) if msg.contains("nope")));
    }

    #[test]
    fn test_workspace_removed_on_drop() {
        let resources = TempDir::new().unwrap();
        write(&resources.path().join("demo/pom.xml"), "<project/>");

        let fixture = extract_resources(resources.path(), "demo").unwrap();
        let basedir = fixture.basedir().to_path_buf();
        assert!(basedir.is_dir());
        drop(fixture);
        assert!(!basedir.exists());
    }
}
