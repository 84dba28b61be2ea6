//! Local repository layout module
//!
//! Path algebra for Maven-style local repositories. Artifact and metadata
//! path construction is pure string/path manipulation; only the deletion
//! helpers and sibling-metadata scans touch the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{Error, Result};

/// Default metadata file name used by local installs
pub const DEFAULT_METADATA_FILE: &str = "maven-metadata-local.xml";

/// Repository directory layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// `group/id/artifact/version/artifact-version[-classifier].ext`
    /// with group id dots mapped to directory separators
    #[default]
    Default,
    /// `groupId/exts/artifact-version.ext` (flat, pre-Maven-2 style)
    Legacy,
}

/// A local artifact repository rooted at a directory
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
    layout: Layout,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>, layout: Layout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Path of an artifact file inside this repository.
    ///
    /// Extension aliases are normalised first: `maven-plugin` maps to `jar`,
    /// `coreit-artifact` to `jar` with classifier `it`, `test-jar` to `jar`
    /// with classifier `tests`. An empty classifier counts as none.
    pub fn artifact_path(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        ext: &str,
        classifier: Option<&str>,
    ) -> PathBuf {
        let (ext, classifier) = normalize_ext(ext, classifier);

        match self.layout {
            Layout::Default => {
                let mut path = self.group_dir(group_id);
                path.push(artifact_id);
                path.push(version);
                let mut file_name = format!("{artifact_id}-{version}");
                if let Some(classifier) = classifier {
                    file_name.push('-');
                    file_name.push_str(classifier);
                }
                file_name.push('.');
                file_name.push_str(&ext);
                path.push(file_name);
                path
            }
            Layout::Legacy => {
                let mut path = self.root.join(group_id);
                path.push(format!("{ext}s"));
                path.push(format!("{artifact_id}-{version}.{ext}"));
                path
            }
        }
    }

    /// Path of a repository metadata file.
    ///
    /// `artifact_id` and `version` narrow the location: group-level metadata
    /// passes neither, artifact-level passes only the artifact id.
    pub fn metadata_path(
        &self,
        group_id: &str,
        artifact_id: Option<&str>,
        version: Option<&str>,
        file_name: &str,
    ) -> Result<PathBuf> {
        if self.layout == Layout::Legacy {
            return Err(Error::verification(
                "metadata paths are not defined for the legacy repository layout",
            ));
        }

        let mut path = self.group_dir(group_id);
        if let Some(artifact_id) = artifact_id {
            path.push(artifact_id);
            if let Some(version) = version {
                path.push(version);
            }
        }
        path.push(file_name);
        Ok(path)
    }

    /// Path of the local-install metadata file for a version
    pub fn local_metadata_path(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: Option<&str>,
    ) -> Result<PathBuf> {
        self.metadata_path(group_id, Some(artifact_id), version, DEFAULT_METADATA_FILE)
    }

    /// All files belonging to an artifact: the artifact itself plus any
    /// `maven-metadata*.xml` siblings in its version and artifact
    /// directories. Only files that actually exist are scanned for, but the
    /// artifact path itself is always included.
    pub fn artifact_file_names(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        ext: &str,
    ) -> Vec<PathBuf> {
        let artifact = self.artifact_path(group_id, artifact_id, version, ext, None);
        let mut files = vec![artifact.clone()];

        if self.layout == Layout::Default {
            if let Some(version_dir) = artifact.parent() {
                collect_metadata_files(version_dir, &mut files);
                if let Some(artifact_dir) = version_dir.parent() {
                    collect_metadata_files(artifact_dir, &mut files);
                }
            }
        }

        files
    }

    /// Delete a single artifact and its sibling metadata files
    pub fn delete_artifact(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        ext: &str,
    ) -> Result<()> {
        for file in self.artifact_file_names(group_id, artifact_id, version, ext) {
            if file.is_file() {
                fs::remove_file(&file)?;
            }
        }
        Ok(())
    }

    /// Delete everything under a group id
    pub fn delete_group(&self, group_id: &str) -> Result<()> {
        if self.layout == Layout::Legacy {
            return Err(Error::verification(
                "group-level deletion is not defined for the legacy repository layout",
            ));
        }
        remove_dir_if_present(&self.group_dir(group_id))
    }

    /// Delete everything under a single version of an artifact
    pub fn delete_version(&self, group_id: &str, artifact_id: &str, version: &str) -> Result<()> {
        if self.layout == Layout::Legacy {
            return Err(Error::verification(
                "version-level deletion is not defined for the legacy repository layout",
            ));
        }
        let mut dir = self.group_dir(group_id);
        dir.push(artifact_id);
        dir.push(version);
        remove_dir_if_present(&dir)
    }

    fn group_dir(&self, group_id: &str) -> PathBuf {
        let mut path = self.root.clone();
        for part in group_id.split('.') {
            path.push(part);
        }
        path
    }
}

/// Map artifact-type aliases onto their on-disk extension and implied
/// classifier. An explicitly passed classifier wins over an implied one;
/// empty classifiers count as none.
fn normalize_ext<'a>(ext: &'a str, classifier: Option<&'a str>) -> (String, Option<&'a str>) {
    let classifier = classifier.filter(|c| !c.is_empty());
    match ext {
        "maven-plugin" => ("jar".to_string(), classifier),
        "coreit-artifact" => ("jar".to_string(), classifier.or(Some("it"))),
        "test-jar" => ("jar".to_string(), classifier.or(Some("tests"))),
        other => (other.to_string(), classifier),
    }
}

fn collect_metadata_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("maven-metadata") && name.ends_with(".xml") {
            files.push(entry.path());
        }
    }
}

fn remove_dir_if_present(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

/// Locate the local repository to use.
///
/// Priority: explicit override, then a `<localRepository>` element scraped
/// from the settings file, then `<home>/.m2/repository`. The resolved
/// directory is created if absent and normalised to an absolute path.
pub fn find_local_repo(
    override_path: Option<PathBuf>,
    settings_file: Option<&Path>,
    home_dir: Option<&Path>,
) -> Result<PathBuf> {
    let repo = match override_path {
        Some(path) => Some(path),
        None => match settings_file {
            Some(settings) => scrape_local_repository(settings)?,
            None => None,
        },
    };

    let repo = match (repo, home_dir) {
        (Some(repo), _) => repo,
        (None, Some(home)) => home.join(".m2").join("repository"),
        (None, None) => {
            return Err(Error::verification(
                "cannot locate local repository: no override, settings entry or home directory",
            ))
        }
    };

    fs::create_dir_all(&repo)?;
    Ok(repo.canonicalize()?)
}

/// Pull the `<localRepository>` element out of a settings file, if any
fn scrape_local_repository(settings_file: &Path) -> Result<Option<PathBuf>> {
    let content = fs::read_to_string(settings_file)?;
    // One well-known element; full XML parsing is not warranted here.
    let pattern = Regex::new(r"<localRepository>\s*([^<]*?)\s*</localRepository>")
        .map_err(|e| Error::verification(format!("invalid settings pattern: {e}")))?;
    Ok(pattern
        .captures(&content)
        .map(|c| PathBuf::from(&c[1]))
        .filter(|p| !p.as_os_str().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo(layout: Layout) -> LocalRepository {
        LocalRepository::new("/repo", layout)
    }

    /// **What is tested:** Artifact path construction in the default layout
    /// **Why it is tested:** Every artifact assertion depends on this mapping
    /// **Test conditions:** Dotted group id, with and without classifier
    /// **Expectations:** Dots become directories, classifier is appended before the extension
    #[test]
    fn test_default_layout_artifact_path() {
        let repo = repo(Layout::Default);
        assert_eq!(
            repo.artifact_path("org.apache.maven", "maven-core", "2.0", "jar", None),
            PathBuf::from("/repo/org/apache/maven/maven-core/2.0/maven-core-2.0.jar")
        );
        assert_eq!(
            repo.artifact_path("org.test", "lib", "1.0", "jar", Some("sources")),
            PathBuf::from("/repo/org/test/lib/1.0/lib-1.0-sources.jar")
        );
    }

    #[test]
    fn test_legacy_layout_artifact_path() {
        let repo = repo(Layout::Legacy);
        assert_eq!(
            repo.artifact_path("org.apache.maven", "maven-core", "2.0", "jar", None),
            PathBuf::from("/repo/org.apache.maven/jars/maven-core-2.0.jar")
        );
    }

    /// **What is tested:** Extension alias normalisation
    /// **Why it is tested:** Plugin and test-jar artifacts are stored under their real extension
    /// **Test conditions:** The three aliases, with and without an explicit classifier
    /// **Expectations:** maven-plugin maps to jar; coreit-artifact implies classifier it; test-jar implies tests; explicit classifier wins
    #[test]
    fn test_ext_normalization() {
        let repo = repo(Layout::Default);
        assert_eq!(
            repo.artifact_path("g", "a", "1", "maven-plugin", None),
            PathBuf::from("/repo/g/a/1/a-1.jar")
        );
        assert_eq!(
            repo.artifact_path("g", "a", "1", "coreit-artifact", None),
            PathBuf::from("/repo/g/a/1/a-1-it.jar")
        );
        assert_eq!(
            repo.artifact_path("g", "a", "1", "test-jar", None),
            PathBuf::from("/repo/g/a/1/a-1-tests.jar")
        );
        assert_eq!(
            repo.artifact_path("g", "a", "1", "test-jar", Some("shaded")),
            PathBuf::from("/repo/g/a/1/a-1-shaded.jar")
        );
        // Empty classifier counts as none
        assert_eq!(
            repo.artifact_path("g", "a", "1", "jar", Some("")),
            PathBuf::from("/repo/g/a/1/a-1.jar")
        );
    }

    #[test]
    fn test_metadata_paths() {
        let default_repo = repo(Layout::Default);
        assert_eq!(
            default_repo
                .metadata_path("org.test", None, None, "maven-metadata.xml")
                .unwrap(),
            PathBuf::from("/repo/org/test/maven-metadata.xml")
        );
        assert_eq!(
            default_repo
                .local_metadata_path("org.test", "lib", Some("1.0"))
                .unwrap(),
            PathBuf::from("/repo/org/test/lib/1.0/maven-metadata-local.xml")
        );

        assert!(repo(Layout::Legacy)
            .metadata_path("org.test", None, None, "maven-metadata.xml")
            .is_err());
    }

    /// **What is tested:** Sibling metadata expansion and artifact deletion
    /// **Why it is tested:** Deleting an artifact must also remove its install metadata
    /// **Test conditions:** Real temp repository with an artifact plus metadata in version and artifact directories
    /// **Expectations:** File list contains all three; delete_artifact removes all of them
    #[test]
    fn test_artifact_file_names_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let repo = LocalRepository::new(temp_dir.path(), Layout::Default);

        let artifact = repo.artifact_path("org.test", "lib", "1.0", "jar", None);
        let version_dir = artifact.parent().unwrap().to_path_buf();
        let artifact_dir = version_dir.parent().unwrap().to_path_buf();
        fs::create_dir_all(&version_dir).unwrap();
        fs::write(&artifact, b"jar").unwrap();
        fs::write(version_dir.join("maven-metadata-local.xml"), b"<m/>").unwrap();
        fs::write(artifact_dir.join("maven-metadata-local.xml"), b"<m/>").unwrap();
        fs::write(version_dir.join("unrelated.txt"), b"x").unwrap();

        let files = repo.artifact_file_names("org.test", "lib", "1.0", "jar");
        assert_eq!(files.len(), 3);
        assert!(files.contains(&artifact));

        repo.delete_artifact("org.test", "lib", "1.0", "jar").unwrap();
        assert!(!artifact.exists());
        assert!(!version_dir.join("maven-metadata-local.xml").exists());
        assert!(!artifact_dir.join("maven-metadata-local.xml").exists());
        assert!(version_dir.join("unrelated.txt").exists());
    }

    #[test]
    fn test_delete_group_and_version() {
        let temp_dir = TempDir::new().unwrap();
        let repo = LocalRepository::new(temp_dir.path(), Layout::Default);

        let artifact = repo.artifact_path("org.test", "lib", "1.0", "jar", None);
        fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        fs::write(&artifact, b"jar").unwrap();

        repo.delete_version("org.test", "lib", "1.0").unwrap();
        assert!(!artifact.exists());

        fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        fs::write(&artifact, b"jar").unwrap();
        repo.delete_group("org.test").unwrap();
        assert!(!temp_dir.path().join("org/test").exists());

        // Deleting something absent is fine
        repo.delete_group("org.missing").unwrap();
    }

    /// **What is tested:** Local repository discovery priority
    /// **Why it is tested:** Forked builds must stay inside the sandbox repository
    /// **Test conditions:** Explicit override, settings file with localRepository element, home fallback
    /// **Expectations:** Override wins, then settings, then home/.m2/repository; directory gets created
    #[test]
    fn test_find_local_repo_priority() {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path().join("home");
        let settings = temp_dir.path().join("settings.xml");
        let settings_repo = temp_dir.path().join("from-settings");
        fs::write(
            &settings,
            format!(
                "<settings>\n  <localRepository>{}</localRepository>\n</settings>\n",
                settings_repo.display()
            ),
        )
        .unwrap();

        let explicit = temp_dir.path().join("explicit");
        let found = find_local_repo(Some(explicit.clone()), Some(&settings), Some(&home)).unwrap();
        assert_eq!(found, explicit.canonicalize().unwrap());
        assert!(explicit.is_dir());

        let found = find_local_repo(None, Some(&settings), Some(&home)).unwrap();
        assert_eq!(found, settings_repo.canonicalize().unwrap());

        let found = find_local_repo(None, None, Some(&home)).unwrap();
        assert_eq!(
            found,
            home.join(".m2").join("repository").canonicalize().unwrap()
        );
    }

    #[test]
    fn test_find_local_repo_without_any_source_fails() {
        assert!(find_local_repo(None, None, None).is_err());
    }
}
