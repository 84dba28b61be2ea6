//! Core verifier module
//!
//! The [`Verifier`] drives one build of one fixture project: it assembles
//! the command line, forks the build tool through a [`Launcher`], captures
//! the log, and exposes assertion helpers over the log, the fixture files
//! and the local repository.
//!
//! One instance covers one basedir. Assertion helpers never mutate the
//! fixture; mutation helpers never assert.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use memchr::memmem;
use regex::Regex;

use crate::config::{CliArgs, VerifierConfig};
use crate::error::{Error, Result, ResultExt};
use crate::launcher::{resolve_executable, ForkedLauncher, LaunchRequest, Launcher};
use crate::properties::Properties;
use crate::repository::{Layout, LocalRepository};

/// Command name of the build tool, used when no explicit executable is set
const DEFAULT_COMMAND: &str = "mvn";

/// Goal prepended when autoclean is enabled
const CLEAN_GOAL: &str = "org.apache.maven.plugins:maven-clean-plugin:clean";

/// File driving the declarative verification mode
const EXPECTED_RESULTS_FILE: &str = "expected-results.txt";

/// Environment variables that make build tools believe they run on CI
const CI_ENVIRONMENT: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "CIRCLECI",
    "TRAVIS",
    "TEAMCITY_VERSION",
    "WORKSPACE",
];

/// Harness for forking a build over a fixture directory and asserting on
/// the results
pub struct Verifier {
    basedir: PathBuf,
    local_repo: LocalRepository,
    launcher: Box<dyn Launcher>,
    explicit_executable: Option<PathBuf>,
    tool_home: Option<PathBuf>,
    use_wrapper: bool,
    log_file_name: String,
    autoclean: bool,
    forward_local_repo: bool,
    default_cli_args: Vec<String>,
    cli_args: Vec<String>,
    system_properties: Vec<(String, String)>,
    settings_file: Option<PathBuf>,
    environment: BTreeMap<String, String>,
    env_removals: Vec<String>,
}

impl Verifier {
    /// Create a verifier for a fixture directory, resolving the local
    /// repository and tool home from the environment.
    pub fn new(basedir: impl Into<PathBuf>) -> Result<Self> {
        let basedir = basedir.into();
        let config = VerifierConfig::resolve(CliArgs {
            basedir: basedir.clone(),
            ..Default::default()
        })?;
        Self::from_config(config)
    }

    /// Create a verifier from an already resolved configuration
    pub fn from_config(config: VerifierConfig) -> Result<Self> {
        let repo_root = crate::repository::find_local_repo(
            config.local_repo_override().cloned(),
            config.settings_file().map(PathBuf::as_path),
            config.home_dir().map(PathBuf::as_path),
        )?;

        let mut verifier = Self {
            basedir: config.basedir().clone(),
            local_repo: LocalRepository::new(repo_root, Layout::Default),
            launcher: Box::new(ForkedLauncher),
            explicit_executable: config.executable().cloned(),
            tool_home: config.tool_home().cloned(),
            use_wrapper: true,
            log_file_name: config.log_file_name().to_string(),
            autoclean: config.autoclean(),
            forward_local_repo: true,
            default_cli_args: vec!["--errors".to_string(), "--batch-mode".to_string()],
            cli_args: Vec::new(),
            system_properties: Vec::new(),
            settings_file: config.settings_file().cloned(),
            environment: BTreeMap::new(),
            env_removals: Vec::new(),
        };
        for (key, value) in config.system_properties() {
            verifier.set_system_property(key, value);
        }
        for (key, value) in config.environment() {
            verifier.set_environment_variable(key, value);
        }
        if config.quiet() {
            verifier.add_cli_argument("--quiet");
        }
        Ok(verifier)
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    pub fn local_repository(&self) -> &LocalRepository {
        &self.local_repo
    }

    /// Replace the launcher, the seam used to stub out process forking
    pub fn set_launcher(&mut self, launcher: Box<dyn Launcher>) {
        self.launcher = launcher;
    }

    /// Name of the log file, relative to the basedir
    pub fn set_log_file_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::verification("log file name must not be blank"));
        }
        self.log_file_name = name;
        Ok(())
    }

    pub fn log_file(&self) -> PathBuf {
        self.resolve_path(&self.log_file_name)
    }

    /// Enable or disable the automatic clean goal (enabled by default)
    pub fn set_autoclean(&mut self, autoclean: bool) {
        self.autoclean = autoclean;
    }

    /// Use an explicit executable instead of discovery
    pub fn set_executable(&mut self, executable: impl Into<PathBuf>) {
        self.explicit_executable = Some(executable.into());
    }

    /// Enable or disable looking for a wrapper script in the basedir
    pub fn set_use_wrapper(&mut self, use_wrapper: bool) {
        self.use_wrapper = use_wrapper;
    }

    /// Whether `-Dmaven.repo.local=...` is passed so the forked build stays
    /// inside the sandbox repository (enabled by default)
    pub fn set_forward_local_repo(&mut self, forward: bool) {
        self.forward_local_repo = forward;
    }

    /// Replace the default arguments (`--errors --batch-mode`)
    pub fn set_default_cli_arguments(&mut self, args: Vec<String>) {
        self.default_cli_args = args;
    }

    /// Add a CLI argument; `${basedir}` is interpolated at execute time
    pub fn add_cli_argument(&mut self, arg: impl Into<String>) {
        self.cli_args.push(arg.into());
    }

    pub fn add_cli_arguments<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self.add_cli_argument(arg);
        }
    }

    /// Set a `-Dkey=value` system property, overwriting a previous value
    pub fn set_system_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.system_properties.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.system_properties.push((key, value)),
        }
    }

    pub fn set_environment_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.environment.insert(key.into(), value.into());
    }

    /// Remove a variable from the forked build's environment
    pub fn remove_environment_variable(&mut self, key: impl Into<String>) {
        let key = key.into();
        self.environment.remove(&key);
        if !self.env_removals.contains(&key) {
            self.env_removals.push(key);
        }
    }

    /// Clear the environment variables that CI detectors trigger on, so the
    /// forked build behaves like a local one.
    pub fn remove_ci_environment(&mut self) {
        for key in CI_ENVIRONMENT {
            self.remove_environment_variable(*key);
        }
    }

    /// Fork the build and wait for it.
    ///
    /// Arguments are assembled as defaults, then the clean goal when
    /// autoclean is on, then user arguments, then system properties and the
    /// settings/repository switches. A previous log is truncated. Non-zero
    /// exit maps to [`Error::BuildFailure`] carrying the command line and
    /// the captured log.
    pub fn execute(&self) -> Result<()> {
        let request = self.assemble_request()?;
        let exit_code = self.launcher.run(&request)?;
        if exit_code != 0 {
            return Err(Error::BuildFailure {
                exit_code,
                command: request.command_line(),
                log_excerpt: fs::read_to_string(&request.log_file)
                    .unwrap_or_else(|_| "(log file not found)".to_string()),
            });
        }
        Ok(())
    }

    /// Probe the tool version by forking `--version` with a throwaway log
    pub fn tool_version(&self) -> Result<String> {
        let log = tempfile::NamedTempFile::new()?;
        let request = LaunchRequest {
            executable: self.executable(),
            args: vec!["--version".to_string()],
            working_dir: self.basedir.clone(),
            env: self.environment.clone(),
            env_removals: self.env_removals.clone(),
            log_file: log.path().to_path_buf(),
            log_header: None,
        };
        let exit_code = self.launcher.run(&request)?;
        let output = fs::read_to_string(log.path())?;
        if exit_code != 0 {
            return Err(Error::BuildFailure {
                exit_code,
                command: request.command_line(),
                log_excerpt: output,
            });
        }
        output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::verification("version probe produced no output"))
    }

    fn executable(&self) -> PathBuf {
        match &self.explicit_executable {
            Some(path) => path.clone(),
            None => resolve_executable(
                DEFAULT_COMMAND,
                self.tool_home.as_deref(),
                &self.basedir,
                self.use_wrapper,
            ),
        }
    }

    fn assemble_request(&self) -> Result<LaunchRequest> {
        let mut args = self.default_cli_args.clone();
        if self.autoclean {
            args.push(CLEAN_GOAL.to_string());
        }
        for arg in &self.cli_args {
            args.push(self.interpolate(arg));
        }
        for (key, value) in &self.system_properties {
            args.push(format!("-D{key}={value}"));
        }
        if let Some(settings) = &self.settings_file {
            args.push("--settings".to_string());
            args.push(settings.display().to_string());
        }
        if self.forward_local_repo {
            args.push(format!(
                "-Dmaven.repo.local={}",
                self.local_repo.root().display()
            ));
        }

        let quiet = args.iter().any(|a| a == "-q" || a == "--quiet");

        let mut request = LaunchRequest {
            executable: self.executable(),
            args,
            working_dir: self.basedir.clone(),
            env: self.environment.clone(),
            env_removals: self.env_removals.clone(),
            log_file: self.log_file(),
            log_header: None,
        };
        if !quiet {
            request.log_header = Some(format!("Command line: {}", request.command_line()));
        }
        Ok(request)
    }

    /// Replace `${basedir}` with the fixture directory
    fn interpolate(&self, text: &str) -> String {
        text.replace("${basedir}", &self.basedir.display().to_string())
    }

    /// Resolve a path against the basedir unless it is absolute
    fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.basedir.join(path)
        }
    }

    // ----- log assertions -------------------------------------------------

    /// Raw log contents
    pub fn load_log_content(&self) -> Result<String> {
        Ok(fs::read_to_string(self.log_file())?)
    }

    /// Non-empty log lines, untrimmed
    pub fn load_log_lines(&self) -> Result<Vec<String>> {
        Ok(self
            .load_log_content()?
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Fail if any log line contains `[ERROR]` after ANSI stripping
    pub fn verify_error_free_log(&self) -> Result<()> {
        let content = self.load_log_content()?;
        let stripped = strip_ansi(&content);
        for line in stripped.lines() {
            if memmem::find(line.as_bytes(), b"[ERROR]").is_some() {
                return Err(Error::verification(format!(
                    "Error in execution: {}",
                    line.trim()
                )));
            }
        }
        Ok(())
    }

    /// Assert that the log contains the given text (after ANSI stripping)
    pub fn verify_text_in_log(&self, text: &str) -> Result<()> {
        if self.text_occurrences_in_log(text)? == 0 {
            return Err(Error::verification(format!(
                "Text not found in log: {text}"
            )));
        }
        Ok(())
    }

    /// Assert that the log does not contain the given text
    pub fn verify_text_not_in_log(&self, text: &str) -> Result<()> {
        if self.text_occurrences_in_log(text)? > 0 {
            return Err(Error::verification(format!(
                "Text found in log which should not be there: {text}"
            )));
        }
        Ok(())
    }

    /// Count the log lines containing the text, after ANSI stripping.
    ///
    /// The commented `# Command line:` header is not build output and never
    /// counts, so assertions cannot be satisfied by the echoed command line.
    /// A line holding the text more than once still counts as one.
    pub fn text_occurrences_in_log(&self, text: &str) -> Result<usize> {
        Ok(self
            .load_log_content()?
            .lines()
            .map(strip_ansi)
            .filter(|line| !line.starts_with('#'))
            .filter(|line| memmem::find(line.as_bytes(), text.as_bytes()).is_some())
            .count())
    }

    // ----- file loading ---------------------------------------------------

    /// Non-empty, trimmed lines of a file under the basedir
    pub fn load_lines(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let content = fs::read_to_string(self.resolve_path(path))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Load a check-list file: comment (`#`) and blank lines are dropped,
    /// `${artifact:gid:aid:version:ext}` markers are expanded to repository
    /// paths, and expanded artifacts bring their `maven-metadata*.xml`
    /// siblings along.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        for line in self.load_lines(path)? {
            if line.starts_with('#') {
                continue;
            }
            self.expand_line(&line, &mut lines)?;
        }
        Ok(lines)
    }

    fn expand_line(&self, line: &str, out: &mut Vec<String>) -> Result<()> {
        let (negated, body) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line),
        };

        let Some(start) = body.find("${artifact:") else {
            out.push(line.to_string());
            return Ok(());
        };
        let Some(end) = body[start..].find('}') else {
            return Err(Error::verification(format!(
                "unterminated artifact marker in line: {line}"
            )));
        };

        let marker = &body[start + "${artifact:".len()..start + end];
        let parts: Vec<&str> = marker.split(':').collect();
        let [group_id, artifact_id, version, ext] = parts[..] else {
            return Err(Error::verification(format!(
                "artifact marker must be gid:aid:version:ext, got: {marker}"
            )));
        };

        let prefix = if negated { "!" } else { "" };
        for file in self
            .local_repo
            .artifact_file_names(group_id, artifact_id, version, ext)
        {
            out.push(format!(
                "{prefix}{}{}{}",
                &body[..start],
                file.display(),
                &body[start + end + 1..]
            ));
        }
        Ok(())
    }

    /// Parse a `.properties` file under the basedir
    pub fn load_properties(&self, path: impl AsRef<Path>) -> Result<Properties> {
        let path = self.resolve_path(path);
        let content = fs::read_to_string(&path).map_err(|e| {
            Error::verification(format!(
                "cannot read properties file {}: {e}",
                path.display()
            ))
        })?;
        Ok(Properties::parse(&content))
    }

    // ----- file assertions ------------------------------------------------

    /// Assert that a file or directory exists.
    ///
    /// Relative paths resolve against the basedir. A `*` in the file name
    /// component matches any directory entry.
    pub fn verify_file_present(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !self.check_file_presence(path)? {
            return Err(Error::verification(format!(
                "Expected file missing: {}",
                self.resolve_path(path).display()
            )));
        }
        Ok(())
    }

    /// Assert that a file or directory does not exist
    pub fn verify_file_not_present(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.check_file_presence(path)? {
            return Err(Error::verification(format!(
                "Unexpected file present: {}",
                self.resolve_path(path).display()
            )));
        }
        Ok(())
    }

    fn check_file_presence(&self, path: &Path) -> Result<bool> {
        if path.to_string_lossy().contains("!/") {
            return Err(Error::verification(format!(
                "archive entry paths are not supported: {}",
                path.display()
            )));
        }
        let resolved = self.resolve_path(path);
        let Some(name) = resolved.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Ok(resolved.exists());
        };
        if !name.contains('*') {
            return Ok(resolved.exists());
        }

        let Some(parent) = resolved.parent() else {
            return Ok(false);
        };
        if !parent.is_dir() {
            return Ok(false);
        }
        let pattern = glob_to_regex(&name)?;
        for entry in fs::read_dir(parent)? {
            let entry = entry?;
            if pattern.is_match(&entry.file_name().to_string_lossy()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Assert that a file's contents match a regex (full content, multiline).
    ///
    /// A missing file is an assertion failure naming the file, not an IO
    /// error.
    pub fn verify_file_content_matches(&self, path: impl AsRef<Path>, pattern: &str) -> Result<()> {
        self.verify_file_present(path.as_ref())?;
        let resolved = self.resolve_path(path.as_ref());
        let content = fs::read_to_string(&resolved)?;
        let regex = Regex::new(pattern)
            .map_err(|e| Error::verification(format!("invalid content pattern: {e}")))?;
        if !regex.is_match(&content) {
            return Err(Error::verification(format!(
                "Content of {} does not match {pattern}",
                resolved.display()
            )));
        }
        Ok(())
    }

    // ----- artifact assertions --------------------------------------------

    /// Repository path of an artifact
    pub fn artifact_path(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        ext: &str,
    ) -> PathBuf {
        self.local_repo
            .artifact_path(group_id, artifact_id, version, ext, None)
    }

    pub fn verify_artifact_present(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        ext: &str,
    ) -> Result<()> {
        let path = self.artifact_path(group_id, artifact_id, version, ext);
        if !path.is_file() {
            return Err(Error::verification(format!(
                "Expected artifact missing: {}",
                path.display()
            )));
        }
        Ok(())
    }

    pub fn verify_artifact_not_present(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        ext: &str,
    ) -> Result<()> {
        let path = self.artifact_path(group_id, artifact_id, version, ext);
        if path.exists() {
            return Err(Error::verification(format!(
                "Unexpected artifact present: {}",
                path.display()
            )));
        }
        Ok(())
    }

    /// Assert the exact contents of an installed artifact
    pub fn verify_artifact_content(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        ext: &str,
        expected: &str,
    ) -> Result<()> {
        let path = self.artifact_path(group_id, artifact_id, version, ext);
        let actual = fs::read_to_string(&path)?;
        if actual != expected {
            return Err(Error::verification(format!(
                "Content of {} does not match expected content",
                path.display()
            )));
        }
        Ok(())
    }

    /// Delete everything under a group id in the local repository
    pub fn delete_artifacts(&self, group_id: &str) -> Result<()> {
        self.local_repo.delete_group(group_id)
    }

    /// Delete one version directory of an artifact in the local repository
    pub fn delete_artifacts_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Result<()> {
        self.local_repo.delete_version(group_id, artifact_id, version)
    }

    /// Delete one artifact file and its sibling metadata
    pub fn delete_artifact(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        ext: &str,
    ) -> Result<()> {
        self.local_repo
            .delete_artifact(group_id, artifact_id, version, ext)
    }

    // ----- fixture mutation -----------------------------------------------

    /// Remove a directory under the basedir, if present
    pub fn delete_directory(&self, path: impl AsRef<Path>) -> Result<()> {
        let dir = self.resolve_path(path);
        if dir.is_dir() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    /// Write a file under the basedir, creating parent directories
    pub fn write_file(&self, path: impl AsRef<Path>, content: &str) -> Result<()> {
        let file = self.resolve_path(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(file, content)?;
        Ok(())
    }

    /// Token map used by [`Verifier::filter_file`]: `@basedir@` and
    /// `@baseurl@` point at the fixture directory.
    pub fn new_default_filter_map(&self) -> Vec<(String, String)> {
        let basedir = self.basedir.display().to_string();
        let baseurl = format!("file://{}", basedir.replace('\\', "/"));
        vec![
            ("@basedir@".to_string(), basedir),
            ("@baseurl@".to_string(), baseurl),
        ]
    }

    /// Copy a file while replacing tokens, creating parent directories of
    /// the destination. Source and destination resolve against the basedir.
    pub fn filter_file(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        tokens: &[(String, String)],
    ) -> Result<PathBuf> {
        let source = self.resolve_path(source);
        let destination = self.resolve_path(destination);

        let mut content = fs::read_to_string(&source)?;
        for (token, value) in tokens {
            content = content.replace(token.as_str(), value);
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&destination, content)?;
        Ok(destination)
    }

    // ----- declarative verification ---------------------------------------

    /// Run the declarative checks of the fixture.
    ///
    /// When `choke_on_error_output` is set the log must be error-free. If an
    /// `expected-results.txt` exists in the basedir, each of its lines names
    /// a file that must exist; lines starting with `!` name files that must
    /// not.
    pub fn verify(&self, choke_on_error_output: bool) -> Result<()> {
        if self.resolve_path(EXPECTED_RESULTS_FILE).is_file() {
            self.verify_expected_results()?;
        }
        if choke_on_error_output {
            self.verify_error_free_log()?;
        }
        Ok(())
    }

    fn verify_expected_results(&self) -> Result<()> {
        for line in self.load_file(EXPECTED_RESULTS_FILE)? {
            match line.strip_prefix('!') {
                Some(path) => self.verify_file_not_present(path),
                None => self.verify_file_present(&line),
            }
            .with_context(|| format!("{EXPECTED_RESULTS_FILE} check failed"))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("basedir", &self.basedir)
            .field("local_repo", &self.local_repo)
            .field("log_file_name", &self.log_file_name)
            .field("autoclean", &self.autoclean)
            .finish_non_exhaustive()
    }
}

/// Remove ANSI CSI escape sequences (colors, cursor movement)
pub fn strip_ansi(text: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        // CSI sequences only; build tools emit nothing fancier.
        Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").unwrap_or_else(|_| unreachable!())
    });
    pattern.replace_all(text, "").into_owned()
}

/// Translate a `*` file-name glob into an anchored regex
fn glob_to_regex(glob: &str) -> Result<Regex> {
    let mut pattern = String::from("^");
    for c in glob.chars() {
        if c == '*' {
            pattern.push_str(".*");
        } else {
            pattern.push_str(&regex::escape(&c.to_string()));
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
        .map_err(|e| Error::verification(format!("invalid file pattern '{glob}': {e}")))
}
