//! Configuration module for build-verifier
//!
//! This module provides a unified configuration system that combines CLI
//! arguments with environment values using strict error handling and clear
//! priority logic.
//!
//! # Architecture
//!
//! The configuration system is built with a layered architecture:
//!
//! - [`env_reader`] - Low-level environment abstraction for testability
//! - [`app_config`] - High-level harness configuration with CLI integration
//!
//! # Error Handling
//!
//! The configuration system uses strict error handling:
//!
//! - Malformed CLI values result in [`ConfigError`], not fallback to defaults
//! - An unusable settings file results in [`ConfigError`], not fallback
//! - Only when a value is entirely absent are defaults used
//!
//! # Priority Logic
//!
//! Configuration values are resolved with the following priority:
//!
//! 1. CLI parameters (highest priority)
//! 2. Environment variables (`MAVEN_HOME`, `MAVEN_REPO_LOCAL`)
//! 3. Settings-file values (scraped `<localRepository>`)
//! 4. Hardcoded defaults
//!
//! # Testing
//!
//! `MockEnvReader` is available in test builds so resolution can be tested
//! without mutating the real process environment.

pub mod app_config;
pub mod env_reader;

pub use app_config::{CliArgs, ConfigError, VerifierConfig};
pub use app_config::{FORK_MODE_VAR, LOCAL_REPO_VAR, TOOL_HOME_VAR};
pub use env_reader::{EnvReader, SystemEnvReader};

#[cfg(test)]
pub use env_reader::MockEnvReader;

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// **What is tested:** Availability and accessibility of all public API types through the module
    /// **Why it is tested:** Ensures that the module correctly re-exports all necessary types for external use
    /// **Test conditions:** Creates instances of the public types (CliArgs, ConfigError, SystemEnvReader, etc.)
    /// **Expectations:** All public types should be accessible and instantiable through the module interface
    #[test]
    fn test_public_api_availability() {
        let _cli_args = CliArgs::default();

        let _error = ConfigError::IoError {
            source: "test".to_owned(),
        };

        let _reader = SystemEnvReader;

        let _result = VerifierConfig::resolve_with_reader(CliArgs::default(), &SystemEnvReader);
    }

    /// **What is tested:** Required trait implementations for ConfigError type
    /// **Why it is tested:** Validates that ConfigError implements all necessary traits for proper error handling and usage
    /// **Test conditions:** Creates ConfigError instances and tests Debug, Display, Error, Clone, and PartialEq traits
    /// **Expectations:** ConfigError should implement all required traits without compilation errors
    #[test]
    fn test_error_types_implement_required_traits() {
        let error = ConfigError::IoError {
            source: "test".to_owned(),
        };

        let _debug = format!("{error:?}");
        let _display = format!("{error}");
        let _error_trait: &dyn std::error::Error = &error;
        let _cloned = error.clone();

        let error2 = ConfigError::IoError {
            source: "test".to_owned(),
        };
        assert_eq!(error, error2);
    }

    /// **What is tested:** Integration between the env reader and configuration resolution
    /// **Why it is tested:** Validates that the layers work together in a complete workflow
    /// **Test conditions:** Mock reader carrying every harness variable, resolved through VerifierConfig
    /// **Expectations:** All environment values flow through to the resolved configuration
    #[test]
    fn test_integration_with_all_components() {
        let reader = MockEnvReader::new()
            .with_var(TOOL_HOME_VAR, "/opt/tool")
            .with_var(LOCAL_REPO_VAR, "/tmp/sandbox-repo")
            .with_var(FORK_MODE_VAR, "forked");

        let config = VerifierConfig::resolve_with_reader(CliArgs::default(), &reader).unwrap();

        assert_eq!(
            config.tool_home().map(|p| p.display().to_string()),
            Some("/opt/tool".to_string())
        );
        assert_eq!(
            config.local_repo_override().map(|p| p.display().to_string()),
            Some("/tmp/sandbox-repo".to_string())
        );
    }
}
