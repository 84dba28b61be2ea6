//! Environment abstraction module
//!
//! This module provides a minimal abstraction over process environment
//! lookups, allowing the configuration layer to be tested without mutating
//! the real environment.

/// Trait for reading environment variables
pub trait EnvReader {
    /// Read a variable, `None` when unset or not valid unicode
    fn var(&self, key: &str) -> Option<String>;
}

/// Environment reader backed by the real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvReader;

impl EnvReader for SystemEnvReader {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock environment reader for testing
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MockEnvReader {
    vars: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl MockEnvReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable (builder style)
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
impl EnvReader for MockEnvReader {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}
