//! Unified test framework for build-verifier
//!
//! This module provides a consistent way to set up fixture projects,
//! sandboxed local repositories and fake build tools for integration tests.

pub mod framework;

// Re-export the main framework API
#[allow(unused_imports)]
pub use framework::*;
