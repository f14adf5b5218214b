// system-tests/src/config/mod.rs
// ============================================================================
// Module: Suite Configuration
// Description: Centralized configuration for the integration scenarios.
// Purpose: Provide typed access to backend, project, and timing settings.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Suite configuration is read from an optional TOML file and from
//! environment variables, the latter taking precedence, and mapped into a
//! small typed structure shared by every scenario.
//! Security posture: environment and file inputs are untrusted; invalid
//! values fail closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod env_tests;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::ConfigError;
pub use env::DEFAULT_PROJECT_NAME;
pub use env::SuiteConfig;
pub use env::SuiteEnv;
pub use env::read_env_strict;
