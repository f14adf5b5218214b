// system-tests/src/lib.rs
// ============================================================================
// Module: DigitalHub Integration Tests Library
// Description: Shared runner, registry, cases, and scenario drivers.
// Purpose: Back the per-scenario binaries and the aggregate CLI.
// Dependencies: digitalhub-client, tracing, thiserror
// ============================================================================

//! ## Overview
//! The crate drives a live DigitalHub backend through `digitalhub-client`:
//! - `s0-crud` runs the [`registry`] of CRUD cases with the sequential
//!   [`runner`], tallying outcomes per test and per case.
//! - `s1`..`s6` are [`scenarios`] that provision functions and workflows,
//!   wait for serve runs with [`readiness`] polling, and invoke the service.
//!
//! Every binary shares one [`SuiteContext`] built from [`SuiteConfig`].
//! Security posture: backend responses and environment values are untrusted
//! and fail closed with typed errors.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod app;
pub mod config;
pub mod context;
pub mod crud;
pub mod failure;
pub mod logging;
pub mod readiness;
pub mod registry;
pub mod runner;
pub mod scenarios;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::SuiteConfig;
pub use context::SuiteContext;
pub use failure::TestFailure;
pub use failure::TestResult;
pub use readiness::ReadinessError;
pub use readiness::ReadinessPolicy;
pub use registry::Registration;
pub use runner::RunReport;
pub use scenarios::Scenario;
pub use scenarios::ScenarioError;
