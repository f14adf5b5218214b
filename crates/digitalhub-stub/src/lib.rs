// crates/digitalhub-stub/src/lib.rs
// ============================================================================
// Module: DigitalHub Stub Library
// Description: In-memory emulation of the DigitalHub platform REST API.
// Purpose: Run client and scenario tests without a live backend.
// Dependencies: axum, tokio, serde_json
// ============================================================================

//! ## Overview
//! [`spawn_platform_stub`] starts an HTTP server on a loopback port that
//! speaks the platform entity API: projects, versioned context entities,
//! tasks and runs, secret values, file uploads, search, and the services of
//! serve runs. State lives in memory and disappears with the handle.
//!
//! The stub is test infrastructure. It validates shapes only as far as the
//! client needs and never shares types with the client crate.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod execution;
mod server;
mod service;
mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use server::PlatformStub;
pub use server::spawn_platform_stub;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Stub behavior knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubOptions {
    /// Bearer token every request must present.
    pub access_token: Option<String>,
    /// Reads of a job/build/pipeline run before it settles.
    pub run_polls: u32,
    /// Calls a service answers with 503 before serving.
    pub service_warmup: u32,
}

impl StubOptions {
    /// Requires `token` on every request.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets how many reads a run stays `RUNNING`.
    #[must_use]
    pub const fn with_run_polls(mut self, polls: u32) -> Self {
        self.run_polls = polls;
        self
    }

    /// Sets how many service calls answer 503.
    #[must_use]
    pub const fn with_service_warmup(mut self, calls: u32) -> Self {
        self.service_warmup = calls;
        self
    }
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            access_token: None,
            run_polls: 1,
            service_warmup: 1,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Stub startup errors.
#[derive(Debug, thiserror::Error)]
pub enum StubError {
    /// The loopback listener could not be opened.
    #[error("stub bind failed: {0}")]
    Bind(String),
    /// The server thread could not be started.
    #[error("stub thread spawn failed: {0}")]
    Spawn(String),
}

#[cfg(test)]
mod tests;
