// crates/digitalhub-client/src/config.rs
// ============================================================================
// Module: Client Configuration
// Description: Connection settings for the DigitalHub backend.
// Purpose: Hold endpoint, credentials, and timeouts for the REST client.
// Dependencies: std
// ============================================================================

use std::time::Duration;

/// Default backend endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client connection settings.
///
/// # Invariants
/// - `endpoint` is an absolute `http`/`https` URL; validated by the client.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL.
    pub endpoint: String,
    /// Optional bearer token sent on API and service calls.
    pub access_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Builds a configuration for the given endpoint with default timeout.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_token: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}
