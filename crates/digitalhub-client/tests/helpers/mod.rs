// crates/digitalhub-client/tests/helpers/mod.rs
// ============================================================================
// Module: Client Test Helpers
// Description: Stub startup and project fixtures for client tests.
// Purpose: Give each test an isolated platform and a connected client.
// Dependencies: digitalhub-client, digitalhub-stub
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

use std::time::Duration;

use digitalhub_client::ClientConfig;
use digitalhub_client::PlatformClient;
use digitalhub_client::PollPolicy;
use digitalhub_stub::PlatformStub;
use digitalhub_stub::StubOptions;
use digitalhub_stub::spawn_platform_stub;

/// Running stub plus a client pointed at it.
pub struct Harness {
    /// Stub handle; dropping it stops the server.
    pub stub: PlatformStub,
    /// Connected client.
    pub client: PlatformClient,
}

/// Starts a stub with `options` and connects a client, forwarding the token.
pub fn harness_with(options: StubOptions) -> Harness {
    let token = options.access_token.clone();
    let stub = spawn_platform_stub(options).expect("stub starts");
    let mut config = ClientConfig::new(stub.base_url()).with_timeout(Duration::from_secs(10));
    if let Some(token) = token {
        config = config.with_access_token(token);
    }
    let client = PlatformClient::new(config).expect("client builds");
    Harness {
        stub,
        client,
    }
}

/// Starts a default stub whose runs settle on first read.
pub fn harness() -> Harness {
    harness_with(StubOptions::default().with_run_polls(0).with_service_warmup(0))
}

/// Starts a stub and creates `project`.
pub fn harness_with_project(project: &str) -> Harness {
    let harness = harness();
    harness.client.get_or_create_project(project).expect("project created");
    harness
}

/// Short polling budget for stub waits.
pub fn quick_poll() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
        max_attempts: 50,
    }
}
