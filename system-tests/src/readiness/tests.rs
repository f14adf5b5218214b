// system-tests/src/readiness/tests.rs
// ============================================================================
// Module: Readiness Tests
// Description: Readiness polling against the platform stub.
// Purpose: Pin the attempt budget and the returned first response.
// Dependencies: digitalhub-stub
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::time::Duration;

use digitalhub_client::ClientConfig;
use digitalhub_client::Entity;
use digitalhub_client::EntityRequest;
use digitalhub_client::InvokeRequest;
use digitalhub_client::PlatformClient;
use digitalhub_client::RunOptions;
use digitalhub_stub::PlatformStub;
use digitalhub_stub::StubOptions;
use digitalhub_stub::spawn_platform_stub;

use super::ReadinessError;
use super::ReadinessPolicy;
use super::await_service;

/// Starts a stub whose services answer 503 `warmup` times and opens a serve run.
fn serving(warmup: u32) -> (PlatformStub, PlatformClient, Entity) {
    let stub = spawn_platform_stub(StubOptions::default().with_run_polls(0).with_service_warmup(warmup)).unwrap();
    let client = PlatformClient::new(ClientConfig::new(stub.base_url())).unwrap();
    client.get_or_create_project("ready").unwrap();
    let function = client.create("ready", EntityRequest::function("echo", "container")).unwrap();
    let run = client.run(&function, "serve", RunOptions::default()).unwrap();
    (stub, client, run)
}

fn fast(max_attempts: u32) -> ReadinessPolicy {
    ReadinessPolicy {
        interval: Duration::from_millis(5),
        timeout: Duration::from_secs(5),
        max_attempts,
    }
}

#[test]
fn returns_first_response_after_warmup() {
    let (_stub, client, run) = serving(2);
    let ready = await_service(&client, &run, &InvokeRequest::default().with_path("?page=1"), &fast(10)).unwrap();
    assert_eq!(ready.response.status, 200);
    assert_eq!(ready.response.json().unwrap()["query"], "page=1");
    assert_eq!(ready.run.id(), run.id());
}

#[test]
fn gives_up_after_bounded_attempts() {
    let (_stub, client, run) = serving(100);
    let err = await_service(&client, &run, &InvokeRequest::default(), &fast(3)).unwrap_err();
    match err {
        ReadinessError::NotReady {
            attempts,
            last,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last, "status 503");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn deleted_runs_surface_client_errors() {
    let (_stub, client, run) = serving(0);
    client.delete_entity(&run, digitalhub_client::DeleteOptions::default()).unwrap();
    let err = await_service(&client, &run, &InvokeRequest::default(), &fast(3)).unwrap_err();
    assert!(matches!(err, ReadinessError::Client(ref inner) if inner.is_not_found()));
}

#[test]
fn policy_budget_covers_timeout() {
    let policy = ReadinessPolicy::within(Duration::from_secs(10), Duration::from_secs(2));
    assert_eq!(policy.max_attempts, 6);
}

#[test]
fn zero_attempt_budget_still_checks_once() {
    let (_stub, client, run) = serving(100);
    let err = await_service(&client, &run, &InvokeRequest::default(), &fast(0)).unwrap_err();
    assert!(matches!(err, ReadinessError::NotReady { attempts: 1, .. }), "unexpected error: {err}");
}

#[test]
fn readiness_bounds_carry_over_to_the_client_poll() {
    let policy = fast(7);
    let poll = policy.poll();
    assert_eq!(poll.interval, policy.interval);
    assert_eq!(poll.timeout, policy.timeout);
    assert_eq!(poll.max_attempts, 7);
}
