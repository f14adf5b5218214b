// crates/digitalhub-client/src/poll/tests.rs
// ============================================================================
// Module: Bounded Polling Tests
// Description: Unit tests for attempt and deadline limits.
// Purpose: Ensure polling stops at its bounds and reports what it saw.
// Dependencies: digitalhub-client
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::time::Duration;

use super::PollPolicy;
use super::Probe;
use super::poll_until;
use crate::error::ClientError;

/// Policy that never sleeps long and allows `attempts` probes.
const fn quick(attempts: u32) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(1),
        timeout: Duration::from_secs(30),
        max_attempts: attempts,
    }
}

#[test]
fn returns_first_ready_value() {
    let mut calls = 0;
    let value = poll_until("service", &quick(5), || {
        calls += 1;
        if calls == 3 { Ok(Probe::Ready(calls)) } else { Ok(Probe::Pending(format!("call {calls}"))) }
    })
    .unwrap();
    assert_eq!(value, 3);
}

#[test]
fn gives_up_after_bounded_attempts() {
    let mut calls = 0u32;
    let err = poll_until::<(), _>("service", &quick(4), || {
        calls += 1;
        Ok(Probe::Pending("connection refused".to_string()))
    })
    .unwrap_err();
    assert_eq!(calls, 4);
    match err {
        ClientError::Timeout(message) => {
            assert!(message.contains("4 attempts"), "{message}");
            assert!(message.contains("connection refused"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn zero_attempts_still_probes_once() {
    let mut calls = 0u32;
    let result = poll_until::<(), _>("service", &quick(0), || {
        calls += 1;
        Ok(Probe::Pending(String::new()))
    });
    assert!(result.is_err());
    assert_eq!(calls, 1);
}

#[test]
fn probe_errors_abort_immediately() {
    let mut calls = 0u32;
    let err = poll_until::<(), _>("run", &quick(10), || {
        calls += 1;
        Err(ClientError::NotFound("run".to_string()))
    })
    .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(calls, 1);
}

#[test]
fn within_covers_the_timeout() {
    let policy = PollPolicy::within(Duration::from_secs(10), Duration::from_secs(2));
    assert_eq!(policy.max_attempts, 6);
}
