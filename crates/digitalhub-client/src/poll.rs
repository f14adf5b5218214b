// crates/digitalhub-client/src/poll.rs
// ============================================================================
// Module: Bounded Polling
// Description: Attempt-, interval-, and deadline-bounded polling loop.
// Purpose: Wait for asynchronous remote state without arbitrary sleeps.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`poll_until`] calls a probe until it reports readiness, the attempt budget
//! is spent, or the deadline passes, whichever comes first. The probe returns
//! [`Probe::Pending`] with a short description of what it observed so timeout
//! errors can say why the wait failed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread::sleep;
use std::time::Duration;
use std::time::Instant;

use crate::error::ClientError;
use crate::error::ClientResult;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Bounds applied to a polling loop.
///
/// # Invariants
/// - `max_attempts` of zero is treated as one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between attempts.
    pub interval: Duration,
    /// Overall deadline measured from the first attempt.
    pub timeout: Duration,
    /// Maximum number of probe calls.
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Builds a policy whose attempt budget covers `timeout` at `interval`.
    #[must_use]
    pub fn within(timeout: Duration, interval: Duration) -> Self {
        let interval_ms = interval.as_millis().max(1);
        let attempts = timeout.as_millis() / interval_ms + 1;
        Self {
            interval,
            timeout,
            max_attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::within(Duration::from_secs(300), Duration::from_secs(2))
    }
}

// ============================================================================
// SECTION: Polling
// ============================================================================

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// The awaited condition holds.
    Ready(T),
    /// Not yet; carries the last observation.
    Pending(String),
}

/// Polls `probe` under `policy`.
///
/// Probe errors abort the loop immediately.
///
/// # Errors
///
/// Returns the probe error, or [`ClientError::Timeout`] naming `what`, the
/// attempts made, and the last observation.
pub fn poll_until<T, F>(what: &str, policy: &PollPolicy, mut probe: F) -> ClientResult<T>
where
    F: FnMut() -> ClientResult<Probe<T>>,
{
    let start = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        let observed = match probe()? {
            Probe::Ready(value) => return Ok(value),
            Probe::Pending(observed) => observed,
        };
        if attempts >= max_attempts || start.elapsed() >= policy.timeout {
            return Err(ClientError::Timeout(format!(
                "{what} not ready after {attempts} attempts: {observed}"
            )));
        }
        tracing::debug!(what, attempts, observed = %observed, "waiting");
        sleep(policy.interval);
    }
}

#[cfg(test)]
mod tests;
