// system-tests/src/readiness.rs
// ============================================================================
// Module: Service Readiness
// Description: Bounded polling until a serve run answers its first request.
// Purpose: Replace fixed start-up sleeps with an observable predicate.
// Dependencies: digitalhub-client, thiserror, tracing
// ============================================================================

//! ## Overview
//! A service is ready once its run exposes `status.service.url` and a call
//! answers with anything other than a gateway or "starting" status
//! (502/503/504). Transport errors count as "not yet". The first ready
//! response is handed back so the caller does not send the request twice.
//! Invariants:
//! - At most `max_attempts` probes are made and waiting never exceeds
//!   `timeout` plus one interval.
//! - A run that reports `ERROR` aborts the wait immediately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use digitalhub_client::ClientError;
use digitalhub_client::ClientResult;
use digitalhub_client::Entity;
use digitalhub_client::EntityType;
use digitalhub_client::InvokeRequest;
use digitalhub_client::InvokeResponse;
use digitalhub_client::PlatformClient;
use digitalhub_client::PollPolicy;
use digitalhub_client::Probe;
use digitalhub_client::poll_until;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Statuses a starting service answers with.
const STARTING_STATUSES: [u16; 3] = [502, 503, 504];

/// Bounds applied while waiting for a service.
///
/// # Invariants
/// - `max_attempts` of zero is treated as one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Delay between probes.
    pub interval: Duration,
    /// Overall deadline measured from the first probe.
    pub timeout: Duration,
    /// Maximum number of probes.
    pub max_attempts: u32,
}

impl ReadinessPolicy {
    /// Builds a policy whose attempt budget covers `timeout` at `interval`.
    #[must_use]
    pub fn within(timeout: Duration, interval: Duration) -> Self {
        let poll = PollPolicy::within(timeout, interval);
        Self {
            interval: poll.interval,
            timeout: poll.timeout,
            max_attempts: poll.max_attempts,
        }
    }

    /// Returns the same bounds as a client [`PollPolicy`].
    #[must_use]
    pub const fn poll(&self) -> PollPolicy {
        PollPolicy {
            interval: self.interval,
            timeout: self.timeout,
            max_attempts: self.max_attempts,
        }
    }
}

/// Readiness failures.
#[derive(Debug, Error)]
pub enum ReadinessError {
    /// The budget ran out before the service answered.
    #[error("service of run {run} not ready after {attempts} attempts: {last}")]
    NotReady {
        /// Serve run id.
        run: String,
        /// Probes made.
        attempts: u32,
        /// Last observation.
        last: String,
    },
    /// A platform call failed outright.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// A serve run that answered.
#[derive(Debug, Clone)]
pub struct ReadyService {
    /// Run as last read from the backend.
    pub run: Entity,
    /// First non-starting response.
    pub response: InvokeResponse,
}

// ============================================================================
// SECTION: Polling
// ============================================================================

/// Probes `run` with `request` until the service answers.
///
/// # Errors
///
/// Returns [`ReadinessError::NotReady`] when the policy is exhausted, or
/// [`ReadinessError::Client`] when the run cannot be read or has failed.
pub fn await_service(
    client: &PlatformClient,
    run: &Entity,
    request: &InvokeRequest,
    policy: &ReadinessPolicy,
) -> Result<ReadyService, ReadinessError> {
    let mut attempts = 0u32;
    let mut last = String::new();
    let outcome = poll_until("service", &policy.poll(), || {
        attempts = attempts.saturating_add(1);
        let observed = probe(client, run, request)?;
        if let Probe::Pending(pending) = &observed {
            last.clone_from(pending);
        }
        Ok(observed)
    });
    match outcome {
        Ok(ready) => {
            tracing::debug!(run = %run.id(), attempts, "service ready");
            Ok(ready)
        }
        Err(ClientError::Timeout(_)) => Err(ReadinessError::NotReady {
            run: run.id().to_string(),
            attempts,
            last,
        }),
        Err(err) => Err(err.into()),
    }
}

/// Makes one readiness observation.
fn probe(client: &PlatformClient, run: &Entity, request: &InvokeRequest) -> ClientResult<Probe<ReadyService>> {
    let current = client.get_by_id(EntityType::Run, run.project(), run.id())?;
    let state = current.state().unwrap_or("CREATED");
    if state == "ERROR" {
        return Err(ClientError::RunFailed {
            run: current.id().to_string(),
            state: state.to_string(),
        });
    }
    if PlatformClient::service_url(&current).is_none() {
        return Ok(Probe::Pending(format!("no service url in state {state}")));
    }
    match client.invoke(&current, request) {
        Ok(response) if STARTING_STATUSES.contains(&response.status) => {
            Ok(Probe::Pending(format!("status {}", response.status)))
        }
        Ok(response) => Ok(Probe::Ready(ReadyService {
            run: current,
            response,
        })),
        Err(ClientError::Transport(message)) => Ok(Probe::Pending(message)),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests;
