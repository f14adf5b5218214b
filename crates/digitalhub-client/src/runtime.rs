// crates/digitalhub-client/src/runtime.rs
// ============================================================================
// Module: Runtime Operations
// Description: Tasks, runs, triggers, and service invocation.
// Purpose: Execute functions and workflows and talk to the services they expose.
// Dependencies: reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! An executable (function or workflow) is bound to an action through a task
//! of kind `{executable kind}+{action}`; executing the task creates a run of
//! kind `{task kind}:run`. Runs progress remotely; [`PlatformClient::wait_for_run`]
//! polls them until they settle. Serve runs settle once `RUNNING` and expose
//! `status.service.url`, which [`PlatformClient::invoke`] calls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde_json::Map;
use serde_json::Value;

use crate::client::DeleteOptions;
use crate::client::ListFilter;
use crate::client::PlatformClient;
use crate::client::read_limited;
use crate::entity::Entity;
use crate::entity::EntityRequest;
use crate::entity::EntityType;
use crate::error::ClientError;
use crate::error::ClientResult;
use crate::key::EntityKey;
use crate::key::EntityRef;
use crate::poll::PollPolicy;
use crate::poll::Probe;
use crate::poll::poll_until;

// ============================================================================
// SECTION: Run State
// ============================================================================

/// Lifecycle states reported in `status.state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Accepted, not yet scheduled.
    Created,
    /// Image or resources built.
    Built,
    /// Scheduled, waiting for resources.
    Ready,
    /// Executing; serve runs stay here while the service is up.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Error,
    /// Stopped by a user.
    Stopped,
    /// Deleted while running.
    Deleted,
    /// Any label this client does not know.
    Other(String),
}

impl RunState {
    /// Parses a state label.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label {
            "CREATED" => Self::Created,
            "BUILT" => Self::Built,
            "READY" => Self::Ready,
            "RUNNING" => Self::Running,
            "COMPLETED" => Self::Completed,
            "ERROR" => Self::Error,
            "STOPPED" => Self::Stopped,
            "DELETED" => Self::Deleted,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns true when the run can no longer change state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Stopped | Self::Deleted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "CREATED",
            Self::Built => "BUILT",
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
            Self::Stopped => "STOPPED",
            Self::Deleted => "DELETED",
            Self::Other(label) => label,
        };
        f.write_str(label)
    }
}

/// Returns the action encoded in a task or run kind (`python+serve:run` -> `serve`).
#[must_use]
pub fn action_of(kind: &str) -> Option<&str> {
    let (_, rest) = kind.split_once('+')?;
    Some(rest.strip_suffix(":run").unwrap_or(rest))
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// Options for creating a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Parameters passed to the executable.
    pub parameters: Map<String, Value>,
    /// Ask the backend to execute in the caller's environment.
    pub local_execution: bool,
    /// Labels recorded on the run.
    pub labels: Vec<String>,
    /// Extra run spec fields (`inputs`, `init_parameters`, ...).
    pub spec: Map<String, Value>,
    /// Wait for the run to settle under this policy.
    pub wait: Option<PollPolicy>,
}

impl RunOptions {
    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    /// Adds an extra run spec field.
    #[must_use]
    pub fn with_spec(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.spec.insert(field.to_string(), value.into());
        self
    }

    /// Requests local execution.
    #[must_use]
    pub const fn local(mut self) -> Self {
        self.local_execution = true;
        self
    }

    /// Waits for the run to settle.
    #[must_use]
    pub const fn wait(mut self, policy: PollPolicy) -> Self {
        self.wait = Some(policy);
        self
    }
}

// ============================================================================
// SECTION: Invocation Types
// ============================================================================

/// HTTP call against a serve run.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeRequest {
    /// HTTP method.
    pub method: Method,
    /// Path (with optional query) appended to the service URL.
    pub path: Option<String>,
    /// Targets the V2 inference endpoint `/v2/models/{name}/infer`.
    pub model_name: Option<String>,
    /// JSON body.
    pub json: Option<Value>,
}

impl Default for InvokeRequest {
    fn default() -> Self {
        Self {
            method: Method::POST,
            path: None,
            model_name: None,
            json: None,
        }
    }
}

impl InvokeRequest {
    /// Sends a JSON body.
    #[must_use]
    pub fn json(body: Value) -> Self {
        Self {
            json: Some(body),
            ..Self::default()
        }
    }

    /// Calls the V2 inference endpoint of `model_name` with `body`.
    #[must_use]
    pub fn infer(model_name: impl Into<String>, body: Value) -> Self {
        Self {
            model_name: Some(model_name.into()),
            json: Some(body),
            ..Self::default()
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Appends a path to the service URL.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Response of a service invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl InvokeResponse {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Fails on non-2xx statuses.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] carrying the status and body.
    pub fn ensure_success(&self) -> ClientResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ClientError::Http {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Json`] when the body is not JSON.
    pub fn json(&self) -> ClientResult<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

// ============================================================================
// SECTION: Tasks
// ============================================================================

impl PlatformClient {
    /// Creates a task binding `executable` to `action`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when `executable` is neither a function
    /// nor a workflow.
    pub fn new_task(&self, executable: &Entity, action: &str, labels: &[&str]) -> ClientResult<Entity> {
        self.new_task_with(executable, action, labels, Map::new())
    }

    /// Creates a task with extra spec fields (resources, ports, ...).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when `executable` is neither a function
    /// nor a workflow.
    pub fn new_task_with(
        &self,
        executable: &Entity,
        action: &str,
        labels: &[&str],
        spec: Map<String, Value>,
    ) -> ClientResult<Entity> {
        let field = executable_field(executable)?;
        let id = uuid::Uuid::new_v4().to_string();
        let kind = format!("{}+{action}", executable.kind());
        let mut request = EntityRequest::new(EntityType::Task, id.clone(), kind)
            .with_id(id)
            .with_labels(labels.iter().copied())
            .with_spec(field, executable.executable_string());
        for (name, value) in spec {
            request = request.with_spec(&name, value);
        }
        self.create(executable.project(), request)
    }

    /// Finds the task binding `executable` to `action`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when no such task exists.
    pub fn find_task(&self, executable: &Entity, action: &str) -> ClientResult<Entity> {
        executable_field(executable)?;
        let filter = ListFilter {
            kind: Some(format!("{}+{action}", executable.kind())),
            function: Some(executable.executable_string()),
            ..ListFilter::default()
        };
        self.list_filtered(executable.project(), EntityType::Task, &filter)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ClientError::NotFound(format!("{action} task of {}", executable.executable_string()))
            })
    }

    /// Returns the existing task for `action` or creates one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when lookup or creation fails.
    pub fn ensure_task(&self, executable: &Entity, action: &str) -> ClientResult<Entity> {
        match self.find_task(executable, action) {
            Ok(task) => Ok(task),
            Err(err) if err.is_not_found() => self.new_task(executable, action, &[]),
            Err(err) => Err(err),
        }
    }

    /// Deletes the task for `action` together with its runs.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when no such task exists.
    pub fn delete_task(&self, executable: &Entity, action: &str) -> ClientResult<()> {
        let task = self.find_task(executable, action)?;
        self.delete_entity(&task, DeleteOptions::default())
    }

    // ------------------------------------------------------------------------
    // Runs
    // ------------------------------------------------------------------------

    /// Creates a run of `task`, optionally waiting for it to settle.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when creation fails, or the wait errors of
    /// [`PlatformClient::wait_for_run`].
    pub fn run_task(&self, task: &Entity, options: RunOptions) -> ClientResult<Entity> {
        if task.entity_type() != EntityType::Task {
            return Err(ClientError::Config(format!("{} is not a task", task.key())));
        }
        let (field, executable) = task
            .spec()
            .iter()
            .find(|(field, _)| matches!(field.as_str(), "function" | "workflow"))
            .and_then(|(field, value)| value.as_str().map(|value| (field.clone(), value.to_string())))
            .ok_or_else(|| ClientError::Protocol(format!("task {} names no executable", task.id())))?;
        let id = uuid::Uuid::new_v4().to_string();
        let mut request = EntityRequest::new(EntityType::Run, id.clone(), format!("{}:run", task.kind()))
            .with_id(id)
            .with_labels(options.labels.clone())
            .with_spec("task", task_string(task.kind(), &executable))
            .with_spec(&field, executable)
            .with_spec("parameters", Value::Object(options.parameters.clone()))
            .with_spec("local_execution", options.local_execution);
        for (name, value) in options.spec {
            request = request.with_spec(&name, value);
        }
        let run = self.create(task.project(), request)?;
        tracing::debug!(run = %run.id(), kind = %run.kind(), "run created");
        match options.wait {
            Some(policy) => self.wait_for_run(&run, &policy),
            None => Ok(run),
        }
    }

    /// Runs `executable` with `action`, creating the task when missing.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::run_task`].
    pub fn run(&self, executable: &Entity, action: &str, options: RunOptions) -> ClientResult<Entity> {
        let task = self.ensure_task(executable, action)?;
        self.run_task(&task, options)
    }

    /// Polls a run until it settles.
    ///
    /// Job, build, and pipeline runs settle in a terminal state; serve runs
    /// settle once `RUNNING`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RunFailed`] when the run ends in `ERROR`, or
    /// [`ClientError::Timeout`] when `policy` is exhausted.
    pub fn wait_for_run(&self, run: &Entity, policy: &PollPolicy) -> ClientResult<Entity> {
        let serving = action_of(run.kind()) == Some("serve");
        let what = format!("run {}", run.id());
        let settled = poll_until(&what, policy, || {
            let current = self.get_by_id(EntityType::Run, run.project(), run.id())?;
            let state = RunState::parse(current.state().unwrap_or("CREATED"));
            if state.is_terminal() || (serving && state == RunState::Running) {
                Ok(Probe::Ready(current))
            } else {
                Ok(Probe::Pending(format!("state {state}")))
            }
        })?;
        if let Some(state @ "ERROR") = settled.state() {
            return Err(ClientError::RunFailed {
                run: settled.id().to_string(),
                state: state.to_string(),
            });
        }
        Ok(settled)
    }

    /// Lists runs of an executable, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails.
    pub fn list_runs(&self, executable: &Entity) -> ClientResult<Vec<Entity>> {
        executable_field(executable)?;
        let filter = ListFilter {
            function: Some(executable.executable_string()),
            ..ListFilter::default()
        };
        self.list_filtered(executable.project(), EntityType::Run, &filter)
    }

    /// Fetches the entity a run produced under output `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the run has no such output.
    pub fn run_output(&self, run: &Entity, name: &str) -> ClientResult<Entity> {
        let key = run
            .status()
            .get("outputs")
            .and_then(|outputs| outputs.get(name))
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::NotFound(format!("output {name} of run {}", run.id())))?;
        let key: EntityKey = key.parse()?;
        let entity_type = key.entity_type();
        self.get(entity_type, &EntityRef::Key(key))
    }

    // ------------------------------------------------------------------------
    // Triggers
    // ------------------------------------------------------------------------

    /// Creates a trigger firing `action` of `executable`.
    ///
    /// `request` carries the trigger name, kind, and its kind-specific spec
    /// (`schedule`, or `key` plus `states`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when task lookup or creation fails.
    pub fn trigger(&self, executable: &Entity, action: &str, request: EntityRequest) -> ClientResult<Entity> {
        if request.entity_type() != EntityType::Trigger {
            return Err(ClientError::Config(format!(
                "expected a trigger request, got {}",
                request.entity_type()
            )));
        }
        let field = executable_field(executable)?;
        let task = self.ensure_task(executable, action)?;
        let executable_string = executable.executable_string();
        let request = request
            .with_spec("task", task_string(task.kind(), &executable_string))
            .with_spec(field, executable_string);
        self.create(executable.project(), request)
    }

    // ------------------------------------------------------------------------
    // Services
    // ------------------------------------------------------------------------

    /// Returns `http://{status.service.url}` of a serve run, when exposed.
    #[must_use]
    pub fn service_url(run: &Entity) -> Option<String> {
        let url = run.status().get("service")?.get("url")?.as_str()?;
        if url.starts_with("http://") || url.starts_with("https://") {
            Some(url.to_string())
        } else {
            Some(format!("http://{url}"))
        }
    }

    /// Calls the service exposed by a serve run.
    ///
    /// Non-2xx statuses are returned, not raised; use
    /// [`InvokeResponse::ensure_success`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] when the run exposes no service, or
    /// [`ClientError::Transport`] when the call fails.
    pub fn invoke(&self, run: &Entity, request: &InvokeRequest) -> ClientResult<InvokeResponse> {
        let base = Self::service_url(run)
            .ok_or_else(|| ClientError::Protocol(format!("run {} exposes no service url", run.id())))?;
        let base = base.trim_end_matches('/');
        let url = match (&request.model_name, &request.path) {
            (Some(model), _) => format!("{base}/v2/models/{model}/infer"),
            (None, Some(path)) => format!("{base}/{}", path.trim_start_matches('/')),
            (None, None) => format!("{base}/"),
        };
        let mut builder = self.authorize(self.http().request(request.method.clone(), url.as_str()));
        if let Some(body) = &request.json {
            builder = builder.header(CONTENT_TYPE, "application/json").body(serde_json::to_vec(body)?);
        }
        let response = builder.send().map_err(|err| ClientError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let body = read_limited(response)?;
        tracing::debug!(%url, status, "service invoked");
        Ok(InvokeResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the task/run spec field naming this executable.
fn executable_field(executable: &Entity) -> ClientResult<&'static str> {
    match executable.entity_type() {
        EntityType::Function => Ok("function"),
        EntityType::Workflow => Ok("workflow"),
        other => Err(ClientError::Config(format!("{other} entities cannot be executed"))),
    }
}

/// Builds `{task kind}://{project}/{name}:{id}` from an executable string.
#[must_use]
pub fn task_string(task_kind: &str, executable_string: &str) -> String {
    let reference = executable_string.split_once("://").map_or(executable_string, |(_, rest)| rest);
    format!("{task_kind}://{reference}")
}
