// system-tests/src/scenarios/mod.rs
// ============================================================================
// Module: Scenario Drivers
// Description: End-to-end pipelines s1 through s6 and their shared steps.
// Purpose: Provision functions and workflows, run them, and call the service.
// Dependencies: digitalhub-client, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Every scenario follows the same shape: create the functions it needs,
//! store a [`Pipeline`] definition on a `hera` workflow, run the workflow's
//! `build` and `pipeline` actions to completion, then (except `s2-dbt`) wait
//! for the serve run to answer and call it once.
//!
//! The serve run is deleted whether or not the call succeeds. A failed call
//! is logged with the response body before the error is returned.
//! Security posture: service responses are untrusted and only logged.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod container;
pub mod custom_model;
pub mod dbt;
pub mod etl;
pub mod mlflow;
pub mod sklearn;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use digitalhub_client::ClientError;
use digitalhub_client::DeleteOptions;
use digitalhub_client::Entity;
use digitalhub_client::EntityRequest;
use digitalhub_client::InvokeRequest;
use digitalhub_client::InvokeResponse;
use digitalhub_client::Pipeline;
use digitalhub_client::PipelineError;
use digitalhub_client::RunOptions;
use digitalhub_client::SourceCode;
use serde_json::Value;
use thiserror::Error;

use crate::context::SuiteContext;
use crate::readiness::ReadinessError;
use crate::readiness::await_service;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Python runtime version of scenario functions.
pub const PYTHON_VERSION: &str = "PYTHON3_10";
/// Runtime source holding the scenario functions.
pub const FUNCTIONS_FILE: &str = "functions.py";
/// Runtime source holding the workflow entry point.
pub const PIPELINE_FILE: &str = "pipeline.py";
/// Handler of every workflow source.
const PIPELINE_HANDLER: &str = "pipeline";

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// End-to-end scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Bologna traffic ETL with a python API.
    S1Etl,
    /// dbt transformation of an employees table.
    S2Dbt,
    /// scikit-learn classifier served over V2 inference.
    S3ScikitLearn,
    /// MLflow iris classifier served over V2 inference.
    S4Mlflow,
    /// Time-series model on a custom built image.
    S5CustomMlModel,
    /// Container job, build, and echo service.
    S6Container,
}

impl Scenario {
    /// Every scenario, in numbering order.
    pub const ALL: [Self; 6] =
        [Self::S1Etl, Self::S2Dbt, Self::S3ScikitLearn, Self::S4Mlflow, Self::S5CustomMlModel, Self::S6Container];

    /// Returns the scenario name, which is also its binary and source directory.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::S1Etl => "s1-etl",
            Self::S2Dbt => "s2-dbt",
            Self::S3ScikitLearn => "s3-scikit-learn",
            Self::S4Mlflow => "s4-mlflow",
            Self::S5CustomMlModel => "s5-custom-ml-model",
            Self::S6Container => "s6-container",
        }
    }

    /// Resolves a scenario by name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scenario| scenario.name() == name)
    }

    /// Runs the scenario to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] on the first failed step.
    pub fn drive(self, context: &SuiteContext) -> Result<(), ScenarioError> {
        tracing::info!("Running scenario {self} in project {}", context.project_name());
        context.client().get_or_create_project(context.project_name())?;
        match self {
            Self::S1Etl => etl::drive(context),
            Self::S2Dbt => dbt::drive(context),
            Self::S3ScikitLearn => sklearn::drive(context),
            Self::S4Mlflow => mlflow::drive(context),
            Self::S5CustomMlModel => custom_model::drive(context),
            Self::S6Container => container::drive(context),
        }?;
        tracing::info!("Scenario {self} completed");
        Ok(())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Scenario failures.
///
/// # Invariants
/// - Service call failures keep the response status and body in `Client`.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A platform call failed.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The pipeline definition is invalid.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The service never became ready.
    #[error(transparent)]
    Readiness(#[from] ReadinessError),
    /// A definition could not be encoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// An entity the scenario depends on is missing.
    #[error("missing {0}")]
    Missing(String),
}

// ============================================================================
// SECTION: Shared Steps
// ============================================================================

/// Python function whose code lives in the scenario's `functions.py`.
#[must_use]
pub fn python_function(context: &SuiteContext, scenario: Scenario, name: &str, handler: &str) -> EntityRequest {
    EntityRequest::function(name, "python")
        .with_spec("python_version", PYTHON_VERSION)
        .with_source(SourceCode::File(context.source_file(scenario.name(), FUNCTIONS_FILE)))
        .with_handler(handler)
}

/// Creates the `hera` workflow carrying `pipeline`, builds it, and runs it.
///
/// Both runs are awaited; the finished pipeline run is returned.
///
/// # Errors
///
/// Returns [`ScenarioError`] when the pipeline is invalid, the workflow
/// source cannot be read, or either run fails.
pub fn run_workflow(
    context: &SuiteContext,
    scenario: Scenario,
    name: &str,
    pipeline: &Pipeline,
    parameters: &[(&str, Value)],
) -> Result<Entity, ScenarioError> {
    let definition = pipeline.build()?;
    let request = EntityRequest::workflow(name, "hera")
        .with_source(SourceCode::File(context.source_file(scenario.name(), PIPELINE_FILE)))
        .with_handler(PIPELINE_HANDLER)
        .with_spec("pipeline", definition.to_value()?);
    let client = context.client();
    let workflow = client.create(context.project_name(), request)?;
    tracing::info!("Workflow {} steps: {}", workflow.name(), definition.order.join(" -> "));

    client.run(&workflow, "build", RunOptions::default().wait(context.run_wait()))?;
    let options = parameters
        .iter()
        .fold(RunOptions::default().wait(context.run_wait()), |options, (field, value)| {
            options.with_parameter(field, value.clone())
        });
    let run = client.run(&workflow, "pipeline", options)?;
    tracing::info!("Pipeline run {} finished in state {}", run.id(), run.state().unwrap_or("UNKNOWN"));
    Ok(run)
}

/// Returns the newest run of `executable`.
///
/// # Errors
///
/// Returns [`ScenarioError::Missing`] when it has never run.
pub fn latest_run(context: &SuiteContext, executable: &Entity) -> Result<Entity, ScenarioError> {
    context
        .client()
        .list_runs(executable)?
        .into_iter()
        .next()
        .ok_or_else(|| ScenarioError::Missing(format!("run of {}", executable.name())))
}

/// Waits for the newest serve run of `function`, calls it once, and deletes it.
///
/// # Errors
///
/// Returns [`ScenarioError`] when the service never answers or answers with
/// a non-2xx status; the run is deleted in both cases.
pub fn invoke_and_cleanup(
    context: &SuiteContext,
    function: &Entity,
    request: &InvokeRequest,
) -> Result<InvokeResponse, ScenarioError> {
    let run = latest_run(context, function)?;
    let outcome = call_service(context, &run, request);
    let cleanup = context.client().delete_entity(&run, DeleteOptions::default());
    match (outcome, cleanup) {
        (Ok(response), Ok(())) => Ok(response),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(cleanup_err)) => {
            tracing::warn!("Serve run {} not deleted: {cleanup_err}", run.id());
            Err(err)
        }
    }
}

/// Waits for readiness and checks the first response.
fn call_service(
    context: &SuiteContext,
    run: &Entity,
    request: &InvokeRequest,
) -> Result<InvokeResponse, ScenarioError> {
    let ready = match await_service(context.client(), run, request, &context.readiness()) {
        Ok(ready) => ready,
        Err(err) => {
            tracing::error!("Request failed: {err}");
            return Err(err.into());
        }
    };
    let response = ready.response;
    if let Err(err) = response.ensure_success() {
        tracing::error!("Request failed: {err}");
        tracing::info!("Response content: {}", response.body);
        return Err(err.into());
    }
    match response.json() {
        Ok(body) => tracing::info!("Request succeeded: {body}"),
        Err(_) => tracing::info!("Request succeeded: {}", response.body),
    }
    Ok(response)
}
