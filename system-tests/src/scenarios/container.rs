// system-tests/src/scenarios/container.rs
// ============================================================================
// Module: s6-container
// Description: Container job, image build, and echo service in one DAG.
// Purpose: Cover container templates with users, replicas, and ports.
// Dependencies: digitalhub-client, serde_json
// ============================================================================

use digitalhub_client::EntityRequest;
use digitalhub_client::InvokeRequest;
use digitalhub_client::Pipeline;
use digitalhub_client::Step;
use serde_json::json;

use super::Scenario;
use super::ScenarioError;
use super::invoke_and_cleanup;
use super::run_workflow;
use crate::context::SuiteContext;

/// Unprivileged user the job and service run as.
const RUN_AS_USER: &str = "8877";
/// Port `http-echo` listens on.
const ECHO_PORT: u16 = 5678;

/// Builds the job, build, serve pipeline.
#[must_use]
pub fn pipeline() -> Pipeline {
    let mut pipeline = Pipeline::dag("dag");
    let job = pipeline.step(Step::new("c-job").action("job").template_field("run_as_user", RUN_AS_USER));
    let build = pipeline.step(
        Step::new("c-build")
            .action("build")
            .template_field("instructions", json!(["RUN apt-get update && apt-get install -y git"])),
    );
    let serve = pipeline.step(
        Step::new("c-serve")
            .action("serve")
            .template_field("replicas", 2)
            .template_field("service_ports", json!([{ "port": ECHO_PORT, "target_port": ECHO_PORT }]))
            .template_field("service_name", "http-echo")
            .template_field("run_as_user", RUN_AS_USER),
    );
    pipeline.chain(&[&job, &build, &serve]);
    pipeline
}

/// Runs `s6-container`.
///
/// # Errors
///
/// Returns [`ScenarioError`] on the first failed step.
pub fn drive(context: &SuiteContext) -> Result<(), ScenarioError> {
    let client = context.client();
    let project = context.project_name();

    client.create(project, EntityRequest::function("c-job", "container").with_spec("image", "hello-world:latest"))?;
    client.create(project, EntityRequest::function("c-build", "container").with_spec("base_image", "python:3.11-slim"))?;
    let serve = EntityRequest::function("c-serve", "container").with_spec("image", "hashicorp/http-echo:latest");
    let serve = client.create(project, serve)?;

    run_workflow(context, Scenario::S6Container, "container-pipeline", &pipeline(), &[])?;
    invoke_and_cleanup(context, &serve, &InvokeRequest::default())?;
    Ok(())
}
