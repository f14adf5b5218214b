// system-tests/src/scenarios/etl.rs
// ============================================================================
// Module: s1-etl
// Description: Download, process, and serve Bologna traffic sensor data.
// Purpose: Cover URL dataitems, chained python jobs, and a python API.
// Dependencies: digitalhub-client, serde_json
// ============================================================================

//! ## Overview
//! `download-data` reads the `url` workflow parameter and produces `dataset`,
//! which both processing jobs consume. The `api` serve step starts once both
//! finished and is called with a paging query.

use digitalhub_client::EntityRequest;
use digitalhub_client::InvokeRequest;
use digitalhub_client::ParamSource;
use digitalhub_client::Pipeline;
use digitalhub_client::Step;
use serde_json::Value;

use super::Scenario;
use super::ScenarioError;
use super::invoke_and_cleanup;
use super::python_function;
use super::run_workflow;
use crate::context::SuiteContext;

/// Open data export of the 2023 vehicle flow sensors.
pub const DATA_URL: &str = "https://opendata.comune.bologna.it/api/explore/v2.1/catalog/datasets/rilevazione-flusso-veicoli-tramite-spire-anno-2023/exports/csv?limit=10000&lang=it&timezone=Europe%2FRome&use_labels=true&delimiter=%3B";
/// Query sent to the API once it is up.
pub const API_QUERY: &str = "?page=5&size=10";

/// Builds the ETL pipeline.
#[must_use]
pub fn pipeline() -> Pipeline {
    let mut pipeline = Pipeline::dag("dag");
    let download = pipeline.step(
        Step::new("download-data")
            .action("job")
            .input("url", ParamSource::workflow("url"))
            .outputs(["dataset"]),
    );
    let spire = pipeline.step(Step::new("process-spire").action("job").input("di", download.parameter("dataset")));
    let measures =
        pipeline.step(Step::new("process-measures").action("job").input("di", download.parameter("dataset")));
    let api = pipeline.step(Step::new("api").action("serve"));
    pipeline.then(&spire, &api).then(&measures, &api);
    pipeline
}

/// Runs `s1-etl`.
///
/// # Errors
///
/// Returns [`ScenarioError`] on the first failed step.
pub fn drive(context: &SuiteContext) -> Result<(), ScenarioError> {
    let scenario = Scenario::S1Etl;
    let client = context.client();
    let project = context.project_name();

    let dataitem = client.create(project, EntityRequest::dataitem("url-data-item", "table", DATA_URL))?;
    for (name, handler) in
        [("download-data", "downloader"), ("process-spire", "process_spire"), ("process-measures", "process_measures")]
    {
        client.create(project, python_function(context, scenario, name, handler))?;
    }
    let api = python_function(context, scenario, "api", "serve").with_init_function("init_context");
    let api = client.create(project, api)?;

    run_workflow(context, scenario, "pipeline", &pipeline(), &[("url", Value::String(dataitem.key().to_string()))])?;
    invoke_and_cleanup(context, &api, &InvokeRequest::default().with_path(API_QUERY))?;
    Ok(())
}
