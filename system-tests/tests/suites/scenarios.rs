// system-tests/tests/suites/scenarios.rs
// ============================================================================
// Module: Scenario Tests
// Description: Every scenario against the stub, plus failure paths.
// Purpose: Cover provisioning, readiness, invocation, and cleanup.
// Dependencies: digitalhub-client, digitalhub-stub, digitalhub-tests, helpers
// ============================================================================

use std::time::Duration;

use digitalhub_client::ClientError;
use digitalhub_client::EntityRef;
use digitalhub_client::EntityType;
use digitalhub_stub::StubOptions;
use digitalhub_tests::ReadinessError;
use digitalhub_tests::Scenario;
use digitalhub_tests::ScenarioError;
use digitalhub_tests::SuiteContext;

use crate::helpers::Workspace;
use crate::helpers::fast_config;
use crate::helpers::workspace_with;
use crate::helpers::write_sources;

/// Project every scenario test works in.
const PROJECT: &str = "scenario-tests";

/// Workspace with placeholder sources for every scenario.
fn scenario_workspace(options: StubOptions) -> Workspace {
    let workspace = workspace_with(options, PROJECT);
    write_sources(&workspace.source_root());
    workspace
}

/// Counts runs still in `RUNNING`.
fn running_runs(context: &SuiteContext) -> usize {
    context
        .client()
        .list(PROJECT, EntityType::Run)
        .unwrap()
        .iter()
        .filter(|run| run.state() == Some("RUNNING"))
        .count()
}

/// Drives `scenario` on a fresh stub and checks nothing is left serving.
fn drive_clean(scenario: Scenario) -> Workspace {
    let workspace = scenario_workspace(StubOptions::default());
    if let Err(err) = scenario.drive(&workspace.context) {
        panic!("{scenario} failed: {err}");
    }
    assert_eq!(running_runs(&workspace.context), 0, "{scenario} left a run serving");
    workspace
}

#[test]
fn etl_scenario_completes() {
    let workspace = drive_clean(Scenario::S1Etl);
    let client = workspace.context.client();
    let dataitems = client.list(PROJECT, EntityType::Dataitem).unwrap();
    assert!(dataitems.iter().any(|item| item.name() == "url-data-item"));
    assert!(dataitems.iter().any(|item| item.name() == "download-data-dataset"));
}

#[test]
fn dbt_scenario_completes() {
    let workspace = drive_clean(Scenario::S2Dbt);
    let function =
        workspace.context.client().get(EntityType::Function, &EntityRef::name(PROJECT, "transform-employees")).unwrap();
    assert_eq!(function.kind(), "dbt");
    assert_eq!(function.spec()["source"]["lang"], "sql");
}

#[test]
fn sklearn_scenario_completes() {
    let workspace = drive_clean(Scenario::S3ScikitLearn);
    let models = workspace.context.client().list(PROJECT, EntityType::Model).unwrap();
    assert!(models.iter().any(|model| model.name() == "train-classifier-model"));
}

#[test]
fn mlflow_scenario_completes() {
    let workspace = drive_clean(Scenario::S4Mlflow);
    let serve =
        workspace.context.client().get(EntityType::Function, &EntityRef::name(PROJECT, "serve-mlflow-model")).unwrap();
    assert_eq!(serve.spec_str("path"), Some("store://scenario-tests/models/iris-classifier"));
}

#[test]
fn custom_model_scenario_runs_on_the_built_image() {
    let workspace = drive_clean(Scenario::S5CustomMlModel);
    let client = workspace.context.client();
    let builder = client.get(EntityType::Function, &EntityRef::name(PROJECT, "build-time-series-model")).unwrap();
    let image = builder.spec_str("image").unwrap();
    for name in ["train-time-series-model", "serve-time-series-model"] {
        let function = client.get(EntityType::Function, &EntityRef::name(PROJECT, name)).unwrap();
        assert_eq!(function.spec_str("image"), Some(image));
    }
}

#[test]
fn container_scenario_completes() {
    let workspace = drive_clean(Scenario::S6Container);
    let runs = workspace.context.client().list(PROJECT, EntityType::Run).unwrap();
    assert!(runs.iter().any(|run| run.kind() == "container+build:run"));
    assert!(!runs.iter().any(|run| run.kind() == "container+serve:run"));
}

#[test]
fn serve_run_is_deleted_when_the_service_never_answers() {
    let workspace = scenario_workspace(StubOptions::default().with_service_warmup(u32::MAX));
    let mut config = fast_config(&workspace.stub, workspace.dir.path(), PROJECT);
    config.readiness_timeout = Duration::from_millis(300);
    let context = SuiteContext::connect(config).unwrap();

    let err = Scenario::S6Container.drive(&context).unwrap_err();
    assert!(
        matches!(
            err,
            ScenarioError::Readiness(ReadinessError::NotReady {
                ..
            })
        ),
        "unexpected error: {err}"
    );
    assert_eq!(running_runs(&context), 0);
}

#[test]
fn missing_sources_fail_before_any_run() {
    let workspace = workspace_with(StubOptions::default(), PROJECT);
    let err = Scenario::S1Etl.drive(&workspace.context).unwrap_err();
    assert!(
        matches!(
            err,
            ScenarioError::Client(ClientError::Io {
                ..
            })
        ),
        "unexpected error: {err}"
    );
    assert!(workspace.context.client().list(PROJECT, EntityType::Run).unwrap().is_empty());
}

#[test]
fn scenarios_authenticate_with_the_configured_token() {
    let workspace = scenario_workspace(StubOptions::default().with_access_token("s3cret"));
    let mut config = fast_config(&workspace.stub, workspace.dir.path(), PROJECT);
    config.access_token = Some("s3cret".to_string());
    let context = SuiteContext::connect(config).unwrap();
    Scenario::S2Dbt.drive(&context).unwrap();

    let err = Scenario::S2Dbt.drive(&workspace.context).unwrap_err();
    assert!(
        matches!(
            err,
            ScenarioError::Client(ClientError::Http {
                status: 401,
                ..
            })
        ),
        "unexpected error: {err}"
    );
}
