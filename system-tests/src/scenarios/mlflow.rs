// system-tests/src/scenarios/mlflow.rs
// ============================================================================
// Module: s4-mlflow
// Description: Train an MLflow iris classifier and serve it.
// Purpose: Cover model servers bound to a store path and V2 inference.
// Dependencies: digitalhub-client, serde_json
// ============================================================================

use digitalhub_client::EntityRequest;
use digitalhub_client::InvokeRequest;
use digitalhub_client::Pipeline;
use digitalhub_client::Step;
use serde_json::Value;
use serde_json::json;

use super::Scenario;
use super::ScenarioError;
use super::invoke_and_cleanup;
use super::latest_run;
use super::python_function;
use super::run_workflow;
use crate::context::SuiteContext;

/// Name the served model is registered under.
pub const MODEL_NAME: &str = "iris-classifier";
/// Packages installed into the training function.
const REQUIREMENTS: [&str; 3] = ["numpy<2", "mlflow<3", "scikit-learn <= 1.6.1"];

/// First ten rows of the iris dataset.
const IRIS: [[f64; 4]; 10] = [
    [5.1, 3.5, 1.4, 0.2],
    [4.9, 3.0, 1.4, 0.2],
    [4.7, 3.2, 1.3, 0.2],
    [4.6, 3.1, 1.5, 0.2],
    [5.0, 3.6, 1.4, 0.2],
    [5.4, 3.9, 1.7, 0.4],
    [4.6, 3.4, 1.4, 0.3],
    [5.0, 3.4, 1.5, 0.2],
    [4.4, 2.9, 1.4, 0.2],
    [4.9, 3.1, 1.5, 0.1],
];

/// Builds the train, serve pipeline.
#[must_use]
pub fn pipeline() -> Pipeline {
    let mut pipeline = Pipeline::dag("dag");
    let train = pipeline.step(Step::new("train-mlflow-model").action("job").outputs(["model"]));
    let serve = pipeline.step(
        Step::new("serve-mlflow-model")
            .action("serve")
            .template_field("path", "{{inputs.parameters.model}}")
            .template_field("model_name", MODEL_NAME)
            .input("model", train.parameter("model")),
    );
    pipeline.then(&train, &serve);
    pipeline
}

/// Builds the V2 inference body; the row count is left to the server.
#[must_use]
pub fn inference_payload() -> Value {
    json!({
        "inputs": [{
            "name": "input-0",
            "shape": [-1, 4],
            "datatype": "FP64",
            "data": IRIS,
        }]
    })
}

/// Runs `s4-mlflow`.
///
/// # Errors
///
/// Returns [`ScenarioError`] on the first failed step.
pub fn drive(context: &SuiteContext) -> Result<(), ScenarioError> {
    let scenario = Scenario::S4Mlflow;
    let client = context.client();
    let project = context.project_name();

    let train = python_function(context, scenario, "train-mlflow-model", "train_model")
        .with_spec("requirements", REQUIREMENTS.to_vec());
    let train = client.create(project, train)?;
    let serve = EntityRequest::function("serve-mlflow-model", "mlflowserve")
        .with_spec("path", format!("store://{project}/models/{MODEL_NAME}"))
        .with_spec("model_name", MODEL_NAME);
    let serve = client.create(project, serve)?;

    run_workflow(context, scenario, "mlflow-pipeline", &pipeline(), &[])?;

    let model = client.run_output(&latest_run(context, &train)?, "model")?;
    invoke_and_cleanup(context, &serve, &InvokeRequest::infer(model.name(), inference_payload()))?;
    Ok(())
}
