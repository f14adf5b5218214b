// system-tests/src/scenarios/sklearn.rs
// ============================================================================
// Module: s3-scikit-learn
// Description: Train a scikit-learn classifier and serve it.
// Purpose: Cover job outputs feeding a model server and V2 inference.
// Dependencies: digitalhub-client, rand, serde_json
// ============================================================================

//! ## Overview
//! A sequential pipeline generates a dataset, trains a classifier on it, and
//! serves the resulting model. The model name used for inference is read
//! from the `model` output of the newest training run.

use digitalhub_client::EntityRequest;
use digitalhub_client::InvokeRequest;
use digitalhub_client::Pipeline;
use digitalhub_client::Step;
use rand::Rng;
use serde_json::Value;
use serde_json::json;

use super::Scenario;
use super::ScenarioError;
use super::invoke_and_cleanup;
use super::latest_run;
use super::python_function;
use super::run_workflow;
use crate::context::SuiteContext;

/// Packages installed into the training functions.
const REQUIREMENTS: [&str; 2] = ["numpy<2", "scikit-learn<1.8"];
/// Rows of the inference payload.
const ROWS: usize = 2;
/// Features per row.
const FEATURES: usize = 30;

/// Builds the prepare, train, serve pipeline.
#[must_use]
pub fn pipeline() -> Pipeline {
    let mut pipeline = Pipeline::steps("dag");
    let prepare = pipeline.step(Step::new("prepare-data").action("job").outputs(["dataset"]));
    let train = pipeline.step(
        Step::new("train-classifier")
            .action("job")
            .template_field("inputs", json!({ "di": "{{inputs.parameters.di}}" }))
            .input("di", prepare.parameter("dataset"))
            .outputs(["model"]),
    );
    let serve = pipeline.step(
        Step::new("serve-classifier")
            .action("serve")
            .template_field("path", "{{inputs.parameters.model}}")
            .input("model", train.parameter("model")),
    );
    pipeline.chain(&[&prepare, &train, &serve]);
    pipeline
}

/// Builds a V2 inference body of random FP32 features.
#[must_use]
pub fn inference_payload() -> Value {
    let mut rng = rand::thread_rng();
    let data: Vec<Vec<f32>> = (0..ROWS).map(|_| (0..FEATURES).map(|_| rng.gen_range(0.0_f32..1.0)).collect()).collect();
    json!({
        "inputs": [{
            "name": "input-0",
            "shape": [ROWS, FEATURES],
            "datatype": "FP32",
            "data": data,
        }]
    })
}

/// Runs `s3-scikit-learn`.
///
/// # Errors
///
/// Returns [`ScenarioError`] on the first failed step.
pub fn drive(context: &SuiteContext) -> Result<(), ScenarioError> {
    let scenario = Scenario::S3ScikitLearn;
    let client = context.client();
    let project = context.project_name();

    let requirements = REQUIREMENTS.to_vec();
    let prepare = python_function(context, scenario, "prepare-data", "data_generator");
    client.create(project, prepare.with_spec("requirements", requirements.clone()))?;
    let train = python_function(context, scenario, "train-classifier", "train_model");
    let train = client.create(project, train.with_spec("requirements", requirements))?;
    let serve = client.create(project, EntityRequest::function("serve-classifier", "sklearnserve"))?;

    run_workflow(context, scenario, "ml-pipeline", &pipeline(), &[])?;

    let model = client.run_output(&latest_run(context, &train)?, "model")?;
    invoke_and_cleanup(context, &serve, &InvokeRequest::infer(model.name(), inference_payload()))?;
    Ok(())
}
