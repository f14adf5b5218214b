// system-tests/src/scenarios/custom_model.rs
// ============================================================================
// Module: s5-custom-ml-model
// Description: Time-series model trained and served on a custom image.
// Purpose: Cover function builds and reuse of the built image.
// Dependencies: digitalhub-client, serde_json
// ============================================================================

//! ## Overview
//! A placeholder function is built first so the platform bakes the heavy
//! requirements into an image. The training and serving functions then run
//! on that image, read back from the built function's `spec.image`.

use digitalhub_client::EntityRequest;
use digitalhub_client::InvokeRequest;
use digitalhub_client::Pipeline;
use digitalhub_client::RunOptions;
use digitalhub_client::SourceCode;
use digitalhub_client::Step;
use serde_json::Value;
use serde_json::json;

use super::PYTHON_VERSION;
use super::Scenario;
use super::ScenarioError;
use super::invoke_and_cleanup;
use super::python_function;
use super::run_workflow;
use crate::context::SuiteContext;

/// Packages baked into the custom image.
const REQUIREMENTS: [&str; 3] = ["torch<2.6.0", "darts==0.30.0", "patsy"];

/// Monthly observations as `(value, epoch milliseconds)`.
const SERIES: [(f64, f64); 24] = [
    (360.0, -347_155_200_000.0),
    (342.0, -344_476_800_000.0),
    (406.0, -342_057_600_000.0),
    (396.0, -339_379_200_000.0),
    (420.0, -336_787_200_000.0),
    (472.0, -334_108_800_000.0),
    (548.0, -331_516_800_000.0),
    (559.0, -328_838_400_000.0),
    (463.0, -326_160_000_000.0),
    (407.0, -323_568_000_000.0),
    (362.0, -320_889_600_000.0),
    (405.0, -318_297_600_000.0),
    (417.0, -315_619_200_000.0),
    (391.0, -312_940_800_000.0),
    (419.0, -310_435_200_000.0),
    (461.0, -307_756_800_000.0),
    (472.0, -305_164_800_000.0),
    (535.0, -302_486_400_000.0),
    (622.0, -299_894_400_000.0),
    (606.0, -297_216_000_000.0),
    (508.0, -294_537_600_000.0),
    (461.0, -291_945_600_000.0),
    (390.0, -289_267_200_000.0),
    (432.0, -286_675_200_000.0),
];

/// Builds the train, serve pipeline.
#[must_use]
pub fn pipeline() -> Pipeline {
    let mut pipeline = Pipeline::dag("dag");
    let train = pipeline.step(Step::new("train-time-series-model").action("job").outputs(["model"]));
    let serve = pipeline.step(
        Step::new("serve-time-series-model")
            .action("serve")
            .template_field("init_parameters", json!({ "model_key": "{{inputs.parameters.model}}" }))
            .input("model", train.parameter("model")),
    );
    pipeline.then(&train, &serve);
    pipeline
}

/// Builds the prediction request body.
#[must_use]
pub fn inference_payload() -> Value {
    let points: Vec<Value> = SERIES.iter().map(|(value, date)| json!({ "value": value, "date": date })).collect();
    json!({ "inference_input": points })
}

/// Runs `s5-custom-ml-model`.
///
/// # Errors
///
/// Returns [`ScenarioError`] on the first failed step, or
/// [`ScenarioError::Missing`] when the build leaves no image behind.
pub fn drive(context: &SuiteContext) -> Result<(), ScenarioError> {
    let scenario = Scenario::S5CustomMlModel;
    let client = context.client();
    let project = context.project_name();

    let builder = EntityRequest::function("build-time-series-model", "python")
        .with_spec("python_version", PYTHON_VERSION)
        .with_spec("requirements", REQUIREMENTS.to_vec())
        .with_source(SourceCode::python("placeholder"))
        .with_handler("placeholder");
    let mut builder = client.create(project, builder)?;
    client.run(&builder, "build", RunOptions::default().wait(context.run_wait()))?;
    client.refresh(&mut builder)?;
    let image = builder
        .spec_str("image")
        .ok_or_else(|| ScenarioError::Missing(format!("image of {}", builder.name())))?
        .to_string();
    tracing::info!("Built image {image}");

    let train = python_function(context, scenario, "train-time-series-model", "train_model")
        .with_spec("image", image.as_str());
    client.create(project, train)?;
    let serve = python_function(context, scenario, "serve-time-series-model", "serve_predictions")
        .with_init_function("init_context")
        .with_spec("image", image);
    let serve = client.create(project, serve)?;

    run_workflow(context, scenario, "time-series-pipeline", &pipeline(), &[])?;
    invoke_and_cleanup(context, &serve, &InvokeRequest::json(inference_payload()))?;
    Ok(())
}
