// crates/digitalhub-client/src/pipeline/tests.rs
// ============================================================================
// Module: Pipeline DSL Tests
// Description: Unit tests for pipeline validation and ordering.
// Purpose: Ensure invalid graphs are rejected and ordering is deterministic.
// Dependencies: digitalhub-client, serde_json
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use serde_json::json;

use super::ContainerKind;
use super::ParamSource;
use super::Pipeline;
use super::PipelineError;
use super::Step;

/// Builds the prepare -> train -> serve pipeline used by the classifier scenario.
fn classifier_pipeline() -> Pipeline {
    let mut pipeline = Pipeline::steps("dag");
    let prepare = pipeline.step(Step::new("prepare-data").action("job").outputs(["dataset"]));
    let train = pipeline.step(
        Step::new("train-classifier")
            .action("job")
            .template_field("inputs", json!({"di": "{{inputs.parameters.di}}"}))
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

#[test]
fn linear_chain_orders_steps() {
    let definition = classifier_pipeline().build().unwrap();
    assert_eq!(definition.kind, ContainerKind::Steps);
    assert_eq!(definition.order, vec!["prepare-data", "train-classifier", "serve-classifier"]);
    let train = &definition.steps[1];
    assert_eq!(train.depends, vec!["prepare-data"]);
    assert_eq!(train.action(), Some("job"));
}

#[test]
fn declaration_order_breaks_ties() {
    let mut pipeline = Pipeline::dag("dag");
    let late = pipeline.step(Step::new("b").action("job"));
    let early = pipeline.step(Step::new("a").action("job"));
    let last = pipeline.step(Step::new("c").action("job"));
    pipeline.then(&early, &last);
    let definition = pipeline.build().unwrap();
    assert_eq!(definition.order, vec!["b", "a", "c"]);
    assert_eq!(late.name(), "b");
}

#[test]
fn implicit_edges_come_from_inputs() {
    let mut pipeline = Pipeline::dag("dag");
    let serve = Step::new("serve").action("serve");
    let train = pipeline.step(Step::new("train").action("job").outputs(["model"]));
    pipeline.step(serve.input("model", train.parameter("model")));
    let reversed = {
        let mut reordered = Pipeline::dag("dag");
        let consumer = Step::new("serve").action("serve").input("model", train.parameter("model"));
        reordered.step(consumer);
        reordered.step(Step::new("train").action("job").outputs(["model"]));
        reordered.build().unwrap()
    };
    assert_eq!(reversed.order, vec!["train", "serve"]);
    assert_eq!(pipeline.build().unwrap().order, vec!["train", "serve"]);
}

#[test]
fn workflow_parameters_are_collected() {
    let mut pipeline = Pipeline::dag("dag");
    pipeline.step(Step::new("download").action("job").input("url", ParamSource::workflow("url")));
    pipeline.step(
        Step::new("transform").action("job").input("limit", ParamSource::value(10)).named("transform-1"),
    );
    let definition = pipeline.build().unwrap();
    assert_eq!(definition.parameters, vec!["url"]);
    assert_eq!(definition.ordered_steps().len(), 2);
}

#[test]
fn rejects_cycles() {
    let mut pipeline = Pipeline::dag("dag");
    let a = pipeline.step(Step::new("a").action("job"));
    let b = pipeline.step(Step::new("b").action("job"));
    let c = pipeline.step(Step::new("c").action("job"));
    pipeline.chain(&[&a, &b, &c]).then(&c, &b);
    let err = pipeline.build().unwrap_err();
    assert_eq!(err, PipelineError::Cycle(vec!["b".to_string(), "c".to_string()]));
}

#[test]
fn rejects_dangling_references() {
    let mut other = Pipeline::dag("other");
    let foreign = other.step(Step::new("foreign").action("job").outputs(["x"]));

    let mut pipeline = Pipeline::dag("dag");
    pipeline.step(Step::new("a").action("job").input("x", foreign.parameter("x")));
    assert!(matches!(pipeline.build(), Err(PipelineError::UnknownStep { .. })));

    let mut pipeline = Pipeline::dag("dag");
    let a = pipeline.step(Step::new("a").action("job"));
    pipeline.step(Step::new("b").action("job").input("x", a.parameter("missing")));
    assert_eq!(
        pipeline.build().unwrap_err(),
        PipelineError::UndeclaredOutput {
            step: "b".to_string(),
            source_step: "a".to_string(),
            parameter: "missing".to_string(),
        }
    );
}

#[test]
fn rejects_duplicates_and_missing_actions() {
    let mut pipeline = Pipeline::dag("dag");
    pipeline.step(Step::new("a").action("job"));
    pipeline.step(Step::new("a").action("serve"));
    assert_eq!(pipeline.build().unwrap_err(), PipelineError::DuplicateStep("a".to_string()));

    let mut pipeline = Pipeline::dag("dag");
    pipeline.step(Step::new("a"));
    assert_eq!(pipeline.build().unwrap_err(), PipelineError::MissingAction("a".to_string()));

    assert_eq!(Pipeline::dag("dag").build().unwrap_err(), PipelineError::Empty("dag".to_string()));
}

#[test]
fn definition_serializes_for_workflow_spec() {
    let value = classifier_pipeline().build().unwrap().to_value().unwrap();
    assert_eq!(value["kind"], "steps");
    assert_eq!(value["steps"][1]["inputs"]["di"], json!({"from": "output", "step": "prepare-data", "parameter": "dataset"}));
    assert_eq!(value["steps"][2]["template"]["action"], "serve");
}
