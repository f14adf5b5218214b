// crates/digitalhub-client/tests/suites/runtime.rs
// ============================================================================
// Module: Runtime Tests
// Description: Tasks, runs, triggers, pipelines, and services on the stub.
// Purpose: Pin bounded waits, cascades, and service invocation.
// Dependencies: digitalhub-client, digitalhub-stub, helpers
// ============================================================================

//! Runtime tests.

use digitalhub_client::ClientError;
use digitalhub_client::DeleteOptions;
use digitalhub_client::Entity;
use digitalhub_client::EntityRequest;
use digitalhub_client::EntityType;
use digitalhub_client::InvokeRequest;
use digitalhub_client::Method;
use digitalhub_client::ParamSource;
use digitalhub_client::Pipeline;
use digitalhub_client::PlatformClient;
use digitalhub_client::PollPolicy;
use digitalhub_client::RunOptions;
use digitalhub_client::SourceCode;
use digitalhub_client::Step;
use digitalhub_client::action_of;
use digitalhub_client::task_string;
use digitalhub_stub::StubOptions;
use serde_json::json;

use crate::helpers::harness_with;
use crate::helpers::harness_with_project;
use crate::helpers::quick_poll;

/// Creates an inline python function.
fn python_function(client: &PlatformClient, project: &str, name: &str) -> Entity {
    client
        .create(
            project,
            EntityRequest::function(name, "python")
                .with_source(SourceCode::python("def handler(x=1): return x * 2"))
                .with_handler("handler")
                .with_spec("python_version", "PYTHON3_12"),
        )
        .unwrap()
}

#[test]
fn tasks_bind_executables_to_actions() {
    let harness = harness_with_project("tasks");
    let client = &harness.client;
    let function = client
        .create("tasks", EntityRequest::function("box", "container").with_spec("image", "hello-world:latest"))
        .unwrap();
    let task = client.new_task(&function, "job", &["test"]).unwrap();
    assert_eq!(task.kind(), "container+job");
    assert_eq!(action_of(task.kind()), Some("job"));
    assert_eq!(task.spec_str("function"), Some(function.executable_string().as_str()));
    assert_eq!(task.metadata().labels, vec!["test".to_string()]);

    let found = client.find_task(&function, "job").unwrap();
    assert_eq!(found.id(), task.id());
    assert_eq!(client.ensure_task(&function, "job").unwrap().id(), task.id());
    assert!(client.find_task(&function, "serve").unwrap_err().is_not_found());

    client.delete_task(&function, "job").unwrap();
    assert!(client.find_task(&function, "job").unwrap_err().is_not_found());

    let artifact = client.create("tasks", EntityRequest::artifact("a", "artifact", "s3://b/a")).unwrap();
    assert!(matches!(client.new_task(&artifact, "job", &[]), Err(ClientError::Config(_))));
}

#[test]
fn job_runs_settle_and_expose_outputs() {
    let harness = harness_with(StubOptions::default().with_run_polls(3));
    let client = &harness.client;
    client.get_or_create_project("jobs").unwrap();
    let function = python_function(client, "jobs", "trainer");
    let run = client
        .run(
            &function,
            "job",
            RunOptions::default().with_parameter("x", 2).with_spec("outputs", json!(["model"])).local(),
        )
        .unwrap();
    assert_eq!(run.kind(), "python+job:run");
    assert_eq!(run.state(), Some("RUNNING"));
    assert_eq!(run.spec()["local_execution"], true);
    assert_eq!(run.spec()["parameters"]["x"], 2);
    let task = client.find_task(&function, "job").unwrap();
    assert_eq!(run.spec_str("task"), Some(task_string(task.kind(), &function.executable_string()).as_str()));

    let settled = client.wait_for_run(&run, &quick_poll()).unwrap();
    assert_eq!(settled.state(), Some("COMPLETED"));
    let model = client.run_output(&settled, "model").unwrap();
    assert_eq!(model.entity_type(), EntityType::Model);
    assert_eq!(model.name(), "trainer-model");
    assert!(client.run_output(&settled, "missing").unwrap_err().is_not_found());
}

#[test]
fn exhausted_waits_time_out() {
    let harness = harness_with(StubOptions::default().with_run_polls(10));
    let client = &harness.client;
    client.get_or_create_project("slow").unwrap();
    let function = python_function(client, "slow", "f");
    let policy = PollPolicy {
        max_attempts: 2,
        ..quick_poll()
    };
    let err = client.run(&function, "job", RunOptions::default().wait(policy)).unwrap_err();
    match err {
        ClientError::Timeout(message) => assert!(message.contains("2 attempts")),
        other => panic!("expected timeout, got {other}"),
    }
}

#[test]
fn deleting_a_function_cascades_to_runs() {
    let harness = harness_with_project("cascade");
    let client = &harness.client;
    let function = python_function(client, "cascade", "f");
    client.run(&function, "job", RunOptions::default().wait(quick_poll())).unwrap();
    client.run(&function, "build", RunOptions::default().wait(quick_poll())).unwrap();
    assert_eq!(client.list_runs(&function).unwrap().len(), 2);

    client.delete_entity(&function, DeleteOptions::default()).unwrap();
    assert!(client.list_runs(&function).unwrap().is_empty());
    assert!(client.list("cascade", EntityType::Task).unwrap().is_empty());
}

#[test]
fn build_runs_record_an_image() {
    let harness = harness_with_project("build");
    let client = &harness.client;
    let mut function = python_function(client, "build", "model-builder");
    client.run(&function, "build", RunOptions::default().wait(quick_poll())).unwrap();
    client.refresh(&mut function).unwrap();
    let image = function.spec_str("image").unwrap();
    assert!(image.starts_with("registry.local/build/model-builder:"));
}

#[test]
fn serve_runs_answer_after_warmup() {
    let harness = harness_with(StubOptions::default().with_run_polls(0).with_service_warmup(1));
    let client = &harness.client;
    client.get_or_create_project("serve").unwrap();
    let function = python_function(client, "serve", "api");
    let run = client.run(&function, "serve", RunOptions::default().wait(quick_poll())).unwrap();
    assert_eq!(run.state(), Some("RUNNING"));
    let url = PlatformClient::service_url(&run).unwrap();
    assert!(url.starts_with("http://"));

    let cold = client.invoke(&run, &InvokeRequest::default().with_path("/?page=5&size=10")).unwrap();
    assert_eq!(cold.status, 503);
    assert!(cold.ensure_success().is_err());

    let warm = client
        .invoke(&run, &InvokeRequest::default().with_method(Method::GET).with_path("/?page=5&size=10"))
        .unwrap();
    warm.ensure_success().unwrap();
    let echoed = warm.json().unwrap();
    assert_eq!(echoed["method"], "GET");
    assert_eq!(echoed["query"], "page=5&size=10");

    let payload = json!({
        "inputs": [{
            "name": "input-0",
            "shape": [2, 4],
            "datatype": "FP64",
            "data": [[5.1, 3.5, 1.4, 0.2], [6.2, 3.4, 5.4, 2.3]],
        }]
    });
    let inferred = client.invoke(&run, &InvokeRequest::infer("iris", payload)).unwrap();
    let body = inferred.json().unwrap();
    assert_eq!(body["model_name"], "iris");
    assert_eq!(body["outputs"][0]["shape"], json!([2]));

    client.delete_entity(&run, DeleteOptions::default()).unwrap();
    let gone = client.invoke(&run, &InvokeRequest::default()).unwrap();
    assert_eq!(gone.status, 404);
}

#[test]
fn runs_without_a_service_cannot_be_invoked() {
    let harness = harness_with_project("no-service");
    let client = &harness.client;
    let function = python_function(client, "no-service", "f");
    let run = client.run(&function, "job", RunOptions::default().wait(quick_poll())).unwrap();
    assert_eq!(PlatformClient::service_url(&run), None);
    let err = client.invoke(&run, &InvokeRequest::default().with_path("/?page=5&size=10")).unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)), "{err}");
}

#[test]
fn triggers_reference_the_task_and_executable() {
    let harness = harness_with_project("triggers");
    let client = &harness.client;
    let function = python_function(client, "triggers", "f");
    let trigger = client
        .trigger(
            &function,
            "job",
            EntityRequest::trigger("nightly", "scheduler").with_spec("schedule", "0 0 * * *"),
        )
        .unwrap();
    assert_eq!(trigger.spec_str("schedule"), Some("0 0 * * *"));
    assert_eq!(trigger.spec_str("function"), Some(function.executable_string().as_str()));
    assert_eq!(
        trigger.spec_str("task"),
        Some(task_string("python+job", &function.executable_string()).as_str())
    );
    let err = client.trigger(&function, "job", EntityRequest::artifact("x", "artifact", "s3://b/x")).unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
}

#[test]
fn pipelines_run_steps_in_order_and_wire_outputs() {
    let harness = harness_with_project("pipes");
    let client = &harness.client;
    python_function(client, "pipes", "train");
    let serve = python_function(client, "pipes", "serve");

    let mut pipeline = Pipeline::dag("pipeline");
    let train = pipeline.step(Step::new("train").action("job").outputs(["model"]));
    let deploy = pipeline.step(
        Step::new("serve")
            .named("deploy")
            .action("serve")
            .input("model", train.parameter("model"))
            .input("data", ParamSource::workflow("url")),
    );
    pipeline.then(&train, &deploy);
    let definition = pipeline.build().unwrap();
    let workflow = client
        .create(
            "pipes",
            EntityRequest::workflow("pipeline", "hera").with_spec("pipeline", definition.to_value().unwrap()),
        )
        .unwrap();

    let run = client
        .run(
            &workflow,
            "pipeline",
            RunOptions::default().with_parameter("url", "store://pipes/dataitem/table/d:1").wait(quick_poll()),
        )
        .unwrap();
    assert_eq!(run.kind(), "hera+pipeline:run");
    assert_eq!(run.state(), Some("COMPLETED"));

    let serve_runs = client.list_runs(&serve).unwrap();
    assert_eq!(serve_runs.len(), 1);
    let serve_run = &serve_runs[0];
    assert_eq!(serve_run.state(), Some("RUNNING"));
    let model_key = serve_run.spec()["inputs"]["model"].as_str().unwrap();
    assert!(model_key.starts_with("store://pipes/model/model/train-model:"));
    assert_eq!(serve_run.spec()["inputs"]["data"], "store://pipes/dataitem/table/d:1");
}

#[test]
fn failing_pipelines_surface_run_failed() {
    let harness = harness_with_project("broken");
    let client = &harness.client;
    let mut pipeline = Pipeline::steps("broken");
    pipeline.step(Step::new("missing-function").action("job"));
    let workflow = client
        .create(
            "broken",
            EntityRequest::workflow("broken", "hera")
                .with_spec("pipeline", pipeline.build().unwrap().to_value().unwrap()),
        )
        .unwrap();
    let err = client.run(&workflow, "pipeline", RunOptions::default().wait(quick_poll())).unwrap_err();
    assert!(matches!(err, ClientError::RunFailed { ref state, .. } if state == "ERROR"));
}
