// crates/digitalhub-stub/src/tests.rs
// ============================================================================
// Module: Stub Tests
// Description: Raw HTTP checks of the stub contract.
// Purpose: Pin status codes, paging, auth, and run emulation.
// Dependencies: digitalhub-stub, reqwest, serde_json
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;
use serde_json::json;

use crate::StubOptions;
use crate::spawn_platform_stub;

/// Posts JSON and returns status and body.
fn post(client: &Client, url: &str, body: &Value) -> (StatusCode, Value) {
    let response = client.post(url).json(body).send().unwrap();
    let status = response.status();
    (status, response.json().unwrap_or(Value::Null))
}

/// Gets JSON and returns status and body.
fn fetch(client: &Client, url: &str) -> (StatusCode, Value) {
    let response = client.get(url).send().unwrap();
    let status = response.status();
    (status, response.json().unwrap_or(Value::Null))
}

/// Minimal entity document.
fn doc(id: &str, name: &str, kind: &str) -> Value {
    json!({ "id": id, "name": name, "kind": kind, "spec": {}, "status": {} })
}

#[test]
fn projects_conflict_and_missing() {
    let stub = spawn_platform_stub(StubOptions::default()).unwrap();
    let client = Client::new();
    let projects = format!("{}/api/v1/projects", stub.base_url());
    assert_eq!(post(&client, &projects, &doc("p", "p", "project")).0, StatusCode::OK);
    assert_eq!(post(&client, &projects, &doc("p", "p", "project")).0, StatusCode::CONFLICT);
    assert_eq!(fetch(&client, &format!("{projects}/missing")).0, StatusCode::NOT_FOUND);
    let artifacts = format!("{}/api/v1/-/missing/artifacts", stub.base_url());
    assert_eq!(post(&client, &artifacts, &doc("a", "a", "artifact")).0, StatusCode::NOT_FOUND);
}

#[test]
fn lists_latest_versions_newest_first_with_paging() {
    let stub = spawn_platform_stub(StubOptions::default()).unwrap();
    let client = Client::new();
    let base = stub.base_url();
    post(&client, &format!("{base}/api/v1/projects"), &doc("p", "p", "project"));
    let artifacts = format!("{base}/api/v1/-/p/artifacts");
    for (id, name) in [("1", "a"), ("2", "a"), ("3", "b")] {
        assert_eq!(post(&client, &artifacts, &doc(id, name, "artifact")).0, StatusCode::OK);
    }
    let (_, latest) = fetch(&client, &artifacts);
    let ids: Vec<&str> = latest["content"].as_array().unwrap().iter().map(|d| d["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["3", "2"]);

    let (_, all) = fetch(&client, &format!("{artifacts}?name=a&versions=all&page=0&size=1"));
    assert_eq!(all["content"].as_array().unwrap().len(), 1);
    assert_eq!(all["last"], false);
    let (_, second) = fetch(&client, &format!("{artifacts}?name=a&versions=all&page=1&size=1"));
    assert_eq!(second["content"][0]["id"], "1");
    assert_eq!(second["last"], true);
}

#[test]
fn rejects_requests_without_token() {
    let stub = spawn_platform_stub(StubOptions::default().with_access_token("secret-token")).unwrap();
    let client = Client::new();
    let projects = format!("{}/api/v1/projects", stub.base_url());
    assert_eq!(fetch(&client, &projects).0, StatusCode::UNAUTHORIZED);
    let response = client.get(&projects).bearer_auth("secret-token").send().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn pipeline_runs_steps_and_exposes_service() {
    let stub = spawn_platform_stub(StubOptions::default().with_run_polls(0).with_service_warmup(0)).unwrap();
    let client = Client::new();
    let base = stub.base_url();
    post(&client, &format!("{base}/api/v1/projects"), &doc("p", "p", "project"));
    let functions = format!("{base}/api/v1/-/p/functions");
    post(&client, &functions, &doc("f1", "train", "python"));
    post(&client, &functions, &doc("f2", "serve", "python"));
    let mut workflow = doc("w1", "pipeline", "hera");
    workflow["spec"]["pipeline"] = json!({
        "entrypoint": "dag",
        "kind": "dag",
        "steps": [
            { "name": "train", "function": "train", "template": { "action": "job" }, "outputs": ["model"] },
            {
                "name": "serve", "function": "serve", "template": { "action": "serve" },
                "inputs": { "model": { "from": "output", "step": "train", "parameter": "model" } }
            }
        ],
        "order": ["train", "serve"],
    });
    post(&client, &format!("{base}/api/v1/-/p/workflows"), &workflow);
    let mut run = doc("r1", "r1", "hera+pipeline:run");
    run["spec"] = json!({ "workflow": "hera://p/pipeline:w1", "parameters": {} });
    let (_, created) = post(&client, &format!("{base}/api/v1/-/p/runs"), &run);
    assert_eq!(created["status"]["state"], "COMPLETED");

    let (_, serve_runs) = fetch(&client, &format!("{base}/api/v1/-/p/runs?function=python://p/serve:f2"));
    let serve_run = &serve_runs["content"][0];
    assert_eq!(serve_run["status"]["state"], "RUNNING");
    assert!(serve_run["spec"]["inputs"]["model"].as_str().unwrap().starts_with("store://p/model/model/"));
    let service = serve_run["status"]["service"]["url"].as_str().unwrap();
    let (status, echoed) = fetch(&client, &format!("http://{service}/?page=5"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(echoed["query"], "page=5");
}

#[test]
fn job_runs_settle_after_polls() {
    let stub = spawn_platform_stub(StubOptions::default().with_run_polls(2)).unwrap();
    let client = Client::new();
    let base = stub.base_url();
    post(&client, &format!("{base}/api/v1/projects"), &doc("p", "p", "project"));
    post(&client, &format!("{base}/api/v1/-/p/functions"), &doc("f", "f", "python"));
    let mut run = doc("r", "r", "python+job:run");
    run["spec"] = json!({ "function": "python://p/f:f" });
    let (_, created) = post(&client, &format!("{base}/api/v1/-/p/runs"), &run);
    assert_eq!(created["status"]["state"], "RUNNING");
    let run_url = format!("{base}/api/v1/-/p/runs/r");
    assert_eq!(fetch(&client, &run_url).1["status"]["state"], "RUNNING");
    assert_eq!(fetch(&client, &run_url).1["status"]["state"], "COMPLETED");
}
