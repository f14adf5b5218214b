// crates/digitalhub-client/tests/suites/material.rs
// ============================================================================
// Module: Material Logging Tests
// Description: Upload-and-register helpers for artifacts, dataitems, models.
// Purpose: Pin upload targets, file info, and drop-existing semantics.
// Dependencies: digitalhub-client, tempfile, helpers
// ============================================================================

//! Material logging tests.

use digitalhub_client::ClientError;
use digitalhub_client::EntityType;
use digitalhub_client::LogOptions;
use digitalhub_client::LogSource;
use digitalhub_client::Table;
use digitalhub_client::sha256_label;

use crate::helpers::harness_with_project;

const CSV: &[u8] = b"id,value\n1,10\n2,20\n";

#[test]
fn logged_material_is_uploaded_and_described() {
    let harness = harness_with_project("material");
    let scope = harness.client.project("material");
    let options = LogOptions {
        description: Some("sample table".to_string()),
        labels: vec!["csv".to_string()],
        ..LogOptions::default()
    };
    let table = scope.log_table("sample", &LogSource::bytes("sample.csv", CSV), &options).unwrap();
    assert_eq!(table.kind(), "table");
    assert_eq!(table.state(), Some("READY"));
    assert_eq!(table.metadata().description.as_deref(), Some("sample table"));
    assert_eq!(table.metadata().labels, vec!["csv".to_string()]);

    let path = table.spec_str("path").unwrap();
    let stored = path.strip_prefix("s3://stub/").unwrap();
    assert!(stored.ends_with("/sample.csv"));
    assert_eq!(harness.stub.uploaded_file(stored).unwrap(), CSV);

    let files = table.status()["files"].as_array().unwrap();
    assert_eq!(files[0]["name"], "sample.csv");
    assert_eq!(files[0]["size"], CSV.len());
    assert_eq!(files[0]["hash"], sha256_label(CSV).as_str());
}

#[test]
fn in_memory_tables_upload_as_csv() {
    let harness = harness_with_project("frames");
    let scope = harness.client.project("frames");
    let mut rows = Table::new(["id", "value"]);
    rows.push_row(["1", "10"]).unwrap();
    rows.push_row(["2", "20"]).unwrap();
    let options = LogOptions::default();

    let table = scope.log_table("frame", &LogSource::table(rows.clone()), &options).unwrap();
    let typed = scope.log_dataitem("frame", "table", &LogSource::table(rows), &options).unwrap();
    assert_eq!(table.kind(), "table");
    assert_eq!(typed.kind(), "table");

    let stored = table.spec_str("path").unwrap().strip_prefix("s3://stub/").unwrap();
    assert!(stored.ends_with("/data.csv"));
    assert_eq!(harness.stub.uploaded_file(stored).unwrap(), CSV);
    assert_eq!(table.status()["files"][0]["hash"], sha256_label(CSV).as_str());
    assert_eq!(harness.client.get_versions("frames", EntityType::Dataitem, "frame").unwrap().len(), 2);
}

#[test]
fn kinds_follow_the_helper_used() {
    let harness = harness_with_project("kinds");
    let scope = harness.client.project("kinds");
    let source = LogSource::bytes("blob.bin", vec![1_u8, 2, 3]);
    let options = LogOptions::default();
    let cases = [
        (scope.log_generic_artifact("a", &source, &options).unwrap(), "artifact"),
        (scope.log_croissant("c", &source, &options).unwrap(), "croissant"),
        (scope.log_generic_dataitem("d", &source, &options).unwrap(), "dataitem"),
        (scope.log_generic_model("m", &source, &options).unwrap(), "model"),
        (scope.log_sklearn("s", &source, &options).unwrap(), "sklearn"),
        (scope.log_mlflow("f", &source, &options).unwrap(), "mlflow"),
        (scope.log_huggingface("h", &source, &options).unwrap(), "huggingface"),
    ];
    for (entity, kind) in cases {
        assert_eq!(entity.kind(), kind);
    }
}

#[test]
fn drop_existing_replaces_every_version() {
    let harness = harness_with_project("drop");
    let scope = harness.client.project("drop");
    let source = LogSource::bytes("v.txt", b"v".to_vec());
    scope.log_generic_artifact("a", &source, &LogOptions::default()).unwrap();
    scope.log_generic_artifact("a", &source, &LogOptions::default()).unwrap();
    assert_eq!(scope.get_versions(EntityType::Artifact, "a").unwrap().len(), 2);

    scope.log_generic_artifact("a", &source, &LogOptions::drop_existing()).unwrap();
    assert_eq!(scope.get_versions(EntityType::Artifact, "a").unwrap().len(), 1);

    scope.log_generic_artifact("fresh", &source, &LogOptions::drop_existing()).unwrap();
    assert_eq!(scope.get_versions(EntityType::Artifact, "fresh").unwrap().len(), 1);
}

#[test]
fn file_sources_use_their_file_name() {
    let harness = harness_with_project("files");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.pkl");
    std::fs::write(&path, b"weights").unwrap();
    let model = harness
        .client
        .log_model("files", "clf", "sklearn", &LogSource::file(&path), &LogOptions::default())
        .unwrap();
    assert!(model.spec_str("path").unwrap().ends_with("/weights.pkl"));

    let missing = LogSource::file(dir.path().join("missing.pkl"));
    let err = harness.client.log_generic_model("files", "x", &missing, &LogOptions::default()).unwrap_err();
    assert!(matches!(err, ClientError::Io { .. }));
}

#[test]
fn only_material_types_can_be_logged() {
    let harness = harness_with_project("guard");
    let err = harness
        .client
        .log_entity(
            "guard",
            EntityType::Function,
            "f",
            "python",
            &LogSource::bytes("f.py", b"x".to_vec()),
            &LogOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
}
