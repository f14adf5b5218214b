// crates/digitalhub-client/tests/suites/transfer.rs
// ============================================================================
// Module: Export/Import Tests
// Description: YAML export files for entities and projects.
// Purpose: Pin file naming, round trips through the stub, and conflicts.
// Dependencies: digitalhub-client, tempfile, helpers
// ============================================================================

//! Export and import tests.

use digitalhub_client::ClientError;
use digitalhub_client::DeleteOptions;
use digitalhub_client::EntityRequest;
use digitalhub_client::EntityType;
use digitalhub_client::export_file_name;
use tempfile::TempDir;

use crate::helpers::harness_with_project;

#[test]
fn entity_export_restores_the_same_version() {
    let harness = harness_with_project("transfer");
    let client = &harness.client;
    let dir = TempDir::new().unwrap();
    let function = client
        .create(
            "transfer",
            EntityRequest::function("f", "container")
                .with_spec("image", "hello-world:latest")
                .with_description("Test export"),
        )
        .unwrap();
    let path = client.export(&function, dir.path()).unwrap();
    assert_eq!(path.file_name().unwrap().to_str().unwrap(), export_file_name(&function));
    assert_eq!(export_file_name(&function), format!("function-f-{}.yaml", function.id()));

    assert!(client.import(&path).unwrap_err().is_conflict());

    client.delete_entity(&function, DeleteOptions::default()).unwrap();
    let restored = client.import(&path).unwrap();
    assert_eq!(restored.id(), function.id());
    assert_eq!(restored.metadata().description.as_deref(), Some("Test export"));
    assert_eq!(restored.spec_str("image"), Some("hello-world:latest"));
}

#[test]
fn import_into_moves_entities_across_projects() {
    let harness = harness_with_project("source");
    let client = &harness.client;
    client.get_or_create_project("target").unwrap();
    let dir = TempDir::new().unwrap();
    let artifact = client.create("source", EntityRequest::artifact("a", "artifact", "s3://b/a")).unwrap();
    let path = client.project("source").export(&artifact, dir.path()).unwrap();

    let copied = client.project("target").import(&path).unwrap();
    assert_eq!(copied.project(), "target");
    assert_eq!(copied.id(), artifact.id());
    assert_eq!(client.list("target", EntityType::Artifact).unwrap().len(), 1);
}

#[test]
fn project_export_embeds_latest_entities() {
    let harness = harness_with_project("bundle");
    let client = &harness.client;
    let dir = TempDir::new().unwrap();
    let scope = client.project("bundle");
    scope.new_entity(EntityRequest::artifact("a", "artifact", "s3://b/a1")).unwrap();
    scope.new_entity(EntityRequest::artifact("a", "artifact", "s3://b/a2")).unwrap();
    scope.new_entity(EntityRequest::model("m", "model", "s3://b/m")).unwrap();
    scope.new_entity(EntityRequest::secret("token", "value")).unwrap();

    let path = scope.export_project(dir.path()).unwrap();
    assert_eq!(path.file_name().unwrap().to_str().unwrap(), "project-bundle.yaml");
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("entity_type: project"));
    assert!(!text.contains("token"));

    assert!(client.import_project(&path, false).unwrap_err().is_conflict());
    let loaded = client.load_project(&path).unwrap();
    assert_eq!(loaded.name(), "bundle");

    client.delete_project("bundle", true).unwrap();
    client.import_project(&path, true).unwrap();
    let artifacts = client.list("bundle", EntityType::Artifact).unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].spec_str("path"), Some("s3://b/a2"));
    assert_eq!(client.list("bundle", EntityType::Model).unwrap().len(), 1);
    assert!(client.list("bundle", EntityType::Secret).unwrap().is_empty());
}

#[test]
fn project_files_are_not_entity_imports() {
    let harness = harness_with_project("guard");
    let client = &harness.client;
    let dir = TempDir::new().unwrap();
    let path = client.export_project("guard", dir.path()).unwrap();
    let err = client.import_into("guard", &path).unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));

    let artifact = client.create("guard", EntityRequest::artifact("a", "artifact", "s3://b/a")).unwrap();
    let entity_file = client.export(&artifact, dir.path()).unwrap();
    assert!(matches!(client.import_project(&entity_file, false), Err(ClientError::Config(_))));
}

#[test]
fn load_project_overwrites_backend_changes_with_the_file() {
    let harness = harness_with_project("reload");
    let client = &harness.client;
    let dir = TempDir::new().unwrap();
    let mut project = client.get_project("reload").unwrap();
    project.metadata_mut().description = Some("from file".to_string());
    client.update_project(&project).unwrap();
    let kept = client.create("reload", EntityRequest::model("m", "model", "s3://b/m").with_description("v1")).unwrap();
    let dropped = client.create("reload", EntityRequest::artifact("a", "artifact", "s3://b/a")).unwrap();
    let path = client.export_project("reload", dir.path()).unwrap();

    let mut changed = client.get_project("reload").unwrap();
    changed.metadata_mut().description = Some("changed in backend".to_string());
    client.update_project(&changed).unwrap();
    let mut model = kept.clone();
    model.metadata_mut().description = Some("edited".to_string());
    client.update(&model).unwrap();
    client.delete_entity(&dropped, DeleteOptions::default()).unwrap();

    let loaded = client.load_project(&path).unwrap();
    assert_eq!(loaded.metadata().description.as_deref(), Some("from file"));
    let fetched = client.get_project("reload").unwrap();
    assert_eq!(fetched.metadata().description.as_deref(), Some("from file"));

    let models = client.get_versions("reload", EntityType::Model, "m").unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].id(), kept.id());
    assert_eq!(models[0].metadata().description.as_deref(), Some("v1"));
    let artifacts = client.list("reload", EntityType::Artifact).unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].id(), dropped.id());
}
