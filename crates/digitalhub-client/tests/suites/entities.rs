// crates/digitalhub-client/tests/suites/entities.rs
// ============================================================================
// Module: Entity CRUD Tests
// Description: Project and context entity lifecycle against the stub.
// Purpose: Pin create/get/list/update/delete semantics and error mapping.
// Dependencies: digitalhub-client, helpers
// ============================================================================

//! Entity lifecycle tests.

use digitalhub_client::ClientConfig;
use digitalhub_client::ClientError;
use digitalhub_client::DeleteOptions;
use digitalhub_client::EntityRef;
use digitalhub_client::EntityRequest;
use digitalhub_client::EntityType;
use digitalhub_client::ListFilter;
use digitalhub_client::PlatformClient;
use digitalhub_client::SourceCode;
use digitalhub_stub::StubOptions;

use crate::helpers::harness;
use crate::helpers::harness_with;
use crate::helpers::harness_with_project;

#[test]
fn project_lifecycle_maps_conflict_and_missing() {
    let harness = harness();
    let client = &harness.client;
    let created = client.new_project(EntityRequest::project("crud").with_description("first")).unwrap();
    assert_eq!(created.name(), "crud");
    assert_eq!(created.key().to_string(), "store://crud");

    let duplicate = client.new_project(EntityRequest::project("crud")).unwrap_err();
    assert!(duplicate.is_conflict());

    let mut fetched = client.get_or_create_project("crud").unwrap();
    assert_eq!(fetched.metadata().description.as_deref(), Some("first"));
    fetched.metadata_mut().description = Some("second".to_string());
    client.update(&fetched).unwrap();
    client.refresh(&mut fetched).unwrap();
    assert_eq!(fetched.metadata().description.as_deref(), Some("second"));

    assert_eq!(client.list_projects().unwrap().len(), 1);
    client.delete_project("crud", true).unwrap();
    assert!(client.get_project("crud").unwrap_err().is_not_found());
    assert!(client.delete_project("crud", true).unwrap_err().is_not_found());
}

#[test]
fn versions_are_listed_and_resolved_by_name() {
    let harness = harness_with_project("versions");
    let scope = harness.client.project("versions");
    let first = scope.new_entity(EntityRequest::artifact("data", "artifact", "s3://bucket/a")).unwrap();
    let second = scope.new_entity(EntityRequest::artifact("data", "artifact", "s3://bucket/b")).unwrap();
    scope.new_entity(EntityRequest::artifact("other", "artifact", "s3://bucket/c")).unwrap();

    let latest = scope.get(EntityType::Artifact, "data").unwrap();
    assert_eq!(latest.id(), second.id());
    let pinned = scope.get_version(EntityType::Artifact, "data", first.id()).unwrap();
    assert_eq!(pinned.spec_str("path"), Some("s3://bucket/a"));
    let by_key = scope.get(EntityType::Artifact, &first.key().to_string()).unwrap();
    assert_eq!(by_key.id(), first.id());

    assert_eq!(scope.get_versions(EntityType::Artifact, "data").unwrap().len(), 2);
    assert_eq!(scope.list(EntityType::Artifact).unwrap().len(), 2);

    scope.delete(EntityType::Artifact, "data", DeleteOptions::single().all_versions()).unwrap();
    assert!(scope.get(EntityType::Artifact, "data").unwrap_err().is_not_found());
    assert_eq!(scope.list(EntityType::Artifact).unwrap().len(), 1);
}

#[test]
fn save_creates_a_new_version_unless_updating() {
    let harness = harness_with_project("save");
    let client = &harness.client;
    let mut model = client.create("save", EntityRequest::model("m", "model", "s3://bucket/m")).unwrap();
    let original = model.id().to_string();

    model.metadata_mut().description = Some("in place".to_string());
    client.save(&mut model, true).unwrap();
    assert_eq!(model.id(), original);

    client.save(&mut model, false).unwrap();
    assert_ne!(model.id(), original);
    assert_eq!(client.get_versions("save", EntityType::Model, "m").unwrap().len(), 2);
}

#[test]
fn keys_of_another_type_are_rejected() {
    let harness = harness_with_project("keys");
    let scope = harness.client.project("keys");
    let artifact = scope.new_entity(EntityRequest::artifact("a", "artifact", "s3://bucket/a")).unwrap();
    let err = harness
        .client
        .get(EntityType::Model, &EntityRef::Key(artifact.key()))
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidKey(_)));
}

#[test]
fn list_filters_by_kind() {
    let harness = harness_with_project("filters");
    let scope = harness.client.project("filters");
    scope
        .new_entity(
            EntityRequest::function("py", "python")
                .with_source(SourceCode::python("def main(): return 1"))
                .with_handler("main"),
        )
        .unwrap();
    scope.new_entity(EntityRequest::function("box", "container").with_spec("image", "hello-world:latest")).unwrap();
    let python = scope.list_filtered(EntityType::Function, &ListFilter::kind("python")).unwrap();
    assert_eq!(python.len(), 1);
    assert_eq!(python[0].name(), "py");
    let source = python[0].spec().get("source").unwrap();
    assert_eq!(source["handler"], "main");
    assert_eq!(source["lang"], "python");
}

#[test]
fn secrets_store_values_outside_documents() {
    let harness = harness_with_project("secrets");
    let scope = harness.client.project("secrets");
    let secret = scope.new_entity(EntityRequest::secret("token", "s3cr3t")).unwrap();
    assert!(!secret.spec().values().any(|value| value == "s3cr3t"));
    assert_eq!(scope.read_secret("token").unwrap(), "s3cr3t");

    harness.client.set_secret_value(&secret, "rotated").unwrap();
    assert_eq!(harness.client.read_secret_value(&secret).unwrap(), "rotated");

    scope.delete(EntityType::Secret, "token", DeleteOptions::default()).unwrap();
    assert!(harness.client.read_secret_value(&secret).unwrap_err().is_not_found());
}

#[test]
fn search_tags_hits_with_their_type() {
    let harness = harness_with_project("search");
    let scope = harness.client.project("search");
    scope.new_entity(EntityRequest::artifact("shared", "artifact", "s3://bucket/a")).unwrap();
    scope.new_entity(EntityRequest::model("shared", "model", "s3://bucket/m")).unwrap();
    let all = scope.search(Some("shared"), &[]).unwrap();
    assert_eq!(all.len(), 2);
    let models = scope.search(Some("shared"), &[EntityType::Model]).unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].entity_type(), EntityType::Model);
}

#[test]
fn bearer_token_is_required_and_forwarded() {
    let harness = harness_with(StubOptions::default().with_access_token("token-1"));
    harness.client.get_or_create_project("auth").unwrap();

    let anonymous = PlatformClient::new(ClientConfig::new(harness.stub.base_url())).unwrap();
    let err = anonymous.list_projects().unwrap_err();
    assert!(matches!(err, ClientError::Http { status: 401, .. }));
}

#[test]
fn invalid_endpoints_are_rejected() {
    let err = PlatformClient::new(ClientConfig::new("ftp://example.com")).unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
    let err = PlatformClient::new(ClientConfig::new("not a url")).unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
}
