// system-tests/src/crud/project.rs
// ============================================================================
// Module: Project Case
// Description: Project create, update, transfer, load, and search tests.
// Purpose: Cover project-level operations on dedicated throwaway projects.
// Dependencies: digitalhub-client
// ============================================================================

//! ## Overview
//! This case ignores the suite project and works on `test-project-{1,2,3}`,
//! which its constructor removes up front.

use digitalhub_client::EntityRequest;
use digitalhub_client::EntityType;
use digitalhub_client::SourceCode;

use super::description;
use super::ensure_exported;
use super::ignore_not_found;
use super::remove_export;
use crate::context::SuiteContext;
use crate::ensure;
use crate::ensure_eq;
use crate::failure::TestFailure;
use crate::failure::TestResult;
use crate::runner::NamedTest;
use crate::runner::TestCase;

/// Project names, descriptions, and labels.
const PROJECTS: [(&str, &str, &[&str]); 3] = [
    ("test-project-1", "Test project 1", &["test", "project1"]),
    ("test-project-2", "Test project 2", &["test", "project2"]),
    ("test-project-3", "Test project 3", &[]),
];

/// Project request for `PROJECTS[index]`.
fn project_request(index: usize) -> EntityRequest {
    let (name, description, labels) = PROJECTS[index];
    EntityRequest::project(name).with_description(description).with_labels(labels.iter().copied())
}

/// Embedded python function.
fn embedded_function() -> EntityRequest {
    EntityRequest::function("test-function", "python")
        .with_source(SourceCode::python("def main(): return 'test'"))
        .with_handler("main")
        .with_spec("python_version", "PYTHON3_10")
        .embedded(true)
}

/// Embedded artifact.
fn embedded_artifact() -> EntityRequest {
    EntityRequest::artifact("test-artifact", "artifact", "./test.csv").embedded(true)
}

/// Embedded model.
fn embedded_model() -> EntityRequest {
    EntityRequest::model("test-model", "mlflow", "./model").embedded(true)
}

/// Embedded table dataitem.
fn embedded_dataitem() -> EntityRequest {
    EntityRequest::dataitem("test-dataitem", "table", "./test.csv").embedded(true)
}

/// Project lifecycle case.
pub struct ProjectCase<'a> {
    /// Suite context.
    context: &'a SuiteContext,
}

impl ProjectCase<'_> {
    /// Deletes a throwaway project with its content.
    fn drop_project(&self, name: &str) -> TestResult {
        self.context.client().delete_project(name, true)?;
        Ok(())
    }

    fn create_delete(&self) -> TestResult {
        let client = self.context.client();
        for index in 0..PROJECTS.len() {
            let request = project_request(index);
            let project = client.new_project(request.clone())?;
            ensure_eq!(project.name(), request.name());
            self.drop_project(project.name())?;

            let project = client.get_or_create_project(request.name())?;
            ensure_eq!(project.name(), request.name());
            self.drop_project(project.name())?;
        }
        Ok(())
    }

    fn export_import(&self) -> TestResult {
        let client = self.context.client();
        let project = client.new_project(project_request(0))?;
        let scope = client.project(project.name());
        scope.new_entity(embedded_artifact())?;
        scope.new_entity(embedded_function())?;

        let path = client.export(&project, &self.context.export_dir())?;
        ensure_exported(&path)?;
        self.drop_project(project.name())?;

        let imported = client.import_project(&path, false)?;
        ensure_eq!(imported.name(), project.name());

        let artifacts = scope.list(EntityType::Artifact)?;
        ensure_eq!(artifacts.len(), 1);
        ensure_eq!(artifacts[0].name(), "test-artifact");
        let functions = scope.list(EntityType::Function)?;
        ensure_eq!(functions.len(), 1);
        ensure_eq!(functions[0].name(), "test-function");

        self.drop_project(imported.name())?;
        remove_export(&path)
    }

    fn get_list(&self) -> TestResult {
        let client = self.context.client();
        let created = (0..PROJECTS.len())
            .map(|index| client.new_project(project_request(index)))
            .collect::<Result<Vec<_>, _>>()?;
        for project in &created {
            let fetched = client.get_project(project.name())?;
            ensure_eq!(fetched.name(), project.name());
        }
        let listed = client.list_projects()?;
        for project in &created {
            ensure!(
                listed.iter().any(|candidate| candidate.name() == project.name()),
                "{} missing from project list",
                project.name()
            );
        }
        for project in &created {
            self.drop_project(project.name())?;
        }
        Ok(())
    }

    fn load(&self) -> TestResult {
        let client = self.context.client();
        let request = project_request(1);
        let mut project = client.new_project(request.clone())?;
        let path = client.export(&project, &self.context.export_dir())?;

        project.metadata_mut().description = Some("Modified in backend".to_string());
        client.update_project(&project)?;
        let loaded = client.load_project(&path)?;
        ensure_eq!(loaded.name(), project.name());
        ensure_eq!(description(&loaded), request.description().unwrap_or_default());

        let fetched = client.get_project(project.name())?;
        ensure_eq!(description(&fetched), request.description().unwrap_or_default());

        self.drop_project(project.name())?;
        remove_export(&path)
    }

    fn search_entity(&self) -> TestResult {
        let client = self.context.client();
        let project = client.new_project(project_request(2))?;
        let scope = client.project(project.name());
        scope.new_entity(embedded_artifact())?;
        scope.new_entity(embedded_dataitem())?;
        scope.new_entity(embedded_model())?;
        scope.new_entity(embedded_function())?;

        let everything = scope.search(None, &[])?;
        ensure_eq!(everything.len(), 4);

        let artifacts = scope.search(None, &[EntityType::Artifact])?;
        ensure_eq!(artifacts.len(), 1);
        ensure_eq!(artifacts[0].name(), "test-artifact");

        let models = client.search_entity(project.name(), Some("test-model"), &[])?;
        ensure!(!models.is_empty(), "search by name found nothing");

        self.drop_project(project.name())
    }

    fn update_refresh(&self) -> TestResult {
        let client = self.context.client();
        let mut project = client.new_project(project_request(0))?;

        project.metadata_mut().description = Some("Updated description".to_string());
        let mut project = client.update_project(&project)?;
        ensure_eq!(description(&project), "Updated description");
        let fetched = client.get_project(project.name())?;
        ensure_eq!(description(&fetched), "Updated description");

        project.metadata_mut().description = Some("Another update".to_string());
        client.save(&mut project, true)?;
        ensure_eq!(description(&project), "Another update");

        let mut other = client.get_project(project.name())?;
        other.metadata_mut().description = Some("Yet another update".to_string());
        client.save(&mut other, true)?;

        client.refresh(&mut project)?;
        ensure_eq!(description(&project), "Yet another update");

        self.drop_project(project.name())
    }
}

impl TestCase for ProjectCase<'_> {
    fn tests(&self) -> Vec<NamedTest<'_>> {
        vec![
            NamedTest::new("test_create_delete", || self.create_delete()),
            NamedTest::new("test_export_import", || self.export_import()),
            NamedTest::new("test_get_list", || self.get_list()),
            NamedTest::new("test_load", || self.load()),
            NamedTest::new("test_search_entity", || self.search_entity()),
            NamedTest::new("test_update_refresh", || self.update_refresh()),
        ]
    }
}

/// Builds the project case, removing leftovers of earlier runs.
///
/// # Errors
///
/// Returns [`TestFailure::Client`] when a leftover project cannot be deleted.
pub fn build(context: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    for (name, _, _) in PROJECTS {
        ignore_not_found(context.client().delete_project(name, true))?;
    }
    Ok(Box::new(ProjectCase {
        context,
    }))
}
