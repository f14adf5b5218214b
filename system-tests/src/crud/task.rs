// system-tests/src/crud/task.rs
// ============================================================================
// Module: Task Case
// Description: Task lifecycle tests over a container function.
// Purpose: Cover task creation per action, lookup, labels, and transfer.
// Dependencies: digitalhub-client
// ============================================================================

use digitalhub_client::DeleteOptions;
use digitalhub_client::Entity;
use digitalhub_client::EntityRef;
use digitalhub_client::EntityRequest;
use digitalhub_client::EntityType;

use super::ensure_empty;
use super::ensure_exported;
use super::fixtures::UPDATED_LABELS;
use super::remove_export;
use crate::context::SuiteContext;
use crate::ensure;
use crate::ensure_eq;
use crate::failure::TestFailure;
use crate::failure::TestResult;
use crate::runner::NamedTest;
use crate::runner::TestCase;

/// Actions tasks are created for.
const ACTIONS: [&str; 2] = ["job", "serve"];

/// Task lifecycle case.
pub struct TaskCase<'a> {
    /// Suite context.
    context: &'a SuiteContext,
}

impl TaskCase<'_> {
    /// Creates a fresh version of the container function tasks bind to.
    fn function(&self) -> Result<Entity, TestFailure> {
        let request =
            EntityRequest::function("task-function", "container").with_spec("image", "hello-world:latest");
        Ok(self.context.client().create(self.context.project_name(), request)?)
    }

    /// Deletes the function with its tasks and checks nothing is left.
    fn finish(&self, function: &Entity) -> TestResult {
        self.context.client().delete_entity(function, DeleteOptions::default())?;
        ensure_empty(self.context, EntityType::Task)
    }

    fn create_delete(&self) -> TestResult {
        let client = self.context.client();
        let function = self.function()?;
        for action in ACTIONS {
            let task = client.new_task(&function, action, &[])?;
            ensure_eq!(task.kind(), format!("container+{action}"));
            ensure_eq!(task.spec_str("function").unwrap_or_default(), function.executable_string());
            client.delete(EntityType::Task, &EntityRef::Key(task.key()), DeleteOptions::default())?;

            let task = client.new_task(&function, action, &[])?;
            client.delete_entity(&task, DeleteOptions::default())?;
        }
        self.finish(&function)
    }

    fn get(&self) -> TestResult {
        let client = self.context.client();
        let project = self.context.project_name();
        let function = self.function()?;
        for action in ACTIONS {
            let created = client.new_task(&function, action, &[])?;
            let by_name = client.get(EntityType::Task, &EntityRef::name(project, created.name()))?;
            ensure_eq!(by_name.id(), created.id());
            let by_key = client.get(EntityType::Task, &EntityRef::Key(created.key()))?;
            ensure_eq!(by_key.id(), created.id());
        }
        for task in client.list(project, EntityType::Task)? {
            client.delete_entity(&task, DeleteOptions::default())?;
        }
        self.finish(&function)
    }

    fn import_export(&self) -> TestResult {
        let client = self.context.client();
        let function = self.function()?;
        let task = client.new_task(&function, "job", &["test", "export"])?;

        let path = client.export(&task, &self.context.export_dir())?;
        ensure_exported(&path)?;
        client.delete_entity(&task, DeleteOptions::default())?;
        ensure_empty(self.context, EntityType::Task)?;

        let imported = client.import(&path)?;
        ensure_eq!(imported.spec_str("function").unwrap_or_default(), function.executable_string());
        ensure_eq!(imported.kind(), "container+job");

        client.delete_entity(&imported, DeleteOptions::default())?;
        remove_export(&path)?;
        self.finish(&function)
    }

    fn list(&self) -> TestResult {
        ensure_empty(self.context, EntityType::Task)?;
        let client = self.context.client();
        let function = self.function()?;
        for action in ACTIONS {
            client.new_task(&function, action, &[])?;
        }
        let listed = client.list(self.context.project_name(), EntityType::Task)?;
        ensure_eq!(listed.len(), ACTIONS.len());
        for task in &listed {
            ensure!(task.kind().starts_with("container+"), "unexpected task kind {}", task.kind());
            client.delete_entity(task, DeleteOptions::default())?;
        }
        self.finish(&function)
    }

    fn update_refresh(&self) -> TestResult {
        ensure_empty(self.context, EntityType::Task)?;
        let client = self.context.client();
        let function = self.function()?;
        let mut task = client.new_task(&function, "job", &[])?;

        task.metadata_mut().labels = UPDATED_LABELS.iter().map(ToString::to_string).collect();
        client.save(&mut task, true)?;

        let refreshed = client.get(EntityType::Task, &EntityRef::Key(task.key()))?;
        ensure!(
            refreshed.metadata().labels == UPDATED_LABELS,
            "labels not updated: {}",
            refreshed.metadata().labels.join(",")
        );

        client.refresh(&mut task)?;
        ensure!(
            task.metadata().labels == UPDATED_LABELS,
            "labels not refreshed: {}",
            task.metadata().labels.join(",")
        );

        client.delete_entity(&task, DeleteOptions::default())?;
        self.finish(&function)
    }
}

impl TestCase for TaskCase<'_> {
    fn tests(&self) -> Vec<NamedTest<'_>> {
        vec![
            NamedTest::new("test_create_delete", || self.create_delete()),
            NamedTest::new("test_get", || self.get()),
            NamedTest::new("test_import_export", || self.import_export()),
            NamedTest::new("test_list", || self.list()),
            NamedTest::new("test_update_refresh", || self.update_refresh()),
        ]
    }
}

/// Builds the task case.
///
/// # Errors
///
/// Never fails; the signature matches [`crate::registry::CaseBuilder`].
pub fn build(context: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    Ok(Box::new(TaskCase {
        context,
    }))
}
