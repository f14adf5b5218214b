// system-tests/src/crud/trigger.rs
// ============================================================================
// Module: Trigger Case
// Description: Scheduler and lifecycle trigger tests over a python job.
// Purpose: Cover triggers bound by task string, by key, and via the function.
// Dependencies: digitalhub-client, tracing
// ============================================================================

use digitalhub_client::DeleteOptions;
use digitalhub_client::Entity;
use digitalhub_client::EntityRef;
use digitalhub_client::EntityRequest;
use digitalhub_client::EntityType;
use digitalhub_client::task_string;

use super::description;
use super::ensure_empty;
use super::ensure_exported;
use super::fixtures;
use super::fixtures::EXPORT_DESCRIPTION;
use super::fixtures::Fixture;
use super::fixtures::UPDATED_DESCRIPTION;
use super::fixtures::python_function;
use super::remove_export;
use crate::context::SuiteContext;
use crate::ensure_eq;
use crate::failure::TestFailure;
use crate::failure::TestResult;
use crate::runner::NamedTest;
use crate::runner::TestCase;

/// Function and job task a trigger fires.
struct Target {
    /// Function version.
    function: Entity,
    /// Job task of the function.
    task: Entity,
}

impl Target {
    /// Binds `request` by task string and executable string.
    fn bind(&self, request: EntityRequest) -> EntityRequest {
        let executable = self.function.executable_string();
        request
            .with_spec("task", task_string(self.task.kind(), &executable))
            .with_spec("function", executable)
    }

    /// Binds `request` by entity keys.
    fn bind_keys(&self, request: EntityRequest) -> EntityRequest {
        request
            .with_spec("task", self.task.key().to_string())
            .with_spec("function", self.function.key().to_string())
    }
}

/// Trigger lifecycle case.
pub struct TriggerCase<'a> {
    /// Suite context.
    context: &'a SuiteContext,
    /// Trigger fixtures.
    fixtures: Vec<Fixture>,
}

impl TriggerCase<'_> {
    /// Creates a fresh function version and its job task.
    fn target(&self) -> Result<Target, TestFailure> {
        let client = self.context.client();
        let request = python_function("trigger-function", "def handler(): return 'test'", "handler");
        let function = client.create(self.context.project_name(), request)?;
        let task = client.new_task(&function, "job", &[])?;
        Ok(Target {
            function,
            task,
        })
    }

    /// Returns the fixture single-trigger tests use.
    fn first(&self) -> Result<&Fixture, TestFailure> {
        self.fixtures.first().ok_or_else(|| TestFailure::Assertion("no trigger fixtures".to_string()))
    }

    /// Deletes the function with its tasks and checks no trigger is left.
    fn finish(&self, target: &Target) -> TestResult {
        self.context.client().delete_entity(&target.function, DeleteOptions::default())?;
        ensure_empty(self.context, EntityType::Trigger)
    }

    fn create_delete(&self) -> TestResult {
        let client = self.context.client();
        let project = self.context.project_name();
        let target = self.target()?;
        for fixture in &self.fixtures {
            let trigger = client.create(project, target.bind(fixture.pinned()))?;
            ensure_eq!(trigger.name(), fixture.name());
            ensure_eq!(trigger.kind(), fixture.kind());
            client.delete_entity(&trigger, DeleteOptions::default())?;

            let trigger = client.create(project, target.bind_keys(fixture.pinned()))?;
            client.delete(
                EntityType::Trigger,
                &EntityRef::version(project, trigger.name(), trigger.id()),
                DeleteOptions::default(),
            )?;

            let trigger = client.trigger(&target.function, "job", fixture.pinned())?;
            ensure_eq!(trigger.spec_str("function").unwrap_or_default(), target.function.executable_string());
            client.delete_entity(&trigger, DeleteOptions::default())?;
        }
        self.finish(&target)
    }

    fn get(&self) -> TestResult {
        let client = self.context.client();
        let project = self.context.project_name();
        let target = self.target()?;
        for fixture in &self.fixtures {
            let created = client.create(project, target.bind(fixture.pinned()))?;
            let by_name = client.get(EntityType::Trigger, &EntityRef::version(project, created.name(), created.id()))?;
            ensure_eq!(by_name.id(), created.id());
            let by_key = client.get(EntityType::Trigger, &EntityRef::Key(created.key()))?;
            ensure_eq!(by_key.id(), created.id());
        }
        for trigger in client.list(project, EntityType::Trigger)? {
            client.delete_entity(&trigger, DeleteOptions::default())?;
        }
        self.finish(&target)
    }

    fn import_export(&self) -> TestResult {
        let client = self.context.client();
        let target = self.target()?;
        let fixture = self.first()?;
        let request = target.bind(fixture.pinned()).with_description(EXPORT_DESCRIPTION);
        let trigger = client.create(self.context.project_name(), request)?;

        let path = client.export(&trigger, &self.context.export_dir())?;
        ensure_exported(&path)?;
        client.delete_entity(&trigger, DeleteOptions::default())?;
        ensure_empty(self.context, EntityType::Trigger)?;

        let imported = client.import(&path)?;
        ensure_eq!(imported.name(), fixture.name());
        ensure_eq!(imported.kind(), fixture.kind());
        ensure_eq!(description(&imported), EXPORT_DESCRIPTION);

        client.delete_entity(&imported, DeleteOptions::default())?;
        remove_export(&path)?;
        self.finish(&target)
    }

    fn list(&self) -> TestResult {
        ensure_empty(self.context, EntityType::Trigger)?;
        let client = self.context.client();
        let project = self.context.project_name();
        let target = self.target()?;
        for fixture in &self.fixtures {
            client.create(project, target.bind_keys(fixture.pinned()))?;
        }
        let listed = client.list(project, EntityType::Trigger)?;
        ensure_eq!(listed.len(), self.fixtures.len());
        for trigger in &listed {
            client.delete_entity(trigger, DeleteOptions::default())?;
        }
        self.finish(&target)
    }

    fn update_refresh(&self) -> TestResult {
        ensure_empty(self.context, EntityType::Trigger)?;
        let client = self.context.client();
        let target = self.target()?;
        let mut trigger = client.create(self.context.project_name(), target.bind(self.first()?.pinned()))?;

        trigger.metadata_mut().description = Some(UPDATED_DESCRIPTION.to_string());
        client.save(&mut trigger, true)?;

        let refreshed = client.get(EntityType::Trigger, &EntityRef::Key(trigger.key()))?;
        ensure_eq!(description(&refreshed), UPDATED_DESCRIPTION);

        client.refresh(&mut trigger)?;
        ensure_eq!(description(&trigger), UPDATED_DESCRIPTION);

        client.delete_entity(&trigger, DeleteOptions::default())?;
        self.finish(&target)
    }
}

impl TestCase for TriggerCase<'_> {
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

/// Builds the trigger case, removing leftover fixture triggers first.
///
/// # Errors
///
/// Never fails; leftover cleanup errors are logged and ignored.
pub fn build(context: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    let fixtures = fixtures::triggers();
    match context.project().list(EntityType::Trigger) {
        Ok(existing) => {
            for trigger in existing.iter().filter(|trigger| fixtures.iter().any(|f| f.name() == trigger.name())) {
                if let Err(err) = context.client().delete_entity(trigger, DeleteOptions::default()) {
                    tracing::debug!(trigger = %trigger.key(), error = %err, "leftover trigger kept");
                }
            }
        }
        Err(err) => tracing::debug!(error = %err, "leftover triggers not listed"),
    }
    Ok(Box::new(TriggerCase {
        context,
        fixtures,
    }))
}
