// system-tests/src/crud/run.rs
// ============================================================================
// Module: Run Case
// Description: Run lifecycle tests over local python job and build runs.
// Purpose: Cover run creation from tasks, lookup, labels, and transfer.
// Dependencies: digitalhub-client
// ============================================================================

use digitalhub_client::DeleteOptions;
use digitalhub_client::Entity;
use digitalhub_client::EntityRef;
use digitalhub_client::EntityType;
use digitalhub_client::RunOptions;

use super::ensure_empty;
use super::ensure_exported;
use super::fixtures::UPDATED_LABELS;
use super::fixtures::python_function;
use super::remove_export;
use crate::context::SuiteContext;
use crate::ensure;
use crate::ensure_eq;
use crate::failure::TestFailure;
use crate::failure::TestResult;
use crate::runner::NamedTest;
use crate::runner::TestCase;

/// Runs created by the list test.
const LISTED_RUNS: usize = 3;

/// Run lifecycle case.
pub struct RunCase<'a> {
    /// Suite context.
    context: &'a SuiteContext,
}

impl RunCase<'_> {
    /// Creates a fresh version of the function runs execute.
    fn function(&self) -> Result<Entity, TestFailure> {
        let request = python_function("run-function", "def handler(x=1): return x * 2", "handler");
        Ok(self.context.client().create(self.context.project_name(), request)?)
    }

    /// Creates the job task of `function`.
    fn job_task(&self, function: &Entity) -> Result<Entity, TestFailure> {
        Ok(self.context.client().new_task(function, "job", &[])?)
    }

    /// Runs `task` locally.
    fn run(&self, task: &Entity) -> Result<Entity, TestFailure> {
        Ok(self.context.client().run_task(task, RunOptions::default().local())?)
    }

    /// Deletes the job task and the function, then checks no run is left.
    fn finish(&self, function: &Entity) -> TestResult {
        let client = self.context.client();
        client.delete_task(function, "job")?;
        client.delete_entity(function, DeleteOptions::default())?;
        ensure_empty(self.context, EntityType::Run)
    }

    fn create_delete(&self) -> TestResult {
        let client = self.context.client();
        let project = self.context.project_name();
        let function = self.function()?;
        for action in ["job", "build"] {
            let task = client.new_task(&function, action, &[])?;

            let run = self.run(&task)?;
            ensure_eq!(run.kind(), format!("python+{action}:run"));
            client.delete(EntityType::Run, &EntityRef::Key(run.key()), DeleteOptions::default())?;

            let run = self.run(&task)?;
            client.delete(EntityType::Run, &EntityRef::version(project, run.id(), run.id()), DeleteOptions::default())?;

            client.delete_task(&function, action)?;
        }
        client.delete_entity(&function, DeleteOptions::default())?;
        ensure_empty(self.context, EntityType::Run)
    }

    fn get(&self) -> TestResult {
        let client = self.context.client();
        let project = self.context.project_name();
        let function = self.function()?;
        let task = self.job_task(&function)?;
        for _ in 0..2 {
            let created = self.run(&task)?;
            let by_name = client.get(EntityType::Run, &EntityRef::name(project, created.name()))?;
            ensure_eq!(by_name.id(), created.id());
            let by_key = client.get(EntityType::Run, &EntityRef::Key(created.key()))?;
            ensure_eq!(by_key.id(), created.id());
        }
        for run in client.list(project, EntityType::Run)? {
            client.delete_entity(&run, DeleteOptions::default())?;
        }
        self.finish(&function)
    }

    fn import_export(&self) -> TestResult {
        let client = self.context.client();
        let function = self.function()?;
        let task = self.job_task(&function)?;
        let run = self.run(&task)?;

        let path = client.export(&run, &self.context.export_dir())?;
        ensure_exported(&path)?;
        client.delete_entity(&run, DeleteOptions::default())?;
        ensure_empty(self.context, EntityType::Run)?;

        let imported = client.import(&path)?;
        ensure_eq!(imported.kind(), "python+job:run");

        client.delete_entity(&imported, DeleteOptions::default())?;
        remove_export(&path)?;
        self.finish(&function)
    }

    fn list(&self) -> TestResult {
        ensure_empty(self.context, EntityType::Run)?;
        let client = self.context.client();
        let function = self.function()?;
        let task = self.job_task(&function)?;
        for _ in 0..LISTED_RUNS {
            self.run(&task)?;
        }
        let listed = client.list(self.context.project_name(), EntityType::Run)?;
        ensure_eq!(listed.len(), LISTED_RUNS);
        ensure_eq!(client.list_runs(&function)?.len(), LISTED_RUNS);
        for run in &listed {
            ensure_eq!(run.kind(), "python+job:run");
            client.delete_entity(run, DeleteOptions::default())?;
        }
        self.finish(&function)
    }

    fn update_refresh(&self) -> TestResult {
        ensure_empty(self.context, EntityType::Run)?;
        let client = self.context.client();
        let function = self.function()?;
        let task = self.job_task(&function)?;
        let mut run = self.run(&task)?;

        run.metadata_mut().labels = UPDATED_LABELS.iter().map(ToString::to_string).collect();
        client.save(&mut run, true)?;

        let refreshed = client.get(EntityType::Run, &EntityRef::Key(run.key()))?;
        ensure!(
            refreshed.metadata().labels == UPDATED_LABELS,
            "labels not updated: {}",
            refreshed.metadata().labels.join(",")
        );

        client.refresh(&mut run)?;
        ensure!(run.metadata().labels == UPDATED_LABELS, "labels not refreshed: {}", run.metadata().labels.join(","));

        client.delete_entity(&run, DeleteOptions::default())?;
        self.finish(&function)
    }
}

impl TestCase for RunCase<'_> {
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

/// Builds the run case.
///
/// # Errors
///
/// Never fails; the signature matches [`crate::registry::CaseBuilder`].
pub fn build(context: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    Ok(Box::new(RunCase {
        context,
    }))
}
