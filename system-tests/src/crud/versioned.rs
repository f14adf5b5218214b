// system-tests/src/crud/versioned.rs
// ============================================================================
// Module: Versioned Entity Cases
// Description: CRUD cases for artifacts, dataitems, models, functions, and
//              workflows.
// Purpose: Share one lifecycle script across every versioned entity family.
// Dependencies: digitalhub-client
// ============================================================================

//! ## Overview
//! Each family runs the same seven tests over its own fixtures. Material
//! (artifacts, dataitems, models) is deleted without cascade; executables
//! cascade into their tasks and runs.

use std::collections::BTreeSet;

use digitalhub_client::DeleteOptions;
use digitalhub_client::EntityRef;
use digitalhub_client::EntityType;

use super::description;
use super::ensure_empty;
use super::ensure_exported;
use super::fixtures;
use super::fixtures::EXPORT_DESCRIPTION;
use super::fixtures::Fixture;
use super::fixtures::PROJECT_DESCRIPTION;
use super::fixtures::UPDATED_DESCRIPTION;
use super::remove_export;
use crate::context::SuiteContext;
use crate::ensure;
use crate::ensure_eq;
use crate::failure::TestFailure;
use crate::failure::TestResult;
use crate::runner::NamedTest;
use crate::runner::TestCase;

/// Versions created by the versioning test.
const VERSION_COUNT: usize = 3;

/// Lifecycle case over one versioned entity family.
pub struct VersionedCase<'a> {
    /// Suite context.
    context: &'a SuiteContext,
    /// Entity family under test.
    entity_type: EntityType,
    /// Fixtures; the first one drives single-entity tests.
    fixtures: Vec<Fixture>,
    /// Delete options applied to single deletions.
    delete: DeleteOptions,
}

impl<'a> VersionedCase<'a> {
    /// Builds a case; material deletes without cascade.
    #[must_use]
    pub fn new(context: &'a SuiteContext, entity_type: EntityType, fixtures: Vec<Fixture>) -> Self {
        let delete = match entity_type {
            EntityType::Function | EntityType::Workflow => DeleteOptions::default(),
            _ => DeleteOptions::single(),
        };
        Self {
            context,
            entity_type,
            fixtures,
            delete,
        }
    }

    /// Returns the fixture single-entity tests use.
    fn first(&self) -> Result<&Fixture, TestFailure> {
        self.fixtures
            .first()
            .ok_or_else(|| TestFailure::Assertion(format!("no {} fixtures", self.entity_type)))
    }

    /// Deletes every version of `name`.
    fn delete_all_versions(&self, name: &str) -> TestResult {
        let target = EntityRef::name(self.context.project_name(), name);
        self.context.client().delete(self.entity_type, &target, self.delete.all_versions())?;
        Ok(())
    }

    fn create_delete(&self) -> TestResult {
        let client = self.context.client();
        let scope = self.context.project();
        let project = self.context.project_name();
        for fixture in &self.fixtures {
            let entity = client.create(project, fixture.pinned())?;
            ensure_eq!(entity.name(), fixture.name());
            ensure_eq!(entity.kind(), fixture.kind());
            client.delete(self.entity_type, &EntityRef::Key(entity.key()), self.delete)?;

            let entity = client.create(project, fixture.pinned())?;
            client.delete(self.entity_type, &EntityRef::version(project, entity.name(), entity.id()), self.delete)?;

            let entity = scope.new_entity(fixture.pinned())?;
            scope.delete(self.entity_type, &entity.key().to_string(), self.delete)?;
        }
        ensure_empty(self.context, self.entity_type)
    }

    fn get(&self) -> TestResult {
        let client = self.context.client();
        let project = self.context.project_name();
        for fixture in &self.fixtures {
            let created = client.create(project, fixture.pinned())?;
            let by_name = client.get(self.entity_type, &EntityRef::version(project, created.name(), created.id()))?;
            ensure_eq!(by_name.id(), created.id());
            let by_key = client.get(self.entity_type, &EntityRef::Key(created.key()))?;
            ensure_eq!(by_key.id(), created.id());
        }
        for entity in client.list(project, self.entity_type)? {
            client.delete_entity(&entity, self.delete)?;
        }
        ensure_empty(self.context, self.entity_type)
    }

    fn import_export(&self) -> TestResult {
        let client = self.context.client();
        let fixture = self.first()?;
        let entity = client
            .create(self.context.project_name(), fixture.pinned().with_description(EXPORT_DESCRIPTION))?;
        let path = client.export(&entity, &self.context.export_dir())?;
        ensure_exported(&path)?;

        client.delete_entity(&entity, self.delete)?;
        ensure_empty(self.context, self.entity_type)?;

        let imported = client.import(&path)?;
        ensure_eq!(imported.entity_type(), self.entity_type);
        ensure_eq!(imported.name(), fixture.name());
        ensure_eq!(imported.kind(), fixture.kind());
        ensure_eq!(description(&imported), EXPORT_DESCRIPTION);

        client.delete_entity(&imported, self.delete)?;
        remove_export(&path)
    }

    fn list(&self) -> TestResult {
        ensure_empty(self.context, self.entity_type)?;
        let client = self.context.client();
        let project = self.context.project_name();
        for fixture in &self.fixtures {
            client.create(project, fixture.pinned())?;
        }
        let listed = client.list(project, self.entity_type)?;
        ensure_eq!(listed.len(), self.fixtures.len());
        for entity in &listed {
            ensure_eq!(entity.entity_type(), self.entity_type);
            ensure!(
                self.fixtures.iter().any(|fixture| fixture.name() == entity.name() && fixture.kind() == entity.kind()),
                "unexpected {} {}",
                self.entity_type,
                entity.key()
            );
        }
        for entity in &listed {
            self.delete_all_versions(entity.name())?;
        }
        ensure_empty(self.context, self.entity_type)
    }

    fn project_integration(&self) -> TestResult {
        let scope = self.context.project();
        let mut entity = scope.new_entity(self.first()?.pinned())?;
        let key = entity.key().to_string();

        let retrieved = scope.get(self.entity_type, &key)?;
        ensure_eq!(retrieved.id(), entity.id());

        let listed = scope.list(self.entity_type)?;
        ensure_eq!(listed.len(), 1);
        ensure_eq!(listed[0].id(), entity.id());

        entity.metadata_mut().description = Some(PROJECT_DESCRIPTION.to_string());
        let updated = self.context.client().update(&entity)?;
        ensure_eq!(description(&updated), PROJECT_DESCRIPTION);

        scope.delete(self.entity_type, &key, self.delete)?;
        ensure!(scope.list(self.entity_type)?.is_empty(), "{} still listed after delete", key);
        Ok(())
    }

    fn update_refresh(&self) -> TestResult {
        ensure_empty(self.context, self.entity_type)?;
        let client = self.context.client();
        let mut entity = client.create(self.context.project_name(), self.first()?.pinned())?;

        entity.metadata_mut().description = Some(UPDATED_DESCRIPTION.to_string());
        client.save(&mut entity, true)?;

        let refreshed = client.get(self.entity_type, &EntityRef::Key(entity.key()))?;
        ensure_eq!(description(&refreshed), UPDATED_DESCRIPTION);

        client.refresh(&mut entity)?;
        ensure_eq!(description(&entity), UPDATED_DESCRIPTION);

        client.delete_entity(&entity, self.delete)?;
        Ok(())
    }

    fn versions(&self) -> TestResult {
        let client = self.context.client();
        let project = self.context.project_name();
        let fixture = self.first()?;
        for _ in 0..VERSION_COUNT {
            client.create(project, fixture.request())?;
        }

        let versions = client.get_versions(project, self.entity_type, fixture.name())?;
        ensure_eq!(versions.len(), VERSION_COUNT);
        ensure!(
            versions.iter().all(|version| version.name() == fixture.name()),
            "versions of {} carry another name",
            fixture.name()
        );
        let ids: BTreeSet<&str> = versions.iter().map(|version| version.id()).collect();
        ensure_eq!(ids.len(), VERSION_COUNT);

        let via_scope = self.context.project().get_versions(self.entity_type, fixture.name())?;
        ensure_eq!(via_scope.len(), VERSION_COUNT);

        self.delete_all_versions(fixture.name())?;
        ensure_empty(self.context, self.entity_type)
    }
}

impl TestCase for VersionedCase<'_> {
    fn tests(&self) -> Vec<NamedTest<'_>> {
        vec![
            NamedTest::new("test_create_delete", || self.create_delete()),
            NamedTest::new("test_get", || self.get()),
            NamedTest::new("test_import_export", || self.import_export()),
            NamedTest::new("test_list", || self.list()),
            NamedTest::new("test_project_integration", || self.project_integration()),
            NamedTest::new("test_update_refresh", || self.update_refresh()),
            NamedTest::new("test_versions", || self.versions()),
        ]
    }
}

// ============================================================================
// SECTION: Registrations
// ============================================================================

/// Builds the artifact case.
///
/// # Errors
///
/// Never fails; the signature matches [`crate::registry::CaseBuilder`].
pub fn build_artifact(context: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    Ok(Box::new(VersionedCase::new(context, EntityType::Artifact, fixtures::artifacts())))
}

/// Builds the dataitem case.
///
/// # Errors
///
/// Never fails; the signature matches [`crate::registry::CaseBuilder`].
pub fn build_dataitem(context: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    Ok(Box::new(VersionedCase::new(context, EntityType::Dataitem, fixtures::dataitems())))
}

/// Builds the model case.
///
/// # Errors
///
/// Never fails; the signature matches [`crate::registry::CaseBuilder`].
pub fn build_model(context: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    Ok(Box::new(VersionedCase::new(context, EntityType::Model, fixtures::models())))
}

/// Builds the function case.
///
/// # Errors
///
/// Never fails; the signature matches [`crate::registry::CaseBuilder`].
pub fn build_function(context: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    Ok(Box::new(VersionedCase::new(context, EntityType::Function, fixtures::functions())))
}

/// Builds the workflow case.
///
/// # Errors
///
/// Never fails; the signature matches [`crate::registry::CaseBuilder`].
pub fn build_workflow(context: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    Ok(Box::new(VersionedCase::new(context, EntityType::Workflow, fixtures::workflows())))
}
