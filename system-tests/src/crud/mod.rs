// system-tests/src/crud/mod.rs
// ============================================================================
// Module: CRUD Cases
// Description: Entity lifecycle cases run by the `s0-crud` binary.
// Purpose: Exercise create, read, list, update, version, transfer, and delete
//          paths of every entity family against a live backend.
// Dependencies: digitalhub-client, tracing
// ============================================================================

//! ## Overview
//! [`run_suite`] resets the suite project, runs [`crate::registry::CRUD_CASES`]
//! in order and logs the final tally. Every case cleans up after itself so
//! that later cases start from an empty project.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod fixtures;
pub mod log;
pub mod project;
pub mod run;
pub mod secret;
pub mod task;
pub mod trigger;
pub mod versioned;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use digitalhub_client::ClientResult;
use digitalhub_client::Entity;
use digitalhub_client::EntityType;

use crate::context::SuiteContext;
use crate::ensure;
use crate::failure::TestFailure;
use crate::failure::TestResult;
use crate::registry::CRUD_CASES;
use crate::runner::RunReport;
use crate::runner::run_cases;

// ============================================================================
// SECTION: Suite
// ============================================================================

/// Resets the project, runs every registered case, and logs the summary.
///
/// # Errors
///
/// Returns [`digitalhub_client::ClientError`] when the project cannot be reset.
pub fn run_suite(context: &SuiteContext) -> ClientResult<RunReport> {
    tracing::info!("{}", "=".repeat(60));
    tracing::info!("DIGITALHUB SDK - CRUD TESTS");
    tracing::info!("{}", "=".repeat(60));
    reset_project(context)?;
    let report = run_cases(&CRUD_CASES, context);
    report.log_summary();
    Ok(report)
}

/// Deletes the suite project with its content and recreates it empty.
///
/// # Errors
///
/// Returns [`digitalhub_client::ClientError`] for failures other than a
/// missing project.
pub fn reset_project(context: &SuiteContext) -> ClientResult<Entity> {
    let client = context.client();
    ignore_not_found(client.delete_project(context.project_name(), true))?;
    client.get_or_create_project(context.project_name())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Treats "not found" as success.
pub(crate) fn ignore_not_found(result: ClientResult<()>) -> ClientResult<()> {
    match result {
        Err(err) if err.is_not_found() => Ok(()),
        other => other,
    }
}

/// Returns the description of an entity, empty when unset.
pub(crate) fn description(entity: &Entity) -> &str {
    entity.metadata().description.as_deref().unwrap_or_default()
}

/// Fails unless the suite project holds no entity of `entity_type`.
pub(crate) fn ensure_empty(context: &SuiteContext, entity_type: EntityType) -> TestResult {
    let listed = context.project().list(entity_type)?;
    ensure!(listed.is_empty(), "expected no {entity_type} entities, found {}", listed.len());
    Ok(())
}

/// Fails unless `path` exists.
pub(crate) fn ensure_exported(path: &Path) -> TestResult {
    ensure!(path.exists(), "export file {} was not written", path.display());
    Ok(())
}

/// Removes an export file.
pub(crate) fn remove_export(path: &Path) -> TestResult {
    fs::remove_file(path).map_err(|source| TestFailure::Io {
        path: path.to_path_buf(),
        source,
    })
}
