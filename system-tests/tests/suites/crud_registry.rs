// system-tests/tests/suites/crud_registry.rs
// ============================================================================
// Module: CRUD Registry Tests
// Description: Full registry runs, tallies, and export cleanup.
// Purpose: Pin the registered case order and a clean pass on the stub.
// Dependencies: digitalhub-tests, helpers
// ============================================================================

use digitalhub_tests::crud;
use digitalhub_tests::registry;
use digitalhub_tests::registry::CRUD_CASES;
use digitalhub_tests::runner::Outcome;
use digitalhub_tests::runner::RunReport;

use crate::helpers::leftover_files;
use crate::helpers::workspace;

/// Tests declared across all registered cases.
const REGISTERED_TESTS: usize = 64;

/// Renders every failed test as `Case::test: message`.
fn failures(report: &RunReport) -> Vec<String> {
    report
        .cases
        .iter()
        .flat_map(|case| {
            case.tests.iter().filter_map(move |test| match &test.outcome {
                Outcome::Failed(message) => Some(format!("{}::{}: {message}", case.name, test.name)),
                Outcome::Passed => None,
            })
        })
        .collect()
}

#[test]
fn registry_passes_against_stub() {
    let workspace = workspace("crud-tests");
    let report = crud::run_suite(&workspace.context).unwrap();

    let failed = failures(&report);
    assert!(failed.is_empty(), "failed tests:\n{}", failed.join("\n"));
    assert_eq!(report.total(), REGISTERED_TESTS);
    assert_eq!(report.exit_status(), 0);

    let ran: Vec<&str> = report.cases.iter().map(|case| case.name).collect();
    let registered: Vec<&str> = CRUD_CASES.iter().map(|registration| registration.name).collect();
    assert_eq!(ran, registered);
}

#[test]
fn repeated_runs_yield_identical_tallies() {
    let workspace = workspace("crud-repeat");
    let first = crud::run_suite(&workspace.context).unwrap();
    let second = crud::run_suite(&workspace.context).unwrap();
    assert_eq!(first.total(), second.total());
    assert_eq!(first.passed(), second.passed());
    assert_eq!(first.failed(), second.failed());
}

#[test]
fn export_files_are_removed_after_the_run() {
    let workspace = workspace("crud-exports");
    crud::run_suite(&workspace.context).unwrap();
    let leftovers = leftover_files(&workspace.export_dir());
    assert!(leftovers.is_empty(), "{} export files left behind", leftovers.len());
}

#[test]
fn registry_order_follows_entity_dependencies() {
    let names: Vec<&str> = CRUD_CASES.iter().map(|registration| registration.name).collect();
    assert_eq!(
        names,
        [
            "TestProjectCRUD",
            "TestArtifactCRUD",
            "TestDataitemCRUD",
            "TestModelCRUD",
            "TestSecretCRUD",
            "TestFunctionCRUD",
            "TestRunCRUD",
            "TestTaskCRUD",
            "TestWorkflowCRUD",
            "TestTriggerCRUD",
            "TestLogCRUD",
        ]
    );
    assert!(registry::find("TestSecretCRUD").is_some());
    assert!(registry::find("TestNothingCRUD").is_none());
}
