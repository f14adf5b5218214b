// system-tests/src/runner/tests.rs
// ============================================================================
// Module: Runner Unit Tests
// Description: Tallying, isolation, and exit status of the sequential runner.
// Purpose: Ensure one failing test never hides the rest of the run.
// Dependencies: digitalhub-client
// ============================================================================

//! ## Overview
//! Invariants:
//! - Failures and panics are counted and later tests still run.
//! - Case setup failures count as one failed `setup` test.
//! - The exit status is `1` iff something failed.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::cell::Cell;

use super::NamedTest;
use super::Outcome;
use super::RunReport;
use super::SETUP_TEST;
use super::TestCase;
use super::run_case;
use super::run_cases;
use crate::config::SuiteConfig;
use crate::context::SuiteContext;
use crate::failure::TestFailure;
use crate::registry::Registration;

/// Case mixing a failure, a panic, and two passes.
#[derive(Default)]
struct Scripted {
    /// Number of test bodies entered.
    entered: Cell<usize>,
}

impl Scripted {
    fn enter(&self) {
        self.entered.set(self.entered.get() + 1);
    }
}

impl TestCase for Scripted {
    fn tests(&self) -> Vec<NamedTest<'_>> {
        vec![
            NamedTest::new("test_a_passes", || {
                self.enter();
                Ok(())
            }),
            NamedTest::new("test_b_fails", || {
                self.enter();
                Err(TestFailure::Assertion("expected 3 got 2".to_string()))
            }),
            NamedTest::new("test_c_panics", || {
                self.enter();
                panic!("fixture exploded")
            }),
            NamedTest::new("test_d_passes", || {
                self.enter();
                Ok(())
            }),
        ]
    }
}

/// Case whose tests all pass.
struct Green;

impl TestCase for Green {
    fn tests(&self) -> Vec<NamedTest<'_>> {
        vec![NamedTest::new("test_one", || Ok(())), NamedTest::new("test_two", || Ok(()))]
    }
}

fn build_scripted(_: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    Ok(Box::new(Scripted::default()))
}

fn build_green(_: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    Ok(Box::new(Green))
}

fn build_broken(_: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    Err(TestFailure::Assertion("fixture unavailable".to_string()))
}

fn context() -> SuiteContext {
    SuiteContext::connect(SuiteConfig::default()).unwrap()
}

#[test]
fn failures_and_panics_do_not_stop_the_case() {
    let case = Scripted::default();
    let report = run_case("Scripted", &case);

    assert_eq!(case.entered.get(), 4);
    assert_eq!(report.passed(), 2);
    assert_eq!(report.failed(), 2);
    let names: Vec<_> = report.tests.iter().map(|test| test.name).collect();
    assert_eq!(names, ["test_a_passes", "test_b_fails", "test_c_panics", "test_d_passes"]);
    assert_eq!(report.tests[1].outcome, Outcome::Failed("assertion failed: expected 3 got 2".to_string()));
    assert_eq!(report.tests[2].outcome, Outcome::Failed("panicked: fixture exploded".to_string()));
}

#[test]
fn run_totals_sum_case_reports() {
    let registrations = [
        Registration {
            name: "Scripted",
            build: build_scripted,
        },
        Registration {
            name: "Green",
            build: build_green,
        },
    ];
    let report = run_cases(&registrations, &context());

    assert_eq!(report.cases.len(), 2);
    assert_eq!(report.total(), 6);
    assert_eq!(report.passed(), 4);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.passed() + report.failed(), report.total());
    assert_eq!(report.exit_status(), 1);
}

#[test]
fn setup_failure_counts_once_and_later_cases_run() {
    let registrations = [
        Registration {
            name: "Broken",
            build: build_broken,
        },
        Registration {
            name: "Green",
            build: build_green,
        },
    ];
    let report = run_cases(&registrations, &context());

    let broken = &report.cases[0];
    assert_eq!(broken.tests.len(), 1);
    assert_eq!(broken.tests[0].name, SETUP_TEST);
    assert_eq!(broken.failed(), 1);
    assert_eq!(report.cases[1].passed(), 2);
    assert_eq!(report.exit_status(), 1);
}

#[test]
fn exit_status_is_zero_only_without_failures() {
    assert_eq!(RunReport::default().exit_status(), 0);

    let registrations = [Registration {
        name: "Green",
        build: build_green,
    }];
    let report = run_cases(&registrations, &context());
    assert_eq!(report.total(), 2);
    assert_eq!(report.exit_status(), 0);
}

#[test]
fn repeated_runs_yield_identical_reports() {
    let registrations = [
        Registration {
            name: "Scripted",
            build: build_scripted,
        },
        Registration {
            name: "Broken",
            build: build_broken,
        },
    ];
    let context = context();
    assert_eq!(run_cases(&registrations, &context), run_cases(&registrations, &context));
}
