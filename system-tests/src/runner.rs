// system-tests/src/runner.rs
// ============================================================================
// Module: Sequential Runner
// Description: Runs registered test cases one test at a time and tallies them.
// Purpose: Give the CRUD suite per-test isolation and a single exit status.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! A [`TestCase`] exposes its tests as [`NamedTest`] closures. The runner
//! executes cases in registration order and tests in the order the case
//! lists them. A failing or panicking test is logged and counted; it never
//! stops the remaining tests.
//! Invariants:
//! - `passed + failed` equals the number of executed tests.
//! - The exit status is `0` only when no test failed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::process::ExitCode;

use crate::context::SuiteContext;
use crate::failure::TestFailure;
use crate::failure::TestResult;
use crate::registry::Registration;

// ============================================================================
// SECTION: Test Cases
// ============================================================================

/// Test name used when a case cannot be constructed.
pub const SETUP_TEST: &str = "setup";

/// One runnable test of a case.
pub struct NamedTest<'a> {
    /// Test name as printed by the runner.
    pub name: &'static str,
    /// Test body.
    run: Box<dyn Fn() -> TestResult + 'a>,
}

impl<'a> NamedTest<'a> {
    /// Wraps a test body.
    pub fn new(name: &'static str, run: impl Fn() -> TestResult + 'a) -> Self {
        Self {
            name,
            run: Box::new(run),
        }
    }

    /// Runs the body, converting panics into failures.
    fn execute(&self) -> TestResult {
        catch_unwind(AssertUnwindSafe(|| (self.run)()))
            .unwrap_or_else(|payload| Err(TestFailure::Panic(panic_message(&*payload))))
    }
}

/// A group of tests sharing a fixture.
pub trait TestCase {
    /// Lists the tests in execution order.
    fn tests(&self) -> Vec<NamedTest<'_>>;
}

/// Extracts the panic message from a payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Outcome of one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The test returned `Ok`.
    Passed,
    /// The test failed; carries the rendered failure.
    Failed(String),
}

/// Outcome of one test, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    /// Test name.
    pub name: &'static str,
    /// Outcome.
    pub outcome: Outcome,
}

/// Outcomes of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    /// Case name.
    pub name: &'static str,
    /// Test outcomes in execution order.
    pub tests: Vec<TestReport>,
}

impl CaseReport {
    /// Counts passed tests.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.tests.iter().filter(|test| test.outcome == Outcome::Passed).count()
    }

    /// Counts failed tests.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.tests.len() - self.passed()
    }
}

/// Outcomes of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Case reports in registration order.
    pub cases: Vec<CaseReport>,
}

impl RunReport {
    /// Counts executed tests.
    #[must_use]
    pub fn total(&self) -> usize {
        self.cases.iter().map(|case| case.tests.len()).sum()
    }

    /// Counts passed tests.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.cases.iter().map(CaseReport::passed).sum()
    }

    /// Counts failed tests.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.cases.iter().map(CaseReport::failed).sum()
    }

    /// Returns `0` when nothing failed, `1` otherwise.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        u8::from(self.failed() > 0)
    }

    /// Returns [`Self::exit_status`] as a process exit code.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    /// Logs the final tally.
    pub fn log_summary(&self) {
        tracing::info!("{}", "=".repeat(60));
        tracing::info!("FINAL SUMMARY");
        tracing::info!("{}", "=".repeat(60));
        tracing::info!("Total tests: {}", self.total());
        tracing::info!("Passed: {}", self.passed());
        tracing::info!("Failed: {}", self.failed());
        if self.failed() == 0 {
            tracing::info!("✓ All tests passed!");
        }
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Runs every registered case in order.
#[must_use]
pub fn run_cases(registrations: &[Registration], context: &SuiteContext) -> RunReport {
    let cases = registrations
        .iter()
        .map(|registration| {
            tracing::info!("{}", "=".repeat(60));
            tracing::info!("Running {}", registration.name);
            tracing::info!("{}", "=".repeat(60));
            let report = match (registration.build)(context) {
                Ok(case) => run_case(registration.name, case.as_ref()),
                Err(err) => {
                    tracing::error!("  ✗ setup FAILED: {err}");
                    CaseReport {
                        name: registration.name,
                        tests: vec![TestReport {
                            name: SETUP_TEST,
                            outcome: Outcome::Failed(err.to_string()),
                        }],
                    }
                }
            };
            tracing::info!("  Results: {} passed, {} failed", report.passed(), report.failed());
            report
        })
        .collect();
    RunReport {
        cases,
    }
}

/// Runs the tests of one case in order.
#[must_use]
pub fn run_case(name: &'static str, case: &dyn TestCase) -> CaseReport {
    let tests = case
        .tests()
        .iter()
        .map(|test| {
            tracing::info!("  ▶ {}...", test.name);
            let outcome = match test.execute() {
                Ok(()) => {
                    tracing::info!("    ✓ passed");
                    Outcome::Passed
                }
                Err(err) => {
                    tracing::error!("    ✗ FAILED: {err}");
                    Outcome::Failed(err.to_string())
                }
            };
            TestReport {
                name: test.name,
                outcome,
            }
        })
        .collect();
    CaseReport {
        name,
        tests,
    }
}

#[cfg(test)]
mod tests;
