// system-tests/src/failure/tests.rs
// ============================================================================
// Module: Failure Unit Tests
// Description: Behavior of the `ensure!` and `ensure_eq!` macros.
// Purpose: Keep assertion messages stable and borrowed temporaries valid.
// Dependencies: none
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use super::TestFailure;
use super::TestResult;

/// Owned value whose accessor borrows from it.
struct Record {
    label: String,
}

impl Record {
    fn label(&self) -> &str {
        &self.label
    }
}

fn fetch(label: &str) -> Result<Record, TestFailure> {
    Ok(Record {
        label: label.to_string(),
    })
}

fn label_of(record: &Record) -> &str {
    record.label()
}

fn compare_fetched(label: &str, expected: &str) -> TestResult {
    ensure_eq!(label_of(&fetch(label)?), expected);
    Ok(())
}

fn check(flag: bool) -> TestResult {
    ensure!(flag, "flag was {flag}");
    Ok(())
}

#[test]
fn ensure_eq_accepts_borrows_of_temporaries() {
    assert!(compare_fetched("Updated description", "Updated description").is_ok());
}

#[test]
fn ensure_eq_reports_both_sides() {
    let err = compare_fetched("left", "right").unwrap_err();
    let TestFailure::Assertion(message) = err else {
        panic!("expected an assertion failure");
    };
    assert!(message.ends_with("`left` != `right`"), "{message}");
}

#[test]
fn ensure_formats_its_message() {
    assert!(check(true).is_ok());
    assert_eq!(check(false).unwrap_err().to_string(), "assertion failed: flag was false");
}
