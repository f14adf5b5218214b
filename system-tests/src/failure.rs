// system-tests/src/failure.rs
// ============================================================================
// Module: Test Failures
// Description: Failure taxonomy and assertion macros for registered tests.
// Purpose: Turn assertion failures and client errors into tagged outcomes.
// Dependencies: digitalhub-client, thiserror
// ============================================================================

//! ## Overview
//! Registered tests return [`TestResult`]. Assertions go through [`ensure!`]
//! and [`ensure_eq!`], which return [`TestFailure::Assertion`] instead of
//! panicking; client errors convert with `?`. Panics are still caught by the
//! runner and reported as [`TestFailure::Panic`].

use std::path::PathBuf;

use digitalhub_client::ClientError;
use thiserror::Error;

/// Why a registered test failed.
///
/// # Invariants
/// - `Assertion` and `Client` keep the binary split between expectation
///   failures and platform errors.
#[derive(Debug, Error)]
pub enum TestFailure {
    /// An expectation did not hold.
    #[error("assertion failed: {0}")]
    Assertion(String),
    /// A client call failed.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// Local file handling failed.
    #[error("io error at {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// The test panicked.
    #[error("panicked: {0}")]
    Panic(String),
}

/// Result of one registered test.
pub type TestResult = Result<(), TestFailure>;

/// Fails the current test unless `cond` holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::failure::TestFailure::Assertion(format!($($arg)+)));
        }
    };
}

/// Fails the current test unless both sides are equal; sides must be `Display`.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left, right) => {
                if left != right {
                    return Err($crate::failure::TestFailure::Assertion(format!(
                        "{} == {}: `{}` != `{}`",
                        stringify!($left),
                        stringify!($right),
                        left,
                        right
                    )));
                }
            }
        }
    };
}

#[cfg(test)]
mod tests;
