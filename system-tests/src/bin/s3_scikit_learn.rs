// system-tests/src/bin/s3_scikit_learn.rs
// ============================================================================
// Module: s3-scikit-learn Binary
// Description: scikit-learn training and serving pipeline.
// Purpose: Run one suite and exit with its status.
// Dependencies: digitalhub-tests
// ============================================================================

//! Runs `s3-scikit-learn` against the configured backend.

use std::process::ExitCode;

use digitalhub_tests::app::Suite;
use digitalhub_tests::app::main_for;
use digitalhub_tests::scenarios::Scenario;

fn main() -> ExitCode {
    main_for(Suite::Scenario(Scenario::S3ScikitLearn))
}
