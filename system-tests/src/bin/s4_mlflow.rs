// system-tests/src/bin/s4_mlflow.rs
// ============================================================================
// Module: s4-mlflow Binary
// Description: MLflow training and serving pipeline.
// Purpose: Run one suite and exit with its status.
// Dependencies: digitalhub-tests
// ============================================================================

//! Runs `s4-mlflow` against the configured backend.

use std::process::ExitCode;

use digitalhub_tests::app::Suite;
use digitalhub_tests::app::main_for;
use digitalhub_tests::scenarios::Scenario;

fn main() -> ExitCode {
    main_for(Suite::Scenario(Scenario::S4Mlflow))
}
