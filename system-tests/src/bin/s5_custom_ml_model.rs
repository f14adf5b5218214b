// system-tests/src/bin/s5_custom_ml_model.rs
// ============================================================================
// Module: s5-custom-ml-model Binary
// Description: Custom image time-series pipeline.
// Purpose: Run one suite and exit with its status.
// Dependencies: digitalhub-tests
// ============================================================================

//! Runs `s5-custom-ml-model` against the configured backend.

use std::process::ExitCode;

use digitalhub_tests::app::Suite;
use digitalhub_tests::app::main_for;
use digitalhub_tests::scenarios::Scenario;

fn main() -> ExitCode {
    main_for(Suite::Scenario(Scenario::S5CustomMlModel))
}
