// system-tests/src/bin/s1_etl.rs
// ============================================================================
// Module: s1-etl Binary
// Description: ETL pipeline with a python API.
// Purpose: Run one suite and exit with its status.
// Dependencies: digitalhub-tests
// ============================================================================

//! Runs `s1-etl` against the configured backend.

use std::process::ExitCode;

use digitalhub_tests::app::Suite;
use digitalhub_tests::app::main_for;
use digitalhub_tests::scenarios::Scenario;

fn main() -> ExitCode {
    main_for(Suite::Scenario(Scenario::S1Etl))
}
