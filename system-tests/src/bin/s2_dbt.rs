// system-tests/src/bin/s2_dbt.rs
// ============================================================================
// Module: s2-dbt Binary
// Description: dbt transformation pipeline.
// Purpose: Run one suite and exit with its status.
// Dependencies: digitalhub-tests
// ============================================================================

//! Runs `s2-dbt` against the configured backend.

use std::process::ExitCode;

use digitalhub_tests::app::Suite;
use digitalhub_tests::app::main_for;
use digitalhub_tests::scenarios::Scenario;

fn main() -> ExitCode {
    main_for(Suite::Scenario(Scenario::S2Dbt))
}
