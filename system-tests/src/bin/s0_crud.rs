// system-tests/src/bin/s0_crud.rs
// ============================================================================
// Module: s0-crud Binary
// Description: Registered CRUD cases over every entity family.
// Purpose: Run one suite and exit with its status.
// Dependencies: digitalhub-tests
// ============================================================================

//! Runs `s0-crud` against the configured backend.

use std::process::ExitCode;

use digitalhub_tests::app::Suite;
use digitalhub_tests::app::main_for;

fn main() -> ExitCode {
    main_for(Suite::Crud)
}
