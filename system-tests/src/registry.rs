// system-tests/src/registry.rs
// ============================================================================
// Module: CRUD Registry
// Description: Ordered list of CRUD test cases run by `s0-crud`.
// Purpose: Replace reflective discovery with explicit registration.
// Dependencies: crate::crud
// ============================================================================

//! ## Overview
//! Cases run in registration order. Projects go first since that case manages
//! its own projects; logging goes last since it leaves no fixtures behind.

use crate::context::SuiteContext;
use crate::crud;
use crate::failure::TestFailure;
use crate::runner::TestCase;

/// Builds a case bound to the suite context.
pub type CaseBuilder = for<'a> fn(&'a SuiteContext) -> Result<Box<dyn TestCase + 'a>, TestFailure>;

/// A named case constructor.
#[derive(Clone, Copy)]
pub struct Registration {
    /// Case name as printed by the runner.
    pub name: &'static str,
    /// Case constructor; runs the case's own fixture cleanup.
    pub build: CaseBuilder,
}

/// CRUD cases in execution order.
pub static CRUD_CASES: [Registration; 11] = [
    Registration {
        name: "TestProjectCRUD",
        build: crud::project::build,
    },
    Registration {
        name: "TestArtifactCRUD",
        build: crud::versioned::build_artifact,
    },
    Registration {
        name: "TestDataitemCRUD",
        build: crud::versioned::build_dataitem,
    },
    Registration {
        name: "TestModelCRUD",
        build: crud::versioned::build_model,
    },
    Registration {
        name: "TestSecretCRUD",
        build: crud::secret::build,
    },
    Registration {
        name: "TestFunctionCRUD",
        build: crud::versioned::build_function,
    },
    Registration {
        name: "TestRunCRUD",
        build: crud::run::build,
    },
    Registration {
        name: "TestTaskCRUD",
        build: crud::task::build,
    },
    Registration {
        name: "TestWorkflowCRUD",
        build: crud::versioned::build_workflow,
    },
    Registration {
        name: "TestTriggerCRUD",
        build: crud::trigger::build,
    },
    Registration {
        name: "TestLogCRUD",
        build: crud::log::build,
    },
];

/// Looks up a registration by case name.
#[must_use]
pub fn find(name: &str) -> Option<&'static Registration> {
    CRUD_CASES.iter().find(|registration| registration.name == name)
}
