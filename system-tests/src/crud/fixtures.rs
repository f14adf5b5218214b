// system-tests/src/crud/fixtures.rs
// ============================================================================
// Module: CRUD Fixtures
// Description: Entity requests shared by the CRUD cases.
// Purpose: Keep fixture names, ids, and kinds in one place.
// Dependencies: digitalhub-client
// ============================================================================

//! ## Overview
//! Versioned fixtures carry a fixed id so create/delete cycles reuse the same
//! version; [`Fixture::request`] drops the pin for version tests.

use digitalhub_client::EntityRequest;
use digitalhub_client::SourceCode;

/// Fixed version ids reused across entity families.
const IDS: [&str; 4] = [
    "d150bcca-bb64-451d-8455-dff862254b95",
    "31acdd2d-0c41-428c-b68b-1b133da9e97b",
    "b4a3dfdc-b917-44c4-9a29-613dcf734244",
    "2618d9c4-cd61-440f-aebb-7e5761709f3b",
];

/// Description written by the import/export tests.
pub const EXPORT_DESCRIPTION: &str = "Test export";
/// Description written by the update/refresh tests.
pub const UPDATED_DESCRIPTION: &str = "Updated description";
/// Description written through the project scope.
pub const PROJECT_DESCRIPTION: &str = "Updated via project";
/// Labels written by the label update tests.
pub const UPDATED_LABELS: [&str; 2] = ["test", "update"];

/// A request with the version id it is pinned to.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// Version id.
    pub id: &'static str,
    /// Unpinned request.
    pub request: EntityRequest,
}

impl Fixture {
    /// Pins `request` to `IDS[index]`.
    const fn new(index: usize, request: EntityRequest) -> Self {
        Self {
            id: IDS[index],
            request,
        }
    }

    /// Returns the request pinned to the fixture id.
    #[must_use]
    pub fn pinned(&self) -> EntityRequest {
        self.request.clone().with_id(self.id)
    }

    /// Returns the request without an id.
    #[must_use]
    pub fn request(&self) -> EntityRequest {
        self.request.clone()
    }

    /// Returns the entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.request.name()
    }

    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.request.kind()
    }
}

// ============================================================================
// SECTION: Material
// ============================================================================

/// Artifact fixtures.
#[must_use]
pub fn artifacts() -> Vec<Fixture> {
    vec![
        Fixture::new(0, EntityRequest::artifact("test1", "artifact", "./data/test.csv")),
        Fixture::new(1, EntityRequest::artifact("test2", "artifact", "s3://bucket/key.csv")),
        Fixture::new(3, EntityRequest::artifact("test4", "artifact", "https://url.com/file.csv")),
    ]
}

/// Dataitem fixtures.
#[must_use]
pub fn dataitems() -> Vec<Fixture> {
    vec![
        Fixture::new(0, EntityRequest::dataitem("test1", "dataitem", "./data/test.csv")),
        Fixture::new(1, EntityRequest::dataitem("test2", "dataitem", "s3://bucket/key.csv")),
        Fixture::new(2, EntityRequest::dataitem("test3", "dataitem", "sql://database/schema/table")),
        Fixture::new(3, EntityRequest::dataitem("test4", "dataitem", "https://url.com/file.csv")),
    ]
}

/// Model fixtures.
#[must_use]
pub fn models() -> Vec<Fixture> {
    vec![
        Fixture::new(0, EntityRequest::model("test1", "model", "./data/my_random_forest_model.pkl")),
        Fixture::new(1, EntityRequest::model("test2", "model", "s3://bucket/model.pkl")),
    ]
}

// ============================================================================
// SECTION: Executables
// ============================================================================

/// Inline python function returning a greeting.
fn hello_function(name: &str) -> EntityRequest {
    python_function(name, "def main(): return 'Hello, World!'", "main")
}

/// Function fixtures.
#[must_use]
pub fn functions() -> Vec<Fixture> {
    vec![
        Fixture::new(0, hello_function("test1")),
        Fixture::new(1, hello_function("test2")),
        Fixture::new(2, EntityRequest::function("test3", "container").with_spec("image", "hello-world:latest")),
    ]
}

/// Empty hera workflow.
fn empty_workflow(name: &str) -> EntityRequest {
    EntityRequest::workflow(name, "hera")
        .with_source(SourceCode::python("def pipeline(): pass"))
        .with_handler("pipeline")
}

/// Workflow fixtures.
#[must_use]
pub fn workflows() -> Vec<Fixture> {
    vec![Fixture::new(0, empty_workflow("test1")), Fixture::new(1, empty_workflow("test2"))]
}

/// Python function used as the executable of task, run, and trigger cases.
#[must_use]
pub fn python_function(name: &str, code: &str, handler: &str) -> EntityRequest {
    EntityRequest::function(name, "python")
        .with_source(SourceCode::python(code))
        .with_handler(handler)
        .with_spec("python_version", "PYTHON3_12")
}

// ============================================================================
// SECTION: Triggers and Secrets
// ============================================================================

/// Trigger fixtures; task and function fields are added per test.
#[must_use]
pub fn triggers() -> Vec<Fixture> {
    vec![
        Fixture::new(0, EntityRequest::trigger("test1", "scheduler").with_spec("schedule", "0 0 * * *")),
        Fixture::new(1, EntityRequest::trigger("test2", "scheduler").with_spec("schedule", "0 12 * * *")),
        Fixture::new(
            2,
            EntityRequest::trigger("test3", "lifecycle")
                .with_spec("key", "store://test/artifacts/*")
                .with_spec("states", vec!["READY"]),
        ),
    ]
}

/// Secret names and values.
pub const SECRETS: [(&str, &str); 3] =
    [("test-secret-1", "value-1"), ("test-secret-2", "value-2"), ("test-secret-3", "value-3")];
