// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: Integration Test Helpers
// Description: Stub-backed suite contexts with scratch directories.
// Purpose: Run the CRUD registry and scenarios without a live backend.
// Dependencies: digitalhub-stub, digitalhub-tests, tempfile
// ============================================================================

//! ## Overview
//! A [`Workspace`] owns a platform stub, a temporary directory holding export
//! files and placeholder runtime sources, and a [`SuiteContext`] pointing at
//! both. Polling intervals are shortened so suites finish in milliseconds.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use digitalhub_stub::PlatformStub;
use digitalhub_stub::StubOptions;
use digitalhub_stub::spawn_platform_stub;
use digitalhub_tests::SuiteConfig;
use digitalhub_tests::SuiteContext;
use digitalhub_tests::scenarios::FUNCTIONS_FILE;
use digitalhub_tests::scenarios::PIPELINE_FILE;
use digitalhub_tests::scenarios::Scenario;
use tempfile::TempDir;

/// Stub, scratch directory, and connected context.
pub struct Workspace {
    /// Running stub; dropped last.
    pub stub: PlatformStub,
    /// Scratch directory.
    pub dir: TempDir,
    /// Context bound to the stub.
    pub context: SuiteContext,
}

impl Workspace {
    /// Returns the export directory.
    pub fn export_dir(&self) -> PathBuf {
        self.dir.path().join("exports")
    }

    /// Returns the runtime source root.
    pub fn source_root(&self) -> PathBuf {
        self.dir.path().join("scenarios")
    }
}

/// Configuration pointing at `stub` with fast polling.
pub fn fast_config(stub: &PlatformStub, dir: &Path, project: &str) -> SuiteConfig {
    SuiteConfig {
        project_name: project.to_string(),
        endpoint: stub.base_url().to_string(),
        access_token: None,
        request_timeout: Duration::from_secs(10),
        readiness_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(10),
        export_dir: Some(dir.join("exports")),
        source_root: dir.join("scenarios"),
    }
}

/// Starts a stub with `options` and a workspace for `project`.
pub fn workspace_with(options: StubOptions, project: &str) -> Workspace {
    let stub = spawn_platform_stub(options).expect("stub starts");
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("exports")).expect("export dir");
    let context = SuiteContext::connect(fast_config(&stub, dir.path(), project)).expect("context");
    Workspace {
        stub,
        dir,
        context,
    }
}

/// Starts a default stub and a workspace for `project`.
pub fn workspace(project: &str) -> Workspace {
    workspace_with(StubOptions::default(), project)
}

/// Writes placeholder `functions.py` and `pipeline.py` for every scenario.
pub fn write_sources(root: &Path) {
    for scenario in Scenario::ALL {
        let dir = root.join(scenario.name()).join("src");
        fs::create_dir_all(&dir).expect("source dir");
        fs::write(dir.join(FUNCTIONS_FILE), "def handler():\n    return None\n").expect("functions.py");
        fs::write(dir.join(PIPELINE_FILE), "def pipeline():\n    pass\n").expect("pipeline.py");
    }
}

/// Lists the files left in `dir`.
pub fn leftover_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir).expect("read dir").map(|entry| entry.expect("dir entry").path()).collect()
}
