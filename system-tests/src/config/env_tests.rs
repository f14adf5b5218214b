// system-tests/src/config/env_tests.rs
// ============================================================================
// Module: Suite Env Unit Tests
// Description: Unit coverage for file and environment configuration.
// Purpose: Ensure configuration parsing fails closed on invalid inputs.
// Dependencies: tempfile
// ============================================================================

//! ## Overview
//! Invariants:
//! - Environment parsing rejects invalid or empty values.
//! - Environment values override file values.
//! - Tests restore environment state after each run.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::time::Duration;

use super::ConfigError;
use super::DEFAULT_PROJECT_NAME;
use super::SuiteConfig;
use super::SuiteEnv;

mod env_mut {
    #![allow(unsafe_code, reason = "Tests mutate process env vars in a controlled scope.")]

    /// Sets an environment variable for the current process.
    pub fn set_var(key: &str, value: &str) {
        // SAFETY: Tests serialize environment mutation via a global lock.
        unsafe {
            std::env::set_var(key, value);
        }
    }

    /// Removes an environment variable from the current process.
    pub fn remove_var(key: &str) {
        // SAFETY: Tests serialize environment mutation via a global lock.
        unsafe {
            std::env::remove_var(key);
        }
    }
}

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().expect("env lock poisoned")
}

/// Snapshots every suite variable, clears them, and restores them on drop.
struct EnvGuard {
    entries: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn clean() -> Self {
        let entries = SuiteEnv::ALL
            .iter()
            .map(|key| (key.as_str(), std::env::var(key.as_str()).ok()))
            .collect();
        for key in SuiteEnv::ALL {
            env_mut::remove_var(key.as_str());
        }
        Self {
            entries,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in self.entries.drain(..) {
            match value {
                Some(value) => env_mut::set_var(name, &value),
                None => env_mut::remove_var(name),
            }
        }
    }
}

#[test]
fn defaults_apply_without_environment() {
    let _lock = env_lock();
    let _guard = EnvGuard::clean();

    let config = SuiteConfig::load().expect("config should load");
    assert_eq!(config.project_name, DEFAULT_PROJECT_NAME);
    assert_eq!(config.endpoint, "http://localhost:8080");
    assert_eq!(config.access_token, None);
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.readiness_timeout, Duration::from_secs(120));
    assert_eq!(config.source_root, PathBuf::from("scenarios"));
}

#[test]
fn environment_overrides_defaults() {
    let _lock = env_lock();
    let _guard = EnvGuard::clean();

    env_mut::set_var(SuiteEnv::ProjectName.as_str(), "nightly");
    env_mut::set_var(SuiteEnv::Endpoint.as_str(), "https://core.example.org");
    env_mut::set_var(SuiteEnv::AccessToken.as_str(), "token-1");
    env_mut::set_var(SuiteEnv::PollIntervalMillis.as_str(), "250");
    env_mut::set_var(SuiteEnv::ExportDir.as_str(), "/tmp/exports");
    let config = SuiteConfig::load().expect("config should load");
    assert_eq!(config.project_name, "nightly");
    assert_eq!(config.endpoint, "https://core.example.org");
    assert_eq!(config.access_token.as_deref(), Some("token-1"));
    assert_eq!(config.poll_interval, Duration::from_millis(250));
    assert_eq!(config.export_dir, Some(PathBuf::from("/tmp/exports")));
}

#[test]
fn timeouts_reject_invalid_values() {
    let _lock = env_lock();
    let _guard = EnvGuard::clean();

    for raw in ["0", "not-a-number", "-3"] {
        env_mut::set_var(SuiteEnv::TimeoutSeconds.as_str(), raw);
        let err = SuiteConfig::load().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }), "{raw}: {err}");
    }
    env_mut::remove_var(SuiteEnv::TimeoutSeconds.as_str());

    env_mut::set_var(SuiteEnv::ReadinessSeconds.as_str(), "0");
    assert!(SuiteConfig::load().is_err());
}

#[test]
fn empty_values_fail_closed() {
    let _lock = env_lock();
    let _guard = EnvGuard::clean();

    env_mut::set_var(SuiteEnv::ProjectName.as_str(), "   ");
    let err = SuiteConfig::load().unwrap_err();
    assert!(matches!(err, ConfigError::Empty { ref name } if name == "PROJECT_NAME"));
}

#[test]
fn file_values_apply_and_environment_wins() {
    let _lock = env_lock();
    let _guard = EnvGuard::clean();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("suite.toml");
    std::fs::write(
        &path,
        "project_name = \"from-file\"\nendpoint = \"http://file:9000\"\nreadiness_sec = 15\nsource_root = \"/srv/sources\"\n",
    )
    .unwrap();
    env_mut::set_var(SuiteEnv::ConfigFile.as_str(), path.to_str().unwrap());
    env_mut::set_var(SuiteEnv::Endpoint.as_str(), "http://env:9000");

    let config = SuiteConfig::load().expect("config should load");
    assert_eq!(config.project_name, "from-file");
    assert_eq!(config.endpoint, "http://env:9000");
    assert_eq!(config.readiness_timeout, Duration::from_secs(15));
    assert_eq!(config.source_root, PathBuf::from("/srv/sources"));
}

#[test]
fn file_errors_are_typed() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    assert!(matches!(SuiteConfig::from_file(&missing), Err(ConfigError::Read { .. })));

    let unknown = dir.path().join("unknown.toml");
    std::fs::write(&unknown, "colour = \"blue\"\n").unwrap();
    assert!(matches!(SuiteConfig::from_file(&unknown), Err(ConfigError::Parse { .. })));

    let zero = dir.path().join("zero.toml");
    std::fs::write(&zero, "timeout_sec = 0\n").unwrap();
    assert!(matches!(SuiteConfig::from_file(&zero), Err(ConfigError::Invalid { .. })));
}

#[test]
#[allow(clippy::use_debug, reason = "The Debug rendering is the behavior under test.")]
fn debug_output_redacts_token() {
    let config = SuiteConfig {
        access_token: Some("super-secret".to_string()),
        ..SuiteConfig::default()
    };
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains("<redacted>"));
}
