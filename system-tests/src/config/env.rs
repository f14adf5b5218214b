// system-tests/src/config/env.rs
// ============================================================================
// Module: Suite Environment
// Description: File- and environment-backed configuration for the scenarios.
// Purpose: Centralize parsing with strict UTF-8 and positive-value validation.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Values are resolved in three layers: built-in defaults, an optional TOML
//! file named by `DIGITALHUB_TESTS_CONFIG`, then individual environment
//! variables. Invalid UTF-8, empty strings, and non-positive durations fail
//! closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use digitalhub_client::DEFAULT_ENDPOINT;
use digitalhub_client::config::DEFAULT_REQUEST_TIMEOUT;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Project used when `PROJECT_NAME` is unset.
pub const DEFAULT_PROJECT_NAME: &str = "digitalhub-tests";

/// Root of scenario runtime sources when unset.
const DEFAULT_SOURCE_ROOT: &str = "scenarios";

/// Upper bound on waiting for runs and services.
const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(120);

/// Delay between readiness probes.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for suite configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteEnv {
    /// Project the scenarios work in.
    ProjectName,
    /// Backend base URL.
    Endpoint,
    /// Optional bearer token.
    AccessToken,
    /// HTTP request timeout in seconds (positive integer).
    TimeoutSeconds,
    /// Run and service readiness timeout in seconds (positive integer).
    ReadinessSeconds,
    /// Delay between readiness probes in milliseconds (positive integer).
    PollIntervalMillis,
    /// Directory receiving export files.
    ExportDir,
    /// Root directory of scenario runtime sources.
    SourceRoot,
    /// Optional TOML file supplying the same settings.
    ConfigFile,
}

impl SuiteEnv {
    /// Every key, in documentation order.
    pub const ALL: [Self; 9] = [
        Self::ProjectName,
        Self::Endpoint,
        Self::AccessToken,
        Self::TimeoutSeconds,
        Self::ReadinessSeconds,
        Self::PollIntervalMillis,
        Self::ExportDir,
        Self::SourceRoot,
        Self::ConfigFile,
    ];

    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProjectName => "PROJECT_NAME",
            Self::Endpoint => "DHCORE_ENDPOINT",
            Self::AccessToken => "DHCORE_ACCESS_TOKEN",
            Self::TimeoutSeconds => "DIGITALHUB_TESTS_TIMEOUT_SEC",
            Self::ReadinessSeconds => "DIGITALHUB_TESTS_READINESS_SEC",
            Self::PollIntervalMillis => "DIGITALHUB_TESTS_POLL_INTERVAL_MS",
            Self::ExportDir => "DIGITALHUB_TESTS_EXPORT_DIR",
            Self::SourceRoot => "DIGITALHUB_TESTS_SOURCE_ROOT",
            Self::ConfigFile => "DIGITALHUB_TESTS_CONFIG",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Messages name the offending variable or file, never a secret value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The value is not valid UTF-8.
    #[error("{name} must be valid UTF-8")]
    InvalidUtf8 {
        /// Variable name.
        name: String,
    },
    /// The value is set but blank.
    #[error("{name} must not be empty")]
    Empty {
        /// Variable or field name.
        name: String,
    },
    /// The value failed validation.
    #[error("{name} {reason}")]
    Invalid {
        /// Variable or field name.
        name: String,
        /// What was expected.
        reason: String,
    },
    /// The config file could not be read.
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// The config file is not valid TOML for this schema.
    #[error("invalid config file {}: {message}", path.display())]
    Parse {
        /// File path.
        path: PathBuf,
        /// Decoder message.
        message: String,
    },
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed suite configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct SuiteConfig {
    /// Project the scenarios work in.
    pub project_name: String,
    /// Backend base URL.
    pub endpoint: String,
    /// Optional bearer token.
    pub access_token: Option<String>,
    /// HTTP request timeout.
    pub request_timeout: Duration,
    /// Upper bound on waiting for runs and services.
    pub readiness_timeout: Duration,
    /// Delay between readiness probes.
    pub poll_interval: Duration,
    /// Directory receiving export files; system temp when unset.
    pub export_dir: Option<PathBuf>,
    /// Root of scenario runtime sources (`{root}/{scenario}/src/...`).
    pub source_root: PathBuf,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            export_dir: None,
            source_root: PathBuf::from(DEFAULT_SOURCE_ROOT),
        }
    }
}

impl fmt::Debug for SuiteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteConfig")
            .field("project_name", &self.project_name)
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("readiness_timeout", &self.readiness_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("export_dir", &self.export_dir)
            .field("source_root", &self.source_root)
            .finish()
    }
}

/// Settings accepted in the TOML file; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    /// Project name.
    project_name: Option<String>,
    /// Backend base URL.
    endpoint: Option<String>,
    /// Bearer token.
    access_token: Option<String>,
    /// Request timeout in seconds.
    timeout_sec: Option<u64>,
    /// Readiness timeout in seconds.
    readiness_sec: Option<u64>,
    /// Probe interval in milliseconds.
    poll_interval_ms: Option<u64>,
    /// Export directory.
    export_dir: Option<PathBuf>,
    /// Source root.
    source_root: Option<PathBuf>,
}

impl SuiteConfig {
    /// Loads configuration from the optional file and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is not valid UTF-8, is empty,
    /// fails validation, or the config file cannot be read or decoded.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match read_env_nonempty(SuiteEnv::ConfigFile.as_str())? {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Loads defaults overlaid with a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`], [`ConfigError::Parse`], or a validation
    /// error for blank strings and zero durations.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&raw).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let mut config = Self::default();
        if let Some(project_name) = file.project_name {
            config.project_name = nonempty("project_name", project_name)?;
        }
        if let Some(endpoint) = file.endpoint {
            config.endpoint = nonempty("endpoint", endpoint)?;
        }
        if let Some(token) = file.access_token {
            config.access_token = Some(nonempty("access_token", token)?);
        }
        if let Some(secs) = file.timeout_sec {
            config.request_timeout = Duration::from_secs(positive("timeout_sec", secs)?);
        }
        if let Some(secs) = file.readiness_sec {
            config.readiness_timeout = Duration::from_secs(positive("readiness_sec", secs)?);
        }
        if let Some(millis) = file.poll_interval_ms {
            config.poll_interval = Duration::from_millis(positive("poll_interval_ms", millis)?);
        }
        config.export_dir = file.export_dir.or(config.export_dir);
        if let Some(source_root) = file.source_root {
            config.source_root = source_root;
        }
        Ok(config)
    }

    /// Overrides fields with the environment variables that are set.
    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(project_name) = read_env_nonempty(SuiteEnv::ProjectName.as_str())? {
            self.project_name = project_name;
        }
        if let Some(endpoint) = read_env_nonempty(SuiteEnv::Endpoint.as_str())? {
            self.endpoint = endpoint;
        }
        if let Some(token) = read_env_nonempty(SuiteEnv::AccessToken.as_str())? {
            self.access_token = Some(token);
        }
        if let Some(raw) = read_env_nonempty(SuiteEnv::TimeoutSeconds.as_str())? {
            self.request_timeout = Duration::from_secs(parse_positive(SuiteEnv::TimeoutSeconds, &raw)?);
        }
        if let Some(raw) = read_env_nonempty(SuiteEnv::ReadinessSeconds.as_str())? {
            self.readiness_timeout =
                Duration::from_secs(parse_positive(SuiteEnv::ReadinessSeconds, &raw)?);
        }
        if let Some(raw) = read_env_nonempty(SuiteEnv::PollIntervalMillis.as_str())? {
            self.poll_interval =
                Duration::from_millis(parse_positive(SuiteEnv::PollIntervalMillis, &raw)?);
        }
        if let Some(dir) = read_env_nonempty(SuiteEnv::ExportDir.as_str())? {
            self.export_dir = Some(PathBuf::from(dir));
        }
        if let Some(root) = read_env_nonempty(SuiteEnv::SourceRoot.as_str())? {
            self.source_root = PathBuf::from(root);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidUtf8`] when the variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| ConfigError::InvalidUtf8 {
            name: name.to_string(),
        })
    })
}

/// Reads an environment variable and rejects empty values.
fn read_env_nonempty(name: &str) -> Result<Option<String>, ConfigError> {
    read_env_strict(name)?.map(|value| nonempty(name, value)).transpose()
}

/// Rejects blank strings.
fn nonempty(name: &str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty {
            name: name.to_string(),
        });
    }
    Ok(value)
}

/// Rejects zero.
fn positive(name: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            name: name.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Parses a positive integer from an environment value.
fn parse_positive(key: SuiteEnv, raw: &str) -> Result<u64, ConfigError> {
    let name = key.as_str();
    let value: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name: name.to_string(),
        reason: "must be a positive integer".to_string(),
    })?;
    positive(name, value)
}
