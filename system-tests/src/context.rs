// system-tests/src/context.rs
// ============================================================================
// Module: Suite Context
// Description: Connected client, project name, and configuration.
// Purpose: Replace process-global SDK state with an explicit handle.
// Dependencies: digitalhub-client
// ============================================================================

//! ## Overview
//! Every case and scenario receives a [`SuiteContext`]. It owns the client
//! and derives the polling budgets and file locations from [`SuiteConfig`].

use std::path::Path;
use std::path::PathBuf;

use digitalhub_client::ClientConfig;
use digitalhub_client::ClientResult;
use digitalhub_client::PlatformClient;
use digitalhub_client::PollPolicy;
use digitalhub_client::ProjectScope;

use crate::config::SuiteConfig;
use crate::readiness::ReadinessPolicy;

/// Shared state of one suite invocation.
#[derive(Debug)]
pub struct SuiteContext {
    /// Connected client.
    client: PlatformClient,
    /// Settings the context was built from.
    config: SuiteConfig,
}

impl SuiteContext {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`digitalhub_client::ClientError::Config`] for an invalid endpoint.
    pub fn connect(config: SuiteConfig) -> ClientResult<Self> {
        let mut client_config = ClientConfig::new(config.endpoint.clone()).with_timeout(config.request_timeout);
        if let Some(token) = &config.access_token {
            client_config = client_config.with_access_token(token.clone());
        }
        let client = PlatformClient::new(client_config)?;
        Ok(Self {
            client,
            config,
        })
    }

    /// Returns the client.
    #[must_use]
    pub const fn client(&self) -> &PlatformClient {
        &self.client
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Returns the suite project name.
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.config.project_name
    }

    /// Returns a scope bound to the suite project.
    #[must_use]
    pub fn project(&self) -> ProjectScope<'_> {
        self.client.project(self.config.project_name.as_str())
    }

    /// Returns the directory export files are written to.
    #[must_use]
    pub fn export_dir(&self) -> PathBuf {
        self.config.export_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Returns `{source root}/{scenario}/src/{file}`.
    #[must_use]
    pub fn source_file(&self, scenario: &str, file: &str) -> PathBuf {
        source_path(&self.config.source_root, scenario, file)
    }

    /// Returns the budget for waiting on runs.
    #[must_use]
    pub fn run_wait(&self) -> PollPolicy {
        PollPolicy::within(self.config.readiness_timeout, self.config.poll_interval)
    }

    /// Returns the budget for waiting on services.
    #[must_use]
    pub fn readiness(&self) -> ReadinessPolicy {
        ReadinessPolicy::within(self.config.readiness_timeout, self.config.poll_interval)
    }
}

/// Joins a scenario source path.
fn source_path(root: &Path, scenario: &str, file: &str) -> PathBuf {
    root.join(scenario).join("src").join(file)
}
