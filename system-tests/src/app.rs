// system-tests/src/app.rs
// ============================================================================
// Module: Application Entry Points
// Description: Process wiring shared by the scenario binaries and the CLI.
// Purpose: Map suite outcomes and startup errors onto process exit codes.
// Dependencies: clap, digitalhub-client, thiserror, tracing
// ============================================================================

//! ## Overview
//! Each binary calls [`main_for`] with its [`Suite`]; the `digitalhub-tests`
//! CLI calls [`cli_main`], which can list suites or run one by name. Startup
//! installs logging, loads [`SuiteConfig`], and connects a [`SuiteContext`].
//! Exit codes:
//! - `s0-crud` exits `1` when any registered test failed.
//! - Scenarios exit `1` on the first error, after logging it.
//! - Startup errors exit `1`; logging failures are written to stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use digitalhub_client::ClientError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::config::SuiteConfig;
use crate::context::SuiteContext;
use crate::crud;
use crate::logging::LoggingError;
use crate::logging::init_logging;
use crate::scenarios::Scenario;
use crate::scenarios::ScenarioError;

// ============================================================================
// SECTION: Suites
// ============================================================================

/// Name of the CRUD suite.
pub const CRUD_SUITE: &str = "s0-crud";

/// Something a binary can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    /// The registered CRUD cases.
    Crud,
    /// One end-to-end scenario.
    Scenario(Scenario),
}

impl Suite {
    /// Every suite, in numbering order.
    #[must_use]
    pub fn all() -> Vec<Self> {
        std::iter::once(Self::Crud).chain(Scenario::ALL.into_iter().map(Self::Scenario)).collect()
    }

    /// Returns the suite name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Crud => CRUD_SUITE,
            Self::Scenario(scenario) => scenario.name(),
        }
    }

    /// Resolves a suite by name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if name == CRUD_SUITE { Some(Self::Crud) } else { Scenario::parse(name).map(Self::Scenario) }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that end a process.
#[derive(Debug, Error)]
pub enum AppError {
    /// Logging could not be installed.
    #[error(transparent)]
    Logging(#[from] LoggingError),
    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The client could not be built or the project reset failed.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// A scenario failed.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// The CLI was asked for a suite that does not exist.
    #[error("unknown suite {0}; see `digitalhub-tests list`")]
    UnknownSuite(String),
    /// Writing to stdout failed.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

// ============================================================================
// SECTION: CLI
// ============================================================================

/// Command line of `digitalhub-tests`.
#[derive(Parser, Debug)]
#[command(name = "digitalhub-tests", about = "DigitalHub end-to-end integration suites")]
pub struct Cli {
    /// Selected subcommand.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of `digitalhub-tests`.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the available suites.
    List,
    /// Run one suite by name.
    Run {
        /// Suite name, e.g. `s0-crud` or `s3-scikit-learn`.
        suite: String,
    },
}

/// Entry point of the `digitalhub-tests` binary.
#[must_use]
pub fn cli_main() -> ExitCode {
    dispatch(Cli::parse())
}

/// Executes a parsed command line.
#[must_use]
pub fn dispatch(cli: Cli) -> ExitCode {
    match cli.command {
        Command::List => match write_suites(&mut std::io::stdout()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => report(&err),
        },
        Command::Run {
            suite,
        } => match Suite::parse(&suite) {
            Some(suite) => main_for(suite),
            None => report(&AppError::UnknownSuite(suite)),
        },
    }
}

/// Writes one suite name per line.
///
/// # Errors
///
/// Returns [`AppError::Output`] when `out` cannot be written.
pub fn write_suites(out: &mut impl Write) -> Result<(), AppError> {
    for suite in Suite::all() {
        writeln!(out, "{suite}")?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Entry point of the per-suite binaries.
#[must_use]
pub fn main_for(suite: Suite) -> ExitCode {
    match start().and_then(|context| execute(suite, &context)) {
        Ok(code) => code,
        Err(err) => report(&err),
    }
}

/// Installs logging, loads configuration, and connects.
///
/// # Errors
///
/// Returns [`AppError`] when any of the three steps fails.
pub fn start() -> Result<SuiteContext, AppError> {
    init_logging()?;
    let config = SuiteConfig::load()?;
    tracing::debug!(?config, "configuration loaded");
    Ok(SuiteContext::connect(config)?)
}

/// Runs `suite` against a connected context.
///
/// # Errors
///
/// Returns [`AppError`] when the CRUD project cannot be reset or the
/// scenario fails; failed CRUD tests only change the exit code.
pub fn execute(suite: Suite, context: &SuiteContext) -> Result<ExitCode, AppError> {
    match suite {
        Suite::Crud => Ok(crud::run_suite(context)?.exit_code()),
        Suite::Scenario(scenario) => {
            scenario.drive(context)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Logs a fatal error and returns the failure exit code.
fn report(err: &AppError) -> ExitCode {
    match err {
        AppError::Logging(_) | AppError::Output(_) | AppError::UnknownSuite(_) => {
            let _ = writeln!(std::io::stderr(), "{err}");
        }
        _ => tracing::error!("{err}"),
    }
    ExitCode::FAILURE
}
