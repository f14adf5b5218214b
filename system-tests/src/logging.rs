// system-tests/src/logging.rs
// ============================================================================
// Module: Console Logging
// Description: Tracing subscriber setup shared by every scenario binary.
// Purpose: Render run output as `date time LEVEL target - message` lines.
// Dependencies: time, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! [`init_logging`] installs a global `tracing` subscriber writing to stdout
//! at `INFO`, overridable through `RUST_LOG`. Timestamps use local time.
//! Installing twice returns
//! [`LoggingError`] instead of panicking.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::Event;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::FormatFields;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: Format
// ============================================================================

/// Level used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LEVEL: &str = "info";

/// `YYYY-MM-DD HH:MM:SS`.
const TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Current wall-clock time in the local offset, or UTC when the offset
/// cannot be determined.
fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber is already installed.
    #[error("failed to initialize logging: {0}")]
    Init(String),
}

/// Single-line console format.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleFormat;

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        let metadata = event.metadata();
        let now = local_now().format(TIMESTAMP).map_err(|_| fmt::Error)?;
        write!(writer, "{now} {} {} - ", metadata.level(), metadata.target())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`LoggingError::Init`] when a subscriber is already installed.
pub fn init_logging() -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().event_format(ConsoleFormat))
        .try_init()
        .map_err(|err| LoggingError::Init(err.to_string()))
}
