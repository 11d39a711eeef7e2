//! Logging and metrics setup

use crate::config::LoggingConfig;
use crate::domain::shared::error::{DomainError, Result};
use metrics::{describe_counter, describe_gauge};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| DomainError::Config(format!("invalid log level: {}", e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| DomainError::Config(e.to_string()))
}

/// Register descriptions for the session metrics with whatever recorder
/// the host installed.
pub fn describe_metrics() {
    describe_counter!(
        "incall_notifications_total",
        "Call-state notifications received, by session state"
    );
    describe_counter!(
        "incall_commands_total",
        "User commands received, by command"
    );
    describe_counter!(
        "incall_commands_rejected_total",
        "Inputs rejected as no-ops, by input"
    );
    describe_counter!(
        "incall_sessions_ended_total",
        "Sessions that reached the terminal state"
    );
    describe_gauge!("incall_active_legs", "Call legs in the current session");
}
