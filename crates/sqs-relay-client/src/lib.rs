//! # SQS Relay Client
//!
//! Polling client for the SQS relay. It receives batches through the relay,
//! deletes every message it gets and gives up once too many calls have
//! failed.
//!
//! ## Module Organization
//!
//! - [driver] - The polling loop and its counters
//! - [source] - The [`MessageSource`] seam and its gRPC implementation
//! - [config] - Configuration loading and the command line
//! - [errors] - Client error types and exit codes

pub mod config;
pub mod driver;
pub mod errors;
pub mod source;

pub use config::{Cli, ClientConfig, LoggingConfig};
pub use driver::{CycleReport, PollingDriver, PollingSettings, PollingState};
pub use errors::{ClientError, DriverError, SourceError};
pub use source::{MessageSource, RelayClient};

use std::future::Future;
use tracing::info;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Drive `source` until `shutdown` resolves or the error budget is spent
///
/// The run summary is logged in both cases. The final counters are returned
/// on a clean shutdown.
pub async fn run_with_source<S, F>(
    source: S,
    settings: PollingSettings,
    shutdown: F,
) -> Result<PollingState, ClientError>
where
    S: MessageSource,
    F: Future<Output = ()>,
{
    let mut state = PollingState::new(settings.error_limit);
    let driver = PollingDriver::new(source, settings);

    let outcome = driver.run(&mut state, shutdown).await;
    info!(
        polls = state.polls,
        processed = state.processed,
        errors = state.errors,
        "Polling finished"
    );

    outcome?;
    Ok(state)
}

/// Connect to the configured relay server and poll it
pub async fn run_client<F>(config: &ClientConfig, shutdown: F) -> Result<PollingState, ClientError>
where
    F: Future<Output = ()>,
{
    config.validate()?;

    let source = RelayClient::connect(&config.server_address).await?;
    let state = run_with_source(source, config.polling.clone(), shutdown).await;
    info!(address = %config.server_address, "Connection to relay server closed");
    state
}
