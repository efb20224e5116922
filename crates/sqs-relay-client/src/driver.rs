//! The polling loop.
//!
//! Each cycle receives one batch and deletes every message in it, in order.
//! Every failed receive or delete spends one unit of the error budget. The
//! loop ends with [`DriverError::BudgetExceeded`] the moment the error count
//! goes above the configured limit, even in the middle of a batch. A healthy
//! loop only stops when its shutdown future resolves.

use crate::errors::DriverError;
use crate::source::MessageSource;
use serde::{Deserialize, Serialize};
use sqs_relay_proto::ReceiveMessageRequest;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;

/// Polling parameters, read once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Pause between cycles in seconds
    pub polling_interval_seconds: u64,

    /// Seconds a received message stays hidden
    pub visibility_timeout: u32,

    /// Long-poll duration in seconds; zero is a short poll
    pub wait_time: u32,

    /// Upper bound on messages per receive
    pub max_messages: u32,

    /// Errors tolerated before the loop gives up
    pub error_limit: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            polling_interval_seconds: 5,
            visibility_timeout: 5,
            wait_time: 5,
            max_messages: 5,
            error_limit: 10,
        }
    }
}

impl PollingSettings {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_seconds)
    }

    fn receive_request(&self) -> ReceiveMessageRequest {
        ReceiveMessageRequest {
            visibility_timeout: self.visibility_timeout,
            wait_time: self.wait_time,
            max_messages: self.max_messages,
        }
    }
}

/// Counters of one run
///
/// `errors` never decreases. The run is over once it exceeds `error_limit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollingState {
    pub polls: u64,
    pub errors: u64,
    pub processed: u64,
    pub error_limit: u64,
}

impl PollingState {
    pub fn new(error_limit: u64) -> Self {
        Self {
            error_limit,
            ..Default::default()
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.errors > self.error_limit
    }

    /// Count one failure and report whether the budget is now spent
    fn record_error(&mut self) -> Result<(), DriverError> {
        self.errors += 1;
        if self.is_exhausted() {
            return Err(DriverError::BudgetExceeded { count: self.errors });
        }
        Ok(())
    }
}

/// What happened during one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub received: usize,
    pub deleted: usize,
    pub failed_deletes: usize,
    pub receive_failed: bool,
}

/// Drives a [`MessageSource`] until shutdown or error-budget exhaustion
pub struct PollingDriver<S> {
    source: S,
    settings: PollingSettings,
}

impl<S: MessageSource> PollingDriver<S> {
    pub fn new(source: S, settings: PollingSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &PollingSettings {
        &self.settings
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run one cycle without the trailing sleep
    ///
    /// A failed receive skips the delete phase. Only a spent error budget is
    /// returned as an error; individual call failures are counted in `state`.
    pub async fn poll_once(&self, state: &mut PollingState) -> Result<CycleReport, DriverError> {
        state.polls += 1;
        let mut report = CycleReport::default();

        let messages = match self.source.receive(self.settings.receive_request()).await {
            Ok(messages) => messages,
            Err(e) => {
                report.receive_failed = true;
                warn!(poll = state.polls, errors = state.errors + 1, error = %e, "Receive failed");
                state.record_error()?;
                return Ok(report);
            }
        };

        report.received = messages.len();
        if messages.is_empty() {
            info!(poll = state.polls, "No messages received");
            return Ok(report);
        }
        debug!(poll = state.polls, count = messages.len(), "Received messages");

        for message in messages {
            debug!(handle = %message.handle, body = %message.body, "Processing message");

            match self.source.delete(&message.handle).await {
                Ok(()) => {
                    state.processed += 1;
                    report.deleted += 1;
                }
                Err(e) => {
                    report.failed_deletes += 1;
                    warn!(
                        poll = state.polls,
                        handle = %message.handle,
                        errors = state.errors + 1,
                        error = %e,
                        "Delete failed"
                    );
                    state.record_error()?;
                }
            }
        }

        info!(
            poll = state.polls,
            deleted = report.deleted,
            failed = report.failed_deletes,
            "Cycle complete"
        );
        Ok(report)
    }

    /// Poll until `shutdown` resolves or the error budget is spent
    ///
    /// `shutdown` interrupts an in-flight call or the sleep between cycles.
    pub async fn run<F>(&self, state: &mut PollingState, shutdown: F) -> Result<(), DriverError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let cycle = tokio::select! {
                _ = &mut shutdown => break,
                result = self.poll_once(state) => result,
            };
            if let Err(e) = cycle {
                warn!(
                    errors = state.errors,
                    limit = state.error_limit,
                    "Error budget exceeded; stopping"
                );
                return Err(e);
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.settings.polling_interval()) => {}
            }
        }

        info!("Shutdown requested; polling stopped");
        Ok(())
    }
}
