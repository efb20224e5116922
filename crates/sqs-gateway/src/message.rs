//! Message types for gateway operations including the queue name identifier.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Largest batch a single `ReceiveMessage` call may return
pub const MAX_RECEIVE_MESSAGES: u32 = 10;

/// Longest long-poll wait SQS accepts, in seconds
pub const MAX_WAIT_TIME_SECONDS: u32 = 20;

/// Longest visibility timeout SQS accepts (12 hours), in seconds
pub const MAX_VISIBILITY_TIMEOUT_SECONDS: u32 = 43_200;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated SQS queue name
///
/// SQS accepts 1-80 characters of ASCII alphanumerics, hyphens and
/// underscores, with an optional `.fifo` suffix for FIFO queues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigurationError> {
        let name = name.into();

        if name.is_empty() || name.len() > 80 {
            return Err(ConfigurationError::Invalid {
                message: format!("queue name '{}' must be 1-80 characters", name),
            });
        }

        let base = name.strip_suffix(".fifo").unwrap_or(&name);
        if base.is_empty()
            || !base
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigurationError::Invalid {
                message: format!(
                    "queue name '{}' may only contain ASCII alphanumerics, hyphens and underscores",
                    name
                ),
            });
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this names a FIFO queue
    pub fn is_fifo(&self) -> bool {
        self.0.ends_with(".fifo")
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Provider-issued token identifying one delivery of a message
///
/// A handle is only good for deleting the delivery it came from. It is not a
/// stable message identity: a redelivered message gets a new handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// A message delivered by a receive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub handle: ReceiptHandle,
    pub body: String,
}

impl ReceivedMessage {
    pub fn new(handle: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            handle: ReceiptHandle::new(handle),
            body: body.into(),
        }
    }
}

/// Parameters of a single receive call
///
/// All durations are whole seconds, matching the SQS API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveOptions {
    /// How long delivered messages stay hidden from other consumers
    pub visibility_timeout: u32,

    /// How long the call may block waiting for a message (0 = short poll)
    pub wait_time: u32,

    /// Upper bound on the number of messages returned
    pub max_messages: u32,
}

impl ReceiveOptions {
    pub fn new(visibility_timeout: u32, wait_time: u32, max_messages: u32) -> Self {
        Self {
            visibility_timeout,
            wait_time,
            max_messages,
        }
    }
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            visibility_timeout: 5,
            wait_time: 5,
            max_messages: 5,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
