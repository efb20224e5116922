//! In-memory SQS implementation for development and testing.
//!
//! Behaves like a single-region SQS endpoint closely enough for the relay:
//!
//! - Queues must exist before their URL can be resolved
//! - Received messages stay hidden for the visibility timeout, then become
//!   receivable again under a fresh receipt handle
//! - Long polling waits up to the wait time for a message to arrive
//! - Deleting an unknown, stale or already-deleted handle is rejected
//! - Out-of-range receive parameters are rejected the way SQS rejects them
//!
//! Messages are returned in the order they were sent.

use crate::error::ProviderError;
use crate::message::{
    QueueName, ReceiptHandle, ReceiveOptions, ReceivedMessage, MAX_RECEIVE_MESSAGES,
    MAX_VISIBILITY_TIMEOUT_SECONDS, MAX_WAIT_TIME_SECONDS,
};
use crate::provider::{ProviderType, SqsApi};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

const BASE_URL: &str = "http://localhost:9324/000000000000";

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// All queues, keyed by queue URL
#[derive(Default)]
struct QueueStorage {
    queues: HashMap<String, InMemoryQueue>,
}

/// Messages of a single queue in send order
#[derive(Default)]
struct InMemoryQueue {
    messages: Vec<StoredMessage>,
}

struct StoredMessage {
    body: String,
    /// Handle of the latest delivery, if any
    receipt_handle: Option<String>,
    visible_at: Instant,
    /// Visibility timeout of the latest delivery
    hidden_for: Duration,
}

impl StoredMessage {
    /// A zero-timeout delivery keeps its handle valid until the next one
    fn accepts_handle(&self, handle: &str, now: Instant) -> bool {
        self.receipt_handle.as_deref() == Some(handle)
            && (self.visible_at > now || self.hidden_for.is_zero())
    }
}

impl InMemoryQueue {
    /// Take up to `max` visible messages, hiding each for `visibility`
    fn take_visible(&mut self, max: usize, visibility: Duration, now: Instant) -> Vec<ReceivedMessage> {
        let mut received = Vec::new();
        for stored in self.messages.iter_mut() {
            if received.len() == max {
                break;
            }
            if stored.visible_at > now {
                continue;
            }

            let handle = uuid::Uuid::new_v4().to_string();
            stored.receipt_handle = Some(handle.clone());
            stored.visible_at = now + visibility;
            stored.hidden_for = visibility;
            received.push(ReceivedMessage::new(handle, stored.body.clone()));
        }
        received
    }

    /// Earliest moment a currently hidden message becomes visible
    fn next_visible_at(&self, now: Instant) -> Option<Instant> {
        self.messages
            .iter()
            .map(|m| m.visible_at)
            .filter(|at| *at > now)
            .min()
    }
}

// ============================================================================
// InMemorySqs
// ============================================================================

/// Process-local [`SqsApi`] implementation
#[derive(Default)]
pub struct InMemorySqs {
    storage: Mutex<QueueStorage>,
    arrivals: Notify,
}

impl InMemorySqs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue (no-op if it already exists) and return its URL
    pub fn create_queue(&self, queue_name: &QueueName) -> Result<String, ProviderError> {
        let url = queue_url_for(queue_name);
        self.lock()?.queues.entry(url.clone()).or_default();
        Ok(url)
    }

    /// Remove a queue and every message in it
    pub fn delete_queue(&self, queue_name: &QueueName) -> Result<(), ProviderError> {
        let url = queue_url_for(queue_name);
        match self.lock()?.queues.remove(&url) {
            Some(_) => Ok(()),
            None => Err(ProviderError::QueueNotFound(queue_name.to_string())),
        }
    }

    /// Enqueue a message, waking any long-polling receivers
    pub fn send_message(
        &self,
        queue_name: &QueueName,
        body: impl Into<String>,
    ) -> Result<(), ProviderError> {
        {
            let mut storage = self.lock()?;
            let queue = storage
                .queues
                .get_mut(&queue_url_for(queue_name))
                .ok_or_else(|| ProviderError::QueueNotFound(queue_name.to_string()))?;
            queue.messages.push(StoredMessage {
                body: body.into(),
                receipt_handle: None,
                visible_at: Instant::now(),
                hidden_for: Duration::ZERO,
            });
        }

        self.arrivals.notify_waiters();
        Ok(())
    }

    /// Number of messages not yet deleted, visible or not
    pub fn message_count(&self, queue_name: &QueueName) -> Result<usize, ProviderError> {
        self.lock()?
            .queues
            .get(&queue_url_for(queue_name))
            .map(|queue| queue.messages.len())
            .ok_or_else(|| ProviderError::QueueNotFound(queue_name.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueStorage>, ProviderError> {
        self.storage.lock().map_err(|_| ProviderError::Service {
            code: "InternalError".to_string(),
            message: "in-memory queue storage is poisoned".to_string(),
        })
    }

    /// One non-blocking receive attempt
    ///
    /// Returns the messages taken plus the instant a hidden message next
    /// becomes visible, so long polls know when to look again.
    fn try_receive(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Result<(Vec<ReceivedMessage>, Option<Instant>), ProviderError> {
        let now = Instant::now();
        let mut storage = self.lock()?;
        let queue = storage
            .queues
            .get_mut(queue_url)
            .ok_or_else(|| ProviderError::QueueNotFound(queue_url.to_string()))?;

        let messages = queue.take_visible(
            options.max_messages as usize,
            Duration::from_secs(u64::from(options.visibility_timeout)),
            now,
        );
        Ok((messages, queue.next_visible_at(now)))
    }
}

fn queue_url_for(queue_name: &QueueName) -> String {
    format!("{}/{}", BASE_URL, queue_name)
}

fn check_receive_options(options: &ReceiveOptions) -> Result<(), ProviderError> {
    if options.max_messages == 0 || options.max_messages > MAX_RECEIVE_MESSAGES {
        return Err(ProviderError::InvalidRequest(format!(
            "MaxNumberOfMessages must be between 1 and {}, got {}",
            MAX_RECEIVE_MESSAGES, options.max_messages
        )));
    }
    if options.wait_time > MAX_WAIT_TIME_SECONDS {
        return Err(ProviderError::InvalidRequest(format!(
            "WaitTimeSeconds must be between 0 and {}, got {}",
            MAX_WAIT_TIME_SECONDS, options.wait_time
        )));
    }
    if options.visibility_timeout > MAX_VISIBILITY_TIMEOUT_SECONDS {
        return Err(ProviderError::InvalidRequest(format!(
            "VisibilityTimeout must be between 0 and {}, got {}",
            MAX_VISIBILITY_TIMEOUT_SECONDS, options.visibility_timeout
        )));
    }
    Ok(())
}

#[async_trait]
impl SqsApi for InMemorySqs {
    async fn get_queue_url(&self, queue_name: &QueueName) -> Result<String, ProviderError> {
        let url = queue_url_for(queue_name);
        if self.lock()?.queues.contains_key(&url) {
            Ok(url)
        } else {
            Err(ProviderError::QueueNotFound(queue_name.to_string()))
        }
    }

    async fn receive_message(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, ProviderError> {
        check_receive_options(options)?;

        let deadline = Instant::now() + Duration::from_secs(u64::from(options.wait_time));

        loop {
            // Register interest before looking so a send between the check
            // and the wait is not missed
            let arrival = self.arrivals.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            let (messages, next_visible) = self.try_receive(queue_url, options)?;
            if !messages.is_empty() || Instant::now() >= deadline {
                return Ok(messages);
            }

            let wake_at = next_visible.map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                _ = &mut arrival => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn delete_message(
        &self,
        queue_url: &str,
        handle: &ReceiptHandle,
    ) -> Result<(), ProviderError> {
        let now = Instant::now();
        let mut storage = self.lock()?;
        let queue = storage
            .queues
            .get_mut(queue_url)
            .ok_or_else(|| ProviderError::QueueNotFound(queue_url.to_string()))?;

        // Only the latest delivery's handle is valid, and only while hidden
        let position = queue
            .messages
            .iter()
            .position(|m| m.accepts_handle(handle.as_str(), now));

        match position {
            Some(index) => {
                queue.messages.remove(index);
                Ok(())
            }
            None => Err(ProviderError::InvalidReceipt(handle.to_string())),
        }
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Memory
    }
}
