//! Queue gateway bound to a single SQS queue.
//!
//! The gateway resolves its queue URL exactly once at startup. Any failure at
//! that point is a [`ConfigurationError`] and the gateway is never created.
//! After that every receive or delete failure is reported as a transient
//! [`GatewayError`] and the gateway stays usable.

use crate::credentials::resolve_credentials;
use crate::error::{ConfigurationError, GatewayError, Operation};
use crate::message::{QueueName, ReceiptHandle, ReceiveOptions, ReceivedMessage};
use crate::provider::{GatewayConfig, ProviderType, SqsApi};
use crate::providers::{InMemorySqs, SqsHttpApi};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;

/// Handle to one resolved SQS queue
///
/// Cloning is cheap; clones share the underlying provider.
#[derive(Clone)]
pub struct QueueGateway {
    api: Arc<dyn SqsApi>,
    queue_name: QueueName,
    queue_url: String,
}

impl QueueGateway {
    /// Resolve `queue_name` through `api` and bind the gateway to the result
    ///
    /// # Errors
    ///
    /// Any provider failure while resolving the queue URL is returned as
    /// [`ConfigurationError::QueueResolution`].
    pub async fn initialize(api: Arc<dyn SqsApi>, queue_name: QueueName) -> Result<Self, GatewayError> {
        let queue_url = api.get_queue_url(&queue_name).await.map_err(|source| {
            ConfigurationError::QueueResolution {
                queue_name: queue_name.to_string(),
                source,
            }
        })?;

        info!(
            queue = %queue_name,
            queue_url = %queue_url,
            provider = %api.provider_type(),
            "Resolved queue URL"
        );

        Ok(Self {
            api,
            queue_name,
            queue_url,
        })
    }

    /// Build the provider described by `config` and initialize against it
    ///
    /// The memory provider creates its queue on the spot so a fresh process
    /// has something to serve.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        let queue_name = QueueName::new(config.queue_name.clone())?;

        let api: Arc<dyn SqsApi> = match config.provider {
            ProviderType::Memory => {
                let memory = InMemorySqs::new();
                memory.create_queue(&queue_name).map_err(|source| {
                    ConfigurationError::QueueResolution {
                        queue_name: queue_name.to_string(),
                        source,
                    }
                })?;
                Arc::new(memory)
            }
            ProviderType::Aws => {
                let credentials = resolve_credentials(config)?;
                debug!(
                    region = %config.region,
                    profile = %config.profile,
                    endpoint = %config.endpoint_url(),
                    "Creating SQS HTTP provider"
                );
                Arc::new(SqsHttpApi::new(config, credentials)?)
            }
        };

        Self::initialize(api, queue_name).await
    }

    /// Receive up to `options.max_messages` messages
    ///
    /// Parameters are passed through unchanged; range checks belong to the
    /// provider.
    #[instrument(skip(self), fields(queue = %self.queue_name))]
    pub async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<ReceivedMessage>, GatewayError> {
        match self.api.receive_message(&self.queue_url, options).await {
            Ok(messages) => {
                debug!(count = messages.len(), "Received messages");
                Ok(messages)
            }
            Err(source) => {
                warn!(error = %source, "Receive failed");
                Err(GatewayError::transient(Operation::Receive, source))
            }
        }
    }

    /// Delete one delivered message
    #[instrument(skip(self, handle), fields(queue = %self.queue_name))]
    pub async fn delete(&self, handle: &ReceiptHandle) -> Result<(), GatewayError> {
        match self.api.delete_message(&self.queue_url, handle).await {
            Ok(()) => {
                debug!("Deleted message");
                Ok(())
            }
            Err(source) => {
                warn!(error = %source, "Delete failed");
                Err(GatewayError::transient(Operation::Delete, source))
            }
        }
    }

    pub fn queue_name(&self) -> &QueueName {
        &self.queue_name
    }

    /// URL resolved at initialization
    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    pub fn provider_type(&self) -> ProviderType {
        self.api.provider_type()
    }
}

impl std::fmt::Debug for QueueGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueGateway")
            .field("queue_name", &self.queue_name)
            .field("queue_url", &self.queue_url)
            .field("provider", &self.api.provider_type())
            .finish()
    }
}
