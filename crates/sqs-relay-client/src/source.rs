//! Where the polling driver gets its messages from.

use crate::errors::{ClientError, SourceError};
use async_trait::async_trait;
use sqs_relay_proto::queue_relay_client::QueueRelayClient;
use sqs_relay_proto::{DeleteMessageRequest, QueueMessage, ReceiveMessageRequest};
use tonic::transport::{Channel, Endpoint};
use tracing::info;

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;

/// Receive and delete calls as seen by the polling driver
///
/// One call is outstanding at a time; implementations need not support
/// concurrent use.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Receive a batch of messages
    async fn receive(&self, request: ReceiveMessageRequest) -> Result<Vec<QueueMessage>, SourceError>;

    /// Delete one message by its receipt handle
    async fn delete(&self, handle: &str) -> Result<(), SourceError>;
}

/// [`MessageSource`] backed by the relay server's gRPC API
#[derive(Debug, Clone)]
pub struct RelayClient {
    inner: QueueRelayClient<Channel>,
}

impl RelayClient {
    /// Connect to the relay server at `address`
    ///
    /// # Errors
    ///
    /// An unparseable address is a configuration error; an unreachable
    /// server is a connect error.
    pub async fn connect(address: &str) -> Result<Self, ClientError> {
        let endpoint =
            Endpoint::from_shared(address.to_string()).map_err(|e| ClientError::Configuration {
                message: format!("invalid server address '{}': {}", address, e),
            })?;

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientError::Connect {
                address: address.to_string(),
                message: e.to_string(),
            })?;

        info!(address = %address, "Connected to relay server");
        Ok(Self::new(channel))
    }

    pub fn new(channel: Channel) -> Self {
        Self {
            inner: QueueRelayClient::new(channel),
        }
    }
}

#[async_trait]
impl MessageSource for RelayClient {
    async fn receive(&self, request: ReceiveMessageRequest) -> Result<Vec<QueueMessage>, SourceError> {
        let mut client = self.inner.clone();
        let response = client.receive_message(request).await?;
        Ok(response.into_inner().messages)
    }

    async fn delete(&self, handle: &str) -> Result<(), SourceError> {
        let mut client = self.inner.clone();
        client
            .delete_message(DeleteMessageRequest {
                handle: handle.to_string(),
            })
            .await?;
        Ok(())
    }
}
