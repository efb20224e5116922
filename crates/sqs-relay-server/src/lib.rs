//! # SQS Relay Server
//!
//! gRPC server exposing `ReceiveMessage` and `DeleteMessage` for a single
//! SQS queue.
//!
//! ## Module Organization
//!
//! - [broker] - The `QueueRelay` service implementation
//! - [config] - Configuration loading and validation
//! - [errors] - Server error types and exit codes

pub mod broker;
pub mod config;
pub mod errors;

pub use broker::{status_from_gateway_error, RelayBroker};
pub use config::{ListenerConfig, LoggingConfig, ServerConfig};
pub use errors::ServerError;

use sqs_gateway::QueueGateway;
use sqs_relay_proto::queue_relay_server::QueueRelayServer;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tracing::{info, warn};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Bound, not yet serving, relay server
pub struct RelayServer {
    listener: TcpListener,
    broker: RelayBroker,
    shutdown_timeout: Duration,
}

impl RelayServer {
    /// Bind the listener described by `config`
    pub async fn bind(config: &ListenerConfig, gateway: QueueGateway) -> Result<Self, ServerError> {
        let address = config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ServerError::BindFailed {
                address: address.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            listener,
            broker: RelayBroker::new(gateway),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_seconds),
        })
    }

    /// Address actually bound, useful when the configured port was 0
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::ServerFailed {
                message: e.to_string(),
            })
    }

    /// Serve until `shutdown` resolves
    ///
    /// New connections stop being accepted as soon as `shutdown` resolves.
    /// In-flight calls get the configured shutdown timeout to finish before
    /// they are dropped.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let local_addr = self.local_addr()?;
        info!(address = %local_addr, queue = %self.broker.queue_name(), "Starting gRPC server");

        let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
        let signal = async move {
            shutdown.await;
            let _ = signalled_tx.send(());
        };

        let serve = tonic::transport::Server::builder()
            .add_service(QueueRelayServer::new(self.broker))
            .serve_with_incoming_shutdown(TcpListenerStream::new(self.listener), signal);
        tokio::pin!(serve);

        let shutdown_timeout = self.shutdown_timeout;
        let grace_expired = async move {
            match signalled_rx.await {
                Ok(()) => tokio::time::sleep(shutdown_timeout).await,
                Err(_) => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = &mut serve => {
                result.map_err(|e| ServerError::ServerFailed { message: e.to_string() })?;
            }
            _ = grace_expired => {
                warn!(
                    timeout_seconds = shutdown_timeout.as_secs(),
                    "Graceful shutdown timed out; dropping in-flight calls"
                );
            }
        }

        info!("gRPC server shutdown complete");
        Ok(())
    }
}

/// Bind `config.server` and serve `gateway` until `shutdown` resolves
pub async fn start_server<F>(
    config: &ServerConfig,
    gateway: QueueGateway,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send,
{
    RelayServer::bind(&config.server, gateway)
        .await?
        .serve_with_shutdown(shutdown)
        .await
}
