//! Shared fixtures for relay end-to-end tests
//!
//! Each test gets its own in-memory queue served by a real gRPC server on an
//! ephemeral loopback port.

use sqs_gateway::{InMemorySqs, QueueGateway, QueueName};
use sqs_relay_client::{PollingSettings, RelayClient};
use sqs_relay_server::{ListenerConfig, RelayServer, ServerError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const QUEUE: &str = "e2e-queue";

pub fn queue_name() -> QueueName {
    QueueName::new(QUEUE).expect("valid queue name")
}

/// A running relay over an in-memory queue
pub struct TestRelay {
    pub sqs: Arc<InMemorySqs>,
    pub address: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), ServerError>>>,
}

impl TestRelay {
    pub async fn start() -> Self {
        let sqs = Arc::new(InMemorySqs::new());
        sqs.create_queue(&queue_name()).expect("create queue");

        let gateway = QueueGateway::initialize(sqs.clone(), queue_name())
            .await
            .expect("initialize gateway");
        let config = ListenerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            shutdown_timeout_seconds: 2,
        };
        let server = RelayServer::bind(&config, gateway)
            .await
            .expect("bind relay server");
        let address = server.local_addr().expect("local address");

        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with_shutdown(async move {
            let _ = signal.await;
        }));

        Self {
            sqs,
            address,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }

    pub async fn client(&self) -> RelayClient {
        RelayClient::connect(&self.url())
            .await
            .expect("connect to relay")
    }

    pub fn send(&self, body: &str) {
        self.sqs
            .send_message(&queue_name(), body)
            .expect("send message");
    }

    pub fn remaining(&self) -> usize {
        self.sqs.message_count(&queue_name()).expect("count messages")
    }

    /// Stop the server and wait for it to finish
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(10), handle)
                .await
                .expect("server stops in time")
                .expect("server task does not panic")
                .expect("server shuts down cleanly");
        }
    }
}

/// Settings for fast short-poll cycles
pub fn fast_settings(error_limit: u64) -> PollingSettings {
    PollingSettings {
        polling_interval_seconds: 0,
        visibility_timeout: 30,
        wait_time: 0,
        max_messages: 5,
        error_limit,
    }
}
