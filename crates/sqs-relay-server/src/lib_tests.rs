//! Tests for server bootstrap and shutdown over a real gRPC connection.

use super::*;
use sqs_gateway::{InMemorySqs, QueueName};
use sqs_relay_proto::queue_relay_client::QueueRelayClient;
use sqs_relay_proto::{DeleteMessageRequest, ReceiveMessageRequest};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tonic::transport::Channel;

fn queue_name() -> QueueName {
    QueueName::new("server-queue").unwrap()
}

fn loopback_config(shutdown_timeout_seconds: u64) -> ListenerConfig {
    ListenerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        shutdown_timeout_seconds,
    }
}

struct RunningServer {
    address: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl RunningServer {
    async fn client(&self) -> QueueRelayClient<Channel> {
        QueueRelayClient::connect(format!("http://{}", self.address))
            .await
            .expect("connect to test server")
    }

    async fn stop(self) -> Result<(), ServerError> {
        let _ = self.shutdown.send(());
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("server stops in time")
            .expect("server task does not panic")
    }
}

async fn start(sqs: Arc<InMemorySqs>, shutdown_timeout_seconds: u64) -> RunningServer {
    let gateway = QueueGateway::initialize(sqs, queue_name()).await.unwrap();
    let server = RelayServer::bind(&loopback_config(shutdown_timeout_seconds), gateway)
        .await
        .unwrap();
    let address = server.local_addr().unwrap();

    let (shutdown, signal) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve_with_shutdown(async move {
        let _ = signal.await;
    }));

    RunningServer {
        address,
        shutdown,
        handle,
    }
}

fn memory_queue() -> Arc<InMemorySqs> {
    let sqs = Arc::new(InMemorySqs::new());
    sqs.create_queue(&queue_name()).unwrap();
    sqs
}

#[tokio::test]
async fn test_receive_and_delete_over_grpc() {
    let sqs = memory_queue();
    sqs.send_message(&queue_name(), "one").unwrap();
    sqs.send_message(&queue_name(), "two").unwrap();

    let server = start(sqs.clone(), 5).await;
    let mut client = server.client().await;

    let response = client
        .receive_message(ReceiveMessageRequest {
            visibility_timeout: 30,
            wait_time: 0,
            max_messages: 5,
        })
        .await
        .unwrap()
        .into_inner();

    let bodies: Vec<&str> = response.messages.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["one", "two"]);

    for message in &response.messages {
        client
            .delete_message(DeleteMessageRequest {
                handle: message.handle.clone(),
            })
            .await
            .unwrap();
    }
    assert_eq!(sqs.message_count(&queue_name()).unwrap(), 0);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_gateway_failure_reaches_client_as_status() {
    let server = start(memory_queue(), 5).await;
    let mut client = server.client().await;

    let status = client
        .delete_message(DeleteMessageRequest {
            handle: "error-id".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), tonic::Code::Unavailable);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_without_calls_returns_ok() {
    let server = start(memory_queue(), 5).await;
    assert!(server.stop().await.is_ok());
}

#[tokio::test]
async fn test_shutdown_timeout_drops_long_poll() {
    let server = start(memory_queue(), 1).await;
    let mut client = server.client().await;

    let in_flight = tokio::spawn(async move {
        client
            .receive_message(ReceiveMessageRequest {
                visibility_timeout: 5,
                wait_time: 20,
                max_messages: 1,
            })
            .await
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = std::time::Instant::now();
    assert!(server.stop().await.is_ok());
    assert!(started.elapsed() < Duration::from_secs(10));

    in_flight.abort();
}

#[tokio::test]
async fn test_bind_to_used_port_fails() {
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let gateway = QueueGateway::initialize(memory_queue(), queue_name())
        .await
        .unwrap();
    let config = ListenerConfig {
        port,
        ..loopback_config(5)
    };

    match RelayServer::bind(&config, gateway).await {
        Err(ServerError::BindFailed { address, .. }) => {
            assert_eq!(address, format!("127.0.0.1:{}", port))
        }
        Err(other) => panic!("expected BindFailed, got {:?}", other),
        Ok(_) => panic!("expected BindFailed, got a bound server"),
    }
}

#[tokio::test]
async fn test_start_server_stops_on_shutdown() {
    let gateway = QueueGateway::initialize(memory_queue(), queue_name())
        .await
        .unwrap();
    let config = ServerConfig {
        server: loopback_config(5),
        ..Default::default()
    };

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        start_server(&config, gateway, async {}),
    )
    .await
    .expect("server stops in time");
    assert!(result.is_ok());
}
