//! Tests for the gRPC message source against an in-process relay.

use super::*;
use sqs_relay_proto::queue_relay_server::{QueueRelay, QueueRelayServer};
use sqs_relay_proto::{DeleteMessageResponse, ReceiveMessageResponse};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};

/// Relay that hands out fixed messages and only accepts handle "h1"
#[derive(Clone, Default)]
struct FixedRelay {
    requests: Arc<Mutex<Vec<ReceiveMessageRequest>>>,
}

#[tonic::async_trait]
impl QueueRelay for FixedRelay {
    async fn receive_message(
        &self,
        request: Request<ReceiveMessageRequest>,
    ) -> Result<Response<ReceiveMessageResponse>, Status> {
        let request = request.into_inner();
        self.requests.lock().unwrap().push(request);

        if request.max_messages == 0 {
            return Err(Status::unavailable("ReceiveMessage failed: bad count"));
        }

        Ok(Response::new(ReceiveMessageResponse {
            messages: vec![
                QueueMessage {
                    handle: "h1".to_string(),
                    body: "hello".to_string(),
                },
                QueueMessage {
                    handle: "h2".to_string(),
                    body: "world".to_string(),
                },
            ],
        }))
    }

    async fn delete_message(
        &self,
        request: Request<DeleteMessageRequest>,
    ) -> Result<Response<DeleteMessageResponse>, Status> {
        match request.into_inner().handle.as_str() {
            "h1" => Ok(Response::new(DeleteMessageResponse {})),
            other => Err(Status::unavailable(format!(
                "DeleteMessage failed: invalid receipt {}",
                other
            ))),
        }
    }
}

async fn spawn_relay(relay: FixedRelay) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(QueueRelayServer::new(relay))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    address
}

fn request(max_messages: u32) -> ReceiveMessageRequest {
    ReceiveMessageRequest {
        visibility_timeout: 5,
        wait_time: 0,
        max_messages,
    }
}

#[tokio::test]
async fn test_receive_returns_messages_in_order() {
    let relay = FixedRelay::default();
    let address = spawn_relay(relay.clone()).await;
    let client = RelayClient::connect(&format!("http://{}", address))
        .await
        .unwrap();

    let messages = client.receive(request(5)).await.unwrap();

    let handles: Vec<&str> = messages.iter().map(|m| m.handle.as_str()).collect();
    assert_eq!(handles, vec!["h1", "h2"]);
    assert_eq!(relay.requests.lock().unwrap().as_slice(), &[request(5)]);
}

#[tokio::test]
async fn test_receive_status_becomes_source_error() {
    let address = spawn_relay(FixedRelay::default()).await;
    let client = RelayClient::connect(&format!("http://{}", address))
        .await
        .unwrap();

    let error = client.receive(request(0)).await.unwrap_err();
    assert_eq!(error.code, tonic::Code::Unavailable);
    assert!(error.message.contains("ReceiveMessage"));
}

#[tokio::test]
async fn test_delete_success_and_failure() {
    let address = spawn_relay(FixedRelay::default()).await;
    let client = RelayClient::connect(&format!("http://{}", address))
        .await
        .unwrap();

    assert!(client.delete("h1").await.is_ok());

    let error = client.delete("error-id").await.unwrap_err();
    assert_eq!(error.code, tonic::Code::Unavailable);
    assert!(error.message.contains("error-id"));
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let result = RelayClient::connect(&format!("http://{}", address)).await;
    assert!(matches!(result, Err(ClientError::Connect { .. })));
}

#[tokio::test]
async fn test_invalid_address_is_configuration_error() {
    let result = RelayClient::connect("not a uri").await;
    assert!(matches!(result, Err(ClientError::Configuration { .. })));
}
