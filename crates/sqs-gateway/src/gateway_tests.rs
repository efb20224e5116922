//! Tests for the queue gateway.

use super::*;
use crate::error::ProviderError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Scripted provider
// ============================================================================

/// Provider that replays scripted results and records every call
#[derive(Default)]
struct ScriptedSqs {
    queue_url: Option<String>,
    receive_results: Mutex<VecDeque<Result<Vec<ReceivedMessage>, ProviderError>>>,
    delete_results: Mutex<VecDeque<Result<(), ProviderError>>>,
    receive_calls: Mutex<Vec<(String, ReceiveOptions)>>,
    delete_calls: Mutex<Vec<(String, ReceiptHandle)>>,
}

impl ScriptedSqs {
    fn with_queue(url: &str) -> Self {
        Self {
            queue_url: Some(url.to_string()),
            ..Default::default()
        }
    }

    fn push_receive(&self, result: Result<Vec<ReceivedMessage>, ProviderError>) {
        self.receive_results.lock().unwrap().push_back(result);
    }

    fn push_delete(&self, result: Result<(), ProviderError>) {
        self.delete_results.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl SqsApi for ScriptedSqs {
    async fn get_queue_url(&self, queue_name: &QueueName) -> Result<String, ProviderError> {
        self.queue_url
            .clone()
            .ok_or_else(|| ProviderError::QueueNotFound(queue_name.to_string()))
    }

    async fn receive_message(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, ProviderError> {
        self.receive_calls
            .lock()
            .unwrap()
            .push((queue_url.to_string(), *options));
        self.receive_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn delete_message(
        &self,
        queue_url: &str,
        handle: &ReceiptHandle,
    ) -> Result<(), ProviderError> {
        self.delete_calls
            .lock()
            .unwrap()
            .push((queue_url.to_string(), handle.clone()));
        self.delete_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Memory
    }
}

const URL: &str = "https://sqs.us-east-1.amazonaws.com/123456789012/queue-1";

fn queue_name() -> QueueName {
    QueueName::new("queue-1").unwrap()
}

async fn scripted_gateway() -> (Arc<ScriptedSqs>, QueueGateway) {
    let api = Arc::new(ScriptedSqs::with_queue(URL));
    let gateway = QueueGateway::initialize(api.clone(), queue_name())
        .await
        .unwrap();
    (api, gateway)
}

// ============================================================================
// Initialization
// ============================================================================

mod initialize_tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_resolves_queue_url_once() {
        let (_, gateway) = scripted_gateway().await;

        assert_eq!(gateway.queue_url(), URL);
        assert_eq!(gateway.queue_name().as_str(), "queue-1");
    }

    #[tokio::test]
    async fn test_initialize_failure_is_configuration_error() {
        let api = Arc::new(ScriptedSqs::default());
        let result = QueueGateway::initialize(api, queue_name()).await;

        match result {
            Err(GatewayError::Configuration(ConfigurationError::QueueResolution {
                queue_name,
                source: ProviderError::QueueNotFound(_),
            })) => assert_eq!(queue_name, "queue-1"),
            other => panic!("expected QueueResolution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_memory_provider_creates_queue() {
        let config = GatewayConfig {
            provider: ProviderType::Memory,
            queue_name: "local-queue".to_string(),
            ..Default::default()
        };

        let gateway = QueueGateway::connect(&config).await.unwrap();
        assert_eq!(gateway.provider_type(), ProviderType::Memory);
        assert!(gateway.queue_url().ends_with("/local-queue"));

        let messages = gateway
            .receive(&ReceiveOptions::new(5, 0, 5))
            .await
            .unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_queue_name() {
        let config = GatewayConfig {
            provider: ProviderType::Memory,
            queue_name: "not a queue".to_string(),
            ..Default::default()
        };

        let result = QueueGateway::connect(&config).await;
        assert!(matches!(result, Err(GatewayError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_connect_aws_provider_against_endpoint() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("Action", "GetQueueUrl"))
            .and(query_param("QueueName", "queue-1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!(
                    "<GetQueueUrlResponse><GetQueueUrlResult><QueueUrl>{}</QueueUrl>\
                     </GetQueueUrlResult></GetQueueUrlResponse>",
                    URL
                ),
                "text/xml",
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = GatewayConfig {
            queue_name: "queue-1".to_string(),
            endpoint: Some(mock_server.uri()),
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("secret".to_string()),
            ..Default::default()
        };

        let gateway = QueueGateway::connect(&config).await.unwrap();
        assert_eq!(gateway.provider_type(), ProviderType::Aws);
        assert_eq!(gateway.queue_url(), URL);
    }

    #[tokio::test]
    async fn test_connect_aws_missing_queue_is_configuration_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_raw(
                "<ErrorResponse><Error><Code>AWS.SimpleQueueService.NonExistentQueue</Code>\
                 <Message>The specified queue does not exist.</Message></Error></ErrorResponse>",
                "text/xml",
            ))
            .mount(&mock_server)
            .await;

        let config = GatewayConfig {
            queue_name: "queue-1".to_string(),
            endpoint: Some(mock_server.uri()),
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("secret".to_string()),
            ..Default::default()
        };

        let result = QueueGateway::connect(&config).await;
        assert!(matches!(
            result,
            Err(GatewayError::Configuration(
                ConfigurationError::QueueResolution { .. }
            ))
        ));
    }
}

// ============================================================================
// Receive and delete
// ============================================================================

mod operation_tests {
    use super::*;

    #[tokio::test]
    async fn test_receive_forwards_options_verbatim() {
        let (api, gateway) = scripted_gateway().await;
        api.push_receive(Ok(vec![
            ReceivedMessage::new("h1", "one"),
            ReceivedMessage::new("h2", "two"),
        ]));

        let options = ReceiveOptions::new(30, 20, 10);
        let messages = gateway.receive(&options).await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].handle.as_str(), "h1");
        assert_eq!(messages[1].body, "two");

        let calls = api.receive_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (URL.to_string(), options));
    }

    #[tokio::test]
    async fn test_receive_failure_is_transient() {
        let (api, gateway) = scripted_gateway().await;
        api.push_receive(Err(ProviderError::Network("connection reset".to_string())));

        let error = gateway
            .receive(&ReceiveOptions::default())
            .await
            .unwrap_err();

        assert!(error.is_transient());
        assert!(matches!(
            error,
            GatewayError::Transient {
                operation: Operation::Receive,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_gateway_usable_after_transient_error() {
        let (api, gateway) = scripted_gateway().await;
        api.push_receive(Err(ProviderError::Network("timeout".to_string())));
        api.push_receive(Ok(vec![ReceivedMessage::new("h1", "body")]));

        assert!(gateway.receive(&ReceiveOptions::default()).await.is_err());
        let messages = gateway.receive(&ReceiveOptions::default()).await.unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_forwards_handle() {
        let (api, gateway) = scripted_gateway().await;

        gateway.delete(&ReceiptHandle::new("h1")).await.unwrap();

        let calls = api.delete_calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(URL.to_string(), ReceiptHandle::new("h1"))]);
    }

    #[tokio::test]
    async fn test_delete_failure_is_transient() {
        let (api, gateway) = scripted_gateway().await;
        api.push_delete(Err(ProviderError::InvalidReceipt("error-id".to_string())));

        let error = gateway
            .delete(&ReceiptHandle::new("error-id"))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            GatewayError::Transient {
                operation: Operation::Delete,
                source: ProviderError::InvalidReceipt(_),
            }
        ));
    }

    #[tokio::test]
    async fn test_clones_share_provider() {
        let (api, gateway) = scripted_gateway().await;
        let clone = gateway.clone();

        clone.delete(&ReceiptHandle::new("h1")).await.unwrap();
        gateway.delete(&ReceiptHandle::new("h2")).await.unwrap();

        assert_eq!(api.delete_calls.lock().unwrap().len(), 2);
    }
}
