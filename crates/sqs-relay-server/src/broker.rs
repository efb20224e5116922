//! gRPC service that relays calls to the queue gateway.
//!
//! Each call maps onto exactly one gateway call. Parameters are forwarded
//! unchanged, results are returned in gateway order and every gateway error
//! is reported to the caller as a [`Status`].

use sqs_gateway::{GatewayError, QueueGateway, QueueName, ReceiptHandle, ReceiveOptions};
use sqs_relay_proto::queue_relay_server::QueueRelay;
use sqs_relay_proto::{
    DeleteMessageRequest, DeleteMessageResponse, QueueMessage, ReceiveMessageRequest,
    ReceiveMessageResponse,
};
use tonic::{Request, Response, Status};
use tracing::{debug, instrument};

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;

/// [`QueueRelay`] implementation over a [`QueueGateway`]
#[derive(Debug, Clone)]
pub struct RelayBroker {
    gateway: QueueGateway,
}

impl RelayBroker {
    pub fn new(gateway: QueueGateway) -> Self {
        Self { gateway }
    }

    pub fn queue_name(&self) -> &QueueName {
        self.gateway.queue_name()
    }
}

/// Map a gateway failure onto the status returned to the caller
pub fn status_from_gateway_error(error: GatewayError) -> Status {
    match &error {
        GatewayError::Transient { .. } => Status::unavailable(error.to_string()),
        GatewayError::Configuration(_) => Status::failed_precondition(error.to_string()),
    }
}

#[tonic::async_trait]
impl QueueRelay for RelayBroker {
    #[instrument(skip_all, fields(queue = %self.gateway.queue_name()))]
    async fn receive_message(
        &self,
        request: Request<ReceiveMessageRequest>,
    ) -> Result<Response<ReceiveMessageResponse>, Status> {
        let request = request.into_inner();
        let options = ReceiveOptions::new(
            request.visibility_timeout,
            request.wait_time,
            request.max_messages,
        );
        debug!(
            visibility_timeout = options.visibility_timeout,
            wait_time = options.wait_time,
            max_messages = options.max_messages,
            "ReceiveMessage called"
        );

        let messages = self
            .gateway
            .receive(&options)
            .await
            .map_err(status_from_gateway_error)?;

        let messages: Vec<QueueMessage> = messages
            .into_iter()
            .map(|m| QueueMessage {
                handle: m.handle.into_inner(),
                body: m.body,
            })
            .collect();
        debug!(count = messages.len(), "ReceiveMessage returning");

        Ok(Response::new(ReceiveMessageResponse { messages }))
    }

    #[instrument(skip_all, fields(queue = %self.gateway.queue_name()))]
    async fn delete_message(
        &self,
        request: Request<DeleteMessageRequest>,
    ) -> Result<Response<DeleteMessageResponse>, Status> {
        let handle = ReceiptHandle::new(request.into_inner().handle);
        debug!(handle = %handle, "DeleteMessage called");

        self.gateway
            .delete(&handle)
            .await
            .map_err(status_from_gateway_error)?;

        Ok(Response::new(DeleteMessageResponse {}))
    }
}
