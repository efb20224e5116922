//! # SQS Relay Protocol
//!
//! Wire types for the `sqsrelay.v1.QueueRelay` gRPC service, together with
//! the generated [`queue_relay_client`] and [`queue_relay_server`] modules.
//! Everything here is generated from `proto/sqs_relay.proto`.

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

tonic::include_proto!("sqsrelay.v1");
