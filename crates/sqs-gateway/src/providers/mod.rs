//! Concrete [`SqsApi`](crate::SqsApi) implementations.

pub mod aws;
pub mod memory;

pub use aws::SqsHttpApi;
pub use memory::InMemorySqs;
