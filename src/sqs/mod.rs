//! # SQS Bridge
//!
//! Sends message payloads to SQS queues through a callback-style client.

pub mod handler;
pub mod types;

pub use handler::{SqsAdapter, SqsClientRef, SqsHandlerBuilder, SqsMessageHandler};
pub use types::{
    md5_of_body, BatchResultErrorEntry, SendMessageBatchRequest, SendMessageBatchRequestEntry,
    SendMessageBatchResult, SendMessageBatchResultEntry, SendMessageRequest, SendMessageResult, SqsRequest,
    SqsResult,
};
