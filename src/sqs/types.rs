//! SQS request and result values.

use md5::{Digest, Md5};
use serde::Serialize;
use std::collections::BTreeMap;

/// Send one message to a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub queue_url: String,
    pub message_body: String,
    pub delay_seconds: Option<u32>,
    pub message_group_id: Option<String>,
    pub message_deduplication_id: Option<String>,
    pub message_attributes: BTreeMap<String, String>,
}

impl SendMessageRequest {
    pub fn new(queue_url: impl Into<String>, message_body: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            message_body: message_body.into(),
            delay_seconds: None,
            message_group_id: None,
            message_deduplication_id: None,
            message_attributes: BTreeMap::new(),
        }
    }

    pub fn with_delay_seconds(mut self, delay_seconds: u32) -> Self {
        self.delay_seconds = Some(delay_seconds);
        self
    }

    pub fn with_message_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.message_group_id = Some(group_id.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.message_attributes.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageBatchRequestEntry {
    /// Caller-chosen id, unique within the batch
    pub id: String,
    pub message_body: String,
    pub delay_seconds: Option<u32>,
    pub message_group_id: Option<String>,
    pub message_deduplication_id: Option<String>,
}

impl SendMessageBatchRequestEntry {
    pub fn new(id: impl Into<String>, message_body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message_body: message_body.into(),
            delay_seconds: None,
            message_group_id: None,
            message_deduplication_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageBatchRequest {
    pub queue_url: String,
    pub entries: Vec<SendMessageBatchRequestEntry>,
}

impl SendMessageBatchRequest {
    pub fn new(queue_url: impl Into<String>, entries: Vec<SendMessageBatchRequestEntry>) -> Self {
        Self {
            queue_url: queue_url.into(),
            entries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResult {
    pub message_id: String,
    pub md5_of_message_body: String,
    /// Assigned for FIFO queues only
    pub sequence_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBatchResultEntry {
    pub id: String,
    pub message_id: String,
    pub md5_of_message_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResultErrorEntry {
    pub id: String,
    pub code: String,
    pub message: String,
    pub sender_fault: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBatchResult {
    pub successful: Vec<SendMessageBatchResultEntry>,
    pub failed: Vec<BatchResultErrorEntry>,
}

/// Request accepted by an SQS provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqsRequest {
    SendMessage(SendMessageRequest),
    SendMessageBatch(SendMessageBatchRequest),
}

impl SqsRequest {
    pub fn queue_url(&self) -> &str {
        match self {
            SqsRequest::SendMessage(request) => &request.queue_url,
            SqsRequest::SendMessageBatch(request) => &request.queue_url,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            SqsRequest::SendMessage(_) => "send_message",
            SqsRequest::SendMessageBatch(_) => "send_message_batch",
        }
    }
}

impl From<SendMessageRequest> for SqsRequest {
    fn from(value: SendMessageRequest) -> Self {
        SqsRequest::SendMessage(value)
    }
}

impl From<SendMessageBatchRequest> for SqsRequest {
    fn from(value: SendMessageBatchRequest) -> Self {
        SqsRequest::SendMessageBatch(value)
    }
}

/// Result reported by an SQS provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SqsResult {
    SendMessage(SendMessageResult),
    SendMessageBatch(SendMessageBatchResult),
}

/// Hex MD5 digest of a message body, as SQS reports it
pub fn md5_of_body(body: &str) -> String {
    format!("{:x}", Md5::digest(body.as_bytes()))
}
