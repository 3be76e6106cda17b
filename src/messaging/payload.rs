//! # Message Payloads
//!
//! The payload variants a bridge accepts, plus the provider-native request and
//! result values that travel as payloads on bypass, reply and failure paths.

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use super::failure::FailureEnvelope;
use crate::kinesis::{KinesisRequest, KinesisResult, PutRecordRequest, PutRecordsRequest};
use crate::s3::{CopyObjectRequest, PutObjectRequest, S3Request, S3Result};
use crate::sqs::{SendMessageBatchRequest, SendMessageRequest, SqsRequest, SqsResult};

/// Payload carried by a [`Message`](super::Message)
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw bytes
    Bytes(Bytes),
    /// UTF-8 text
    Text(String),
    /// Generic resource handle: a path on the local file system
    File(PathBuf),
    /// Readable stream of bytes
    Stream(StreamPayload),
    /// Structured object, serialized as JSON when bytes are needed
    Object(serde_json::Value),
    /// Fully-formed provider request; builders pass it through unchanged
    Request(ProviderRequest),
    /// Provider result emitted on reply paths
    Result(ProviderResult),
    /// Failure envelope emitted on failure channels
    Failure(Box<FailureEnvelope>),
}

impl Payload {
    /// Short variant name used in logs and unsupported-payload errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::Bytes(_) => "bytes",
            Payload::Text(_) => "text",
            Payload::File(_) => "file",
            Payload::Stream(_) => "stream",
            Payload::Object(_) => "object",
            Payload::Request(_) => "provider_request",
            Payload::Result(_) => "provider_result",
            Payload::Failure(_) => "failure",
        }
    }

    pub fn as_failure(&self) -> Option<&FailureEnvelope> {
        match self {
            Payload::Failure(envelope) => Some(&**envelope),
            _ => None,
        }
    }

    pub fn as_request(&self) -> Option<&ProviderRequest> {
        match self {
            Payload::Request(request) => Some(request),
            _ => None,
        }
    }

    pub fn as_result(&self) -> Option<&ProviderResult> {
        match self {
            Payload::Result(result) => Some(result),
            _ => None,
        }
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Payload::Bytes(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(value))
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Payload::Bytes(Bytes::copy_from_slice(value))
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<PathBuf> for Payload {
    fn from(value: PathBuf) -> Self {
        Payload::File(value)
    }
}

impl From<StreamPayload> for Payload {
    fn from(value: StreamPayload) -> Self {
        Payload::Stream(value)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Object(value)
    }
}

impl From<ProviderRequest> for Payload {
    fn from(value: ProviderRequest) -> Self {
        Payload::Request(value)
    }
}

impl From<ProviderResult> for Payload {
    fn from(value: ProviderResult) -> Self {
        Payload::Result(value)
    }
}

impl From<FailureEnvelope> for Payload {
    fn from(value: FailureEnvelope) -> Self {
        Payload::Failure(Box::new(value))
    }
}

impl From<PutRecordRequest> for Payload {
    fn from(value: PutRecordRequest) -> Self {
        Payload::Request(ProviderRequest::Kinesis(KinesisRequest::PutRecord(value)))
    }
}

impl From<PutRecordsRequest> for Payload {
    fn from(value: PutRecordsRequest) -> Self {
        Payload::Request(ProviderRequest::Kinesis(KinesisRequest::PutRecords(value)))
    }
}

impl From<SendMessageRequest> for Payload {
    fn from(value: SendMessageRequest) -> Self {
        Payload::Request(ProviderRequest::Sqs(SqsRequest::SendMessage(value)))
    }
}

impl From<SendMessageBatchRequest> for Payload {
    fn from(value: SendMessageBatchRequest) -> Self {
        Payload::Request(ProviderRequest::Sqs(SqsRequest::SendMessageBatch(value)))
    }
}

/// A readable byte stream payload
///
/// `Resettable` streams are held in memory and can be read any number of times,
/// so digests can be computed before the body is sent. `Unbuffered` streams can
/// be read exactly once.
#[derive(Clone)]
pub enum StreamPayload {
    Resettable(Bytes),
    Unbuffered(Arc<Mutex<Box<dyn Read + Send>>>),
}

impl StreamPayload {
    pub fn resettable(bytes: impl Into<Bytes>) -> Self {
        StreamPayload::Resettable(bytes.into())
    }

    pub fn unbuffered<R>(reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        StreamPayload::Unbuffered(Arc::new(Mutex::new(Box::new(reader))))
    }

    pub fn is_resettable(&self) -> bool {
        matches!(self, StreamPayload::Resettable(_))
    }

    /// Buffered content, available only for resettable streams
    pub fn buffered(&self) -> Option<&Bytes> {
        match self {
            StreamPayload::Resettable(bytes) => Some(bytes),
            StreamPayload::Unbuffered(_) => None,
        }
    }

    /// Read the remaining content
    ///
    /// Resettable streams return their full content on every call; unbuffered
    /// streams are drained.
    pub fn read_all(&self) -> std::io::Result<Bytes> {
        match self {
            StreamPayload::Resettable(bytes) => Ok(bytes.clone()),
            StreamPayload::Unbuffered(reader) => {
                let mut buffer = Vec::new();
                reader.lock().read_to_end(&mut buffer)?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

impl fmt::Debug for StreamPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamPayload::Resettable(bytes) => f
                .debug_struct("Resettable")
                .field("len", &bytes.len())
                .finish(),
            StreamPayload::Unbuffered(_) => f.write_str("Unbuffered"),
        }
    }
}

impl PartialEq for StreamPayload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StreamPayload::Resettable(a), StreamPayload::Resettable(b)) => a == b,
            (StreamPayload::Unbuffered(a), StreamPayload::Unbuffered(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Provider-native request, as dispatched or as carried by a failure envelope
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderRequest {
    Kinesis(KinesisRequest),
    S3(S3Request),
    Sqs(SqsRequest),
}

impl ProviderRequest {
    /// Stream, bucket or queue the request targets
    pub fn destination(&self) -> &str {
        match self {
            ProviderRequest::Kinesis(request) => request.stream_name(),
            ProviderRequest::S3(request) => request.bucket(),
            ProviderRequest::Sqs(request) => request.queue_url(),
        }
    }

    /// Provider operation name for logs
    pub fn operation(&self) -> &'static str {
        match self {
            ProviderRequest::Kinesis(request) => request.operation(),
            ProviderRequest::S3(request) => request.operation(),
            ProviderRequest::Sqs(request) => request.operation(),
        }
    }

    pub fn as_put_record(&self) -> Option<&PutRecordRequest> {
        match self {
            ProviderRequest::Kinesis(KinesisRequest::PutRecord(request)) => Some(request),
            _ => None,
        }
    }

    pub fn as_put_records(&self) -> Option<&PutRecordsRequest> {
        match self {
            ProviderRequest::Kinesis(KinesisRequest::PutRecords(request)) => Some(request),
            _ => None,
        }
    }

    pub fn as_put_object(&self) -> Option<&PutObjectRequest> {
        match self {
            ProviderRequest::S3(S3Request::Upload(request)) => Some(request),
            _ => None,
        }
    }

    pub fn as_copy_object(&self) -> Option<&CopyObjectRequest> {
        match self {
            ProviderRequest::S3(S3Request::Copy(request)) => Some(request),
            _ => None,
        }
    }

    pub fn as_send_message(&self) -> Option<&SendMessageRequest> {
        match self {
            ProviderRequest::Sqs(SqsRequest::SendMessage(request)) => Some(request),
            _ => None,
        }
    }

    pub fn as_send_message_batch(&self) -> Option<&SendMessageBatchRequest> {
        match self {
            ProviderRequest::Sqs(SqsRequest::SendMessageBatch(request)) => Some(request),
            _ => None,
        }
    }
}

impl From<KinesisRequest> for ProviderRequest {
    fn from(value: KinesisRequest) -> Self {
        ProviderRequest::Kinesis(value)
    }
}

impl From<S3Request> for ProviderRequest {
    fn from(value: S3Request) -> Self {
        ProviderRequest::S3(value)
    }
}

impl From<SqsRequest> for ProviderRequest {
    fn from(value: SqsRequest) -> Self {
        ProviderRequest::Sqs(value)
    }
}

/// Provider result carried by reply payloads
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProviderResult {
    Kinesis(KinesisResult),
    S3(S3Result),
    Sqs(SqsResult),
}

impl From<KinesisResult> for ProviderResult {
    fn from(value: KinesisResult) -> Self {
        ProviderResult::Kinesis(value)
    }
}

impl From<S3Result> for ProviderResult {
    fn from(value: S3Result) -> Self {
        ProviderResult::S3(value)
    }
}

impl From<SqsResult> for ProviderResult {
    fn from(value: SqsResult) -> Self {
        ProviderResult::Sqs(value)
    }
}
