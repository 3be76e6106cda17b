//! # Failure Envelopes
//!
//! The structured payload routed to failure channels. An envelope carries the
//! provider cause, the exact request that failed and the message it was built
//! from, so a consumer can diagnose or replay without any bridge state.

use std::fmt;

use super::message::{Message, MessageBuilder};
use super::payload::ProviderRequest;
use crate::error::ProviderError;

#[derive(Debug, Clone, PartialEq)]
pub struct FailureEnvelope {
    cause: ProviderError,
    request: ProviderRequest,
    message: Message,
}

impl FailureEnvelope {
    pub fn new(cause: ProviderError, request: ProviderRequest, message: Message) -> Self {
        Self {
            cause,
            request,
            message,
        }
    }

    /// Underlying provider error
    pub fn cause(&self) -> &ProviderError {
        &self.cause
    }

    /// The outbound request that failed
    pub fn request(&self) -> &ProviderRequest {
        &self.request
    }

    /// The inbound message the request was built from
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Wrap into a message for a failure channel, keeping the original headers
    pub fn into_message(self) -> Message {
        let headers = self.message.headers().clone();
        MessageBuilder::with_payload(self)
            .copy_headers(&headers)
            .build()
    }
}

impl fmt::Display for FailureEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to '{}' failed: {}",
            self.request.operation(),
            self.request.destination(),
            self.cause
        )
    }
}

impl std::error::Error for FailureEnvelope {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinesis::PutRecordRequest;
    use bytes::Bytes;
    use std::error::Error as _;

    fn failed_put_record() -> FailureEnvelope {
        let request = PutRecordRequest::new("foo", "fooKey", Bytes::from_static(b"message"));
        let message = Message::builder("message").header("trace", "t-1").build();
        FailureEnvelope::new(
            ProviderError::new("putRecordRequestEx"),
            ProviderRequest::from(crate::kinesis::KinesisRequest::PutRecord(request)),
            message,
        )
    }

    #[test]
    fn test_envelope_exposes_request_and_cause() {
        let envelope = failed_put_record();
        assert_eq!(envelope.cause().message(), "putRecordRequestEx");

        let request = envelope.request().as_put_record().unwrap();
        assert_eq!(request.stream_name, "foo");
        assert_eq!(request.partition_key, "fooKey");
        assert!(envelope.source().is_some());
        assert_eq!(
            envelope.to_string(),
            "put_record to 'foo' failed: putRecordRequestEx"
        );
    }

    #[test]
    fn test_into_message_keeps_original_headers() {
        let envelope = failed_put_record();
        let message = envelope.clone().into_message();

        assert_eq!(message.headers().get_str("trace"), Some("t-1"));
        assert_eq!(message.payload().as_failure(), Some(&envelope));
    }
}
