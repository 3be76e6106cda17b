//! # Bridge Error Types
//!
//! Structured error handling for the dispatch bridge using thiserror.
//!
//! The taxonomy separates failures detected before anything is dispatched
//! (`Configuration`, `UnsupportedPayload`) from provider failures, which only
//! reach a caller wrapped in [`BridgeError::MessageHandling`], and from
//! [`BridgeError::Timeout`], which means "no answer yet" rather than
//! "answered with failure".

use std::sync::Arc;
use thiserror::Error;

use crate::bridge::InvalidTransition;
use crate::messaging::FailureEnvelope;

/// Error reported by a provider client for a single dispatched request.
///
/// `Display` renders the provider's message verbatim so callers and failure
/// channel consumers see exactly what the provider said.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
    code: Option<String>,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Create a provider error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    /// Create a provider error carrying a service error code
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
            source: None,
        }
    }

    /// Wrap an underlying client error
    pub fn from_source<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: error.to_string(),
            code: None,
            source: Some(Arc::new(error)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

impl PartialEq for ProviderError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.code == other.code
    }
}

/// Comprehensive bridge error types
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Unsupported payload: {payload_type}: {message}")]
    UnsupportedPayload {
        payload_type: String,
        message: String,
    },

    #[error("Timed out waiting for {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Failed to handle message: {}", .envelope.cause())]
    MessageHandling {
        #[source]
        envelope: Box<FailureEnvelope>,
    },

    #[error("Channel send failed: {channel}: {message}")]
    ChannelSend { channel: String, message: String },

    #[error("Sync gate error: {0}")]
    GateState(#[from] InvalidTransition),

    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl BridgeError {
    /// Create a configuration error
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported payload error
    pub fn unsupported_payload(payload_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedPayload {
            payload_type: payload_type.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Wrap a failure envelope so it can be raised to the caller
    pub fn message_handling(envelope: FailureEnvelope) -> Self {
        Self::MessageHandling {
            envelope: Box::new(envelope),
        }
    }

    /// Create a channel send error
    pub fn channel_send(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChannelSend {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error for a named operation
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// The failure envelope when this error carries a provider failure
    pub fn failure_envelope(&self) -> Option<&FailureEnvelope> {
        match self {
            Self::MessageHandling { envelope } => Some(&**envelope),
            _ => None,
        }
    }

    /// The provider cause when this error carries a provider failure
    pub fn provider_cause(&self) -> Option<&ProviderError> {
        self.failure_envelope().map(FailureEnvelope::cause)
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_bridge_error_creation() {
        let config_err = BridgeError::configuration("kinesis", "'stream' must not be null");
        assert!(config_err.is_configuration());

        let timeout_err = BridgeError::timeout("put_record", 500);
        assert!(timeout_err.is_timeout());
        assert!(timeout_err.provider_cause().is_none());

        let payload_err = BridgeError::unsupported_payload("stream", "not resettable");
        assert!(matches!(payload_err, BridgeError::UnsupportedPayload { .. }));
    }

    #[test]
    fn test_error_display() {
        let config_err = BridgeError::configuration("kinesis", "missing stream");
        let display_str = format!("{config_err}");
        assert!(display_str.contains("Configuration error"));
        assert!(display_str.contains("kinesis"));
        assert!(display_str.contains("missing stream"));

        let timeout_err = BridgeError::timeout("put_object", 250);
        assert_eq!(
            timeout_err.to_string(),
            "Timed out waiting for put_object after 250ms"
        );
    }

    #[test]
    fn test_provider_error_keeps_message_verbatim() {
        let err = ProviderError::new("putRecordRequestEx");
        assert_eq!(err.to_string(), "putRecordRequestEx");
        assert_eq!(err.message(), "putRecordRequestEx");
        assert!(err.code().is_none());

        let coded = ProviderError::with_code("ThrottlingException", "Rate exceeded");
        assert_eq!(coded.code(), Some("ThrottlingException"));
        assert_eq!(coded, coded.clone());
    }

    #[test]
    fn test_provider_error_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = ProviderError::from_source(io);
        assert_eq!(err.message(), "reset by peer");
        assert!(err.source().is_some());
    }
}
