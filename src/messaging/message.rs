//! # Message Structures
//!
//! Immutable message values handed to the bridge by the routing substrate and
//! emitted on success and failure channels.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use super::payload::Payload;

/// Message headers: string keys mapped to JSON values
///
/// Every header set carries a generated `id` and `timestamp`; both are
/// regenerated whenever a new message is built, even from an existing one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageHeaders {
    id: Uuid,
    timestamp: DateTime<Utc>,
    values: HashMap<String, Value>,
}

impl MessageHeaders {
    fn new(values: HashMap<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            values,
        }
    }

    /// Unique id of the message these headers belong to
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the message was built
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Header value as a string slice, only when the stored value is a JSON string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Header value rendered as a string
    ///
    /// Strings are returned as-is, numbers and booleans are formatted.
    /// Null, arrays and objects yield `None`.
    pub fn get_string(&self, name: &str) -> Option<String> {
        match self.values.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// A payload together with its headers
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    payload: Payload,
    headers: MessageHeaders,
}

impl Message {
    /// Create a message with no headers
    pub fn new(payload: impl Into<Payload>) -> Self {
        MessageBuilder::with_payload(payload).build()
    }

    /// Start building a message around a payload
    pub fn builder(payload: impl Into<Payload>) -> MessageBuilder {
        MessageBuilder::with_payload(payload)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    pub fn into_parts(self) -> (Payload, MessageHeaders) {
        (self.payload, self.headers)
    }
}

/// Builder for [`Message`] values
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    payload: Payload,
    values: HashMap<String, Value>,
}

impl MessageBuilder {
    pub fn with_payload(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            values: HashMap::new(),
        }
    }

    /// Start from an existing message, copying its payload and headers
    pub fn from_message(message: &Message) -> Self {
        Self {
            payload: message.payload.clone(),
            values: message.headers.values.clone(),
        }
    }

    /// Replace the payload, keeping the headers collected so far
    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Set a header only when a value is present
    pub fn header_if_present(self, name: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.header(name, value),
            None => self,
        }
    }

    /// Copy every header from another header set, overwriting existing names
    pub fn copy_headers(mut self, headers: &MessageHeaders) -> Self {
        for (name, value) in headers.iter() {
            self.values.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn remove_header(mut self, name: &str) -> Self {
        self.values.remove(name);
        self
    }

    pub fn build(self) -> Message {
        Message {
            payload: self.payload,
            headers: MessageHeaders::new(self.values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_creation() {
        let message = Message::builder("message")
            .header("aws_partitionKey", "fooKey")
            .header("aws_sequenceNumber", "10")
            .build();

        assert_eq!(message.payload(), &Payload::Text("message".to_string()));
        assert_eq!(message.headers().get_str("aws_partitionKey"), Some("fooKey"));
        assert_eq!(message.headers().len(), 2);
        assert!(!message.headers().contains("aws_stream"));
    }

    #[test]
    fn test_header_string_rendering() {
        let message = Message::builder(vec![1u8, 2, 3])
            .header("numeric", 10)
            .header("flag", true)
            .header("nested", json!({"a": 1}))
            .build();

        assert_eq!(message.headers().get_string("numeric"), Some("10".to_string()));
        assert_eq!(message.headers().get_string("flag"), Some("true".to_string()));
        assert_eq!(message.headers().get_string("nested"), None);
        assert_eq!(message.headers().get_str("numeric"), None);
    }

    #[test]
    fn test_from_message_copies_headers_with_new_identity() {
        let original = Message::builder("payload").header("key", "value").build();
        let copy = MessageBuilder::from_message(&original)
            .header("extra", "x")
            .build();

        assert_eq!(copy.payload(), original.payload());
        assert_eq!(copy.headers().get_str("key"), Some("value"));
        assert_eq!(copy.headers().get_str("extra"), Some("x"));
        assert_ne!(copy.headers().id(), original.headers().id());
        assert!(!original.headers().contains("extra"));
    }

    #[test]
    fn test_header_if_present() {
        let message = Message::builder("p")
            .header_if_present("present", Some("yes"))
            .header_if_present("absent", None::<String>)
            .build();

        assert!(message.headers().contains("present"));
        assert!(!message.headers().contains("absent"));
    }
}
