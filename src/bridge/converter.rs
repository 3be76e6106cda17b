//! # Payload Conversion
//!
//! Turns message payloads into the byte or text bodies providers expect.

use bytes::Bytes;

use crate::error::{BridgeError, BridgeResult};
use crate::messaging::{Message, Payload, StreamPayload};

/// Converts a message into a provider request body
pub trait PayloadConverter: Send + Sync {
    fn convert(&self, message: &Message) -> BridgeResult<Bytes>;
}

impl<F> PayloadConverter for F
where
    F: Fn(&Message) -> BridgeResult<Bytes> + Send + Sync,
{
    fn convert(&self, message: &Message) -> BridgeResult<Bytes> {
        self(message)
    }
}

/// Default conversion: bytes as-is, text as UTF-8, objects as JSON and
/// resettable streams read fully
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPayloadConverter;

impl PayloadConverter for DefaultPayloadConverter {
    fn convert(&self, message: &Message) -> BridgeResult<Bytes> {
        payload_bytes(message.payload())
    }
}

/// Byte content of an in-memory payload
pub fn payload_bytes(payload: &Payload) -> BridgeResult<Bytes> {
    match payload {
        Payload::Bytes(bytes) => Ok(bytes.clone()),
        Payload::Text(text) => Ok(Bytes::from(text.clone().into_bytes())),
        Payload::Object(value) => serde_json::to_vec(value).map(Bytes::from).map_err(|e| {
            BridgeError::unsupported_payload("Object", format!("Failed to serialize object payload: {e}"))
        }),
        Payload::Stream(StreamPayload::Resettable(bytes)) => Ok(bytes.clone()),
        other => Err(BridgeError::unsupported_payload(
            other.type_name(),
            "Payload must be bytes, text, an object or a resettable stream",
        )),
    }
}

/// Text content of an in-memory payload
pub fn payload_text(payload: &Payload) -> BridgeResult<String> {
    match payload {
        Payload::Text(text) => Ok(text.clone()),
        Payload::Object(value) => Ok(value.to_string()),
        other => {
            let bytes = payload_bytes(other)?;
            String::from_utf8(bytes.to_vec()).map_err(|_| {
                BridgeError::unsupported_payload(other.type_name(), "Payload is not valid UTF-8 text")
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_default_conversions() {
        let converter = DefaultPayloadConverter;
        assert_eq!(
            converter.convert(&Message::new("message")).unwrap(),
            Bytes::from_static(b"message")
        );
        assert_eq!(
            converter.convert(&Message::new(vec![1u8, 2, 3])).unwrap(),
            Bytes::from_static(&[1, 2, 3])
        );
        assert_eq!(
            converter.convert(&Message::new(json!({"a": 1}))).unwrap(),
            Bytes::from_static(br#"{"a":1}"#)
        );
        assert_eq!(
            converter
                .convert(&Message::new(StreamPayload::resettable(&b"abc"[..])))
                .unwrap(),
            Bytes::from_static(b"abc")
        );
    }

    #[test]
    fn test_unsupported_payloads() {
        let err = payload_bytes(&Payload::File(PathBuf::from("/tmp/a"))).unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedPayload { .. }));

        let stream = StreamPayload::unbuffered(std::io::Cursor::new(vec![1u8]));
        assert!(payload_bytes(&Payload::Stream(stream)).is_err());
    }

    #[test]
    fn test_text_conversion() {
        assert_eq!(payload_text(&Payload::from("hi")).unwrap(), "hi");
        assert_eq!(payload_text(&Payload::from(&b"bytes"[..])).unwrap(), "bytes");
        assert!(payload_text(&Payload::from(vec![0xffu8, 0xfe])).is_err());
    }

    #[test]
    fn test_closure_converter() {
        let upper = |message: &Message| -> BridgeResult<Bytes> {
            Ok(Bytes::from(payload_text(message.payload())?.to_uppercase()))
        };
        assert_eq!(upper.convert(&Message::new("abc")).unwrap(), Bytes::from_static(b"ABC"));
    }
}
