//! # Kinesis Message Handler
//!
//! Builds `PutRecord` requests from messages (or passes through prebuilt
//! `PutRecord`/`PutRecords` requests) and dispatches them to a callback-style
//! Kinesis client.

use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::types::{KinesisRequest, KinesisResult, PutRecordRequest};
use crate::bridge::{
    header_then_resolver, AsyncProvider, BridgeAdapter, BridgeHandler, BridgeSettings, CallbackDispatcher,
    DefaultPayloadConverter, PayloadConverter, Resolver, ResultRouter,
};
use crate::config::KinesisConfig;
use crate::constants::{components, defaults, headers};
use crate::error::{BridgeError, BridgeResult};
use crate::messaging::{ChannelRef, Message, MessageBuilder, ProviderRequest};

/// Shared handle to a Kinesis client
pub type KinesisClientRef = Arc<dyn AsyncProvider<KinesisRequest, Output = KinesisResult>>;

/// Request building and reply enrichment for Kinesis
pub struct KinesisAdapter {
    static_stream: Option<String>,
    stream: Option<Resolver<String>>,
    partition_key: Option<Resolver<String>>,
    sequence_number: Option<Resolver<String>>,
    explicit_hash_key: Option<Resolver<String>>,
    converter: Arc<dyn PayloadConverter>,
}

impl fmt::Debug for KinesisAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KinesisAdapter")
            .field("static_stream", &self.static_stream)
            .field("stream", &self.stream)
            .field("partition_key", &self.partition_key)
            .field("sequence_number", &self.sequence_number)
            .field("explicit_hash_key", &self.explicit_hash_key)
            .finish_non_exhaustive()
    }
}

impl KinesisAdapter {
    fn check_passthrough(&self, request: &KinesisRequest) -> BridgeResult<()> {
        if let KinesisRequest::PutRecords(batch) = request {
            if batch.records.is_empty() {
                return Err(BridgeError::unsupported_payload(
                    "PutRecordsRequest",
                    "A PutRecords request must contain at least one record",
                ));
            }
            if batch.records.len() > defaults::KINESIS_MAX_BATCH_RECORDS {
                return Err(BridgeError::unsupported_payload(
                    "PutRecordsRequest",
                    format!(
                        "A PutRecords request accepts at most {} records, got {}",
                        defaults::KINESIS_MAX_BATCH_RECORDS,
                        batch.records.len()
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl BridgeAdapter for KinesisAdapter {
    type Request = KinesisRequest;
    type Output = KinesisResult;

    fn component(&self) -> &'static str {
        components::KINESIS
    }

    fn build(&self, message: &Message) -> BridgeResult<Vec<KinesisRequest>> {
        if let Some(request) = message.payload().as_request() {
            return match request {
                ProviderRequest::Kinesis(request) => {
                    self.check_passthrough(request)?;
                    Ok(vec![request.clone()])
                }
                other => Err(BridgeError::unsupported_payload(
                    other.operation(),
                    "Only Kinesis requests can be passed through the Kinesis bridge",
                )),
            };
        }

        let stream = header_then_resolver(message, headers::STREAM, self.stream.as_ref())?.ok_or_else(|| {
            BridgeError::configuration(components::KINESIS, "'stream' must not be null for sending a Kinesis record")
        })?;
        let partition_key = header_then_resolver(message, headers::PARTITION_KEY, self.partition_key.as_ref())?
            .ok_or_else(|| {
                BridgeError::configuration(
                    components::KINESIS,
                    "'partitionKey' must not be null for sending a Kinesis record",
                )
            })?;
        let sequence_number =
            header_then_resolver(message, headers::SEQUENCE_NUMBER, self.sequence_number.as_ref())?;
        let explicit_hash_key = match &self.explicit_hash_key {
            Some(resolver) => resolver.resolve(message)?,
            None => None,
        };

        let data = self.converter.convert(message)?;
        let mut request = PutRecordRequest::new(stream, partition_key, data);
        request.sequence_number_for_ordering = sequence_number;
        request.explicit_hash_key = explicit_hash_key;
        Ok(vec![KinesisRequest::PutRecord(request)])
    }

    fn success_message(&self, original: &Message, request: &KinesisRequest, output: KinesisResult) -> Message {
        match (request, output) {
            (KinesisRequest::PutRecords(batch), KinesisResult::PutRecords(result)) => {
                if result.failed_record_count > 0 {
                    warn!(
                        stream = %batch.stream_name,
                        failed = result.failed_record_count,
                        total = batch.records.len(),
                        "PutRecords reported failed records; see the aws_serviceResult header"
                    );
                }
                MessageBuilder::from_message(original)
                    .payload(batch.clone())
                    .header(headers::STREAM, batch.stream_name.as_str())
                    .header(
                        headers::SERVICE_RESULT,
                        serde_json::to_value(&result).unwrap_or_default(),
                    )
                    .build()
            }
            (request, KinesisResult::PutRecord(result)) => {
                let partition_key = match request {
                    KinesisRequest::PutRecord(record) => Some(record.partition_key.as_str()),
                    KinesisRequest::PutRecords(_) => None,
                };
                MessageBuilder::from_message(original)
                    .header(headers::SHARD, result.shard_id)
                    .header(headers::SEQUENCE_NUMBER, result.sequence_number)
                    .header_if_present(headers::PARTITION_KEY, partition_key)
                    .header(headers::STREAM, request.stream_name())
                    .build()
            }
            (request, result) => MessageBuilder::from_message(original)
                .header(headers::STREAM, request.stream_name())
                .header(
                    headers::SERVICE_RESULT,
                    serde_json::to_value(&result).unwrap_or_default(),
                )
                .build(),
        }
    }

    fn static_destinations(&self) -> Vec<String> {
        self.static_stream.iter().cloned().collect()
    }
}

/// The Kinesis bridge
pub type KinesisMessageHandler = BridgeHandler<KinesisAdapter>;

impl BridgeHandler<KinesisAdapter> {
    pub fn builder(client: KinesisClientRef) -> KinesisHandlerBuilder {
        KinesisHandlerBuilder::new(client)
    }
}

/// Builder for [`KinesisMessageHandler`]
pub struct KinesisHandlerBuilder {
    client: KinesisClientRef,
    adapter: KinesisAdapter,
    router: ResultRouter,
    settings: BridgeSettings,
}

impl KinesisHandlerBuilder {
    fn new(client: KinesisClientRef) -> Self {
        Self {
            client,
            adapter: KinesisAdapter {
                static_stream: None,
                stream: None,
                partition_key: None,
                sequence_number: None,
                explicit_hash_key: None,
                converter: Arc::new(DefaultPayloadConverter),
            },
            router: ResultRouter::new(components::KINESIS),
            settings: BridgeSettings::asynchronous(),
        }
    }

    /// Pre-populate from a `kinesis` configuration section
    pub fn from_config(mut self, config: &KinesisConfig) -> Self {
        if let Some(stream) = &config.stream {
            self = self.stream(stream.clone());
        }
        self.settings = config.settings();
        self
    }

    /// Static stream, also checked by the fail-fast existence check
    pub fn stream(mut self, stream: impl Into<String>) -> Self {
        let stream = stream.into();
        self.adapter.stream = Some(Resolver::literal(stream.clone()));
        self.adapter.static_stream = Some(stream);
        self
    }

    pub fn stream_resolver(mut self, resolver: Resolver<String>) -> Self {
        self.adapter.stream = Some(resolver);
        self.adapter.static_stream = None;
        self
    }

    pub fn partition_key(mut self, resolver: Resolver<String>) -> Self {
        self.adapter.partition_key = Some(resolver);
        self
    }

    pub fn sequence_number(mut self, resolver: Resolver<String>) -> Self {
        self.adapter.sequence_number = Some(resolver);
        self
    }

    pub fn explicit_hash_key(mut self, resolver: Resolver<String>) -> Self {
        self.adapter.explicit_hash_key = Some(resolver);
        self
    }

    pub fn converter(mut self, converter: impl PayloadConverter + 'static) -> Self {
        self.adapter.converter = Arc::new(converter);
        self
    }

    pub fn output_channel(mut self, channel: ChannelRef) -> Self {
        self.router = self.router.with_output_channel(channel);
        self
    }

    pub fn failure_channel(mut self, channel: ChannelRef) -> Self {
        self.router = self.router.with_failure_channel(channel);
        self
    }

    pub fn settings(mut self, settings: BridgeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> KinesisMessageHandler {
        let dispatcher = Arc::new(CallbackDispatcher::new(self.client));
        BridgeHandler::new(self.adapter, dispatcher, self.router, self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinesis::{PutRecordResult, PutRecordsRequest, PutRecordsRequestEntry, PutRecordsResult};
    use bytes::Bytes;

    fn adapter() -> KinesisAdapter {
        KinesisAdapter {
            static_stream: None,
            stream: None,
            partition_key: None,
            sequence_number: None,
            explicit_hash_key: None,
            converter: Arc::new(DefaultPayloadConverter),
        }
    }

    #[test]
    fn test_missing_stream_and_partition_key() {
        let mut adapter = adapter();
        let message = Message::new("message");

        let err = adapter.build(&message).unwrap_err();
        assert!(err.is_configuration());
        assert!(err
            .to_string()
            .contains("'stream' must not be null for sending a Kinesis record"));

        adapter.stream = Some(Resolver::literal("foo".to_string()));
        let err = adapter.build(&message).unwrap_err();
        assert!(err
            .to_string()
            .contains("'partitionKey' must not be null for sending a Kinesis record"));
    }

    #[test]
    fn test_builds_record_from_headers() {
        let mut adapter = adapter();
        adapter.stream = Some(Resolver::literal("foo".to_string()));
        let message = Message::builder("message")
            .header(headers::PARTITION_KEY, "fooKey")
            .header(headers::SEQUENCE_NUMBER, "10")
            .build();

        let requests = adapter.build(&message).unwrap();
        assert_eq!(
            requests,
            vec![KinesisRequest::PutRecord(
                PutRecordRequest::new("foo", "fooKey", Bytes::from_static(b"message"))
                    .with_sequence_number_for_ordering("10")
            )]
        );
    }

    #[test]
    fn test_stream_header_overrides_resolver() {
        let mut adapter = adapter();
        adapter.stream = Some(Resolver::literal("foo".to_string()));
        adapter.partition_key = Some(Resolver::literal("k".to_string()));
        let message = Message::builder("m").header(headers::STREAM, "other").build();

        let requests = adapter.build(&message).unwrap();
        assert_eq!(requests[0].stream_name(), "other");
    }

    #[test]
    fn test_passthrough_and_batch_limits() {
        let adapter = adapter();
        let batch = PutRecordsRequest::new("myStream", vec![PutRecordsRequestEntry::new("testKey", &b"test"[..])]);
        let requests = adapter.build(&Message::new(batch.clone())).unwrap();
        assert_eq!(requests, vec![KinesisRequest::PutRecords(batch)]);

        let empty = PutRecordsRequest::new("myStream", Vec::new());
        assert!(adapter.build(&Message::new(empty)).is_err());

        let entries = (0..=defaults::KINESIS_MAX_BATCH_RECORDS)
            .map(|i| PutRecordsRequestEntry::new(i.to_string(), &b"x"[..]))
            .collect();
        let oversized = PutRecordsRequest::new("myStream", entries);
        assert!(matches!(
            adapter.build(&Message::new(oversized)).unwrap_err(),
            BridgeError::UnsupportedPayload { .. }
        ));
    }

    #[test]
    fn test_success_headers_for_single_record() {
        let adapter = adapter();
        let original = Message::new("message");
        let request = KinesisRequest::PutRecord(PutRecordRequest::new("foo", "fooKey", &b"message"[..]));
        let output = KinesisResult::PutRecord(PutRecordResult {
            shard_id: "shardId-1".to_string(),
            sequence_number: "10".to_string(),
            encryption_type: None,
        });

        let reply = adapter.success_message(&original, &request, output);
        assert_eq!(reply.payload(), original.payload());
        assert_eq!(reply.headers().get_str(headers::PARTITION_KEY), Some("fooKey"));
        assert_eq!(reply.headers().get_str(headers::SEQUENCE_NUMBER), Some("10"));
        assert_eq!(reply.headers().get_str(headers::SHARD), Some("shardId-1"));
        assert_eq!(reply.headers().get_str(headers::STREAM), Some("foo"));
    }

    #[test]
    fn test_success_for_batch_echoes_request() {
        let adapter = adapter();
        let batch = PutRecordsRequest::new("myStream", vec![PutRecordsRequestEntry::new("testKey", &b"test"[..])]);
        let original = Message::new(batch.clone());
        let request = KinesisRequest::PutRecords(batch.clone());
        let output = KinesisResult::PutRecords(PutRecordsResult::new(Vec::new()));

        let reply = adapter.success_message(&original, &request, output);
        let echoed = reply.payload().as_request().and_then(ProviderRequest::as_put_records);
        assert_eq!(echoed, Some(&batch));
        assert_eq!(
            reply.headers().get(headers::SERVICE_RESULT).unwrap()["failedRecordCount"],
            0
        );
    }
}
