//! # SQS Message Handler
//!
//! Sends message payloads to SQS queues through a callback-style client, or
//! passes prebuilt `SendMessage`/`SendMessageBatch` requests through.

use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::types::{SendMessageRequest, SqsRequest, SqsResult};
use crate::bridge::{
    header_then_resolver, payload_text, AsyncProvider, BridgeAdapter, BridgeHandler, BridgeSettings,
    CallbackDispatcher, Resolver, ResultRouter,
};
use crate::config::SqsConfig;
use crate::constants::{components, defaults, headers};
use crate::error::{BridgeError, BridgeResult};
use crate::messaging::{ChannelRef, Message, MessageBuilder, ProviderRequest};

/// Shared handle to an SQS client
pub type SqsClientRef = Arc<dyn AsyncProvider<SqsRequest, Output = SqsResult>>;

/// Request building and reply enrichment for SQS
pub struct SqsAdapter {
    static_queue: Option<String>,
    queue: Option<Resolver<String>>,
    delay_seconds: Option<Resolver<u32>>,
    message_group_id: Option<Resolver<String>>,
    message_deduplication_id: Option<Resolver<String>>,
    attribute_headers: Vec<String>,
}

impl fmt::Debug for SqsAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqsAdapter")
            .field("static_queue", &self.static_queue)
            .field("queue", &self.queue)
            .field("attribute_headers", &self.attribute_headers)
            .finish_non_exhaustive()
    }
}

fn check_delay(delay: u32) -> BridgeResult<u32> {
    if delay > defaults::SQS_MAX_DELAY_SECONDS {
        return Err(BridgeError::configuration(
            components::SQS,
            format!(
                "'delaySeconds' must be at most {}, got {delay}",
                defaults::SQS_MAX_DELAY_SECONDS
            ),
        ));
    }
    Ok(delay)
}

impl SqsAdapter {
    fn resolve_delay(&self, message: &Message) -> BridgeResult<Option<u32>> {
        if let Some(raw) = message.headers().get_string(headers::DELAY) {
            let delay = raw.parse::<u32>().map_err(|_| {
                BridgeError::configuration(components::SQS, format!("Invalid '{}' header: {raw}", headers::DELAY))
            })?;
            return check_delay(delay).map(Some);
        }
        match &self.delay_seconds {
            Some(resolver) => resolver.resolve(message)?.map(check_delay).transpose(),
            None => Ok(None),
        }
    }

    fn check_passthrough(&self, request: &SqsRequest) -> BridgeResult<()> {
        match request {
            SqsRequest::SendMessage(single) => {
                if let Some(delay) = single.delay_seconds {
                    check_delay(delay)?;
                }
            }
            SqsRequest::SendMessageBatch(batch) => {
                if batch.entries.is_empty() || batch.entries.len() > defaults::SQS_MAX_BATCH_ENTRIES {
                    return Err(BridgeError::unsupported_payload(
                        "SendMessageBatchRequest",
                        format!(
                            "A SendMessageBatch request must contain between 1 and {} entries, got {}",
                            defaults::SQS_MAX_BATCH_ENTRIES,
                            batch.entries.len()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl BridgeAdapter for SqsAdapter {
    type Request = SqsRequest;
    type Output = SqsResult;

    fn component(&self) -> &'static str {
        components::SQS
    }

    fn build(&self, message: &Message) -> BridgeResult<Vec<SqsRequest>> {
        if let Some(request) = message.payload().as_request() {
            return match request {
                ProviderRequest::Sqs(request) => {
                    self.check_passthrough(request)?;
                    Ok(vec![request.clone()])
                }
                other => Err(BridgeError::unsupported_payload(
                    other.operation(),
                    "Only SQS requests can be passed through the SQS bridge",
                )),
            };
        }

        let queue = header_then_resolver(message, headers::QUEUE, self.queue.as_ref())?.ok_or_else(|| {
            BridgeError::configuration(components::SQS, "'queue' must not be null for sending an SQS message")
        })?;
        let message_body = payload_text(message.payload())?;

        let mut request = SendMessageRequest::new(queue, message_body);
        request.delay_seconds = self.resolve_delay(message)?;
        request.message_group_id =
            header_then_resolver(message, headers::MESSAGE_GROUP_ID, self.message_group_id.as_ref())?;
        request.message_deduplication_id = header_then_resolver(
            message,
            headers::MESSAGE_DEDUPLICATION_ID,
            self.message_deduplication_id.as_ref(),
        )?;
        for name in &self.attribute_headers {
            if let Some(value) = message.headers().get_string(name) {
                request.message_attributes.insert(name.clone(), value);
            }
        }
        Ok(vec![SqsRequest::SendMessage(request)])
    }

    fn success_message(&self, original: &Message, request: &SqsRequest, output: SqsResult) -> Message {
        match (request, output) {
            (SqsRequest::SendMessageBatch(batch), result) => {
                if let SqsResult::SendMessageBatch(batch_result) = &result {
                    if !batch_result.failed.is_empty() {
                        warn!(
                            queue = %batch.queue_url,
                            failed = batch_result.failed.len(),
                            total = batch.entries.len(),
                            "SendMessageBatch reported failed entries; see the aws_serviceResult header"
                        );
                    }
                }
                MessageBuilder::from_message(original)
                    .payload(batch.clone())
                    .header(headers::QUEUE, batch.queue_url.as_str())
                    .header(headers::SERVICE_RESULT, serde_json::to_value(&result).unwrap_or_default())
                    .build()
            }
            (SqsRequest::SendMessage(single), SqsResult::SendMessage(result)) => MessageBuilder::from_message(original)
                .header(headers::MESSAGE_ID, result.message_id)
                .header(headers::QUEUE, single.queue_url.as_str())
                .header_if_present(headers::SEQUENCE_NUMBER, result.sequence_number)
                .build(),
            (request, result) => MessageBuilder::from_message(original)
                .header(headers::QUEUE, request.queue_url())
                .header(headers::SERVICE_RESULT, serde_json::to_value(&result).unwrap_or_default())
                .build(),
        }
    }

    fn static_destinations(&self) -> Vec<String> {
        self.static_queue.iter().cloned().collect()
    }
}

/// The SQS bridge
pub type SqsMessageHandler = BridgeHandler<SqsAdapter>;

impl BridgeHandler<SqsAdapter> {
    pub fn builder(client: SqsClientRef) -> SqsHandlerBuilder {
        SqsHandlerBuilder {
            client,
            adapter: SqsAdapter {
                static_queue: None,
                queue: None,
                delay_seconds: None,
                message_group_id: None,
                message_deduplication_id: None,
                attribute_headers: Vec::new(),
            },
            router: ResultRouter::new(components::SQS),
            settings: BridgeSettings::asynchronous(),
        }
    }
}

/// Builder for [`SqsMessageHandler`]
pub struct SqsHandlerBuilder {
    client: SqsClientRef,
    adapter: SqsAdapter,
    router: ResultRouter,
    settings: BridgeSettings,
}

impl SqsHandlerBuilder {
    /// Pre-populate from an `sqs` configuration section
    pub fn from_config(mut self, config: &SqsConfig) -> Self {
        if let Some(queue) = &config.queue {
            self = self.queue(queue.clone());
        }
        if let Some(delay) = config.delay_seconds {
            self.adapter.delay_seconds = Some(Resolver::literal(delay));
        }
        if let Some(group_id) = &config.message_group_id {
            self.adapter.message_group_id = Some(Resolver::literal(group_id.clone()));
        }
        self.adapter.attribute_headers = config.attribute_headers.clone();
        self.settings = config.settings();
        self
    }

    /// Static queue, also checked by the fail-fast existence check
    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        let queue = queue.into();
        self.adapter.queue = Some(Resolver::literal(queue.clone()));
        self.adapter.static_queue = Some(queue);
        self
    }

    pub fn queue_resolver(mut self, resolver: Resolver<String>) -> Self {
        self.adapter.queue = Some(resolver);
        self.adapter.static_queue = None;
        self
    }

    pub fn delay_seconds(mut self, resolver: Resolver<u32>) -> Self {
        self.adapter.delay_seconds = Some(resolver);
        self
    }

    pub fn message_group_id(mut self, resolver: Resolver<String>) -> Self {
        self.adapter.message_group_id = Some(resolver);
        self
    }

    pub fn message_deduplication_id(mut self, resolver: Resolver<String>) -> Self {
        self.adapter.message_deduplication_id = Some(resolver);
        self
    }

    /// Copy these headers into SQS message attributes
    pub fn attribute_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.adapter.attribute_headers = names.into_iter().map(Into::into).collect();
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

    pub fn build(self) -> SqsMessageHandler {
        let dispatcher = Arc::new(CallbackDispatcher::new(self.client));
        BridgeHandler::new(self.adapter, dispatcher, self.router, self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqs::{SendMessageBatchRequest, SendMessageBatchRequestEntry, SendMessageResult};
    use serde_json::json;

    fn adapter() -> SqsAdapter {
        SqsAdapter {
            static_queue: Some("orders".to_string()),
            queue: Some(Resolver::literal("orders".to_string())),
            delay_seconds: None,
            message_group_id: None,
            message_deduplication_id: None,
            attribute_headers: vec!["trace_id".to_string()],
        }
    }

    #[test]
    fn test_builds_send_message() {
        let message = Message::builder(json!({"order": 1}))
            .header(headers::DELAY, 30)
            .header(headers::MESSAGE_GROUP_ID, "group-a")
            .header("trace_id", "abc")
            .header("ignored", "x")
            .build();

        let requests = adapter().build(&message).unwrap();
        match &requests[0] {
            SqsRequest::SendMessage(request) => {
                assert_eq!(request.queue_url, "orders");
                assert_eq!(request.message_body, r#"{"order":1}"#);
                assert_eq!(request.delay_seconds, Some(30));
                assert_eq!(request.message_group_id.as_deref(), Some("group-a"));
                assert_eq!(request.message_attributes.len(), 1);
                assert_eq!(request.message_attributes["trace_id"], "abc");
            }
            other => panic!("expected send_message, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_queue_and_bad_delay() {
        let mut unqueued = adapter();
        unqueued.queue = None;
        let err = unqueued.build(&Message::new("body")).unwrap_err();
        assert!(err
            .to_string()
            .contains("'queue' must not be null for sending an SQS message"));

        let delayed = Message::builder("body").header(headers::DELAY, 1000).build();
        assert!(adapter().build(&delayed).unwrap_err().is_configuration());
    }

    #[test]
    fn test_batch_passthrough_limits() {
        let adapter = adapter();
        let entries: Vec<_> = (0..=defaults::SQS_MAX_BATCH_ENTRIES)
            .map(|i| SendMessageBatchRequestEntry::new(i.to_string(), "m"))
            .collect();
        let oversized = SendMessageBatchRequest::new("orders", entries);
        assert!(adapter.build(&Message::new(oversized)).is_err());

        let batch = SendMessageBatchRequest::new("orders", vec![SendMessageBatchRequestEntry::new("1", "m")]);
        assert_eq!(
            adapter.build(&Message::new(batch.clone())).unwrap(),
            vec![SqsRequest::SendMessageBatch(batch)]
        );
    }

    #[test]
    fn test_success_headers() {
        let original = Message::new("body");
        let request = SqsRequest::SendMessage(SendMessageRequest::new("orders", "body"));
        let output = SqsResult::SendMessage(SendMessageResult {
            message_id: "id-1".to_string(),
            md5_of_message_body: String::new(),
            sequence_number: Some("42".to_string()),
        });

        let reply = adapter().success_message(&original, &request, output);
        assert_eq!(reply.headers().get_str(headers::MESSAGE_ID), Some("id-1"));
        assert_eq!(reply.headers().get_str(headers::QUEUE), Some("orders"));
        assert_eq!(reply.headers().get_str(headers::SEQUENCE_NUMBER), Some("42"));
        assert_eq!(reply.payload(), original.payload());
    }
}
