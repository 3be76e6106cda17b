mod common;

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use aws_channel_bridge::bridge::{BridgeSettings, Resolver};
use aws_channel_bridge::constants::headers;
use aws_channel_bridge::error::BridgeError;
use aws_channel_bridge::kinesis::{KinesisMessageHandler, KinesisRequest, PutRecordsRequest, PutRecordsRequestEntry};
use aws_channel_bridge::messaging::{Message, Payload, QueueChannel};
use aws_channel_bridge::test_helpers::{kinesis_stub, StubKinesisClient, STUB_SHARD_ID};
use common::{channels, WAIT};

fn record_handler(stub: &Arc<StubKinesisClient>, settings: BridgeSettings) -> KinesisMessageHandler {
    let (output, failures) = channels();
    record_handler_with(stub, settings, Some(output), Some(failures))
}

fn record_handler_with(
    stub: &Arc<StubKinesisClient>,
    settings: BridgeSettings,
    output: Option<Arc<QueueChannel>>,
    failures: Option<Arc<QueueChannel>>,
) -> KinesisMessageHandler {
    let mut builder = KinesisMessageHandler::builder(stub.clone())
        .stream("foo")
        .partition_key(Resolver::literal("fooKey".to_string()))
        .sequence_number(Resolver::literal("10".to_string()))
        .settings(settings);
    if let Some(output) = output {
        builder = builder.output_channel(output);
    }
    if let Some(failures) = failures {
        builder = builder.failure_channel(failures);
    }
    builder.build()
}

#[tokio::test]
async fn test_put_record_success_reply() {
    let stub = Arc::new(kinesis_stub());
    let (output, failures) = channels();
    let handler = record_handler_with(&stub, BridgeSettings::asynchronous(), Some(output.clone()), Some(failures.clone()));

    handler.handle_message(Message::new("message")).await.unwrap();

    let reply = output.receive(WAIT).await.expect("success reply");
    assert_eq!(reply.headers().get_str(headers::PARTITION_KEY), Some("fooKey"));
    assert_eq!(reply.headers().get_str(headers::SEQUENCE_NUMBER), Some("10"));
    assert_eq!(reply.headers().get_str(headers::SHARD), Some(STUB_SHARD_ID));
    assert_eq!(reply.headers().get_str(headers::STREAM), Some("foo"));
    assert_eq!(reply.payload(), &Payload::Text("message".to_string()));
    assert!(failures.try_receive().is_none());

    let sent = stub.requests();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        KinesisRequest::PutRecord(record) => {
            assert_eq!(record.data, Bytes::from_static(b"message"));
            assert_eq!(record.sequence_number_for_ordering.as_deref(), Some("10"));
        }
        other => panic!("expected put_record, got {other:?}"),
    }
}

#[tokio::test]
async fn test_put_record_failure_envelope() {
    let stub = Arc::new(kinesis_stub().completing_on_thread());
    let (output, failures) = channels();
    let handler = record_handler_with(&stub, BridgeSettings::asynchronous(), Some(output.clone()), Some(failures.clone()));

    stub.fail_next("putRecordRequestEx");
    handler.handle_message(Message::new("message")).await.unwrap();

    let failure = failures.receive(WAIT).await.expect("failure message");
    let envelope = failure.payload().as_failure().expect("failure envelope");
    assert_eq!(envelope.cause().message(), "putRecordRequestEx");

    let request = envelope.request().as_put_record().expect("put_record request");
    assert_eq!(request.stream_name, "foo");
    assert_eq!(request.partition_key, "fooKey");
    assert_eq!(request.sequence_number_for_ordering.as_deref(), Some("10"));
    assert_eq!(envelope.message().payload(), &Payload::Text("message".to_string()));
    assert!(output.try_receive().is_none());
}

#[tokio::test]
async fn test_sync_without_failure_channel_surfaces_cause() {
    let stub = Arc::new(kinesis_stub().completing_on_thread());
    let (output, _) = channels();
    let handler = record_handler_with(&stub, BridgeSettings::synchronous(None), Some(output.clone()), None);

    stub.fail_next("putRecordRequestEx");
    let err = handler.handle_message(Message::new("message")).await.unwrap_err();
    assert_eq!(err.provider_cause().map(|c| c.message()), Some("putRecordRequestEx"));
    assert!(err.to_string().contains("putRecordRequestEx"));
    assert!(output.try_receive().is_none());

    // The handler stays usable after a failure
    handler.handle_message(Message::new("message")).await.unwrap();
    assert!(output.try_receive().is_some());
}

#[tokio::test]
async fn test_missing_partition_key_never_reaches_provider() {
    let stub = Arc::new(kinesis_stub());
    let handler = KinesisMessageHandler::builder(stub.clone())
        .stream("foo")
        .settings(BridgeSettings::synchronous(None))
        .build();

    let err = handler.handle_message(Message::new("message")).await.unwrap_err();
    assert!(err.is_configuration());
    assert!(err
        .to_string()
        .contains("'partitionKey' must not be null for sending a Kinesis record"));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_headers_override_configured_values() {
    let stub = Arc::new(kinesis_stub());
    let handler = record_handler(&stub, BridgeSettings::synchronous(None));

    let message = Message::builder("message")
        .header(headers::STREAM, "other")
        .header(headers::PARTITION_KEY, "headerKey")
        .build();
    handler.handle_message(message).await.unwrap();

    match &stub.requests()[0] {
        KinesisRequest::PutRecord(record) => {
            assert_eq!(record.stream_name, "other");
            assert_eq!(record.partition_key, "headerKey");
        }
        other => panic!("expected put_record, got {other:?}"),
    }
}

fn batch(n: usize) -> PutRecordsRequest {
    PutRecordsRequest::new(
        "foo",
        (0..n)
            .map(|i| PutRecordsRequestEntry::new(format!("key-{i}"), format!("record-{i}")))
            .collect(),
    )
}

#[tokio::test]
async fn test_batch_success_yields_one_reply() {
    let stub = Arc::new(kinesis_stub());
    let (output, failures) = channels();
    let handler = record_handler_with(&stub, BridgeSettings::synchronous(None), Some(output.clone()), Some(failures.clone()));

    handler.handle_message(Message::new(batch(3))).await.unwrap();

    let replies = output.drain();
    assert_eq!(replies.len(), 1);
    let echoed = replies[0]
        .payload()
        .as_request()
        .and_then(|r| r.as_put_records())
        .expect("batch echoed as payload");
    assert_eq!(echoed.records.len(), 3);
    let service_result = replies[0].headers().get(headers::SERVICE_RESULT).expect("service result");
    assert_eq!(service_result["failedRecordCount"], 0);
    assert!(failures.drain().is_empty());
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_batch_failure_references_whole_batch() {
    let stub = Arc::new(kinesis_stub());
    let (output, failures) = channels();
    let handler = record_handler_with(&stub, BridgeSettings::asynchronous(), Some(output.clone()), Some(failures.clone()));

    stub.fail_next("throughput exceeded");
    handler.handle_message(Message::new(batch(4))).await.unwrap();

    let failure = failures.receive(WAIT).await.expect("failure message");
    let envelope = failure.payload().as_failure().unwrap();
    assert_eq!(envelope.request().as_put_records().map(|b| b.records.len()), Some(4));
    assert!(failures.try_receive().is_none());
    assert!(output.try_receive().is_none());
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let stub = Arc::new(kinesis_stub());
    let handler = record_handler(&stub, BridgeSettings::asynchronous());

    let err = handler.handle_message(Message::new(batch(0))).await.unwrap_err();
    assert!(matches!(err, BridgeError::UnsupportedPayload { .. }));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_sync_timeout_then_late_reply() {
    let stub = Arc::new(kinesis_stub());
    let (output, _) = channels();
    let handler = record_handler_with(
        &stub,
        BridgeSettings::synchronous(Some(Duration::from_millis(25))),
        Some(output.clone()),
        None,
    );

    stub.hold_next();
    let err = handler.handle_message(Message::new("message")).await.unwrap_err();
    assert!(err.is_timeout());

    stub.release_held();
    let reply = output.receive(WAIT).await.expect("late reply");
    assert_eq!(reply.headers().get_str(headers::PARTITION_KEY), Some("fooKey"));
}

#[tokio::test]
async fn test_concurrent_messages_each_routed_once() {
    let stub = Arc::new(kinesis_stub().completing_on_thread());
    let (output, _) = channels();
    let handler = record_handler_with(&stub, BridgeSettings::asynchronous(), Some(output.clone()), None);

    let sends: Vec<_> = (0..20)
        .map(|i| {
            let handler = handler.clone();
            tokio::spawn(async move { handler.handle_message(Message::new(format!("m-{i}"))).await })
        })
        .collect();
    for send in sends {
        send.await.unwrap().unwrap();
    }

    let mut received = 0;
    while received < 20 {
        output.receive(WAIT).await.expect("reply");
        received += 1;
    }
    assert!(output.try_receive().is_none());
    assert_eq!(stub.calls(), 20);
}
