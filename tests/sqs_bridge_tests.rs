mod common;

use std::sync::Arc;

use aws_channel_bridge::bridge::{BridgeSettings, Resolver};
use aws_channel_bridge::config::SqsConfig;
use aws_channel_bridge::constants::headers;
use aws_channel_bridge::messaging::Message;
use aws_channel_bridge::sqs::{
    md5_of_body, SendMessageBatchRequest, SendMessageBatchRequestEntry, SqsMessageHandler, SqsRequest,
};
use aws_channel_bridge::test_helpers::sqs_stub;
use common::{channels, WAIT};

#[tokio::test]
async fn test_send_message_with_attributes() {
    let stub = Arc::new(sqs_stub());
    let (output, _) = channels();
    let config = SqsConfig {
        queue: Some("orders".to_string()),
        delay_seconds: Some(5),
        attribute_headers: vec!["tenant".to_string()],
        ..SqsConfig::default()
    };
    let handler = SqsMessageHandler::builder(stub.clone())
        .from_config(&config)
        .output_channel(output.clone())
        .build();

    let message = Message::builder("message").header("tenant", "acme").build();
    handler.handle_message(message).await.unwrap();

    let reply = output.receive(WAIT).await.expect("reply");
    assert_eq!(reply.headers().get_str(headers::MESSAGE_ID), Some("msg-1"));
    assert_eq!(reply.headers().get_str(headers::QUEUE), Some("orders"));

    match &stub.requests()[0] {
        SqsRequest::SendMessage(request) => {
            assert_eq!(request.message_body, "message");
            assert_eq!(request.delay_seconds, Some(5));
            assert_eq!(request.message_attributes.get("tenant").map(String::as_str), Some("acme"));
            assert_eq!(md5_of_body(&request.message_body), "78e731027d8fd50ed642340b7c9a63b3");
        }
        other => panic!("expected send_message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fifo_group_from_header() {
    let stub = Arc::new(sqs_stub());
    let (output, _) = channels();
    let handler = SqsMessageHandler::builder(stub.clone())
        .queue("orders.fifo")
        .message_deduplication_id(Resolver::header("orderId"))
        .settings(BridgeSettings::synchronous(None))
        .output_channel(output.clone())
        .build();

    let message = Message::builder("message")
        .header(headers::MESSAGE_GROUP_ID, "g1")
        .header("orderId", 42)
        .build();
    handler.handle_message(message).await.unwrap();

    let reply = output.try_receive().unwrap();
    assert_eq!(reply.headers().get_str(headers::SEQUENCE_NUMBER), Some("1"));
    match &stub.requests()[0] {
        SqsRequest::SendMessage(request) => {
            assert_eq!(request.message_group_id.as_deref(), Some("g1"));
            assert_eq!(request.message_deduplication_id.as_deref(), Some("42"));
        }
        other => panic!("expected send_message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_batch_reply_and_failure() {
    let stub = Arc::new(sqs_stub());
    let (output, failures) = channels();
    let handler = SqsMessageHandler::builder(stub.clone())
        .queue("orders")
        .output_channel(output.clone())
        .failure_channel(failures.clone())
        .build();

    let batch = SendMessageBatchRequest::new(
        "orders",
        vec![
            SendMessageBatchRequestEntry::new("1", "a"),
            SendMessageBatchRequestEntry::new("2", "b"),
        ],
    );
    handler.handle_message(Message::new(batch.clone())).await.unwrap();
    let reply = output.receive(WAIT).await.expect("batch reply");
    let service_result = reply.headers().get(headers::SERVICE_RESULT).unwrap();
    assert_eq!(service_result["successful"].as_array().map(Vec::len), Some(2));

    stub.fail_next("AWS.SimpleQueueService.BatchRequestTooLong");
    handler.handle_message(Message::new(batch)).await.unwrap();
    let failure = failures.receive(WAIT).await.expect("batch failure");
    let envelope = failure.payload().as_failure().unwrap();
    assert_eq!(envelope.request().as_send_message_batch().map(|b| b.entries.len()), Some(2));
}

#[tokio::test]
async fn test_missing_queue_is_configuration_error() {
    let stub = Arc::new(sqs_stub());
    let handler = SqsMessageHandler::builder(stub.clone()).build();

    let err = handler.handle_message(Message::new("message")).await.unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(stub.calls(), 0);
}
