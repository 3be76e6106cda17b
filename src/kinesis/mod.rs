//! # Kinesis Bridge
//!
//! Sends message payloads to Kinesis streams through a callback-style client
//! and emits replies enriched with the shard and sequence number assigned.

pub mod handler;
pub mod types;

pub use handler::{KinesisAdapter, KinesisClientRef, KinesisHandlerBuilder, KinesisMessageHandler};
pub use types::{
    KinesisRequest, KinesisResult, PutRecordRequest, PutRecordResult, PutRecordsRequest, PutRecordsRequestEntry,
    PutRecordsResult, PutRecordsResultEntry,
};
