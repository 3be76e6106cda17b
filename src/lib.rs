#![allow(clippy::doc_markdown)] // Allow technical terms like Kinesis, PutRecords in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # AWS Channel Bridge
//!
//! Asynchronous request/response bridge between a message-routing substrate
//! and AWS service clients.
//!
//! ## Overview
//!
//! Each adapter turns an inbound [`messaging::Message`] into one or more typed
//! provider requests, submits them to a client that reports completion
//! through a callback (or a blocking call run on a worker pool), and routes
//! the outcome back as a message: enriched success replies go to the output
//! channel, failures go to the failure channel wrapped in a
//! [`messaging::FailureEnvelope`].
//!
//! Handlers run either detached (fire and forget with routed results) or
//! synchronously, where the caller waits on a [`bridge::SyncGate`] and
//! failures are re-raised.
//!
//! ## Module Organization
//!
//! - [`bridge`] - Dispatchers, result router, sync gate and the generic handler
//! - [`kinesis`] - `PutRecord`/`PutRecords` adapter
//! - [`s3`] - Upload, download and copy adapter over a blocking transfer client
//! - [`sqs`] - `SendMessage`/`SendMessageBatch` adapter
//! - [`messaging`] - Messages, payloads, failure envelopes and channels
//! - [`config`] - YAML configuration with environment overrides
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aws_channel_bridge::bridge::Resolver;
//! use aws_channel_bridge::kinesis::{KinesisClientRef, KinesisMessageHandler};
//! use aws_channel_bridge::messaging::{Message, QueueChannel};
//!
//! # async fn example(client: KinesisClientRef) -> Result<(), Box<dyn std::error::Error>> {
//! let output = QueueChannel::shared("kinesis-replies");
//! let handler = KinesisMessageHandler::builder(client)
//!     .stream("events")
//!     .partition_key(Resolver::header("tenant"))
//!     .output_channel(output.clone())
//!     .build();
//! handler.initialize()?;
//!
//! handler
//!     .handle_message(Message::builder("payload").header("tenant", "acme").build())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod constants;
pub mod error;
pub mod kinesis;
pub mod logging;
pub mod messaging;
pub mod s3;
pub mod sqs;
pub mod test_helpers;

pub use bridge::{
    BridgeAdapter, BridgeHandler, BridgeSettings, Completion, CompletionHandle, Dispatcher, ResultRouter,
    SyncGate,
};
pub use config::{BridgeConfig, ConfigManager};
pub use error::{BridgeError, BridgeResult, ProviderError};
pub use kinesis::KinesisMessageHandler;
pub use messaging::{FailureEnvelope, Message, Payload};
pub use s3::S3MessageHandler;
pub use sqs::SqsMessageHandler;
