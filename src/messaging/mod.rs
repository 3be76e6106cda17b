//! # Messaging Module
//!
//! Message values, payloads, failure envelopes and the channel contract the
//! bridge uses to hand results back to the routing substrate.

pub mod channel;
pub mod failure;
pub mod message;
pub mod payload;

pub use channel::{ChannelRef, MessageChannel, QueueChannel};
pub use failure::FailureEnvelope;
pub use message::{Message, MessageBuilder, MessageHeaders};
pub use payload::{Payload, ProviderRequest, ProviderResult, StreamPayload};
