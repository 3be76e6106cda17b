//! # Async Dispatch Bridge
//!
//! The provider-independent core shared by the Kinesis, S3 and SQS adapters:
//!
//! - request building inputs ([`Resolver`], [`PayloadConverter`])
//! - dispatch ([`Dispatcher`], [`CallbackDispatcher`], [`BlockingDispatcher`])
//! - completion correlation ([`Callback`], [`CompletionHandle`], [`Completion`])
//! - result routing ([`ResultRouter`])
//! - the sync gate ([`SyncGate`])
//!
//! [`BridgeHandler`] ties them together around a [`BridgeAdapter`].

pub mod completion;
pub mod converter;
pub mod dispatcher;
pub mod gate;
pub mod handler;
pub mod provider;
pub mod resolver;
pub mod router;

pub use completion::{Callback, Completion, CompletionHandle};
pub use converter::{payload_bytes, payload_text, DefaultPayloadConverter, PayloadConverter};
pub use dispatcher::{BlockingDispatcher, BlockingMode, CallbackDispatcher, Dispatcher, DispatcherRef};
pub use gate::{GateLifecycle, GateOutcome, GateState, InvalidTransition, SyncGate};
pub use handler::{BridgeAdapter, BridgeHandler, BridgeSettings};
pub use provider::{AsyncProvider, BlockingProvider};
pub use resolver::{header_then_resolver, Resolver};
pub use router::ResultRouter;
