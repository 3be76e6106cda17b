//! # Message Channels
//!
//! The narrow contract the bridge needs from the routing substrate: somewhere
//! to send success and failure messages. [`QueueChannel`] is an in-process
//! implementation backed by an unbounded tokio channel, suitable for wiring
//! tests and for callers that poll for replies.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

use super::message::Message;
use crate::error::{BridgeError, BridgeResult};

/// Destination for messages emitted by a bridge
#[async_trait]
pub trait MessageChannel: Send + Sync + fmt::Debug {
    /// Channel name for logs and errors
    fn name(&self) -> &str;

    /// Deliver a message to the channel
    async fn send(&self, message: Message) -> BridgeResult<()>;
}

/// Shared handle to a channel
pub type ChannelRef = Arc<dyn MessageChannel>;

/// Pollable in-process channel
pub struct QueueChannel {
    name: String,
    sender: mpsc::UnboundedSender<Message>,
    receiver: Mutex<mpsc::UnboundedReceiver<Message>>,
}

impl QueueChannel {
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// Convenience constructor returning a shared handle
    pub fn shared(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(name))
    }

    /// Wait up to `timeout` for the next message
    pub async fn receive(&self, timeout: Duration) -> Option<Message> {
        let mut receiver = self.receiver.lock().await;
        tokio::time::timeout(timeout, receiver.recv())
            .await
            .ok()
            .flatten()
    }

    /// Take the next message if one is already queued
    pub fn try_receive(&self) -> Option<Message> {
        let mut receiver = self.receiver.try_lock().ok()?;
        receiver.try_recv().ok()
    }

    /// Drain every queued message
    pub fn drain(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Some(message) = self.try_receive() {
            messages.push(message);
        }
        messages
    }
}

impl fmt::Debug for QueueChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueChannel")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl MessageChannel for QueueChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: Message) -> BridgeResult<()> {
        self.sender
            .send(message)
            .map_err(|e| BridgeError::channel_send(&self.name, e.to_string()))
    }
}
