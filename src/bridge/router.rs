//! # Result Router
//!
//! Turns completions into outbound messages: success replies go to the output
//! channel, failure envelopes go to the failure channel.

use std::fmt;

use crate::error::{BridgeError, BridgeResult};
use crate::logging::log_routing_operation;
use crate::messaging::{ChannelRef, FailureEnvelope, Message};

/// Routes completion messages to the configured channels
#[derive(Clone, Default)]
pub struct ResultRouter {
    component: &'static str,
    output_channel: Option<ChannelRef>,
    failure_channel: Option<ChannelRef>,
}

impl ResultRouter {
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            output_channel: None,
            failure_channel: None,
        }
    }

    pub fn with_output_channel(mut self, channel: ChannelRef) -> Self {
        self.output_channel = Some(channel);
        self
    }

    pub fn with_failure_channel(mut self, channel: ChannelRef) -> Self {
        self.failure_channel = Some(channel);
        self
    }

    pub fn has_output_channel(&self) -> bool {
        self.output_channel.is_some()
    }

    pub fn has_failure_channel(&self) -> bool {
        self.failure_channel.is_some()
    }

    /// Send a success reply, or drop it when no output channel is configured
    pub async fn route_success(&self, reply: Message) -> BridgeResult<()> {
        match &self.output_channel {
            Some(channel) => {
                channel.send(reply).await?;
                log_routing_operation(self.component, "success", Some(channel.name()), "routed", None);
            }
            None => {
                log_routing_operation(
                    self.component,
                    "success",
                    None,
                    "dropped",
                    Some("no output channel configured"),
                );
            }
        }
        Ok(())
    }

    /// Send a failure envelope to the failure channel
    ///
    /// Without a failure channel the envelope comes back as a
    /// [`BridgeError::MessageHandling`] for the caller to raise or log.
    pub async fn route_failure(&self, envelope: FailureEnvelope) -> BridgeResult<()> {
        match &self.failure_channel {
            Some(channel) => {
                let details = envelope.to_string();
                channel.send(envelope.into_message()).await?;
                log_routing_operation(
                    self.component,
                    "failure",
                    Some(channel.name()),
                    "routed",
                    Some(&details),
                );
                Ok(())
            }
            None => Err(BridgeError::message_handling(envelope)),
        }
    }
}

impl fmt::Debug for ResultRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultRouter")
            .field("component", &self.component)
            .field("output_channel", &self.output_channel.as_ref().map(|c| c.name()))
            .field("failure_channel", &self.failure_channel.as_ref().map(|c| c.name()))
            .finish()
    }
}
