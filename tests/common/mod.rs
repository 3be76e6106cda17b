#![allow(dead_code)]

pub mod strategies;

use std::sync::Arc;
use std::time::Duration;

use aws_channel_bridge::messaging::QueueChannel;

/// Upper bound on waiting for a routed message
pub const WAIT: Duration = Duration::from_secs(2);

/// Fresh output and failure channels
pub fn channels() -> (Arc<QueueChannel>, Arc<QueueChannel>) {
    (QueueChannel::shared("output"), QueueChannel::shared("failures"))
}
