//! # Provider Capabilities
//!
//! The two shapes a concrete provider client can take. Callback-style clients
//! implement [`AsyncProvider`]; clients with only a blocking API implement
//! [`BlockingProvider`]. The dispatchers normalize both into a
//! [`CompletionHandle`](super::CompletionHandle).

use super::completion::Callback;
use crate::error::ProviderError;

/// Provider exposing a callback-based asynchronous API
///
/// `submit` must return promptly. The result is reported later, from any
/// thread, through the callback.
pub trait AsyncProvider<R>: Send + Sync {
    type Output: Send + 'static;

    fn submit(&self, request: R, callback: Callback<R, Self::Output>);

    /// Whether a destination (stream, bucket, queue) exists
    ///
    /// Used by the fail-fast check at wiring time.
    fn destination_exists(&self, _destination: &str) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

/// Provider exposing only a blocking API
pub trait BlockingProvider<R>: Send + Sync {
    type Output: Send + 'static;

    fn call(&self, request: &R) -> Result<Self::Output, ProviderError>;

    /// Whether a destination (stream, bucket, queue) exists
    fn destination_exists(&self, _destination: &str) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
