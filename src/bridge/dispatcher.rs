//! # Dispatchers
//!
//! Issue provider calls and hand back a [`CompletionHandle`] per request.
//! [`CallbackDispatcher`] wraps callback-style providers; [`BlockingDispatcher`]
//! wraps blocking providers and runs the call on the invoking thread or on the
//! tokio blocking pool.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::completion::CompletionHandle;
use super::provider::{AsyncProvider, BlockingProvider};
use crate::error::ProviderError;

/// Issues provider calls and returns their completion handles
pub trait Dispatcher<R, O>: Send + Sync {
    fn dispatch(&self, request: R) -> CompletionHandle<R, O>;

    /// Whether a destination exists, for fail-fast wiring checks
    fn destination_exists(&self, destination: &str) -> Result<bool, ProviderError>;
}

/// Shared dispatcher handle as held by a bridge
pub type DispatcherRef<R, O> = Arc<dyn Dispatcher<R, O>>;

/// Dispatcher for providers with a native callback API
pub struct CallbackDispatcher<P: ?Sized> {
    provider: Arc<P>,
}

impl<P: ?Sized> CallbackDispatcher<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

impl<P: ?Sized> fmt::Debug for CallbackDispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackDispatcher").finish_non_exhaustive()
    }
}

impl<R, P> Dispatcher<R, P::Output> for CallbackDispatcher<P>
where
    R: Clone + Send + 'static,
    P: AsyncProvider<R> + ?Sized,
{
    fn dispatch(&self, request: R) -> CompletionHandle<R, P::Output> {
        let (callback, handle) = CompletionHandle::channel(request.clone());
        self.provider.submit(request, callback);
        handle
    }

    fn destination_exists(&self, destination: &str) -> Result<bool, ProviderError> {
        self.provider.destination_exists(destination)
    }
}

/// Where a blocking provider call runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingMode {
    /// On the thread that handles the message
    CallerThread,
    /// On the tokio blocking thread pool
    #[default]
    Pool,
}

/// Dispatcher adapting a blocking provider to completion handles
pub struct BlockingDispatcher<P: ?Sized> {
    provider: Arc<P>,
    mode: BlockingMode,
}

impl<P: ?Sized> BlockingDispatcher<P> {
    pub fn new(provider: Arc<P>, mode: BlockingMode) -> Self {
        Self { provider, mode }
    }

    pub fn mode(&self) -> BlockingMode {
        self.mode
    }
}

impl<P: ?Sized> fmt::Debug for BlockingDispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingDispatcher")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<R, P> Dispatcher<R, P::Output> for BlockingDispatcher<P>
where
    R: Clone + Send + 'static,
    P: BlockingProvider<R> + ?Sized + 'static,
{
    fn dispatch(&self, request: R) -> CompletionHandle<R, P::Output> {
        let runtime = match self.mode {
            BlockingMode::CallerThread => None,
            BlockingMode::Pool => match tokio::runtime::Handle::try_current() {
                Ok(runtime) => Some(runtime),
                Err(_) => {
                    tracing::warn!("No tokio runtime available; running blocking call on caller thread");
                    None
                }
            },
        };

        match runtime {
            None => {
                let result = self.provider.call(&request);
                CompletionHandle::ready(request, result)
            }
            Some(runtime) => {
                let (callback, handle) = CompletionHandle::channel(request);
                let provider = Arc::clone(&self.provider);
                runtime.spawn_blocking(move || {
                    let result = provider.call(callback.request());
                    callback.complete(result);
                });
                handle
            }
        }
    }

    fn destination_exists(&self, destination: &str) -> Result<bool, ProviderError> {
        self.provider.destination_exists(destination)
    }
}
