//! # Completion Correlation
//!
//! Every dispatched request gets exactly one [`Completion`]. The provider side
//! holds a [`Callback`], consumed by `on_success` or `on_error`, so it cannot
//! report twice. The bridge side holds the matching [`CompletionHandle`]; if a
//! provider drops its callback without reporting, the handle resolves to a
//! failure rather than hanging or losing the request.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::constants::components;
use crate::error::ProviderError;
use crate::logging::log_routing_operation;

/// Message reported when a provider releases a callback without completing it
pub const DROPPED_CALLBACK_MESSAGE: &str =
    "provider released the completion callback without reporting a result";

/// Outcome of one dispatched request
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<R, O> {
    Success { request: R, output: O },
    Failure { request: R, cause: ProviderError },
}

impl<R, O> Completion<R, O> {
    pub fn request(&self) -> &R {
        match self {
            Completion::Success { request, .. } | Completion::Failure { request, .. } => request,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Completion::Success { .. })
    }

    fn from_result(request: R, result: Result<O, ProviderError>) -> Self {
        match result {
            Ok(output) => Completion::Success { request, output },
            Err(cause) => Completion::Failure { request, cause },
        }
    }
}

/// Provider-side half of a completion: report success or failure once
#[derive(Debug)]
pub struct Callback<R, O> {
    request: R,
    sender: oneshot::Sender<Completion<R, O>>,
}

impl<R, O> Callback<R, O> {
    /// The request this callback completes
    pub fn request(&self) -> &R {
        &self.request
    }

    pub fn on_success(self, output: O) {
        self.complete(Ok(output));
    }

    pub fn on_error(self, cause: ProviderError) {
        self.complete(Err(cause));
    }

    pub fn complete(self, result: Result<O, ProviderError>) {
        let route = if result.is_ok() { "success" } else { "failure" };
        if self.sender.send(Completion::from_result(self.request, result)).is_err() {
            log_routing_operation(
                components::COMPLETION,
                route,
                None,
                "dropped",
                Some("completion handle no longer awaited"),
            );
        }
    }
}

/// Bridge-side half of a completion
///
/// Resolves to the request's [`Completion`] when awaited.
#[derive(Debug)]
pub struct CompletionHandle<R, O> {
    request: R,
    receiver: oneshot::Receiver<Completion<R, O>>,
}

impl<R: Clone, O> CompletionHandle<R, O> {
    /// Create a connected callback/handle pair for a request
    pub fn channel(request: R) -> (Callback<R, O>, Self) {
        let (sender, receiver) = oneshot::channel();
        let callback = Callback {
            request: request.clone(),
            sender,
        };
        (callback, Self { request, receiver })
    }

    /// Handle that is already complete
    pub fn ready(request: R, result: Result<O, ProviderError>) -> Self {
        let (callback, handle) = Self::channel(request);
        callback.complete(result);
        handle
    }
}

impl<R, O> CompletionHandle<R, O> {
    pub fn request(&self) -> &R {
        &self.request
    }
}

impl<R: Clone + Unpin, O> Future for CompletionHandle<R, O> {
    type Output = Completion<R, O>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(completion)) => Poll::Ready(completion),
            Poll::Ready(Err(_)) => Poll::Ready(Completion::Failure {
                request: this.request.clone(),
                cause: ProviderError::new(DROPPED_CALLBACK_MESSAGE),
            }),
            Poll::Pending => Poll::Pending,
        }
    }
}
