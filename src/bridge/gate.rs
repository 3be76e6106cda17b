//! # Sync Gate
//!
//! Suspends the handling of a message until a dispatched request completes,
//! optionally bounded by a send timeout. Each wait owns a [`GateLifecycle`]
//! that moves `Idle -> Dispatched -> Completed | TimedOut -> Idle`; the gate
//! leaves it in its terminal state and the handler resets it once the result
//! has been handed back.
//!
//! The bound is measured from when dispatch started, so a provider call that
//! ran on the caller thread counts against it. Timing out abandons the wait
//! only. The provider call keeps running and the handle is returned to the
//! caller so the eventual completion can still be routed.

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use super::completion::{Completion, CompletionHandle};

/// States a gated invocation moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Dispatched,
    Completed { success: bool },
    TimedOut,
}

/// Rejected lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid sync gate transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: GateState,
    pub to: GateState,
}

/// Per-invocation lifecycle state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateLifecycle {
    state: GateState,
}

impl Default for GateLifecycle {
    fn default() -> Self {
        Self {
            state: GateState::Idle,
        }
    }
}

impl GateLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn dispatched(&mut self) -> Result<(), InvalidTransition> {
        self.advance(GateState::Dispatched)
    }

    pub fn completed(&mut self, success: bool) -> Result<(), InvalidTransition> {
        self.advance(GateState::Completed { success })
    }

    pub fn timed_out(&mut self) -> Result<(), InvalidTransition> {
        self.advance(GateState::TimedOut)
    }

    /// Return to idle after the result has been handed back
    pub fn reset(&mut self) -> Result<(), InvalidTransition> {
        self.advance(GateState::Idle)
    }

    fn advance(&mut self, to: GateState) -> Result<(), InvalidTransition> {
        let allowed = matches!(
            (self.state, to),
            (GateState::Idle, GateState::Dispatched)
                | (GateState::Dispatched, GateState::Completed { .. })
                | (GateState::Dispatched, GateState::TimedOut)
                | (GateState::Completed { .. }, GateState::Idle)
                | (GateState::TimedOut, GateState::Idle)
        );
        if !allowed {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

/// Result of waiting on a completion handle
pub enum GateOutcome<R, O> {
    Completed {
        completion: Completion<R, O>,
        lifecycle: GateLifecycle,
    },
    /// The wait timed out; the handle is still live
    TimedOut {
        handle: CompletionHandle<R, O>,
        lifecycle: GateLifecycle,
    },
}

impl<R, O> GateOutcome<R, O> {
    /// Terminal state the wait left its lifecycle in
    pub fn state(&self) -> GateState {
        match self {
            GateOutcome::Completed { lifecycle, .. } | GateOutcome::TimedOut { lifecycle, .. } => {
                lifecycle.state()
            }
        }
    }
}

impl<R: fmt::Debug, O: fmt::Debug> fmt::Debug for GateOutcome<R, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateOutcome::Completed { completion, lifecycle } => f
                .debug_struct("Completed")
                .field("completion", completion)
                .field("state", &lifecycle.state())
                .finish(),
            GateOutcome::TimedOut { handle, lifecycle } => f
                .debug_struct("TimedOut")
                .field("request", handle.request())
                .field("state", &lifecycle.state())
                .finish(),
        }
    }
}

/// Blocks a sync-mode invocation until its completion arrives
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncGate {
    timeout: Option<Duration>,
}

impl SyncGate {
    /// A `None` timeout waits indefinitely
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn wait<R, O>(&self, handle: CompletionHandle<R, O>) -> Result<GateOutcome<R, O>, InvalidTransition>
    where
        R: Clone + Unpin,
    {
        self.wait_since(Instant::now(), handle).await
    }

    /// Wait with the bound measured from `started`
    ///
    /// A deadline already past when the wait begins times out without
    /// polling the handle, even if the completion is ready.
    pub async fn wait_since<R, O>(
        &self,
        started: Instant,
        mut handle: CompletionHandle<R, O>,
    ) -> Result<GateOutcome<R, O>, InvalidTransition>
    where
        R: Clone + Unpin,
    {
        let mut lifecycle = GateLifecycle::new();
        lifecycle.dispatched()?;

        let deadline = self.timeout.and_then(|limit| started.checked_add(limit));
        let completion = match deadline {
            Some(deadline) if Instant::now() >= deadline => None,
            Some(deadline) => tokio::time::timeout_at(deadline, &mut handle).await.ok(),
            None => Some((&mut handle).await),
        };

        match completion {
            Some(completion) => {
                lifecycle.completed(completion.is_success())?;
                Ok(GateOutcome::Completed { completion, lifecycle })
            }
            None => {
                lifecycle.timed_out()?;
                Ok(GateOutcome::TimedOut { handle, lifecycle })
            }
        }
    }
}
