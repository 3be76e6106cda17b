//! # Bridge Handler
//!
//! Wires a provider adapter (request building and reply enrichment) to a
//! dispatcher, a result router and, in sync mode, a [`SyncGate`].
//!
//! Build errors (configuration, unsupported payload) are returned before any
//! provider call. Provider failures go to the failure channel; in sync mode
//! they are also returned to the caller. In async mode with no failure channel
//! they are logged and dropped.

use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::completion::{Completion, CompletionHandle};
use super::dispatcher::DispatcherRef;
use super::gate::{GateOutcome, SyncGate};
use super::router::ResultRouter;
use crate::error::{BridgeError, BridgeResult};
use crate::logging::{log_dispatch_operation, log_error};
use crate::messaging::{FailureEnvelope, Message, ProviderRequest};

/// Provider-specific half of a bridge
pub trait BridgeAdapter: Send + Sync + 'static {
    type Request: Clone + fmt::Debug + Send + Sync + Unpin + Into<ProviderRequest> + 'static;
    type Output: fmt::Debug + Send + 'static;

    /// Short component name for logs and errors
    fn component(&self) -> &'static str;

    /// Build the outbound requests for a message
    fn build(&self, message: &Message) -> BridgeResult<Vec<Self::Request>>;

    /// Reply message for a successful request
    fn success_message(&self, original: &Message, request: &Self::Request, output: Self::Output) -> Message;

    /// Destinations known at wiring time, checked by [`BridgeHandler::initialize`]
    fn static_destinations(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Mode flags shared by all bridges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeSettings {
    /// Wait for completions and return failures to the caller
    pub sync: bool,
    /// Upper bound on a sync wait; `None` waits indefinitely
    pub send_timeout: Option<Duration>,
    /// Check destinations exist during [`BridgeHandler::initialize`]
    pub fail_fast: bool,
}

impl BridgeSettings {
    pub fn asynchronous() -> Self {
        Self::default()
    }

    pub fn synchronous(send_timeout: Option<Duration>) -> Self {
        Self {
            sync: true,
            send_timeout,
            fail_fast: false,
        }
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

struct HandlerInner<A: BridgeAdapter> {
    adapter: A,
    dispatcher: DispatcherRef<A::Request, A::Output>,
    router: ResultRouter,
    settings: BridgeSettings,
}

/// A message handler bridging messages to a provider
pub struct BridgeHandler<A: BridgeAdapter> {
    inner: Arc<HandlerInner<A>>,
}

impl<A: BridgeAdapter> Clone for BridgeHandler<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: BridgeAdapter + fmt::Debug> fmt::Debug for BridgeHandler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeHandler")
            .field("adapter", &self.inner.adapter)
            .field("router", &self.inner.router)
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl<A: BridgeAdapter> BridgeHandler<A> {
    pub fn new(
        adapter: A,
        dispatcher: DispatcherRef<A::Request, A::Output>,
        router: ResultRouter,
        settings: BridgeSettings,
    ) -> Self {
        Self {
            inner: Arc::new(HandlerInner {
                adapter,
                dispatcher,
                router,
                settings,
            }),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.inner.adapter
    }

    pub fn settings(&self) -> BridgeSettings {
        self.inner.settings
    }

    pub fn router(&self) -> &ResultRouter {
        &self.inner.router
    }

    /// Wiring-time check that every static destination exists
    ///
    /// Does nothing unless `fail_fast` is set.
    pub fn initialize(&self) -> BridgeResult<()> {
        if !self.inner.settings.fail_fast {
            return Ok(());
        }
        let component = self.inner.adapter.component();
        for destination in self.inner.adapter.static_destinations() {
            let exists = self
                .inner
                .dispatcher
                .destination_exists(&destination)
                .map_err(|e| {
                    BridgeError::configuration(
                        component,
                        format!("Failed to check that '{destination}' exists: {e}"),
                    )
                })?;
            if !exists {
                return Err(BridgeError::configuration(
                    component,
                    format!("'{destination}' does not exist"),
                ));
            }
            debug!(component, destination = %destination, "Destination exists");
        }
        Ok(())
    }

    /// Bridge one message to the provider
    ///
    /// In async mode this returns once every request is dispatched. In sync
    /// mode it returns once every completion has been routed, with the first
    /// failure or timeout as the error.
    #[instrument(skip_all, fields(component = self.inner.adapter.component(), message_id = %message.headers().id()))]
    pub async fn handle_message(&self, message: Message) -> BridgeResult<()> {
        let inner = &self.inner;
        let requests = inner.adapter.build(&message)?;
        if requests.is_empty() {
            debug!("Message produced no provider requests");
            return Ok(());
        }

        let started = Instant::now();
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let described: ProviderRequest = request.clone().into();
                log_dispatch_operation(
                    inner.adapter.component(),
                    described.operation(),
                    described.destination(),
                    "dispatched",
                    None,
                );
                inner.dispatcher.dispatch(request)
            })
            .collect();

        let message = Arc::new(message);
        if !inner.settings.sync {
            for handle in handles {
                self.route_detached(Arc::clone(&message), handle);
            }
            return Ok(());
        }

        let mut first_error: Option<BridgeError> = None;
        for outcome in self.gate_all(started, handles).await? {
            let mut lifecycle = match outcome {
                GateOutcome::Completed { completion, lifecycle } => {
                    if let Err(e) = inner.complete(&message, completion, true).await {
                        first_error.get_or_insert(e);
                    }
                    lifecycle
                }
                GateOutcome::TimedOut { handle, lifecycle } => {
                    let described: ProviderRequest = handle.request().clone().into();
                    let timeout_ms = inner
                        .settings
                        .send_timeout
                        .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
                        .unwrap_or_default();
                    warn!(
                        operation = described.operation(),
                        destination = described.destination(),
                        timeout_ms,
                        "Sync wait timed out; completion will be routed when it arrives"
                    );
                    self.route_detached(Arc::clone(&message), handle);
                    first_error.get_or_insert(BridgeError::timeout(described.operation(), timeout_ms));
                    lifecycle
                }
            };
            lifecycle.reset()?;
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Wait on every handle concurrently, bounded from `started`
    async fn gate_all(
        &self,
        started: Instant,
        handles: Vec<CompletionHandle<A::Request, A::Output>>,
    ) -> BridgeResult<Vec<GateOutcome<A::Request, A::Output>>> {
        let gate = SyncGate::new(self.inner.settings.send_timeout);
        join_all(handles.into_iter().map(|handle| gate.wait_since(started, handle)))
            .await
            .into_iter()
            .map(|outcome| outcome.map_err(BridgeError::from))
            .collect()
    }

    fn route_detached(&self, message: Arc<Message>, handle: CompletionHandle<A::Request, A::Output>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let completion = handle.await;
            if let Err(e) = inner.complete(&message, completion, false).await {
                let context = e
                    .failure_envelope()
                    .map(|envelope| format!("failure dropped, no failure channel: {envelope}"));
                log_error(
                    inner.adapter.component(),
                    "route_completion",
                    &e.to_string(),
                    context.as_deref(),
                );
            }
        });
    }
}

impl<A: BridgeAdapter> HandlerInner<A> {
    async fn complete(
        &self,
        original: &Message,
        completion: Completion<A::Request, A::Output>,
        raise: bool,
    ) -> BridgeResult<()> {
        match completion {
            Completion::Success { request, output } => {
                debug!(?output, "Provider call succeeded");
                let reply = self.adapter.success_message(original, &request, output);
                self.router.route_success(reply).await
            }
            Completion::Failure { request, cause } => {
                debug!(cause = %cause, "Provider call failed");
                let envelope = FailureEnvelope::new(cause, request.into(), original.clone());
                if raise && self.router.has_failure_channel() {
                    self.router.route_failure(envelope.clone()).await?;
                    return Err(BridgeError::message_handling(envelope));
                }
                self.router.route_failure(envelope).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{GateState, Resolver};
    use crate::kinesis::KinesisMessageHandler;
    use crate::messaging::QueueChannel;
    use crate::test_helpers::{kinesis_stub, Reply, StubKinesisClient};

    const WAIT: Duration = Duration::from_secs(2);

    fn handler(
        stub: &Arc<StubKinesisClient>,
        settings: BridgeSettings,
        output: Option<Arc<QueueChannel>>,
        failures: Option<Arc<QueueChannel>>,
    ) -> KinesisMessageHandler {
        let mut builder = KinesisMessageHandler::builder(stub.clone())
            .stream("foo")
            .partition_key(Resolver::literal("fooKey".to_string()))
            .settings(settings);
        if let Some(output) = output {
            builder = builder.output_channel(output);
        }
        if let Some(failures) = failures {
            builder = builder.failure_channel(failures);
        }
        builder.build()
    }

    #[tokio::test]
    async fn test_async_mode_routes_success_and_failure() {
        let stub = Arc::new(kinesis_stub().completing_on_thread());
        let output = QueueChannel::shared("output");
        let failures = QueueChannel::shared("failures");
        let handler = handler(
            &stub,
            BridgeSettings::asynchronous(),
            Some(output.clone()),
            Some(failures.clone()),
        );

        handler.handle_message(Message::new("ok")).await.unwrap();
        assert!(output.receive(WAIT).await.is_some());

        stub.fail_next("boom");
        handler.handle_message(Message::new("bad")).await.unwrap();
        let failure = failures.receive(WAIT).await.unwrap();
        let envelope = failure.payload().as_failure().unwrap();
        assert_eq!(envelope.cause().message(), "boom");
        assert!(output.try_receive().is_none());
    }

    #[tokio::test]
    async fn test_sync_mode_raises_and_still_routes_failure() {
        let stub = Arc::new(kinesis_stub());
        let failures = QueueChannel::shared("failures");
        let handler = handler(&stub, BridgeSettings::synchronous(None), None, Some(failures.clone()));

        stub.fail_next("putRecordRequestEx");
        let err = handler.handle_message(Message::new("message")).await.unwrap_err();
        assert_eq!(err.provider_cause().unwrap().message(), "putRecordRequestEx");
        assert_eq!(failures.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_timeout_routes_late_completion() {
        let stub = Arc::new(kinesis_stub());
        let output = QueueChannel::shared("output");
        let handler = handler(
            &stub,
            BridgeSettings::synchronous(Some(Duration::from_millis(20))),
            Some(output.clone()),
            None,
        );

        stub.hold_next();
        let err = handler.handle_message(Message::new("slow")).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(output.try_receive().is_none());

        stub.release_held();
        assert!(output.receive(WAIT).await.is_some());
    }

    #[tokio::test]
    async fn test_gate_leaves_terminal_state_per_request() {
        let stub = Arc::new(kinesis_stub());
        let handler = handler(
            &stub,
            BridgeSettings::synchronous(Some(Duration::from_millis(20))),
            None,
            None,
        );
        let requests = handler.adapter().build(&Message::new("message")).unwrap();
        let request = requests[0].clone();

        stub.script([Reply::Succeed, Reply::Fail("rejected".to_string()), Reply::Hold]);
        let handles = vec![
            handler.inner.dispatcher.dispatch(request.clone()),
            handler.inner.dispatcher.dispatch(request.clone()),
            handler.inner.dispatcher.dispatch(request),
        ];
        let states: Vec<_> = handler
            .gate_all(Instant::now(), handles)
            .await
            .unwrap()
            .iter()
            .map(GateOutcome::state)
            .collect();
        assert_eq!(
            states,
            vec![
                GateState::Completed { success: true },
                GateState::Completed { success: false },
                GateState::TimedOut,
            ]
        );
        stub.release_held();
    }

    #[tokio::test]
    async fn test_send_timeout_counts_dispatch_time() {
        let stub = Arc::new(kinesis_stub());
        let output = QueueChannel::shared("output");
        let handler = handler(
            &stub,
            BridgeSettings::synchronous(Some(Duration::from_millis(10))),
            Some(output.clone()),
            None,
        );
        let requests = handler.adapter().build(&Message::new("message")).unwrap();
        let handle = handler.inner.dispatcher.dispatch(requests[0].clone());
        let started = Instant::now() - Duration::from_millis(50);

        let outcomes = handler.gate_all(started, vec![handle]).await.unwrap();
        assert_eq!(outcomes[0].state(), GateState::TimedOut);
    }

    #[tokio::test]
    async fn test_build_error_makes_no_provider_call() {
        let stub = Arc::new(kinesis_stub());
        let handler = KinesisMessageHandler::builder(stub.clone())
            .stream("foo")
            .settings(BridgeSettings::synchronous(None))
            .build();

        let err = handler.handle_message(Message::new("message")).await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_one_handler() {
        let stub = Arc::new(kinesis_stub());
        let output = QueueChannel::shared("output");
        let original = handler(&stub, BridgeSettings::synchronous(None), Some(output.clone()), None);
        let copy = original.clone();
        assert!(Arc::ptr_eq(&original.inner, &copy.inner));

        copy.handle_message(Message::new("message")).await.unwrap();
        assert_eq!(output.drain().len(), 1);
        assert_eq!(stub.calls(), 1);
    }

    #[test]
    fn test_fail_fast_initialize() {
        let stub = Arc::new(kinesis_stub());
        stub.mark_missing("foo");

        let lenient = handler(&stub, BridgeSettings::asynchronous(), None, None);
        assert!(lenient.initialize().is_ok());

        let strict = handler(&stub, BridgeSettings::asynchronous().with_fail_fast(true), None, None);
        let err = strict.initialize().unwrap_err();
        assert!(err.to_string().contains("'foo' does not exist"));
        assert_eq!(stub.calls(), 0);
    }
}
