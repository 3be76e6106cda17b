//! # Stub Providers
//!
//! Scripted in-memory stand-ins for the callback-style Kinesis and SQS
//! clients. Each stub records the requests it receives, answers from a reply
//! script (success by default) and can complete on a background thread the
//! way the real SDK callbacks do.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::bridge::{AsyncProvider, Callback};
use crate::error::ProviderError;
use crate::kinesis::{
    KinesisRequest, KinesisResult, PutRecordResult, PutRecordsResult, PutRecordsResultEntry,
};
use crate::sqs::{
    md5_of_body, SendMessageBatchResult, SendMessageBatchResultEntry, SendMessageResult, SqsRequest, SqsResult,
};

/// How a stub answers the next request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Succeed,
    Fail(String),
    /// Keep the callback until [`StubProvider::release_held`] is called
    Hold,
}

type Responder<R, O> = dyn Fn(&R) -> O + Send + Sync;

/// Scripted [`AsyncProvider`] for tests
pub struct StubProvider<R, O> {
    responder: Arc<Responder<R, O>>,
    script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<R>>,
    held: Mutex<Vec<Callback<R, O>>>,
    missing_destinations: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    complete_on_thread: bool,
}

impl<R, O> fmt::Debug for StubProvider<R, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubProvider")
            .field("calls", &self.calls.load(Ordering::SeqCst))
            .field("complete_on_thread", &self.complete_on_thread)
            .finish_non_exhaustive()
    }
}

impl<R, O> StubProvider<R, O>
where
    R: Clone + Send + 'static,
    O: Send + 'static,
{
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&R) -> O + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
            missing_destinations: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            complete_on_thread: false,
        }
    }

    /// Report completions from a spawned thread instead of inline
    pub fn completing_on_thread(mut self) -> Self {
        self.complete_on_thread = true;
        self
    }

    /// Queue replies for the next requests; once drained every request succeeds
    pub fn script(&self, replies: impl IntoIterator<Item = Reply>) {
        self.script.lock().extend(replies);
    }

    pub fn fail_next(&self, message: impl Into<String>) {
        self.script(Some(Reply::Fail(message.into())));
    }

    pub fn hold_next(&self) {
        self.script(Some(Reply::Hold));
    }

    /// Make the fail-fast existence check report this destination as missing
    pub fn mark_missing(&self, destination: impl Into<String>) {
        self.missing_destinations.lock().insert(destination.into());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<R> {
        self.requests.lock().clone()
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }

    /// Complete every held callback successfully
    pub fn release_held(&self) {
        let held: Vec<_> = self.held.lock().drain(..).collect();
        for callback in held {
            let output = (self.responder)(callback.request());
            callback.on_success(output);
        }
    }
}

impl<R, O> AsyncProvider<R> for StubProvider<R, O>
where
    R: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    type Output = O;

    fn submit(&self, request: R, callback: Callback<R, O>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let reply = self.script.lock().pop_front().unwrap_or(Reply::Succeed);
        let result = match reply {
            Reply::Hold => {
                self.held.lock().push(callback);
                return;
            }
            Reply::Succeed => Ok((self.responder)(&request)),
            Reply::Fail(message) => Err(ProviderError::new(message)),
        };

        if self.complete_on_thread {
            thread::spawn(move || callback.complete(result));
        } else {
            callback.complete(result);
        }
    }

    fn destination_exists(&self, destination: &str) -> Result<bool, ProviderError> {
        Ok(!self.missing_destinations.lock().contains(destination))
    }
}

/// Stub Kinesis client
pub type StubKinesisClient = StubProvider<KinesisRequest, KinesisResult>;

/// Stub SQS client
pub type StubSqsClient = StubProvider<SqsRequest, SqsResult>;

/// Shard id reported by [`kinesis_stub`]
pub const STUB_SHARD_ID: &str = "shardId-000000000000";

/// Kinesis stub assigning sequence numbers from 10 upwards
pub fn kinesis_stub() -> StubKinesisClient {
    let sequence = AtomicUsize::new(10);
    StubProvider::new(move |request: &KinesisRequest| match request {
        KinesisRequest::PutRecord(_) => KinesisResult::PutRecord(PutRecordResult {
            shard_id: STUB_SHARD_ID.to_string(),
            sequence_number: sequence.fetch_add(1, Ordering::SeqCst).to_string(),
            encryption_type: None,
        }),
        KinesisRequest::PutRecords(batch) => KinesisResult::PutRecords(PutRecordsResult::new(
            batch
                .records
                .iter()
                .map(|_| {
                    PutRecordsResultEntry::succeeded(
                        STUB_SHARD_ID,
                        sequence.fetch_add(1, Ordering::SeqCst).to_string(),
                    )
                })
                .collect(),
        )),
    })
}

/// SQS stub numbering message ids and echoing body digests
pub fn sqs_stub() -> StubSqsClient {
    let next_id = AtomicUsize::new(1);
    StubProvider::new(move |request: &SqsRequest| match request {
        SqsRequest::SendMessage(single) => SqsResult::SendMessage(SendMessageResult {
            message_id: format!("msg-{}", next_id.fetch_add(1, Ordering::SeqCst)),
            md5_of_message_body: md5_of_body(&single.message_body),
            sequence_number: single.message_group_id.as_ref().map(|_| "1".to_string()),
        }),
        SqsRequest::SendMessageBatch(batch) => SqsResult::SendMessageBatch(SendMessageBatchResult {
            successful: batch
                .entries
                .iter()
                .map(|entry| SendMessageBatchResultEntry {
                    id: entry.id.clone(),
                    message_id: format!("msg-{}", next_id.fetch_add(1, Ordering::SeqCst)),
                    md5_of_message_body: md5_of_body(&entry.message_body),
                })
                .collect(),
            failed: Vec::new(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::CompletionHandle;
    use crate::kinesis::PutRecordRequest;

    #[tokio::test]
    async fn test_script_and_hold() {
        let stub = kinesis_stub();
        stub.script([Reply::Fail("boom".to_string()), Reply::Hold]);

        let request: KinesisRequest = PutRecordRequest::new("s", "k", "d").into();

        let (callback, handle) = CompletionHandle::channel(request.clone());
        stub.submit(request.clone(), callback);
        assert!(!handle.await.is_success());

        let (callback, handle) = CompletionHandle::channel(request.clone());
        stub.submit(request.clone(), callback);
        assert_eq!(stub.held_count(), 1);
        stub.release_held();
        assert!(handle.await.is_success());

        let (callback, handle) = CompletionHandle::channel(request.clone());
        stub.submit(request, callback);
        assert!(handle.await.is_success());
        assert_eq!(stub.calls(), 3);
    }

    #[test]
    fn test_missing_destination() {
        let stub = sqs_stub();
        stub.mark_missing("orders");
        assert!(!stub.destination_exists("orders").unwrap());
        assert!(stub.destination_exists("other").unwrap());
    }
}
