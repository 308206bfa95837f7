// src/client/mod.rs

use futures::Stream;
use std::future::Future;

use crate::errors::Result;
use crate::models::{ResultMessage, RunRequest, SubmissionHandle};

pub mod http;
pub mod reaper;
pub mod ws;

pub use http::JudgeClient;
pub use reaper::HttpReaper;
pub use ws::{WsChannel, WsSubscription};

/// Schedules a run on the judge.
///
/// Note: like the other seams here this uses `impl Future` returns rather than
/// `async_trait`, so the controller stays generic over its collaborators.
pub trait ExecutionBackend: Send + Sync {
    /// Ask the judge to execute `request`.
    ///
    /// # Returns
    /// The channel and submission id on success; `IdeError::BackendRejection` when the
    /// judge replied with an `error` field; `IdeError::ExecutionRequest` on a non-2xx reply.
    fn run_code(&self, request: &RunRequest) -> impl Future<Output = Result<SubmissionHandle>> + Send;
}

/// Live connection filtered to one channel. Yields messages in arrival order; ends
/// when the server closes the connection. An `Err` item is a transport failure.
pub trait Subscription: Stream<Item = Result<ResultMessage>> + Unpin + Send {
    /// Close the connection. Nothing is read after this.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Opens subscriptions to the judge's event server.
pub trait ResultChannel: Send + Sync {
    type Subscription: Subscription;

    /// Connect and register interest in `channel` before returning.
    fn subscribe(&self, channel: &str) -> impl Future<Output = Result<Self::Subscription>> + Send;
}

/// Best-effort deletion of a finished submission record.
pub trait SubmissionReaper: Send + Sync {
    /// Start deleting `submission_id` and return immediately. Never fails, never retries.
    fn reap(&self, submission_id: &str);
}
