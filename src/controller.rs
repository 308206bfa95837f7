// src/controller.rs
use futures::StreamExt;
use serde::Serialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::client::{ExecutionBackend, ResultChannel, SubmissionReaper, Subscription};
use crate::interpreter::{Interpretation, TerminalKind, TerminalOutcome, interpret};
use crate::models::{RunRequest, SubmissionHandle};
use crate::ui::UiSink;

/// Where the controller is in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Submitting,
    AwaitingResult,
    Terminal(TerminalKind),
}

/// Summary of one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub kind: TerminalKind,
    pub text: String,
    pub submission_id: Option<String>,
    pub elapsed_ms: u64,
    pub finished_at: String,
}

/// Disables submit on creation and re-enables it on drop, so every exit from a run,
/// including a dropped future, hands the affordance back exactly once.
struct SubmitLock<'a, S: UiSink> {
    sink: &'a S,
}

impl<'a, S: UiSink> SubmitLock<'a, S> {
    fn engage(sink: &'a S) -> Self {
        sink.set_submit_enabled(false);
        Self { sink }
    }
}

impl<S: UiSink> Drop for SubmitLock<'_, S> {
    fn drop(&mut self) {
        self.sink.set_submit_enabled(true);
    }
}

/// Drives a run from submission to rendered result.
///
/// `run` takes `&mut self`, so a second run cannot start while one is in flight.
pub struct RunController<B, C, R, S> {
    backend: B,
    channel: C,
    reaper: R,
    sink: S,
    state: RunState,
    result_timeout: Option<Duration>,
}

impl<B, C, R, S> RunController<B, C, R, S>
where
    B: ExecutionBackend,
    C: ResultChannel,
    R: SubmissionReaper,
    S: UiSink,
{
    pub fn new(backend: B, channel: C, reaper: R, sink: S) -> Self {
        Self {
            backend,
            channel,
            reaper,
            sink,
            state: RunState::Idle,
            result_timeout: None,
        }
    }

    /// Give up waiting for a result after `limit`. `None` waits indefinitely.
    pub fn with_result_timeout(mut self, limit: Option<Duration>) -> Self {
        self.result_timeout = limit;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Execute `request` and render exactly one outcome.
    pub async fn run(&mut self, request: RunRequest) -> RunReport {
        let run_id = Uuid::new_v4();
        let start = Instant::now();

        let Self {
            backend,
            channel,
            reaper,
            sink,
            state,
            result_timeout,
        } = self;

        if *state != RunState::Idle {
            log::warn!("⚠️  [{}] Previous run was abandoned in {:?}", run_id, state);
        }

        let lock = SubmitLock::engage(&*sink);
        transition(state, RunState::Submitting, run_id);
        sink.render("Running code...\n");

        let (outcome, handle) = drive(&*backend, &*channel, state, *result_timeout, &request, run_id).await;

        sink.render(&outcome.text);
        let submission_id = handle.and_then(|h| h.submission_id);
        if let Some(id) = &submission_id {
            reaper.reap(id);
        }

        transition(state, RunState::Terminal(outcome.kind), run_id);
        drop(lock);
        transition(state, RunState::Idle, run_id);

        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        log::info!("🏁 [{}] Run finished: {} ({}ms)", run_id, outcome.kind, elapsed_ms);

        RunReport {
            run_id: run_id.to_string(),
            kind: outcome.kind,
            text: outcome.text,
            submission_id,
            elapsed_ms,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn transition(state: &mut RunState, next: RunState, run_id: Uuid) {
    log::debug!("[{}] {:?} -> {:?}", run_id, state, next);
    *state = next;
}

/// Submit, then wait for the result. The handle is returned whenever the judge
/// scheduled the run, so the caller can clean up on every later path.
async fn drive<B, C>(
    backend: &B,
    channel: &C,
    state: &mut RunState,
    result_timeout: Option<Duration>,
    request: &RunRequest,
    run_id: Uuid,
) -> (TerminalOutcome, Option<SubmissionHandle>)
where
    B: ExecutionBackend,
    C: ResultChannel,
{
    let handle = match backend.run_code(request).await {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("❌ [{}] Run request failed: {}", run_id, e);
            return (TerminalOutcome::request_error(&e.user_message()), None);
        }
    };

    log::info!(
        "✅ [{}] Scheduled on channel {} (submission {})",
        run_id,
        handle.channel,
        handle.submission_id.as_deref().unwrap_or("none")
    );
    transition(state, RunState::AwaitingResult, run_id);

    let waiting = await_result(channel, &handle.channel, run_id);
    let outcome = match result_timeout {
        Some(limit) => match tokio::time::timeout(limit, waiting).await {
            Ok(outcome) => outcome,
            Err(_) => {
                log::warn!("⏱️  [{}] No result after {:?}", run_id, limit);
                TerminalOutcome::timed_out()
            }
        },
        None => waiting.await,
    };

    (outcome, Some(handle))
}

/// Consume the channel until the first terminal message, then close it.
async fn await_result<C: ResultChannel>(channel: &C, name: &str, run_id: Uuid) -> TerminalOutcome {
    let mut subscription = match channel.subscribe(name).await {
        Ok(subscription) => subscription,
        Err(e) => {
            log::error!("❌ [{}] {}", run_id, e);
            return TerminalOutcome::connection_error();
        }
    };

    while let Some(item) = subscription.next().await {
        match item {
            Ok(message) => match interpret(&message) {
                Interpretation::Continue => {
                    log::debug!("[{}] Ignoring '{}' message", run_id, message.kind());
                }
                Interpretation::Terminal(outcome) => {
                    subscription.close().await;
                    return outcome;
                }
            },
            Err(e) => {
                log::error!("❌ [{}] {}", run_id, e);
                subscription.close().await;
                return TerminalOutcome::connection_error();
            }
        }
    }

    log::warn!("⚠️  [{}] Channel {} closed without a result", run_id, name);
    TerminalOutcome::connection_closed()
}
