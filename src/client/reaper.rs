// src/client/reaper.rs

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::client::{JudgeClient, SubmissionReaper};
use crate::errors::IdeError;

/// Deletes submission records on detached tasks.
///
/// Delivery is at most once: a task is never awaited by the run, its result is only
/// logged, and a failed delete is left for the server to garbage-collect.
#[derive(Clone)]
pub struct HttpReaper {
    client: JudgeClient,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl HttpReaper {
    pub fn new(client: JudgeClient) -> Self {
        Self {
            client,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Give outstanding deletes up to `grace` to finish. Only for process exit: a
    /// runtime that shuts down drops whatever is still in flight.
    pub async fn drain(&self, grace: Duration) {
        let handles = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        if handles.is_empty() {
            return;
        }
        if tokio::time::timeout(grace, futures::future::join_all(handles))
            .await
            .is_err()
        {
            log::warn!("⚠️  Submission cleanup still running after {:?}, abandoning it", grace);
        }
    }
}

impl SubmissionReaper for HttpReaper {
    fn reap(&self, submission_id: &str) {
        let client = self.client.clone();
        let submission_id = submission_id.to_string();

        let handle = tokio::spawn(async move {
            match client.delete_submission(&submission_id).await {
                Ok(()) => {}
                Err(e @ IdeError::Cleanup(_)) => {
                    log::warn!("⚠️  Failed to delete submission {}: {}", submission_id, e)
                }
                Err(e) => log::error!("❌ Error deleting submission {}: {}", submission_id, e),
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }
}
