//! Background processing of generation jobs.
//!
//! Submitting a job only enqueues its id. Each job runs on its own detached
//! tokio task, so dropping the submitter's future never cancels a run; the
//! outcome is visible only through the persisted job record.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::orchestrator::{DraftError, DraftOrchestrator};

const QUEUE_DEPTH: usize = 256;

pub struct DraftWorker {
    tx: mpsc::Sender<Uuid>,
    dispatcher: JoinHandle<()>,
}

impl DraftWorker {
    /// Start a dispatcher running at most `concurrency` jobs at once.
    pub fn spawn(orchestrator: Arc<DraftOrchestrator>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let dispatcher = tokio::spawn(dispatch(orchestrator, rx, concurrency));
        info!(concurrency, "draft worker started");
        Self { tx, dispatcher }
    }

    /// Enqueue a pending job for processing.
    pub async fn submit(&self, job_id: Uuid) -> Result<(), DraftError> {
        self.tx
            .send(job_id)
            .await
            .map_err(|_| DraftError::WorkerClosed)
    }

    /// Stop accepting jobs and wait for queued and running jobs to finish.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.dispatcher.await {
            warn!(error = %e, "draft dispatcher ended abnormally");
        }
        info!("draft worker stopped");
    }
}

async fn dispatch(
    orchestrator: Arc<DraftOrchestrator>,
    mut rx: mpsc::Receiver<Uuid>,
    concurrency: usize,
) {
    let permits = Arc::new(Semaphore::new(concurrency));
    while let Some(job_id) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            let _permit = permit;
            debug!(%job_id, "processing generation job");
            if let Err(e) = orchestrator.process(job_id).await {
                warn!(%job_id, error = %e, "generation job did not complete");
            }
        });
    }

    // Drain: every permit back means no job is still running.
    let all = u32::try_from(concurrency).unwrap_or(u32::MAX);
    if permits.acquire_many(all).await.is_err() {
        warn!("draft worker semaphore closed while draining");
    }
}
