use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{ChunkJob, EventResponse, InferenceInvoker, Timings};

pub struct Worker {
    pub id: u32,
    pub inbox: mpsc::Receiver<ChunkJob>,
    pub invoker: Arc<InferenceInvoker>,
}

impl Worker {
    pub async fn run(mut self) -> Result<()> {
        info!(worker_id = self.id, "worker started");
        while let Some(job) = self.inbox.recv().await {
            self.process(job).await?;
        }
        info!(worker_id = self.id, "worker stopped");
        Ok(())
    }

    async fn process(&self, job: ChunkJob) -> Result<()> {
        debug!(worker_id = self.id, events = job.requests.len(), "processing chunk");

        let mut events = Vec::with_capacity(job.requests.len());
        let mut replies = Vec::with_capacity(job.requests.len());
        for req in job.requests {
            let queued_us = job
                .created_at
                .saturating_duration_since(req.enqueued_at)
                .as_micros() as u64;
            events.push(req.event);
            replies.push((req.resp_tx, queued_us));
        }

        // Forward passes block, so they run off the async threads.
        let invoker = Arc::clone(&self.invoker);
        let (outcomes, chunk_us) = tokio::task::spawn_blocking(move || {
            let t0 = std::time::Instant::now();
            let outcomes = invoker.process_chunk(events);
            (outcomes, t0.elapsed().as_micros() as u64)
        })
        .await
        .context("chunk processing panicked")?;

        for (outcome, (resp_tx, queued_us)) in outcomes.into_iter().zip(replies) {
            if let Err(err) = &outcome {
                warn!(worker_id = self.id, error = %err, "event dropped");
            }
            let _ = resp_tx.send(EventResponse {
                outcome,
                timings: Timings {
                    queued_us,
                    chunk_us,
                },
            });
        }
        Ok(())
    }
}
