use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tracing::warn;

use crate::ChunkJob;

#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<ChunkJob>,
}

impl SchedulerHandle {
    pub async fn submit(&self, job: ChunkJob) -> Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| anyhow::anyhow!("scheduler is gone"))
    }
}

/// Hands whole chunks to workers round-robin. A chunk is never split, so
/// events inside it keep their order.
///
/// A worker whose inbox has closed is dropped from the rotation and its
/// chunk goes to the next one.
pub struct Scheduler {
    rx: mpsc::Receiver<ChunkJob>,
    workers: Vec<mpsc::Sender<ChunkJob>>,
    next: usize,
}

impl Scheduler {
    pub fn new(rx: mpsc::Receiver<ChunkJob>, workers: Vec<mpsc::Sender<ChunkJob>>) -> Self {
        Self {
            rx,
            workers,
            next: 0,
        }
    }

    pub fn handle(tx: mpsc::Sender<ChunkJob>) -> SchedulerHandle {
        SchedulerHandle { tx }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(job) = self.rx.recv().await {
            self.dispatch(job).await?;
        }
        Ok(())
    }

    async fn dispatch(&mut self, mut job: ChunkJob) -> Result<()> {
        while !self.workers.is_empty() {
            let idx = self.next % self.workers.len();
            match self.workers[idx].send(job).await {
                Ok(()) => {
                    self.next = idx + 1;
                    return Ok(());
                }
                Err(mpsc::error::SendError(returned)) => {
                    warn!(slot = idx, "worker inbox closed, removing from rotation");
                    self.workers.remove(idx);
                    self.next = idx;
                    job = returned;
                }
            }
        }
        bail!("no workers left to run {} events", job.requests.len())
    }
}
