use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

use crate::{EventRequest, SchedulerHandle};

#[derive(Clone, Debug)]
pub struct ChunkPolicy {
    pub max_events: usize,
    pub max_delay: Duration,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            max_events: 64,
            max_delay: Duration::from_millis(5),
        }
    }
}

/// An ordered chunk of events ready to run on a worker.
#[derive(Debug)]
pub struct ChunkJob {
    pub requests: Vec<EventRequest>,
    pub created_at: std::time::Instant,
}

/// Groups incoming events into chunks, flushing when a chunk is full or its
/// first event has waited `max_delay`.
pub struct Chunker {
    policy: ChunkPolicy,
    rx: mpsc::Receiver<EventRequest>,
    scheduler: SchedulerHandle,
}

impl Chunker {
    pub fn new(
        policy: ChunkPolicy,
        rx: mpsc::Receiver<EventRequest>,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            policy,
            rx,
            scheduler,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut pending: Vec<EventRequest> = Vec::new();
        let mut first_seen: Option<Instant> = None;

        loop {
            tokio::select! {
                maybe_req = self.rx.recv() => {
                    match maybe_req {
                        None => break,
                        Some(req) => {
                            if pending.is_empty() { first_seen = Some(Instant::now()); }
                            pending.push(req);
                            if pending.len() >= self.policy.max_events {
                                self.flush(&mut pending).await?;
                                first_seen = None;
                            }
                        }
                    }
                }
                _ = async {
                    if let Some(t0) = first_seen {
                        sleep(self.policy.max_delay.saturating_sub(t0.elapsed())).await;
                    }
                }, if first_seen.is_some() => {
                    self.flush(&mut pending).await?;
                    first_seen = None;
                }
            }
        }

        // Input closed: whatever is left still goes out.
        self.flush(&mut pending).await
    }

    async fn flush(&self, pending: &mut Vec<EventRequest>) -> Result<()> {
        let requests = std::mem::take(pending);
        if requests.is_empty() {
            return Ok(());
        }

        debug!(events = requests.len(), "dispatching chunk");
        let job = ChunkJob {
            requests,
            created_at: std::time::Instant::now(),
        };

        self.scheduler.submit(job).await
    }
}
