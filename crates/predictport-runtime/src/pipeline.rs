use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{
    ChunkPolicy, Chunker, Event, EventRequest, EventResponse, InferenceInvoker, Scheduler, Worker,
};

/// Entry point of a running pipeline: events -> chunker -> scheduler -> workers.
///
/// Dropping every clone of the handle closes the input; the chunker flushes
/// what it holds and the tasks wind down.
#[derive(Clone)]
pub struct PipelineHandle {
    tx: mpsc::Sender<EventRequest>,
}

impl PipelineHandle {
    pub async fn submit(&self, event: Event) -> Result<oneshot::Receiver<EventResponse>> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(EventRequest {
                event,
                enqueued_at: std::time::Instant::now(),
                resp_tx,
            })
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        Ok(resp_rx)
    }
}

pub struct Pipeline {
    pub handle: PipelineHandle,
    pub tasks: Vec<JoinHandle<()>>,
}

/// Spawns the pipeline tasks on the current tokio runtime.
pub fn spawn_pipeline(invoker: Arc<InferenceInvoker>, policy: ChunkPolicy, workers: u32) -> Pipeline {
    let (chunker_tx, chunker_rx) = mpsc::channel(1024);
    let (sched_tx, sched_rx) = mpsc::channel(1024);

    let mut worker_txs = Vec::new();
    let mut tasks = Vec::new();
    for id in 0..workers.max(1) {
        let (w_tx, w_rx) = mpsc::channel(128);
        worker_txs.push(w_tx);
        let worker = Worker {
            id,
            inbox: w_rx,
            invoker: Arc::clone(&invoker),
        };
        tasks.push(tokio::spawn(async move {
            if let Err(e) = worker.run().await {
                tracing::error!(error = ?e, "worker exited");
            }
        }));
    }

    let scheduler = Scheduler::new(sched_rx, worker_txs);
    let chunker = Chunker::new(policy, chunker_rx, Scheduler::handle(sched_tx));

    tasks.push(tokio::spawn(async move {
        if let Err(e) = scheduler.run().await {
            tracing::error!(error = ?e, "scheduler exited");
        }
    }));
    tasks.push(tokio::spawn(async move {
        if let Err(e) = chunker.run().await {
            tracing::error!(error = ?e, "chunker exited");
        }
    }));

    Pipeline {
        handle: PipelineHandle { tx: chunker_tx },
        tasks,
    }
}
