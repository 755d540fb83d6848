use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use predictport_backend_ort::OrtBackend;
use predictport_cli::cli::{Cli, Command, ConventionArg};
use predictport_cli::input;
use predictport_core::{bind, Backend, BackendModel, Device, ModelArtifact, NodeSpec};
use predictport_runtime::{
    spawn_pipeline, ChunkPolicy, EventResponse, InferenceInvoker, Param, Pipeline,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect {
            model_path,
            device,
            outputs,
            log,
        } => {
            init_tracing(&log);
            inspect(model_path.into(), input::parse_device(&device)?, &outputs)
        }
        Command::Run {
            model_path,
            attrs,
            params,
            convention,
            max_events,
            max_delay_ms,
            workers,
            device,
            log,
        } => {
            init_tracing(&log);
            let policy = ChunkPolicy {
                max_events: max_events.max(1),
                max_delay: Duration::from_millis(max_delay_ms),
            };
            run(RunArgs {
                model_path,
                attrs,
                params,
                convention,
                policy,
                workers,
                device: input::parse_device(&device)?,
            })
            .await
        }
    }
}

fn init_tracing(log: &str) {
    std::env::set_var("RUST_LOG", log);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn describe(spec: &NodeSpec) -> String {
    let dims = spec
        .dims
        .iter()
        .map(|d| d.map_or_else(|| "?".to_string(), |d| d.to_string()))
        .collect::<Vec<_>>()
        .join(",");
    format!("{} ({}) {}[{}]", spec.name.0, spec.node.0, spec.dtype, dims)
}

fn inspect(model_path: PathBuf, device: Device, outputs: &[String]) -> Result<()> {
    let backend = OrtBackend::new();
    let artifact = ModelArtifact::from(model_path);
    let model = backend
        .load(&artifact, device)
        .with_context(|| format!("failed to inspect {artifact}"))?;
    let signature = model.signature();

    for spec in &signature.inputs {
        println!("input   {}", describe(spec));
    }
    for spec in &signature.outputs {
        println!("output  {}", describe(spec));
    }

    if !outputs.is_empty() {
        let binding = bind(signature, &[], outputs)?;
        for attr in &binding.schema {
            println!("attr    {}: {}", attr.name, attr.ty);
        }
    }
    Ok(())
}

struct RunArgs {
    model_path: String,
    attrs: Vec<String>,
    params: Vec<String>,
    convention: ConventionArg,
    policy: ChunkPolicy,
    workers: u32,
    device: Device,
}

/// One stdin line in flight, answered in submission order.
enum Pending {
    Submitted(oneshot::Receiver<EventResponse>),
    Rejected(String),
}

async fn run(args: RunArgs) -> Result<()> {
    let stream = input::stream_definition(&args.attrs)?;

    let mut params = vec![Param::string(&args.model_path)];
    params.extend(args.params.iter().map(|raw| input::parse_param(raw)));

    let backend = OrtBackend::new();
    let invoker = InferenceInvoker::configure(
        &backend,
        args.device,
        args.convention.into(),
        &params,
        &stream,
    )?;
    let schema = invoker.output_schema().clone();

    let Pipeline { handle, tasks } = spawn_pipeline(Arc::new(invoker), args.policy, args.workers);

    let (pending_tx, mut pending_rx) = mpsc::channel::<Pending>(1024);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(pending) = pending_rx.recv().await {
            let line = match pending {
                Pending::Submitted(rx) => match rx.await {
                    Ok(response) => input::render(&response.outcome, &schema),
                    Err(_) => serde_json::json!({ "error": "worker dropped the event" }),
                },
                Pending::Rejected(reason) => serde_json::json!({ "error": reason }),
            };
            stdout.write_all(format!("{line}\n").as_bytes()).await?;
        }
        stdout.flush().await?;
        anyhow::Ok(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut timestamp = 0i64;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let pending = match input::event_from_json(timestamp, &line, &stream) {
            Ok(event) => Pending::Submitted(handle.submit(event).await?),
            Err(err) => Pending::Rejected(format!("{err:#}")),
        };
        timestamp += 1;
        pending_tx
            .send(pending)
            .await
            .map_err(|_| anyhow::anyhow!("output writer stopped"))?;
    }

    drop(handle);
    drop(pending_tx);
    writer.await.context("output writer panicked")??;
    for task in tasks {
        task.await.context("pipeline task panicked")?;
    }
    Ok(())
}
