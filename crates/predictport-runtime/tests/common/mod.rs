#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use predictport_core::codec::decode;
use predictport_core::{
    Backend, BackendCapabilities, BackendModel, DType, Device, IOName, ModelArtifact, NodeId,
    NodeSpec, Scalar, Shape, Signature, Tensor,
};

/// Run counters shared between a backend and the models it loads.
#[derive(Default)]
pub struct RunStats {
    pub runs: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

/// Loads canned models by path: `kmeans`, `mnist`, `mixed`.
pub struct MockBackend {
    pub thread_safe: bool,
    pub stats: Arc<RunStats>,
}

impl MockBackend {
    pub fn new(thread_safe: bool) -> Self {
        Self {
            thread_safe,
            stats: Arc::new(RunStats::default()),
        }
    }

    pub fn runs(&self) -> usize {
        self.stats.runs.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.stats.max_active.load(Ordering::SeqCst)
    }
}

impl Backend for MockBackend {
    type Model = MockModel;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn load(&self, artifact: &ModelArtifact, _device: Device) -> Result<MockModel> {
        let ModelArtifact::OnnxPath(path) = artifact else {
            bail!("mock backend expects a path");
        };
        match path.to_str() {
            Some("kmeans") => Ok(self.model(kmeans_signature(), Behavior::HalvePoint)),
            Some("mnist") => Ok(self.model(mnist_signature(), Behavior::Digits)),
            Some("mixed") => Ok(self.model(mixed_signature(), Behavior::Mixed)),
            Some("broken") => Ok(self.model(broken_signature(), Behavior::Broken)),
            _ => bail!("no model at {}", path.display()),
        }
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            string_inputs: false,
            thread_safe_run: self.thread_safe,
        }
    }
}

enum Behavior {
    HalvePoint,
    Digits,
    Mixed,
    Broken,
}

pub struct MockModel {
    signature: Signature,
    behavior: Behavior,
    stats: Arc<RunStats>,
}

impl MockBackend {
    fn model(&self, signature: Signature, behavior: Behavior) -> MockModel {
        MockModel {
            signature,
            behavior,
            stats: Arc::clone(&self.stats),
        }
    }
}

fn node(name: &str, node: &str, dtype: DType, dims: &[Option<usize>]) -> NodeSpec {
    NodeSpec {
        name: IOName(name.to_string()),
        node: NodeId(node.to_string()),
        dtype,
        dims: dims.to_vec(),
    }
}

pub fn kmeans_signature() -> Signature {
    Signature {
        inputs: vec![node("point", "Placeholder:0", DType::F32, &[Some(2)])],
        outputs: vec![node("center", "Cluster/center:0", DType::F32, &[Some(2)])],
    }
}

pub fn mnist_signature() -> Signature {
    Signature {
        inputs: vec![
            node("image", "input_tensor:0", DType::F32, &[None, Some(4)]),
            node("keep_prob", "dropout/keep_prob:0", DType::F32, &[]),
        ],
        outputs: vec![node("scores", "output_tensor:0", DType::F32, &[None, Some(3)])],
    }
}

pub fn mixed_signature() -> Signature {
    Signature {
        inputs: vec![node("ids", "ids:0", DType::I64, &[Some(2)])],
        outputs: vec![
            node("label", "label:0", DType::String, &[Some(2)]),
            node("flags", "flags:0", DType::Bool, &[Some(2)]),
            node("echo", "echo:0", DType::I64, &[None]),
        ],
    }
}

/// `ragged` comes back with a truncated buffer and `dropped` is never returned.
pub fn broken_signature() -> Signature {
    Signature {
        inputs: vec![node("x", "x:0", DType::F32, &[Some(1)])],
        outputs: vec![
            node("ragged", "ragged:0", DType::F32, &[Some(2)]),
            node("dropped", "dropped:0", DType::F32, &[Some(1)]),
        ],
    }
}

fn f32_tensor(dims: &[usize], values: &[f32]) -> Tensor {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    Tensor::from_cpu_bytes(DType::F32, Shape::from_slice(dims), Bytes::from(bytes))
}

fn floats(tensor: &Tensor) -> Result<Vec<f32>> {
    decode(tensor)?
        .into_iter()
        .map(|s| match s {
            Scalar::Float(v) => Ok(v),
            other => bail!("expected float, got {other:?}"),
        })
        .collect()
}

impl BackendModel for MockModel {
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn run(&self, feeds: Vec<(NodeId, Tensor)>, fetches: &[NodeId]) -> Result<Vec<Tensor>> {
        let stats = &self.stats;
        stats.runs.fetch_add(1, Ordering::SeqCst);
        let now = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_active.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(2));
        let result = self.respond(feeds, fetches);
        stats.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl MockModel {
    fn respond(&self, feeds: Vec<(NodeId, Tensor)>, fetches: &[NodeId]) -> Result<Vec<Tensor>> {
        let feeds: HashMap<String, Tensor> = feeds.into_iter().map(|(n, t)| (n.0, t)).collect();
        for input in &self.signature.inputs {
            if !feeds.contains_key(&input.node.0) {
                bail!("missing feed for {}", input.node.0);
            }
        }

        let mut outputs = Vec::with_capacity(fetches.len());
        for fetch in fetches {
            let tensor = match (&self.behavior, fetch.0.as_str()) {
                (Behavior::HalvePoint, "Cluster/center:0") => {
                    let point = floats(&feeds["Placeholder:0"])?;
                    let center: Vec<f32> = point.iter().map(|v| v * 0.5).collect();
                    f32_tensor(&[2], &center)
                }
                (Behavior::Digits, "output_tensor:0") => {
                    let image = floats(&feeds["input_tensor:0"])?;
                    let keep = floats(&feeds["dropout/keep_prob:0"])?;
                    let sum: f32 = image.iter().sum();
                    f32_tensor(&[1, 3], &[sum, keep[0], sum * keep[0]])
                }
                (Behavior::Mixed, "label:0") => Tensor::from_cpu_bytes(
                    DType::String,
                    Shape::from_slice(&[2]),
                    Bytes::from_static(b"cat"),
                ),
                (Behavior::Mixed, "flags:0") => Tensor::from_cpu_bytes(
                    DType::Bool,
                    Shape::from_slice(&[2]),
                    Bytes::from_static(&[1, 0]),
                ),
                (Behavior::Mixed, "echo:0") => {
                    let ids = feeds.get("ids:0").context("ids not fed")?;
                    ids.clone()
                }
                (Behavior::Broken, "ragged:0") => Tensor::from_cpu_bytes(
                    DType::F32,
                    Shape::from_slice(&[2]),
                    Bytes::from_static(&[0, 0, 128]),
                ),
                (Behavior::Broken, "dropped:0") => continue,
                (_, other) => bail!("unknown fetch {other}"),
            };
            outputs.push(tensor);
        }
        Ok(outputs)
    }
}
