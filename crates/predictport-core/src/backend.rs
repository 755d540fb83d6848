use anyhow::Result;

use crate::{Device, ModelArtifact, NodeId, Signature, Tensor};

#[derive(Clone, Copy, Debug)]
pub struct BackendCapabilities {
    /// Whether text tensors can be fed as inputs. When false, such inputs
    /// are rejected before the forward pass.
    pub string_inputs: bool,
    /// Whether one loaded model may run forward passes from several threads
    /// at once. When false, callers serialize each feed/run/decode cycle.
    pub thread_safe_run: bool,
}

pub trait Backend: Send + Sync + 'static {
    type Model: BackendModel;

    fn name(&self) -> &'static str;
    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model>;
    fn capabilities(&self) -> BackendCapabilities;
}

pub trait BackendModel: Send + Sync + 'static {
    fn signature(&self) -> &Signature;

    /// Runs one forward pass and returns the fetched tensors in `fetches`
    /// order. Feed tensors are consumed and released when the call returns.
    fn run(&self, feeds: Vec<(NodeId, Tensor)>, fetches: &[NodeId]) -> Result<Vec<Tensor>>;
}
