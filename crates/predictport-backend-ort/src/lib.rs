use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, bail, ensure, Context, Result};
use bytes::Bytes;
use ort::{
    session::{builder::SessionBuilder, Session, SessionInputValue},
    tensor::TensorElementType,
    value::{DynValue, ValueType},
};
use predictport_core::{
    Backend, BackendCapabilities, BackendModel, DType, Device, IOName, ModelArtifact, NodeId,
    NodeSpec, Shape, Signature, Tensor,
};
use tracing::debug;

pub struct OrtBackend;

impl OrtBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrtBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// ONNX models have no separate signature layer, so every logical name is
/// also the concrete node name.
pub struct OrtModel {
    signature: Signature,
    session: Mutex<Session>,
}

impl Backend for OrtBackend {
    type Model = OrtModel;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model> {
        let builder = Session::builder()
            .context("failed to create ORT session builder")?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .context("failed to configure ORT session builder")?;

        let builder = configure_session_builder(builder, &device)?;

        let session = match artifact {
            ModelArtifact::OnnxPath(path) => builder.commit_from_file(path),
            ModelArtifact::OnnxBytes(bytes) => builder.commit_from_memory(bytes),
        }
        .with_context(|| format!("failed to load ONNX model from {artifact}"))?;

        let signature = build_signature(&session)?;
        debug!(
            model = %artifact,
            inputs = signature.inputs.len(),
            outputs = signature.outputs.len(),
            "loaded ONNX model"
        );

        Ok(OrtModel {
            signature,
            session: Mutex::new(session),
        })
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            string_inputs: false,
            thread_safe_run: true,
        }
    }
}

impl BackendModel for OrtModel {
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn run(&self, feeds: Vec<(NodeId, Tensor)>, fetches: &[NodeId]) -> Result<Vec<Tensor>> {
        let mut ort_inputs = Vec::with_capacity(feeds.len());
        for (node, tensor) in feeds {
            let value = tensor_to_ort_value(tensor)
                .with_context(|| format!("failed to build ORT input for {}", node.0))?;
            ort_inputs.push((node.0, SessionInputValue::from(value)));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("ORT session lock poisoned"))?;
        let outputs = session.run(ort_inputs)?;

        let mut by_name = HashMap::with_capacity(outputs.len());
        for (name, value) in outputs.iter() {
            by_name.insert(name.to_string(), value);
        }

        fetches
            .iter()
            .map(|node| {
                let value = by_name
                    .get(&node.0)
                    .with_context(|| format!("model produced no output named {}", node.0))?;
                ort_value_to_tensor(value)
            })
            .collect()
    }
}

fn build_signature(session: &Session) -> Result<Signature> {
    let inputs = session
        .inputs
        .iter()
        .map(|input| node_spec_from_value_type(&input.name, &input.input_type))
        .collect::<Result<Vec<_>>>()?;

    let outputs = session
        .outputs
        .iter()
        .map(|output| node_spec_from_value_type(&output.name, &output.output_type))
        .collect::<Result<Vec<_>>>()?;

    Ok(Signature { inputs, outputs })
}

fn configure_session_builder(builder: SessionBuilder, device: &Device) -> Result<SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        Device::Cuda { device_id } => configure_cuda(builder, *device_id),
    }
}

fn configure_cuda(builder: SessionBuilder, device_id: u32) -> Result<SessionBuilder> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::cuda::CUDAExecutionProvider;
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32)
            .build();
        builder
            .with_execution_providers([ep])
            .context("failed to enable ORT CUDA execution provider")
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = (builder, device_id);
        bail!("CUDA requested but predictport-backend-ort was built without the `cuda` feature")
    }
}

fn node_spec_from_value_type(name: &str, value_type: &ValueType) -> Result<NodeSpec> {
    let ValueType::Tensor { ty, shape, .. } = value_type else {
        bail!("unsupported non-tensor IO value type for {name}");
    };

    let dtype = ort_tensor_element_to_dtype(*ty)?;
    let dims = shape
        .iter()
        .map(|d| if *d < 0 { None } else { Some(*d as usize) })
        .collect::<Vec<_>>();

    Ok(NodeSpec {
        name: IOName(name.to_string()),
        node: NodeId(name.to_string()),
        dtype,
        dims,
    })
}

fn ort_tensor_element_to_dtype(ty: TensorElementType) -> Result<DType> {
    match ty {
        TensorElementType::Float32 => Ok(DType::F32),
        TensorElementType::Float64 => Ok(DType::F64),
        TensorElementType::Int64 => Ok(DType::I64),
        TensorElementType::Int32 => Ok(DType::I32),
        TensorElementType::Uint8 => Ok(DType::U8),
        TensorElementType::Bool => Ok(DType::Bool),
        TensorElementType::String => Ok(DType::String),
        _ => bail!("unsupported tensor element type: {ty}"),
    }
}

fn tensor_to_ort_value(tensor: Tensor) -> Result<DynValue> {
    let dtype = tensor.dtype();
    let Some(width) = dtype.byte_size() else {
        bail!("string inputs are not supported yet");
    };

    let shape: Vec<usize> = tensor.shape().dims().to_vec();
    let bytes = &tensor.bytes;
    let expected_bytes = tensor.shape().numel() * width;
    ensure!(
        bytes.len() == expected_bytes,
        "input byte size mismatch: got {}, expected {}",
        bytes.len(),
        expected_bytes
    );

    let value = match dtype {
        DType::F32 => {
            let data: Vec<f32> = bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::F64 => {
            let data: Vec<f64> = bytes
                .chunks_exact(8)
                .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                .collect();
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::I64 => {
            let data: Vec<i64> = bytes
                .chunks_exact(8)
                .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                .collect();
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::I32 => {
            let data: Vec<i32> = bytes
                .chunks_exact(4)
                .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::U8 => {
            let data = bytes.to_vec();
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::Bool => {
            let data: Vec<bool> = bytes.iter().map(|b| *b != 0).collect();
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::String => bail!("string inputs are not supported yet"),
    };

    Ok(value)
}

fn ort_value_to_tensor(value: &ort::value::ValueRef<'_>) -> Result<Tensor> {
    let ValueType::Tensor { ty, shape, .. } = value.dtype() else {
        bail!("non-tensor outputs are not supported");
    };

    let dims: Vec<usize> = shape.iter().map(|d| *d as usize).collect();
    let tensor_shape = Shape::from_slice(&dims);

    match *ty {
        TensorElementType::Float32 => {
            let array = value.try_extract_array::<f32>()?;
            Ok(Tensor::from_cpu_bytes(
                DType::F32,
                tensor_shape,
                le_bytes(array.iter().copied(), f32::to_le_bytes),
            ))
        }
        TensorElementType::Float64 => {
            let array = value.try_extract_array::<f64>()?;
            Ok(Tensor::from_cpu_bytes(
                DType::F64,
                tensor_shape,
                le_bytes(array.iter().copied(), f64::to_le_bytes),
            ))
        }
        TensorElementType::Int64 => {
            let array = value.try_extract_array::<i64>()?;
            Ok(Tensor::from_cpu_bytes(
                DType::I64,
                tensor_shape,
                le_bytes(array.iter().copied(), i64::to_le_bytes),
            ))
        }
        TensorElementType::Int32 => {
            let array = value.try_extract_array::<i32>()?;
            Ok(Tensor::from_cpu_bytes(
                DType::I32,
                tensor_shape,
                le_bytes(array.iter().copied(), i32::to_le_bytes),
            ))
        }
        TensorElementType::Uint8 => {
            let array = value.try_extract_array::<u8>()?;
            Ok(Tensor::from_cpu_bytes(
                DType::U8,
                tensor_shape,
                array.iter().copied().collect::<Vec<u8>>().into(),
            ))
        }
        TensorElementType::Bool => {
            let array = value.try_extract_array::<bool>()?;
            Ok(Tensor::from_cpu_bytes(
                DType::Bool,
                tensor_shape,
                array.iter().map(|b| u8::from(*b)).collect::<Vec<u8>>().into(),
            ))
        }
        TensorElementType::String => {
            // Elements are concatenated; the codec reads the buffer as one string.
            let array = value.try_extract_string_array()?;
            let text: String = array.iter().map(String::as_str).collect();
            Ok(Tensor::from_cpu_bytes(
                DType::String,
                tensor_shape,
                Bytes::from(text.into_bytes()),
            ))
        }
        _ => bail!("unsupported output tensor element type: {ty}"),
    }
}

fn le_bytes<T, const N: usize>(values: impl Iterator<Item = T>, to_le: fn(T) -> [u8; N]) -> Bytes {
    values.flat_map(to_le).collect::<Vec<u8>>().into()
}
