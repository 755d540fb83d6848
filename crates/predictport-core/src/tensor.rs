use std::fmt;

use bytes::Bytes;
use smallvec::SmallVec;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda { device_id: u32 },
}

/// Element types a tensor can carry across the runtime boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
    I32,
    I64,
    U8,
    Bool,
    String,
}

impl DType {
    /// Width of one element in bytes. Text has no fixed width.
    pub fn byte_size(self) -> Option<usize> {
        match self {
            DType::F32 | DType::I32 => Some(4),
            DType::F64 | DType::I64 => Some(8),
            DType::U8 | DType::Bool => Some(1),
            DType::String => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::U8 => "uint8",
            DType::Bool => "bool",
            DType::String => "string",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn scalar() -> Self {
        Self(SmallVec::new())
    }
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }
    pub fn rank(&self) -> usize {
        self.0.len()
    }
    /// Rank 0 is a scalar and holds one element.
    pub fn numel(&self) -> usize {
        self.0.iter().product::<usize>()
    }
    pub fn dims(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0.as_slice())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TensorDesc {
    pub dtype: DType,
    pub shape: Shape,
}

/// A CPU tensor. Numeric elements are stored little-endian, booleans as one
/// byte each, text as the concatenated UTF-8 bytes of its elements.
#[derive(Clone, Debug)]
pub struct Tensor {
    pub desc: TensorDesc,
    pub bytes: Bytes,
}

impl Tensor {
    pub fn from_cpu_bytes(dtype: DType, shape: Shape, bytes: Bytes) -> Self {
        Self {
            desc: TensorDesc { dtype, shape },
            bytes,
        }
    }

    pub fn scalar_f32(v: f32) -> Self {
        Self::from_cpu_bytes(DType::F32, Shape::scalar(), Bytes::copy_from_slice(&v.to_le_bytes()))
    }

    pub fn scalar_f64(v: f64) -> Self {
        Self::from_cpu_bytes(DType::F64, Shape::scalar(), Bytes::copy_from_slice(&v.to_le_bytes()))
    }

    pub fn scalar_i32(v: i32) -> Self {
        Self::from_cpu_bytes(DType::I32, Shape::scalar(), Bytes::copy_from_slice(&v.to_le_bytes()))
    }

    pub fn scalar_i64(v: i64) -> Self {
        Self::from_cpu_bytes(DType::I64, Shape::scalar(), Bytes::copy_from_slice(&v.to_le_bytes()))
    }

    pub fn scalar_bool(v: bool) -> Self {
        Self::from_cpu_bytes(DType::Bool, Shape::scalar(), Bytes::from(vec![u8::from(v)]))
    }

    pub fn scalar_string(v: &str) -> Self {
        Self::from_cpu_bytes(DType::String, Shape::scalar(), Bytes::copy_from_slice(v.as_bytes()))
    }

    pub fn dtype(&self) -> DType {
        self.desc.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.desc.shape
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}
