//! Conversion between event-side values and runtime tensors.
//!
//! Encoding accepts either a parsed [`EncodedArray`] or an already-typed
//! [`NativeArray`] / [`Scalar`]. Decoding flattens a tensor into scalars in
//! row-major order.

use std::slice::ChunksExact;
use std::str::FromStr;

use bytes::Bytes;
use ndarray::ArrayD;

use crate::error::CodecError;
use crate::literal::{EncodedArray, TypeTag};
use crate::{DType, Scalar, Shape, Tensor};

/// An n-dimensional array handed over by the caller with its element type
/// already fixed.
#[derive(Clone, Debug, PartialEq)]
pub enum NativeArray {
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    U8(ArrayD<u8>),
    Bool(ArrayD<bool>),
}

impl NativeArray {
    pub fn dtype(&self) -> DType {
        match self {
            NativeArray::F32(_) => DType::F32,
            NativeArray::F64(_) => DType::F64,
            NativeArray::I32(_) => DType::I32,
            NativeArray::I64(_) => DType::I64,
            NativeArray::U8(_) => DType::U8,
            NativeArray::Bool(_) => DType::Bool,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            NativeArray::F32(a) => a.shape(),
            NativeArray::F64(a) => a.shape(),
            NativeArray::I32(a) => a.shape(),
            NativeArray::I64(a) => a.shape(),
            NativeArray::U8(a) => a.shape(),
            NativeArray::Bool(a) => a.shape(),
        }
    }
}

trait LeBytes: Copy {
    fn extend_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_le_bytes {
    ($($ty:ty),*) => {
        $(impl LeBytes for $ty {
            fn extend_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        })*
    };
}

impl_le_bytes!(f32, f64, i32, i64, u8);

impl LeBytes for bool {
    fn extend_le(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }
}

fn buffer<T: LeBytes>(dtype: DType, dims: &[usize], values: impl IntoIterator<Item = T>) -> Tensor {
    let mut out = Vec::with_capacity(dims.iter().product::<usize>() * dtype.byte_size().unwrap_or(1));
    for v in values {
        v.extend_le(&mut out);
    }
    Tensor::from_cpu_bytes(dtype, Shape::from_slice(dims), Bytes::from(out))
}

fn parse_tokens<T: FromStr>(tokens: &[String], expected: DType) -> Result<Vec<T>, CodecError> {
    tokens
        .iter()
        .map(|token| {
            token.parse::<T>().map_err(|_| CodecError::ValueFormat {
                token: token.clone(),
                expected,
            })
        })
        .collect()
}

/// Encodes a parsed literal. Rank-0 literals take the scalar constructors,
/// everything else the contiguous buffer path.
pub fn encode(array: &EncodedArray) -> Result<Tensor, CodecError> {
    let dims = array.shape.dims();
    let dtype = array.element_type.dtype();
    if array.values.len() != array.shape.numel() {
        return Err(CodecError::ElementCount {
            dtype,
            shape: dims.to_vec(),
            found: array.values.len(),
        });
    }
    let tensor = match array.element_type {
        TypeTag::Int => {
            let values = parse_tokens::<i32>(&array.values, dtype)?;
            match values.first().copied() {
                Some(v) if array.is_scalar() => Tensor::scalar_i32(v),
                _ => buffer(dtype, dims, values),
            }
        }
        TypeTag::Long => {
            let values = parse_tokens::<i64>(&array.values, dtype)?;
            match values.first().copied() {
                Some(v) if array.is_scalar() => Tensor::scalar_i64(v),
                _ => buffer(dtype, dims, values),
            }
        }
        TypeTag::Float => {
            let values = parse_tokens::<f32>(&array.values, dtype)?;
            match values.first().copied() {
                Some(v) if array.is_scalar() => Tensor::scalar_f32(v),
                _ => buffer(dtype, dims, values),
            }
        }
        TypeTag::Double => {
            let values = parse_tokens::<f64>(&array.values, dtype)?;
            match values.first().copied() {
                Some(v) if array.is_scalar() => Tensor::scalar_f64(v),
                _ => buffer(dtype, dims, values),
            }
        }
    };
    Ok(tensor)
}

/// Elements are taken in logical row-major order whatever the memory layout
/// of the source array.
pub fn encode_native(array: &NativeArray) -> Tensor {
    match array {
        NativeArray::F32(a) => buffer(DType::F32, a.shape(), a.iter().copied()),
        NativeArray::F64(a) => buffer(DType::F64, a.shape(), a.iter().copied()),
        NativeArray::I32(a) => buffer(DType::I32, a.shape(), a.iter().copied()),
        NativeArray::I64(a) => buffer(DType::I64, a.shape(), a.iter().copied()),
        NativeArray::U8(a) => buffer(DType::U8, a.shape(), a.iter().copied()),
        NativeArray::Bool(a) => buffer(DType::Bool, a.shape(), a.iter().copied()),
    }
}

pub fn encode_scalar(value: &Scalar) -> Tensor {
    match value {
        Scalar::Int(v) => Tensor::scalar_i32(*v),
        Scalar::Long(v) => Tensor::scalar_i64(*v),
        Scalar::Float(v) => Tensor::scalar_f32(*v),
        Scalar::Double(v) => Tensor::scalar_f64(*v),
        Scalar::Bool(v) => Tensor::scalar_bool(*v),
        Scalar::String(v) => Tensor::scalar_string(v),
    }
}

/// Splits a fixed-width tensor buffer into one chunk per element.
fn elements(tensor: &Tensor, width: usize) -> Result<ChunksExact<'_, u8>, CodecError> {
    let dtype = tensor.dtype();
    let len = tensor.bytes.len();
    if len % width != 0 {
        return Err(CodecError::ByteLength { dtype, len });
    }
    let found = len / width;
    if found != tensor.shape().numel() {
        return Err(CodecError::ElementCount {
            dtype,
            shape: tensor.shape().dims().to_vec(),
            found,
        });
    }
    Ok(tensor.bytes.chunks_exact(width))
}

/// Flattens a tensor into scalars, one per element in buffer order.
///
/// Text tensors always decode to a single string covering the whole buffer,
/// with invalid UTF-8 sequences replaced by U+FFFD.
/// Boolean bytes equal to `1` decode to `true`, any other byte to `false`.
pub fn decode(tensor: &Tensor) -> Result<Vec<Scalar>, CodecError> {
    let scalars = match tensor.dtype() {
        DType::F32 => elements(tensor, 4)?
            .map(|b| Scalar::Float(f32::from_le_bytes([b[0], b[1], b[2], b[3]])))
            .collect(),
        DType::F64 => elements(tensor, 8)?
            .map(|b| {
                Scalar::Double(f64::from_le_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ]))
            })
            .collect(),
        DType::I32 => elements(tensor, 4)?
            .map(|b| Scalar::Int(i32::from_le_bytes([b[0], b[1], b[2], b[3]])))
            .collect(),
        DType::I64 => elements(tensor, 8)?
            .map(|b| {
                Scalar::Long(i64::from_le_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ]))
            })
            .collect(),
        DType::U8 => elements(tensor, 1)?
            .map(|b| Scalar::Int(i32::from(b[0])))
            .collect(),
        DType::Bool => elements(tensor, 1)?.map(|b| Scalar::Bool(b[0] == 1)).collect(),
        DType::String => {
            vec![Scalar::String(String::from_utf8_lossy(&tensor.bytes).into_owned())]
        }
    };
    Ok(scalars)
}
