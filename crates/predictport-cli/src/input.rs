//! Conversions between the command line / JSON lines and runtime values.

use anyhow::{bail, ensure, Context, Result};
use ndarray::{ArrayD, IxDyn};
use predictport_core::{Device, NativeArray, OutputSchema, Scalar};
use predictport_runtime::{AttrType, Event, EventError, Param, StreamDefinition, Value};
use serde::Deserialize;
use serde_json::{json, Map};

pub fn parse_device(raw: &str) -> Result<Device> {
    if raw.eq_ignore_ascii_case("cpu") {
        return Ok(Device::Cpu);
    }

    if let Some(rest) = raw.strip_prefix("cuda:") {
        let device_id: u32 = rest.parse().context("invalid cuda device id")?;
        return Ok(Device::Cuda { device_id });
    }

    bail!("unsupported device: {raw} (expected cpu or cuda:N)");
}

/// `name:type`, e.g. `point:string`.
pub fn parse_attr(raw: &str) -> Result<(String, AttrType)> {
    let (name, ty) = raw
        .split_once(':')
        .with_context(|| format!("attribute `{raw}` is not of the form name:type"))?;
    ensure!(!name.is_empty(), "attribute `{raw}` has an empty name");
    Ok((name.to_string(), ty.parse()?))
}

pub fn stream_definition(attrs: &[String]) -> Result<StreamDefinition> {
    attrs.iter().try_fold(StreamDefinition::new(), |stream, raw| {
        let (name, ty) = parse_attr(raw)?;
        ensure!(stream.position(&name).is_none(), "attribute `{name}` declared twice");
        Ok(stream.with_attribute(&name, ty))
    })
}

/// Single-quoted text is a string constant, an integer an int constant, and
/// anything else names a stream attribute.
pub fn parse_param(raw: &str) -> Param {
    if let Some(text) = raw
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return Param::string(text);
    }
    match raw.parse::<i32>() {
        Ok(v) => Param::int(v),
        Err(_) => Param::attribute(raw),
    }
}

/// Values of `object` attributes: `{"shape": [2, 2], "float32": [1, 2, 3, 4]}`.
#[derive(Deserialize)]
struct JsonArray {
    shape: Vec<usize>,
    #[serde(flatten)]
    data: JsonArrayData,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum JsonArrayData {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Uint8(Vec<u8>),
    Bool(Vec<bool>),
}

fn array<T>(shape: &[usize], data: Vec<T>) -> Result<ArrayD<T>> {
    ArrayD::from_shape_vec(IxDyn(shape), data)
        .with_context(|| format!("array data does not fit shape {shape:?}"))
}

impl JsonArray {
    fn into_native(self) -> Result<NativeArray> {
        let shape = &self.shape;
        Ok(match self.data {
            JsonArrayData::Float32(data) => NativeArray::F32(array(shape, data)?),
            JsonArrayData::Float64(data) => NativeArray::F64(array(shape, data)?),
            JsonArrayData::Int32(data) => NativeArray::I32(array(shape, data)?),
            JsonArrayData::Int64(data) => NativeArray::I64(array(shape, data)?),
            JsonArrayData::Uint8(data) => NativeArray::U8(array(shape, data)?),
            JsonArrayData::Bool(data) => NativeArray::Bool(array(shape, data)?),
        })
    }
}

fn value_from_json(raw: serde_json::Value, ty: AttrType) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let scalar = match ty {
        AttrType::Int => {
            let v = raw.as_i64().context("expected an integer")?;
            Scalar::Int(i32::try_from(v).context("integer out of range for int")?)
        }
        AttrType::Long => Scalar::Long(raw.as_i64().context("expected an integer")?),
        AttrType::Float => Scalar::Float(raw.as_f64().context("expected a number")? as f32),
        AttrType::Double => Scalar::Double(raw.as_f64().context("expected a number")?),
        AttrType::Bool => Scalar::Bool(raw.as_bool().context("expected a boolean")?),
        AttrType::String => Scalar::String(raw.as_str().context("expected a string")?.to_string()),
        AttrType::Object => {
            let array: JsonArray = serde_json::from_value(raw)?;
            return Ok(Value::Array(array.into_native()?));
        }
    };
    Ok(Value::Scalar(scalar))
}

/// Parses one input line: a JSON array with one entry per stream attribute.
pub fn event_from_json(timestamp: i64, line: &str, stream: &StreamDefinition) -> Result<Event> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(line).context("event is not a JSON array")?;
    let attributes = stream.attributes();
    ensure!(
        raw.len() == attributes.len(),
        "event has {} values but the stream declares {} attributes",
        raw.len(),
        attributes.len()
    );

    let values = raw
        .into_iter()
        .zip(attributes)
        .map(|(v, attr)| {
            value_from_json(v, attr.ty).with_context(|| format!("attribute `{}`", attr.name))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Event::new(timestamp, values))
}

/// The produced attributes of a processed event, or its error.
pub fn render(outcome: &Result<Event, EventError>, schema: &OutputSchema) -> serde_json::Value {
    let event = match outcome {
        Ok(event) => event,
        Err(err) => return json!({ "error": err.to_string() }),
    };

    let produced = event.values.len().saturating_sub(schema.len());
    let mut out = Map::with_capacity(schema.len());
    for (attr, value) in schema.iter().zip(&event.values[produced..]) {
        let value = value
            .as_scalar()
            .and_then(|s| serde_json::to_value(s).ok())
            .unwrap_or(serde_json::Value::Null);
        out.insert(attr.name.clone(), value);
    }
    serde_json::Value::Object(out)
}
