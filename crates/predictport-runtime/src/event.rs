use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use predictport_core::{NativeArray, OutputSchema, Scalar, ScalarType};

/// Attribute types a stream definition can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrType {
    Int,
    Long,
    Float,
    Double,
    Bool,
    String,
    Object,
}

impl From<ScalarType> for AttrType {
    fn from(ty: ScalarType) -> Self {
        match ty {
            ScalarType::Int => AttrType::Int,
            ScalarType::Long => AttrType::Long,
            ScalarType::Float => AttrType::Float,
            ScalarType::Double => AttrType::Double,
            ScalarType::Bool => AttrType::Bool,
            ScalarType::String => AttrType::String,
        }
    }
}

impl FromStr for AttrType {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> anyhow::Result<Self> {
        Ok(match raw {
            "int" => AttrType::Int,
            "long" => AttrType::Long,
            "float" => AttrType::Float,
            "double" => AttrType::Double,
            "bool" => AttrType::Bool,
            "string" => AttrType::String,
            "object" => AttrType::Object,
            other => bail!(
                "unknown attribute type `{other}` (expected int, long, float, double, bool, string or object)"
            ),
        })
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttrType::Int => "int",
            AttrType::Long => "long",
            AttrType::Float => "float",
            AttrType::Double => "double",
            AttrType::Bool => "bool",
            AttrType::String => "string",
            AttrType::Object => "object",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub ty: AttrType,
}

/// Ordered attributes carried by every event of a stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamDefinition {
    attributes: Vec<Attribute>,
}

impl StreamDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: &str, ty: AttrType) -> Self {
        self.attributes.push(Attribute {
            name: name.to_string(),
            ty,
        });
        self
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|attr| attr.name == name)
    }

    /// This definition followed by the attributes of `schema`.
    pub fn extended(&self, schema: &OutputSchema) -> Self {
        let mut out = self.clone();
        out.attributes.extend(schema.iter().map(|attr| Attribute {
            name: attr.name.clone(),
            ty: attr.ty.into(),
        }));
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Scalar(Scalar),
    Array(NativeArray),
}

impl Value {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Scalar(s) => s.scalar_type().to_string(),
            Value::Array(a) => format!("{} array", a.dtype()),
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<NativeArray> for Value {
    fn from(a: NativeArray) -> Self {
        Value::Array(a)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::String(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub timestamp: i64,
    pub values: Vec<Value>,
}

impl Event {
    pub fn new(timestamp: i64, values: Vec<Value>) -> Self {
        Self { timestamp, values }
    }

    pub fn value(&self, slot: usize) -> Option<&Value> {
        self.values.get(slot)
    }
}
