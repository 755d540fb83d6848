//! Positional parameter grammar of an inference site.
//!
//! Explicit counts:
//! `modelPath, inputCount, outputCount, inputName.., outputName.., inputValue..`
//!
//! Signature counts (N inputs and M outputs read from the model):
//! `modelPath, inputName x N, outputName x M, inputValue x N`
//!
//! Paths, names and counts are constants; input values reference attributes
//! of the incoming stream.

use std::fmt;
use std::path::PathBuf;

use predictport_core::{Scalar, ScalarType};

use crate::{ConfigError, StreamDefinition};

#[derive(Clone, Debug, PartialEq)]
pub enum Param {
    Constant(Scalar),
    Attribute(String),
}

impl Param {
    pub fn string(s: &str) -> Self {
        Param::Constant(Scalar::String(s.to_string()))
    }

    pub fn int(v: i32) -> Self {
        Param::Constant(Scalar::Int(v))
    }

    pub fn attribute(name: &str) -> Self {
        Param::Attribute(name.to_string())
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Constant(value) => write!(f, "constant {value}"),
            Param::Attribute(name) => write!(f, "attribute `{name}`"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Convention {
    /// Counts given as parameters 2 and 3; inputs are already-typed values.
    ExplicitCounts,
    /// Counts taken from the model signature; inputs are string-encoded arrays.
    SignatureCounts,
}

impl Convention {
    pub fn min_params(self) -> usize {
        match self {
            Convention::ExplicitCounts => 5,
            Convention::SignatureCounts => 3,
        }
    }

    /// Number of leading parameters before the input names.
    fn header_len(self) -> usize {
        match self {
            Convention::ExplicitCounts => 3,
            Convention::SignatureCounts => 1,
        }
    }

    pub fn expected_params(self, inputs: usize, outputs: usize) -> usize {
        self.header_len() + 2 * inputs + outputs
    }

    pub fn feed_mode(self) -> FeedMode {
        match self {
            Convention::ExplicitCounts => FeedMode::Native,
            Convention::SignatureCounts => FeedMode::StringEncoded,
        }
    }
}

/// How live attribute values become tensors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedMode {
    Native,
    StringEncoded,
}

/// Names and attribute slots resolved from the parameters. Read-only after
/// configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeBinding {
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
    pub input_slots: Vec<usize>,
}

fn constant<'a>(
    params: &'a [Param],
    index: usize,
    role: &'static str,
    expected: ScalarType,
) -> Result<&'a Scalar, ConfigError> {
    match &params[index] {
        Param::Constant(value) if value.scalar_type() == expected => Ok(value),
        Param::Constant(value) => Err(ConfigError::WrongType {
            index: index + 1,
            role,
            expected,
            found: value.scalar_type(),
        }),
        other => Err(ConfigError::NotConstant {
            index: index + 1,
            role,
            found: other.to_string(),
        }),
    }
}

fn string_constant(params: &[Param], index: usize, role: &'static str) -> Result<String, ConfigError> {
    let value = constant(params, index, role, ScalarType::String)?;
    Ok(value.as_str().unwrap_or_default().to_string())
}

fn count_constant(params: &[Param], index: usize, role: &'static str) -> Result<usize, ConfigError> {
    let value = constant(params, index, role, ScalarType::Int)?;
    let given = value.as_int().unwrap_or_default();
    match usize::try_from(given) {
        Ok(count) if count >= 1 => Ok(count),
        _ => Err(ConfigError::CountOutOfRange { role, given }),
    }
}

pub fn check_min_params(convention: Convention, params: &[Param]) -> Result<(), ConfigError> {
    let min = convention.min_params();
    if params.len() < min {
        return Err(ConfigError::TooFewParams {
            min,
            given: params.len(),
        });
    }
    Ok(())
}

/// Parameter 1. Callers check the minimum count first.
pub fn model_path(params: &[Param]) -> Result<PathBuf, ConfigError> {
    string_constant(params, 0, "absolute path to the model").map(PathBuf::from)
}

/// Parameters 2 and 3 of the explicit-counts convention.
pub fn explicit_counts(params: &[Param]) -> Result<(usize, usize), ConfigError> {
    let inputs = count_constant(params, 1, "number of inputs")?;
    let outputs = count_constant(params, 2, "number of outputs")?;
    Ok((inputs, outputs))
}

pub fn check_arity(
    convention: Convention,
    inputs: usize,
    outputs: usize,
    given: usize,
) -> Result<(), ConfigError> {
    let expected = convention.expected_params(inputs, outputs);
    if given != expected {
        return Err(ConfigError::Arity {
            inputs,
            outputs,
            expected,
            given,
        });
    }
    Ok(())
}

/// Extracts names and value slots. Arity must already be checked.
pub fn runtime_binding(
    convention: Convention,
    params: &[Param],
    inputs: usize,
    outputs: usize,
    stream: &StreamDefinition,
) -> Result<RuntimeBinding, ConfigError> {
    let names_start = convention.header_len();
    let outputs_start = names_start + inputs;
    let values_start = outputs_start + outputs;

    let input_names = (names_start..outputs_start)
        .map(|index| string_constant(params, index, "input name"))
        .collect::<Result<Vec<_>, _>>()?;
    let output_names = (outputs_start..values_start)
        .map(|index| string_constant(params, index, "output name"))
        .collect::<Result<Vec<_>, _>>()?;

    let input_slots = (values_start..values_start + inputs)
        .map(|index| match &params[index] {
            Param::Attribute(name) => {
                stream
                    .position(name)
                    .ok_or_else(|| ConfigError::UnknownAttribute {
                        index: index + 1,
                        name: name.clone(),
                    })
            }
            other => Err(ConfigError::NotAttribute {
                index: index + 1,
                found: other.to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RuntimeBinding {
        input_names,
        output_names,
        input_slots,
    })
}
