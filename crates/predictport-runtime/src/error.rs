use std::path::PathBuf;

use predictport_core::{BindError, CodecError, DType, ParseError, ScalarType};
use thiserror::Error;

/// Raised once while an inference site is being set up. Setup is aborted.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("insufficient number of parameters: at least {min} are required but {given} given")]
    TooFewParams { min: usize, given: usize },

    #[error(
        "Invalid number of parameters. Number of inputs and number of outputs are specified as \
         {inputs} and {outputs} respectively. So the total number of parameters should be \
         {expected} but {given} given."
    )]
    Arity {
        inputs: usize,
        outputs: usize,
        expected: usize,
        given: usize,
    },

    #[error("parameter {index} is the {role} which has to be a constant but found {found}")]
    NotConstant {
        index: usize,
        role: &'static str,
        found: String,
    },

    #[error("parameter {index} is the {role} which has to be of type {expected} but found {found}")]
    WrongType {
        index: usize,
        role: &'static str,
        expected: ScalarType,
        found: ScalarType,
    },

    #[error("{role} should be at least 1 but given as {given}")]
    CountOutOfRange { role: &'static str, given: i32 },

    #[error("parameter {index} is not an attribute of the stream definition, found {found}")]
    NotAttribute { index: usize, found: String },

    #[error("parameter {index} refers to `{name}` which is not in the stream definition")]
    UnknownAttribute { index: usize, name: String },

    #[error("failed to load model from {}: {reason:#}", .path.display())]
    ModelLoad { path: PathBuf, reason: anyhow::Error },

    #[error(transparent)]
    Bind(#[from] BindError),
}

/// One input could not be turned into a tensor. Logged and skipped.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("no value present")]
    MissingValue,

    #[error("expected a string-encoded array but found {0}")]
    NotEncoded(String),

    #[error("{0} inputs are not supported by this backend")]
    Unsupported(DType),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Aborts processing of one event. Other events in the chunk are unaffected.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("forward pass failed: {0:#}")]
    Execution(anyhow::Error),

    #[error("runtime returned {actual} tensors for {expected} requested outputs")]
    FetchCount { expected: usize, actual: usize },

    #[error("failed to decode output {output}: {reason}")]
    Decode { output: String, reason: CodecError },

    #[error("model produced {actual} output values but the schema declares {expected}")]
    OutputCount { expected: usize, actual: usize },

    #[error("session lock poisoned")]
    SessionPoisoned,
}
