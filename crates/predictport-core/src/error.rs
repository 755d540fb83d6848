//! Errors raised while marshalling values to and from tensors.

use thiserror::Error;

use crate::DType;

/// A string-encoded array could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("array literal `{0}` has no `<type>:` prefix")]
    MissingTypeTag(String),

    #[error("array encoded as string should have one of int, long, float, double as prefix but given `{0}`")]
    UnknownTypeTag(String),

    #[error("array size is inconsistent at depth {depth}: expected {expected} elements but found {found}")]
    InconsistentShape {
        depth: usize,
        expected: usize,
        found: usize,
    },

    #[error("array nesting is inconsistent: expected {expected} dimensions but found {found}")]
    InconsistentRank { expected: usize, found: usize },

    #[error("unbalanced brackets in array literal")]
    UnbalancedBrackets,

    #[error("array of shape {shape:?} needs {expected} values but {found} were given")]
    ElementCount {
        shape: Vec<usize>,
        expected: usize,
        found: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("value `{token}` is not a valid {expected}")]
    ValueFormat { token: String, expected: DType },

    #[error("{dtype} buffer has invalid byte length {len}")]
    ByteLength { dtype: DType, len: usize },

    #[error("{dtype} buffer of shape {shape:?} holds {found} elements")]
    ElementCount {
        dtype: DType,
        shape: Vec<usize>,
        found: usize,
    },
}

/// A requested logical name is missing from the model signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("{0} not present in the signature. Please check the input node names")]
    UnknownInputNode(String),

    #[error("{0} not present in the signature. Please check the output node names")]
    UnknownOutputNode(String),
}
