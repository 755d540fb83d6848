//! Resolves caller-declared input/output names against a model signature and
//! derives the attribute schema the outputs flatten into.
//!
//! Non-text outputs expand to one attribute per element, named by suffixing
//! the element index to the output name (`center0`, `center1`, ...). Text
//! outputs always produce a single attribute carrying the output name as is.
//! Downstream consumers bind to these exact names.

use std::slice;

use crate::error::BindError;
use crate::{DType, NodeId, NodeSpec, ScalarType, Signature};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputAttribute {
    pub name: String,
    pub ty: ScalarType,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputSchema(Vec<OutputAttribute>);

impl OutputSchema {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, OutputAttribute> {
        self.0.iter()
    }

    pub fn attributes(&self) -> &[OutputAttribute] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a OutputSchema {
    type Item = &'a OutputAttribute;
    type IntoIter = slice::Iter<'a, OutputAttribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Result of binding: where each input goes, what to fetch, and how the
/// fetched tensors are laid out as attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct SignatureBinding {
    pub input_nodes: Vec<NodeId>,
    pub output_nodes: Vec<NodeId>,
    pub output_dtypes: Vec<DType>,
    pub schema: OutputSchema,
}

pub fn bind(
    signature: &Signature,
    inputs: &[String],
    outputs: &[String],
) -> Result<SignatureBinding, BindError> {
    let input_nodes = inputs
        .iter()
        .map(|name| {
            signature
                .input(name)
                .map(|spec| spec.node.clone())
                .ok_or_else(|| BindError::UnknownInputNode(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let output_specs = outputs
        .iter()
        .map(|name| {
            signature
                .output(name)
                .ok_or_else(|| BindError::UnknownOutputNode(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut attributes = Vec::new();
    for (name, spec) in outputs.iter().zip(&output_specs) {
        expand_output(name, spec, &mut attributes);
    }

    Ok(SignatureBinding {
        input_nodes,
        output_nodes: output_specs.iter().map(|spec| spec.node.clone()).collect(),
        output_dtypes: output_specs.iter().map(|spec| spec.dtype).collect(),
        schema: OutputSchema(attributes),
    })
}

fn expand_output(name: &str, spec: &NodeSpec, out: &mut Vec<OutputAttribute>) {
    let ty = ScalarType::for_dtype(spec.dtype);
    if spec.dtype == DType::String {
        out.push(OutputAttribute {
            name: name.to_string(),
            ty,
        });
        return;
    }

    // Dynamic dims count as 1. A larger axis at run time is caught when the
    // event is populated.
    out.extend((0..spec.known_numel()).map(|i| OutputAttribute {
        name: format!("{name}{i}"),
        ty,
    }));
}
