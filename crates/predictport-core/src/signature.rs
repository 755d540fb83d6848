use crate::DType;

/// Logical name a caller uses to address a model input or output.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IOName(pub String);

/// Concrete node reference the runtime feeds into or fetches from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub String);

#[derive(Clone, Debug, PartialEq)]
pub struct NodeSpec {
    pub name: IOName,
    pub node: NodeId,
    pub dtype: DType,
    pub dims: Vec<Option<usize>>, // None = dynamic
}

impl NodeSpec {
    /// Product of the known dimensions; dynamic ones contribute 1.
    pub fn known_numel(&self) -> usize {
        self.dims.iter().map(|d| d.unwrap_or(1)).product()
    }
}

/// Inputs and outputs a loaded model publishes. Lives as long as the model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Signature {
    pub inputs: Vec<NodeSpec>,
    pub outputs: Vec<NodeSpec>,
}

impl Signature {
    pub fn input(&self, name: &str) -> Option<&NodeSpec> {
        self.inputs.iter().find(|spec| spec.name.0 == name)
    }

    pub fn output(&self, name: &str) -> Option<&NodeSpec> {
        self.outputs.iter().find(|spec| spec.name.0 == name)
    }
}
