use predictport_core::codec::{decode, encode, encode_native, encode_scalar};
use predictport_core::literal::parse;
use predictport_core::{
    bind, Backend, BackendModel, DType, Device, ModelArtifact, NodeId, OutputSchema, Scalar,
    SignatureBinding, Tensor,
};
use tracing::{error, info, trace};

use crate::params::{self, Convention, FeedMode, Param, RuntimeBinding};
use crate::{
    ConfigError, Event, EventError, FeedError, SessionGuard, SessionHandle, StreamDefinition, Value,
};

/// Runs one configured inference site over events.
///
/// Everything here is fixed at configuration time and shared read-only by
/// all events; per-event tensors never outlive [`InferenceInvoker::process_event`].
pub struct InferenceInvoker {
    session: SessionHandle,
    binding: SignatureBinding,
    runtime: RuntimeBinding,
    feed_mode: FeedMode,
    string_inputs: bool,
    output_definition: StreamDefinition,
}

impl InferenceInvoker {
    pub fn configure<B: Backend>(
        backend: &B,
        device: Device,
        convention: Convention,
        params: &[Param],
        stream: &StreamDefinition,
    ) -> Result<Self, ConfigError> {
        params::check_min_params(convention, params)?;
        let path = params::model_path(params)?;
        let declared = match convention {
            Convention::ExplicitCounts => Some(params::explicit_counts(params)?),
            Convention::SignatureCounts => None,
        };

        let model = backend
            .load(&ModelArtifact::OnnxPath(path.clone()), device)
            .map_err(|reason| ConfigError::ModelLoad {
                path: path.clone(),
                reason,
            })?;

        let (inputs, outputs) = declared.unwrap_or_else(|| {
            let signature = model.signature();
            (signature.inputs.len(), signature.outputs.len())
        });
        params::check_arity(convention, inputs, outputs, params.len())?;

        let runtime = params::runtime_binding(convention, params, inputs, outputs, stream)?;
        let binding = bind(model.signature(), &runtime.input_names, &runtime.output_names)?;
        let capabilities = backend.capabilities();
        let session = SessionHandle::new(Box::new(model), capabilities);

        info!(
            backend = backend.name(),
            model = %path.display(),
            inputs,
            outputs,
            attributes = binding.schema.len(),
            serialized = session.serializes_runs(),
            "inference site configured"
        );

        Ok(Self {
            output_definition: stream.extended(&binding.schema),
            session,
            binding,
            runtime,
            feed_mode: convention.feed_mode(),
            string_inputs: capabilities.string_inputs,
        })
    }

    pub fn output_schema(&self) -> &OutputSchema {
        &self.binding.schema
    }

    /// The input stream's attributes followed by the produced ones.
    pub fn output_definition(&self) -> &StreamDefinition {
        &self.output_definition
    }

    pub fn runtime_binding(&self) -> &RuntimeBinding {
        &self.runtime
    }

    /// Processes a chunk strictly in order. A failed event does not stop the
    /// ones after it.
    pub fn process_chunk(&self, chunk: Vec<Event>) -> Vec<Result<Event, EventError>> {
        chunk
            .into_iter()
            .map(|mut event| self.process_event(&mut event).map(|()| event))
            .collect()
    }

    /// Feeds, runs and populates one event, appending the schema's attributes
    /// to `event.values` on success.
    pub fn process_event(&self, event: &mut Event) -> Result<(), EventError> {
        let session = self.session.acquire()?;

        let feeds = self.feed(event);
        trace!(fed = feeds.len(), expected = self.runtime.input_slots.len(), "executing");
        let outputs = self.execute(&session, feeds)?;

        let values = self.flatten(outputs)?;
        trace!(attributes = values.len(), "populating event");
        event.values.extend(values.into_iter().map(Value::Scalar));
        Ok(())
    }

    /// Bad inputs are logged and left out; the runtime decides whether the
    /// remaining feeds are enough.
    fn feed(&self, event: &Event) -> Vec<(NodeId, Tensor)> {
        let mut feeds = Vec::with_capacity(self.runtime.input_slots.len());
        let inputs = self
            .runtime
            .input_names
            .iter()
            .zip(&self.runtime.input_slots)
            .zip(&self.binding.input_nodes);

        for ((name, slot), node) in inputs {
            match self.encode_input(event.value(*slot)) {
                Ok(tensor) => feeds.push((node.clone(), tensor)),
                Err(err) => error!(input = %name, error = %err, "error while feeding input"),
            }
        }
        feeds
    }

    fn encode_input(&self, value: Option<&Value>) -> Result<Tensor, FeedError> {
        let tensor = self.to_tensor(value.ok_or(FeedError::MissingValue)?)?;
        if tensor.dtype() == DType::String && !self.string_inputs {
            return Err(FeedError::Unsupported(DType::String));
        }
        Ok(tensor)
    }

    fn to_tensor(&self, value: &Value) -> Result<Tensor, FeedError> {
        match (self.feed_mode, value) {
            (_, Value::Null) => Err(FeedError::MissingValue),
            (FeedMode::StringEncoded, Value::Scalar(Scalar::String(text))) => {
                Ok(encode(&parse(text)?)?)
            }
            (FeedMode::StringEncoded, other) => Err(FeedError::NotEncoded(other.kind())),
            (FeedMode::Native, Value::Scalar(scalar)) => Ok(encode_scalar(scalar)),
            (FeedMode::Native, Value::Array(array)) => Ok(encode_native(array)),
        }
    }

    fn execute(
        &self,
        session: &SessionGuard<'_>,
        feeds: Vec<(NodeId, Tensor)>,
    ) -> Result<Vec<Tensor>, EventError> {
        let fetches = &self.binding.output_nodes;
        let outputs = session
            .run(feeds, fetches)
            .map_err(EventError::Execution)?;
        if outputs.len() != fetches.len() {
            return Err(EventError::FetchCount {
                expected: fetches.len(),
                actual: outputs.len(),
            });
        }
        Ok(outputs)
    }

    fn flatten(&self, outputs: Vec<Tensor>) -> Result<Vec<Scalar>, EventError> {
        let mut values = Vec::with_capacity(self.binding.schema.len());
        for (tensor, name) in outputs.iter().zip(&self.runtime.output_names) {
            let scalars = decode(tensor).map_err(|reason| EventError::Decode {
                output: name.clone(),
                reason,
            })?;
            values.extend(scalars);
        }
        drop(outputs);

        if values.len() != self.binding.schema.len() {
            return Err(EventError::OutputCount {
                expected: self.binding.schema.len(),
                actual: values.len(),
            });
        }
        Ok(values)
    }
}
