mod common;

use std::sync::Arc;
use std::thread;

use common::MockBackend;
use ndarray::array;
use predictport_core::{Device, NativeArray, Scalar};
use predictport_runtime::{
    AttrType, Convention, Event, EventError, InferenceInvoker, Param, StreamDefinition, Value,
};

fn kmeans(backend: &MockBackend) -> InferenceInvoker {
    let stream = StreamDefinition::new().with_attribute("point", AttrType::String);
    let params = [
        Param::string("kmeans"),
        Param::string("point"),
        Param::string("center"),
        Param::attribute("point"),
    ];
    InferenceInvoker::configure(backend, Device::Cpu, Convention::SignatureCounts, &params, &stream)
        .unwrap()
}

fn mixed(backend: &MockBackend) -> InferenceInvoker {
    let stream = StreamDefinition::new().with_attribute("ids", AttrType::String);
    let params = [
        Param::string("mixed"),
        Param::string("ids"),
        Param::string("label"),
        Param::string("flags"),
        Param::string("echo"),
        Param::attribute("ids"),
    ];
    InferenceInvoker::configure(backend, Device::Cpu, Convention::SignatureCounts, &params, &stream)
        .unwrap()
}

fn point(literal: &str) -> Event {
    Event::new(0, vec![Value::from(literal)])
}

#[test]
fn string_encoded_input_populates_flattened_outputs() {
    let backend = MockBackend::new(true);
    let invoker = kmeans(&backend);

    let mut event = point("float:[1,-2]");
    invoker.process_event(&mut event).unwrap();

    assert_eq!(
        event.values[1..],
        [
            Value::Scalar(Scalar::Float(0.5)),
            Value::Scalar(Scalar::Float(-1.0)),
        ]
    );
    assert_eq!(backend.runs(), 1);
}

#[test]
fn bad_literal_is_skipped_and_the_run_still_happens() {
    let backend = MockBackend::new(true);
    let invoker = kmeans(&backend);

    let mut event = point("float:[1,x]");
    let err = invoker.process_event(&mut event).unwrap_err();

    assert!(matches!(err, EventError::Execution(_)), "{err}");
    assert!(err.to_string().contains("missing feed"), "{err}");
    assert_eq!(backend.runs(), 1);
    assert_eq!(event.values.len(), 1);
}

#[test]
fn non_string_value_is_not_fed_in_encoded_mode() {
    let backend = MockBackend::new(true);
    let invoker = kmeans(&backend);

    let mut event = Event::new(0, vec![Value::Scalar(Scalar::Int(4))]);
    let err = invoker.process_event(&mut event).unwrap_err();
    assert!(matches!(err, EventError::Execution(_)));
}

#[test]
fn chunk_keeps_order_and_isolates_failures() {
    let backend = MockBackend::new(true);
    let invoker = kmeans(&backend);

    let outcomes = invoker.process_chunk(vec![
        point("float:[2,4]"),
        point("long:[1,2"),
        point("float:[6,8]"),
    ]);

    assert_eq!(outcomes.len(), 3);
    let first = outcomes[0].as_ref().unwrap();
    assert_eq!(first.values[1], Value::Scalar(Scalar::Float(1.0)));
    assert!(outcomes[1].is_err());
    let third = outcomes[2].as_ref().unwrap();
    assert_eq!(third.values[2], Value::Scalar(Scalar::Float(4.0)));
    assert_eq!(backend.runs(), 3);
}

#[test]
fn explicit_counts_feed_native_values() {
    let backend = MockBackend::new(true);
    let stream = StreamDefinition::new()
        .with_attribute("image", AttrType::Object)
        .with_attribute("keep", AttrType::Float);
    let params = [
        Param::string("mnist"),
        Param::int(2),
        Param::int(1),
        Param::string("image"),
        Param::string("keep_prob"),
        Param::string("scores"),
        Param::attribute("image"),
        Param::attribute("keep"),
    ];
    let invoker =
        InferenceInvoker::configure(&backend, Device::Cpu, Convention::ExplicitCounts, &params, &stream)
            .unwrap();

    let image = NativeArray::F32(array![[1.0f32, 2.0, 3.0, 4.0]].into_dyn());
    let mut event = Event::new(7, vec![image.into(), Scalar::Float(0.5).into()]);
    invoker.process_event(&mut event).unwrap();

    let scores: Vec<_> = event.values[2..].iter().filter_map(Value::as_scalar).cloned().collect();
    assert_eq!(
        scores,
        [Scalar::Float(10.0), Scalar::Float(0.5), Scalar::Float(5.0)]
    );
    assert_eq!(event.timestamp, 7);
}

#[test]
fn text_and_bool_outputs_decode() {
    let backend = MockBackend::new(true);
    let invoker = mixed(&backend);

    let names: Vec<_> = invoker.output_schema().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["label", "flags0", "flags1", "echo0"]);

    let mut event = Event::new(0, vec![Value::from("long:[7]")]);
    invoker.process_event(&mut event).unwrap();
    assert_eq!(
        event.values[1..],
        [
            Value::Scalar(Scalar::String("cat".to_string())),
            Value::Scalar(Scalar::Bool(true)),
            Value::Scalar(Scalar::Bool(false)),
            Value::Scalar(Scalar::Long(7)),
        ]
    );
}

#[test]
fn wider_dynamic_output_than_declared_is_rejected() {
    let backend = MockBackend::new(true);
    let invoker = mixed(&backend);

    let mut event = Event::new(0, vec![Value::from("long:[7,8]")]);
    let err = invoker.process_event(&mut event).unwrap_err();
    assert!(matches!(
        err,
        EventError::OutputCount {
            expected: 4,
            actual: 5
        }
    ));
    assert_eq!(event.values.len(), 1);
}

fn hammer(invoker: Arc<InferenceInvoker>) {
    let threads: Vec<_> = (0..4)
        .map(|t| {
            let invoker = Arc::clone(&invoker);
            thread::spawn(move || {
                for i in 0..5 {
                    let mut event = point(&format!("float:[{t},{i}]"));
                    invoker.process_event(&mut event).unwrap();
                }
            })
        })
        .collect();
    for handle in threads {
        handle.join().unwrap();
    }
}

#[test]
fn non_thread_safe_backend_runs_one_event_at_a_time() {
    let backend = MockBackend::new(false);
    let invoker = Arc::new(kmeans(&backend));

    hammer(invoker);

    assert_eq!(backend.runs(), 20);
    assert_eq!(backend.max_active(), 1);
}

#[test]
fn thread_safe_backend_completes_concurrent_events() {
    let backend = MockBackend::new(true);
    let invoker = Arc::new(kmeans(&backend));

    hammer(invoker);

    assert_eq!(backend.runs(), 20);
}

#[test]
fn string_input_is_skipped_when_backend_cannot_take_text() {
    let backend = MockBackend::new(true);
    let stream = StreamDefinition::new().with_attribute("point", AttrType::String);
    let params = [
        Param::string("kmeans"),
        Param::int(1),
        Param::int(1),
        Param::string("point"),
        Param::string("center"),
        Param::attribute("point"),
    ];
    let invoker =
        InferenceInvoker::configure(&backend, Device::Cpu, Convention::ExplicitCounts, &params, &stream)
            .unwrap();

    let mut event = point("hello");
    let err = invoker.process_event(&mut event).unwrap_err();

    // The text tensor never reaches the model, so the run sees no feed at all.
    assert!(err.to_string().contains("missing feed for Placeholder:0"), "{err}");
    assert_eq!(backend.runs(), 1);
}

fn broken(backend: &MockBackend, output: &str) -> InferenceInvoker {
    let stream = StreamDefinition::new().with_attribute("x", AttrType::Float);
    let params = [
        Param::string("broken"),
        Param::int(1),
        Param::int(1),
        Param::string("x"),
        Param::string(output),
        Param::attribute("x"),
    ];
    InferenceInvoker::configure(backend, Device::Cpu, Convention::ExplicitCounts, &params, &stream)
        .unwrap()
}

fn x(value: f32) -> Event {
    Event::new(0, vec![Value::Scalar(Scalar::Float(value))])
}

#[test]
fn malformed_output_buffer_fails_the_event() {
    let backend = MockBackend::new(true);
    let invoker = broken(&backend, "ragged");

    let mut event = x(1.0);
    match invoker.process_event(&mut event).unwrap_err() {
        EventError::Decode { output, .. } => assert_eq!(output, "ragged"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(event.values.len(), 1);
}

#[test]
fn missing_fetched_tensor_fails_the_event() {
    let backend = MockBackend::new(true);
    let invoker = broken(&backend, "dropped");

    let mut event = x(1.0);
    let err = invoker.process_event(&mut event).unwrap_err();
    assert!(matches!(
        err,
        EventError::FetchCount {
            expected: 1,
            actual: 0
        }
    ));
}
