//! End-to-end pipeline tests: items with array payloads, quantized on the
//! wire, exchanged against an in-process gateway transport.

use flowline::codec;
use flowline::{CodecMode, NdArray, Quantization, RequestMessage, Response, ScalarValue};
use flowline_client::{
    CallbackSet, ClientConfig, DataItem, InputSource, RequestPipeline, ResultDispatcher,
    Transport, TransportError, check_input,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-process gateway stand-in: decodes every array it receives and echoes
/// the request back with a status line.
struct LocalGateway {
    decoded: Arc<Mutex<Vec<NdArray>>>,
}

impl Transport for LocalGateway {
    fn send(&mut self, request: &RequestMessage) -> Result<Response, TransportError> {
        for part in &request.parts {
            for (_name, encoded) in &part.arrays {
                let array = codec::decode(encoded)
                    .map_err(|e| TransportError::with_source("decode failed", e))?;
                self.decoded.lock().unwrap().push(array);
            }
        }
        Ok(Response {
            endpoint: request.endpoint.clone(),
            parts: request.parts.clone(),
            status: "ok".to_owned(),
        })
    }
}

fn embedding_item(seed: usize) -> (DataItem, Vec<f32>) {
    let values: Vec<f32> = (0..16).map(|i| ((seed * 16 + i) as f32).cos()).collect();
    let item = DataItem::new()
        .with_id(format!("doc-{seed}"))
        .with_array(
            "embedding",
            NdArray::from_f32(values.clone(), vec![4, 4]).unwrap(),
        )
        .with_scalar("seed", ScalarValue::Int(seed as i64));
    (item, values)
}

#[test]
fn quantized_arrays_survive_the_full_request_path() {
    let (items, originals): (Vec<DataItem>, Vec<Vec<f32>>) =
        (0..5).map(embedding_item).unzip();

    let config = ClientConfig {
        batch_size: 2,
        codec_mode: CodecMode::Uint8,
        endpoint: "/encode".to_owned(),
    };
    let pipeline = RequestPipeline::new(&config).unwrap();

    let decoded = Arc::new(Mutex::new(Vec::new()));
    let responses = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&responses);
    let callbacks = CallbackSet::new().on_done(move |response: &Response| {
        assert_eq!(response.endpoint, "/encode");
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let gateway = LocalGateway {
        decoded: Arc::clone(&decoded),
    };
    let summary = ResultDispatcher::new(gateway, callbacks)
        .run(&pipeline, InputSource::from(items))
        .unwrap();

    // 5 items at batch size 2: three requests, the last one short.
    assert_eq!(summary.requests, 3);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.expected_batches, Some(3));
    assert_eq!(responses.load(Ordering::SeqCst), 3);

    let decoded = decoded.lock().unwrap();
    assert_eq!(decoded.len(), 5);
    for (original, array) in originals.iter().zip(decoded.iter()) {
        assert_eq!(array.shape(), &[4, 4]);
        let flowline::ArrayData::F32(recon) = array.data() else {
            panic!("uint8 payload should reconstruct to f32");
        };
        // Values span roughly [-1, 1]; one uint8 bucket is ~2/256.
        for (o, r) in original.iter().zip(recon) {
            assert!((o - r).abs() < 0.01, "error too large: {o} vs {r}");
        }
    }
}

#[test]
fn fp16_mode_round_trips_exact_for_representable_values() {
    let item = DataItem::new().with_array(
        "weights",
        NdArray::from_f32(vec![0.5, -1.25, 2.0, 0.0], vec![4]).unwrap(),
    );

    let config = ClientConfig {
        codec_mode: CodecMode::Fp16,
        ..ClientConfig::default()
    };
    let pipeline = RequestPipeline::new(&config).unwrap();
    let request = pipeline
        .requests(InputSource::from(item))
        .unwrap()
        .next()
        .unwrap()
        .unwrap();

    let (_, encoded) = &request.parts[0].arrays[0];
    assert_eq!(encoded.quantization, Quantization::Fp16);
    assert_eq!(
        codec::decode(encoded).unwrap(),
        NdArray::from_f32(vec![0.5, -1.25, 2.0, 0.0], vec![4]).unwrap()
    );
}

#[test]
fn factory_sources_are_invoked_once_per_check_and_once_per_run() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let make_source = |counter: Arc<AtomicUsize>| {
        InputSource::factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            InputSource::from(vec![
                DataItem::new().with_scalar("n", ScalarValue::Int(1)),
                DataItem::new().with_scalar("n", ScalarValue::Int(2)),
            ])
        })
    };

    // A dry-run check resolves its own copy of the source...
    check_input(
        Some(make_source(Arc::clone(&invocations))),
        CodecMode::None,
    )
    .unwrap();
    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    // ...and the real run resolves another, so the factory fires twice in
    // total across validate + run.
    let pipeline = RequestPipeline::new(&ClientConfig::default()).unwrap();
    let produced = pipeline
        .requests(make_source(Arc::clone(&invocations)))
        .unwrap()
        .count();
    assert_eq!(produced, 2);
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}
