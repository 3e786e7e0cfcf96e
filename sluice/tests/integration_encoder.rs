//! Integration tests for the stream encoder through the public API.

use std::io::{BufReader, Read};

use sluice::encoder::{Pull, StreamEncoder};
use sluice::metric::{FieldValue, LineMetric, Metric};

const TS: i64 = 1_481_032_190_000_000_000;

fn metric(name: &str, host: &str, value: i64) -> LineMetric {
    LineMetric::new(
        name,
        &[("host", host)],
        &[("value", FieldValue::Int(value))],
        TS,
    )
    .unwrap()
}

fn mixed_batch() -> Vec<LineMetric> {
    let mut batch = Vec::new();
    for i in 0..40 {
        batch.push(metric("cpu", &format!("h{i}"), i));
        batch.push(metric(
            "a_much_longer_measurement_name_that_spans_buffers",
            "server-with-a-long-hostname",
            i * 1_000_000,
        ));
    }
    batch
}

#[test]
fn test_split_pattern_two_metrics() {
    let no_tags: &[(&str, &str)] = &[];
    let m = LineMetric::new("foo", no_tags, &[("value", FieldValue::Int(10))], TS).unwrap();
    let mut encoder = StreamEncoder::new(vec![m.clone(), m]);
    let mut buf = [0u8; 10];

    let mut pulls = Vec::new();
    loop {
        let pull = encoder.pull(&mut buf);
        pulls.push(pull);
        if pull.end_of_stream {
            break;
        }
    }

    let sizes: Vec<usize> = pulls.iter().map(|p| p.written).collect();
    assert_eq!(sizes, vec![10, 10, 10, 4, 10, 10, 10, 4]);
    assert_eq!(pulls.iter().filter(|p| p.end_of_stream).count(), 1);

    for _ in 0..5 {
        assert_eq!(
            encoder.pull(&mut buf),
            Pull {
                written: 0,
                end_of_stream: true
            }
        );
    }
}

#[test]
fn test_buffered_reader_capacities() {
    let batch = mixed_batch();
    let expected: Vec<u8> = batch.iter().flat_map(|m| m.serialize()).collect();

    for capacity in [1, 2, 7, 64, 97, 1024, 8192, 1 << 20] {
        let encoder = StreamEncoder::new(batch.clone());
        let mut reader = BufReader::with_capacity(capacity, encoder);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, expected, "capacity {capacity}");
    }
}

#[test]
fn test_io_copy_to_sink() {
    let batch = mixed_batch();
    let mut encoder = StreamEncoder::new(batch);
    let total = encoder.encoded_len();

    let copied = std::io::copy(&mut encoder, &mut std::io::sink()).unwrap();
    assert_eq!(copied, total);
    assert_eq!(encoder.bytes_emitted(), total);
    assert!(encoder.is_done());
}

#[test]
fn test_independent_encoders_on_threads() {
    let handles: Vec<_> = (0..4)
        .map(|t| {
            std::thread::spawn(move || {
                let batch: Vec<_> = (0..500).map(|i| metric("mem", &format!("t{t}"), i)).collect();
                let expected: Vec<u8> = batch.iter().flat_map(|m| m.serialize()).collect();
                let mut encoder = StreamEncoder::new(batch);
                let mut out = Vec::new();
                encoder.read_to_end(&mut out).unwrap();
                out == expected
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
