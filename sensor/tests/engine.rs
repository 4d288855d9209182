#![cfg(feature = "test-utils")]

use std::time::Duration;

use chrono::{DateTime, Utc};
use sensor::concurrency::shutdown::create_shutdown_channel;
use sensor::engine::Engine;
use sensor::error::ErrorKind;
use sensor::sink::memory::MemorySink;
use sensor::source::{LinearSeeder, TimeSeeder};
use sensor::test_utils::counting_seeder::CountingSeeder;
use sensor::test_utils::faulty_sink::FaultySink;
use sensor::test_utils::test_sink_wrapper::{SinkCall, TestSinkWrapper};
use sensor::types::{EnvelopeBuilder, Quality};
use sensor_config::shared::{BatchConfig, EngineConfig, QueueConfig};
use sensor_telemetry::tracing::init_test_tracing;
use serde::Serialize;
use tokio::time::{sleep, timeout};

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Temperature {
    celsius: f64,
    fahrenheit: f64,
}

fn temperature(value: f64, _: DateTime<Utc>) -> Temperature {
    Temperature {
        celsius: value,
        fahrenheit: value * 1.8 + 32.0,
    }
}

fn engine_config(
    interval_ms: u64,
    max_size: usize,
    max_fill_ms: u64,
    workers: usize,
) -> EngineConfig {
    EngineConfig {
        production_interval_ms: interval_ms,
        batch: BatchConfig {
            max_size,
            max_fill_ms,
        },
        max_workers: workers,
        queue: QueueConfig::default(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn engine_delivers_structured_payloads() {
    init_test_tracing();

    let sink = TestSinkWrapper::wrap(MemorySink::<Temperature>::new());
    let engine = Engine::new(
        engine_config(5, 4, 50, 2),
        LinearSeeder::new(1.0, 20.0),
        temperature,
        sink.clone(),
    )
    .unwrap()
    .with_envelope_builder(EnvelopeBuilder::new("temp"));
    let shutdown_tx = engine.shutdown_tx();

    let delivered = sink.wait_for_envelopes(8).await;
    let run = tokio::spawn(engine.start());

    delivered.notified().await;
    shutdown_tx.shutdown();

    timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let envelopes: Vec<_> = sink.batches().await.into_iter().flatten().collect();
    assert!(envelopes.len() >= 8);
    for envelope in &envelopes {
        assert!(envelope.id.starts_with("temp-"));
        assert_eq!(
            envelope.data.fahrenheit,
            envelope.data.celsius * 1.8 + 32.0
        );
    }

    let calls = sink.calls().await;
    assert_eq!(calls.last(), Some(&SinkCall::Close));
    assert_eq!(
        calls.iter().filter(|call| **call == SinkCall::Close).count(),
        1
    );
    assert!(
        calls
            .iter()
            .all(|call| !matches!(call, SinkCall::PublishOne))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_flushes_partial_batches() {
    init_test_tracing();

    // Batches can never fill up, so only the timer flushes them.
    let sink = TestSinkWrapper::wrap(MemorySink::<f64>::new());
    let engine = Engine::new(
        engine_config(10, 1_000, 30, 1),
        TimeSeeder::new(1.0, 0.1, 0.0),
        |value: f64, _: DateTime<Utc>| value,
        sink.clone(),
    )
    .unwrap();
    let shutdown_tx = engine.shutdown_tx();

    let two_batches = sink.notify_on_batches(|batches| batches.len() >= 2).await;
    let run = tokio::spawn(engine.start());

    two_batches.notified().await;
    shutdown_tx.shutdown();

    timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let batches = sink.batches().await;
    assert!(batches.len() >= 2);
    assert!(batches.iter().all(|batch| !batch.is_empty() && batch.len() < 1_000));
    assert!(!sink.closed_while_publishing().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_during_generation_keeps_every_queued_envelope() {
    init_test_tracing();

    let (shutdown_tx, _) = create_shutdown_channel();
    let seeder = CountingSeeder::new().shutdown_on_draw(25, shutdown_tx.clone());
    let draws = seeder.draws();

    let sink = MemorySink::<f64>::new();
    let engine = Engine::new(
        engine_config(1, 4, 1_000, 3),
        seeder,
        |value: f64, _: DateTime<Utc>| value,
        sink.clone(),
    )
    .unwrap()
    .with_shutdown_tx(shutdown_tx);

    timeout(Duration::from_secs(5), engine.start())
        .await
        .unwrap()
        .unwrap();

    // The 25th value is drawn while shutting down and dropped, everything before it arrives.
    let mut values: Vec<f64> = sink
        .batched_envelopes()
        .await
        .into_iter()
        .map(|envelope| envelope.data)
        .collect();
    values.sort_by(f64::total_cmp);

    let expected: Vec<f64> = (1..25).map(f64::from).collect();
    assert_eq!(values, expected);
    assert_eq!(draws.get(), 25);
    assert_eq!(sink.close_calls().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_sink_still_gets_closed() {
    init_test_tracing();

    let sink = FaultySink::new(MemorySink::<f64>::new())
        .fail_publishes(0..1_000)
        .fail_close();
    let engine = Engine::new(
        EngineConfig::low_latency(),
        LinearSeeder::new(0.5, 0.0),
        |value: f64, _: DateTime<Utc>| value,
        sink.clone(),
    )
    .unwrap();
    let shutdown_tx = engine.shutdown_tx();

    let run = tokio::spawn(engine.start());
    sleep(Duration::from_millis(150)).await;
    shutdown_tx.shutdown();

    let err = timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();

    assert_eq!(err.kinds(), vec![ErrorKind::SinkCloseFailed]);
    assert!(sink.publish_attempts() > 0);
    assert!(sink.inner().batches().await.is_empty());
    assert_eq!(sink.inner().close_calls().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn most_envelopes_are_tagged_ok() {
    init_test_tracing();

    let seeder = LinearSeeder::new(1.0, 0.0);

    let sink = MemorySink::<f64>::new();
    let engine = Engine::new(
        engine_config(1, 10, 20, 2),
        seeder,
        |value: f64, _: DateTime<Utc>| value,
        sink.clone(),
    )
    .unwrap()
    .with_envelope_builder(EnvelopeBuilder::new("q").with_seed(7));
    let shutdown_tx = engine.shutdown_tx();

    let run = tokio::spawn(engine.start());
    sleep(Duration::from_millis(60)).await;
    shutdown_tx.shutdown();
    timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let envelopes = sink.batched_envelopes().await;
    assert!(!envelopes.is_empty());
    let ok = envelopes
        .iter()
        .filter(|envelope| envelope.quality == Quality::Ok)
        .count();
    assert!(ok * 2 > envelopes.len(), "{ok} of {} envelopes are OK", envelopes.len());
}

#[tokio::test(flavor = "multi_thread")]
async fn huge_batch_size_flushes_on_timeout_and_shutdown() {
    init_test_tracing();

    let sink = MemorySink::<f64>::new();
    let (shutdown_tx, _) = create_shutdown_channel();
    let seeder = CountingSeeder::new().shutdown_on_draw(10, shutdown_tx.clone());
    let engine = Engine::new(
        engine_config(5, 1 << 40, 20, 1),
        seeder,
        |value: f64, _: DateTime<Utc>| value,
        sink.clone(),
    )
    .unwrap()
    .with_shutdown_tx(shutdown_tx);

    timeout(Duration::from_secs(5), engine.start())
        .await
        .unwrap()
        .unwrap();

    let values: Vec<f64> = sink
        .batched_envelopes()
        .await
        .into_iter()
        .map(|envelope| envelope.data)
        .collect();
    assert_eq!(values, (1..10).map(f64::from).collect::<Vec<_>>());
    assert_eq!(sink.close_calls().await, 1);
}
