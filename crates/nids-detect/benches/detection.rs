//! Detection engine benchmark
//!
//! Per-event cost of the full gate-plus-detector pass over a realistic
//! traffic mix, and the worst case of a source that keeps a large window.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nids_common::{DetectorConfig, GateConfig, PacketEvent, StoreLayout, TcpFlags};
use nids_detect::DetectionEngine;
use std::net::IpAddr;

fn engine() -> (DetectionEngine, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("temp store dir");
    let engine = DetectionEngine::new(
        DetectorConfig::default(),
        &StoreLayout::new(dir.path()),
        &GateConfig::default(),
    );
    (engine, dir)
}

fn traffic_mix(count: usize) -> Vec<PacketEvent> {
    let syn: TcpFlags = "S".parse().unwrap();
    let ack: TcpFlags = "A".parse().unwrap();
    (0..count)
        .map(|i| {
            let src: IpAddr = format!("10.0.{}.{}", (i / 250) % 250, i % 250).parse().unwrap();
            let at = Utc.timestamp_opt(1_700_000_000 + (i / 100) as i64, 0).unwrap();
            let flags = if i % 3 == 0 { syn } else { ack };
            PacketEvent::tcp(at, src, None, (i % 2000) as u16 + 1, flags)
        })
        .collect()
}

fn detection_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection");

    group.bench_function("mixed_traffic", |b| {
        let events = traffic_mix(10_000);
        let (mut engine, _dir) = engine();
        let mut cursor = 0;
        b.iter(|| {
            let event = &events[cursor % events.len()];
            cursor += 1;
            black_box(engine.process(black_box(event)))
        })
    });

    group.bench_function("hot_source_window", |b| {
        // Single source below the flood threshold: every packet pays the
        // window eviction walk.
        let (mut engine, _dir) = engine();
        let src: IpAddr = "10.9.9.9".parse().unwrap();
        let syn: TcpFlags = "S".parse().unwrap();
        let mut tick = 0i64;
        b.iter(|| {
            // Spread packets out so the threshold never trips.
            tick += 1;
            let at = Utc.timestamp_opt(1_700_000_000 + tick, 0).unwrap();
            let event = PacketEvent::tcp(at, src, None, 443, syn);
            black_box(engine.process(&event))
        })
    });

    group.finish();
}

criterion_group!(benches, detection_benchmark);
criterion_main!(benches);
