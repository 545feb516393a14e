//! Detection pipeline
//!
//! One event, fully processed, is a single atomic step: gate check, every
//! applicable detector, throttled alert write, session update with its
//! sweep. The pipeline owns all of that state; nothing else touches it.

use nids_common::{PacketEvent, ReportConfig};
use nids_detect::DetectionEngine;
use nids_report::{AlertThrottle, AttackAggregator, ReportSink};
use std::time::Instant;
use tracing::info;

pub struct IdsPipeline {
    engine: DetectionEngine,
    throttle: AlertThrottle,
    aggregator: AttackAggregator,
    alert_sink: Box<dyn ReportSink>,
}

impl IdsPipeline {
    /// `alert_sink` receives throttled alert records; `session_sink` receives
    /// everything the aggregator emits. In the daemon both are handles to the
    /// same queued I/O worker.
    pub fn new(
        engine: DetectionEngine,
        report: &ReportConfig,
        alert_sink: Box<dyn ReportSink>,
        session_sink: Box<dyn ReportSink>,
    ) -> Self {
        Self {
            engine,
            throttle: AlertThrottle::new(report),
            aggregator: AttackAggregator::new(report, session_sink),
            alert_sink,
        }
    }

    pub fn handle(&mut self, event: &PacketEvent) {
        self.handle_at(event, Instant::now());
    }

    pub fn handle_at(&mut self, event: &PacketEvent, now: Instant) {
        for alert in self.engine.process_at(event, now) {
            info!(
                src_ip = %alert.src_ip,
                attack_type = %alert.attack_type,
                description = %alert.description,
                "alert"
            );
            if let Some(record) = self.throttle.observe_at(&alert, now) {
                self.alert_sink.alert(record);
            }
            self.aggregator.record_at(&alert, now);
        }
    }

    pub fn engine(&self) -> &DetectionEngine {
        &self.engine
    }

    pub fn aggregator(&self) -> &AttackAggregator {
        &self.aggregator
    }
}
