//! Detection engine
//!
//! One owned object holds the gate and every detector's keyed state; the
//! processing worker threads each event through it. A single event can
//! legitimately produce several alerts (a SYN to port 22 is flood, scan,
//! and brute-force evidence at once), so the engine returns them all.

use crate::brute::BruteForceDetector;
use crate::flags::probe_flags;
use crate::flood::SynFloodDetector;
use crate::gate::AccessGate;
use crate::scan::PortScanDetector;
use crate::spoof::SpoofMonitor;
use nids_common::{AlertEvent, ArpOp, DetectorConfig, GateConfig, PacketEvent, Payload, StoreLayout};
use std::time::Instant;
use tracing::debug;

/// Engine counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineStats {
    pub events_processed: u64,
    pub events_exempt: u64,
    pub alerts_emitted: u64,
}

pub struct DetectionEngine {
    config: DetectorConfig,
    gate: AccessGate,
    flood: SynFloodDetector,
    scan: PortScanDetector,
    brute: BruteForceDetector,
    spoof: SpoofMonitor,
    stats: EngineStats,
}

impl DetectionEngine {
    pub fn new(config: DetectorConfig, layout: &StoreLayout, gate_config: &GateConfig) -> Self {
        Self {
            config,
            gate: AccessGate::new(layout, gate_config),
            flood: SynFloodDetector::default(),
            scan: PortScanDetector::default(),
            brute: BruteForceDetector::default(),
            spoof: SpoofMonitor::default(),
            stats: EngineStats::default(),
        }
    }

    /// Run one event through the gate and every applicable detector.
    pub fn process(&mut self, event: &PacketEvent) -> Vec<AlertEvent> {
        self.process_at(event, Instant::now())
    }

    /// Like [`process`](Self::process) with an injected monotonic `now`,
    /// used by the gate's reload throttle.
    pub fn process_at(&mut self, event: &PacketEvent, now: Instant) -> Vec<AlertEvent> {
        self.stats.events_processed += 1;

        if self.gate.is_exempt_at(event.src_ip, now) {
            self.stats.events_exempt += 1;
            debug!(src_ip = %event.src_ip, "exempt source, skipping analysis");
            return Vec::new();
        }

        let mut alerts = Vec::new();
        let at = event.timestamp;

        match &event.payload {
            Payload::Arp { op } => {
                // A reply without a link-layer address is malformed; drop it
                // without touching the cache.
                if let (ArpOp::Reply, Some(mac)) = (*op, event.src_mac.as_deref()) {
                    alerts.extend(self.spoof.on_arp_reply(event.src_ip, mac, at));
                }
            }
            Payload::Tcp { dst_port, flags } => {
                if let Some(mac) = event.src_mac.as_deref() {
                    alerts.extend(self.spoof.on_ip_packet(event.src_ip, mac, at));
                }
                alerts.extend(self.flood.on_packet(
                    event.src_ip,
                    *dst_port,
                    *flags,
                    at,
                    &self.config,
                ));
                alerts.extend(self.scan.on_packet(event.src_ip, *dst_port, at, &self.config));
                alerts.extend(self.brute.on_packet(
                    event.src_ip,
                    *dst_port,
                    *flags,
                    at,
                    &self.config,
                ));
                alerts.extend(probe_flags(event.src_ip, *flags, at));
            }
            Payload::Dns {
                tx_id,
                query_name,
                answer_ips,
                is_response,
            } => {
                if let Some(mac) = event.src_mac.as_deref() {
                    alerts.extend(self.spoof.on_ip_packet(event.src_ip, mac, at));
                }
                // Queries and empty responses carry no answer evidence.
                if *is_response && !answer_ips.is_empty() {
                    alerts.extend(self.spoof.on_dns_response(
                        event.src_ip,
                        *tx_id,
                        query_name,
                        answer_ips,
                        at,
                    ));
                }
            }
        }

        self.stats.alerts_emitted += alerts.len() as u64;
        alerts
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn gate_mut(&mut self) -> &mut AccessGate {
        &mut self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use nids_common::{AttackType, FlagProbe, FloodScope, Service, TcpFlags};
    use std::net::IpAddr;
    use tempfile::tempdir;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn flags(s: &str) -> TcpFlags {
        s.parse().unwrap()
    }

    fn engine_in(dir: &std::path::Path) -> DetectionEngine {
        DetectionEngine::new(
            DetectorConfig::default(),
            &StoreLayout::new(dir),
            &GateConfig::default(),
        )
    }

    #[test]
    fn exempt_sources_create_no_state_and_no_alerts() {
        let dir = tempdir().unwrap();
        std::fs::write(
            StoreLayout::new(dir.path()).whitelist(),
            r#"["9.9.9.9"]"#,
        )
        .unwrap();
        let mut engine = engine_in(dir.path());
        let src = ip("9.9.9.9");

        for i in 0..100 {
            let event = PacketEvent::tcp(at(i / 10), src, None, 22, flags("S"));
            assert!(engine.process(&event).is_empty());
        }
        assert!(engine.flood.is_idle(&src));
        assert!(engine.scan.is_idle(&src));
        assert!(engine.brute.is_idle(&src, 22));
        assert_eq!(engine.stats().events_exempt, 100);
    }

    #[test]
    fn syn_to_service_port_feeds_three_detectors() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let src = ip("44.44.44.44");

        // Six pure SYNs to SSH: brute force fires on the sixth, and the
        // flood/scan windows have been accumulating all along.
        let mut alerts = Vec::new();
        for i in 0..6 {
            let event = PacketEvent::tcp(at(i), src, None, 22, flags("S"));
            alerts.extend(engine.process(&event));
        }
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0].attack_type,
            AttackType::BruteForce(Service::Ssh)
        );
        assert!(!engine.flood.is_idle(&src));
        assert!(!engine.scan.is_idle(&src));
        assert!(engine.brute.is_idle(&src, 22));
    }

    #[test]
    fn targeted_flood_through_the_engine() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let src = ip("9.9.9.9");

        let mut alerts = Vec::new();
        for i in 0..31 {
            let event = PacketEvent::tcp(at(i / 4), src, None, 443, flags("S"));
            alerts.extend(engine.process(&event));
        }
        let flood: Vec<_> = alerts
            .iter()
            .filter(|a| a.attack_type == AttackType::SynFlood(FloodScope::Targeted))
            .collect();
        assert_eq!(flood.len(), 1);
        assert!(engine.flood.is_idle(&src));
    }

    #[test]
    fn xmas_probe_and_ip_spoof_can_stack() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let victim = ip("192.168.1.20");

        // Bind the victim's MAC, then probe from a different MAC with XMAS
        // flags: one event, two alerts.
        let bind = PacketEvent::arp(at(0), victim, Some("aa:aa:aa:aa:aa:aa"), ArpOp::Reply);
        assert!(engine.process(&bind).is_empty());

        let probe = PacketEvent::tcp(at(1), victim, Some("bb:bb:bb:bb:bb:bb"), 80, flags("FPU"));
        let alerts = engine.process(&probe);
        let types: Vec<_> = alerts.iter().map(|a| a.attack_type).collect();
        assert!(types.contains(&AttackType::IpSpoofing));
        assert!(types.contains(&AttackType::AbnormalFlags(FlagProbe::Xmas)));
    }

    #[test]
    fn arp_reply_without_mac_is_ignored() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let src = ip("192.168.1.30");

        let malformed = PacketEvent::arp(at(0), src, None, ArpOp::Reply);
        assert!(engine.process(&malformed).is_empty());
        assert_eq!(engine.spoof.cached_mac(&src), None);
    }

    #[test]
    fn arp_request_does_not_learn() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let src = ip("192.168.1.31");

        let request = PacketEvent::arp(at(0), src, Some("aa:aa:aa:aa:aa:aa"), ArpOp::Request);
        assert!(engine.process(&request).is_empty());
        assert_eq!(engine.spoof.cached_mac(&src), None);
    }

    #[test]
    fn dns_poisoning_through_the_engine() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let server = ip("192.168.1.1");

        let first =
            PacketEvent::dns_response(at(0), server, 1234, "bank.example.", [ip("8.8.8.8")]);
        assert!(engine.process(&first).is_empty());

        let repeat =
            PacketEvent::dns_response(at(1), server, 1234, "bank.example.", [ip("8.8.8.8")]);
        assert!(engine.process(&repeat).is_empty());

        let poison =
            PacketEvent::dns_response(at(2), server, 1234, "bank.example.", [ip("6.6.6.6")]);
        let alerts = engine.process(&poison);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].attack_type, AttackType::DnsSpoofing);
        assert_eq!(alerts[0].src_ip, server);
    }

    #[test]
    fn blocklisted_source_is_exempt_too() {
        let dir = tempdir().unwrap();
        std::fs::write(
            StoreLayout::new(dir.path()).firewall_rules(),
            r#"{"blocklist": ["6.6.6.6"]}"#,
        )
        .unwrap();
        let mut engine = engine_in(dir.path());

        for port in 1..=40 {
            let event = PacketEvent::tcp(at(0), ip("6.6.6.6"), None, port, flags("S"));
            assert!(engine.process(&event).is_empty());
        }
        assert!(engine.scan.is_idle(&ip("6.6.6.6")));
    }
}
