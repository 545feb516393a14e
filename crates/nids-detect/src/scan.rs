//! Port scan detection
//!
//! Reconnaissance shows up as one source touching many distinct well-known
//! ports in a short span. Only ports <= 1024 are tracked; ephemeral-range
//! traffic is normal fan-out.

use crate::window::PortWindow;
use nids_common::{AlertEvent, AttackType, DetectorConfig};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::IpAddr;

/// Ports above this are not scan evidence.
const LOW_PORT_LIMIT: u16 = 1024;

#[derive(Default)]
pub struct PortScanDetector {
    windows: HashMap<IpAddr, PortWindow>,
}

impl PortScanDetector {
    pub fn on_packet(
        &mut self,
        src_ip: IpAddr,
        dst_port: u16,
        at: DateTime<Utc>,
        config: &DetectorConfig,
    ) -> Option<AlertEvent> {
        if dst_port > LOW_PORT_LIMIT {
            return None;
        }

        let window = self.windows.entry(src_ip).or_default();
        window.touch(dst_port, at, config.window());

        let distinct = window.len();
        if distinct <= config.scan_threshold {
            return None;
        }

        window.clear();
        Some(AlertEvent {
            src_ip,
            attack_type: AttackType::PortScan,
            description: format!(
                "{distinct} distinct ports probed within {}s",
                config.window_secs
            ),
            timestamp: at,
        })
    }

    pub fn is_idle(&self, src_ip: &IpAddr) -> bool {
        self.windows.get(src_ip).map_or(true, |w| w.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn fires_on_sixteenth_distinct_port() {
        let config = DetectorConfig::default();
        let mut detector = PortScanDetector::default();
        let src: IpAddr = "5.5.5.5".parse().unwrap();

        for port in 1..=15 {
            assert!(detector.on_packet(src, port, at(0), &config).is_none());
        }
        let alert = detector
            .on_packet(src, 16, at(1), &config)
            .expect("16th distinct port crosses the threshold");
        assert_eq!(alert.attack_type, AttackType::PortScan);
        assert!(detector.is_idle(&src));
    }

    #[test]
    fn repeat_ports_do_not_accumulate() {
        let config = DetectorConfig::default();
        let mut detector = PortScanDetector::default();
        let src: IpAddr = "5.5.5.5".parse().unwrap();

        for _ in 0..100 {
            assert!(detector.on_packet(src, 22, at(0), &config).is_none());
        }
    }

    #[test]
    fn high_ports_ignored() {
        let config = DetectorConfig::default();
        let mut detector = PortScanDetector::default();
        let src: IpAddr = "5.5.5.5".parse().unwrap();

        for port in 2000..2100 {
            assert!(detector.on_packet(src, port, at(0), &config).is_none());
        }
        assert!(detector.is_idle(&src));
    }

    #[test]
    fn slow_scan_stays_quiet() {
        let config = DetectorConfig::default();
        let mut detector = PortScanDetector::default();
        let src: IpAddr = "5.5.5.5".parse().unwrap();

        // One port every 11 seconds: each touch evicts the previous one.
        for port in 1..=40 {
            let t = at(i64::from(port) * 11);
            assert!(detector.on_packet(src, port, t, &config).is_none());
        }
    }
}
