//! Brute force detection
//!
//! Repeated connection attempts against a single authentication service.
//! Keyed by (source, service port) so one host hammering SSH and another
//! probing RDP never share a window.

use crate::window::TimeWindow;
use nids_common::{AlertEvent, AttackType, DetectorConfig, Service, TcpFlags};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::IpAddr;

#[derive(Default)]
pub struct BruteForceDetector {
    attempts: HashMap<(IpAddr, u16), TimeWindow>,
}

impl BruteForceDetector {
    pub fn on_packet(
        &mut self,
        src_ip: IpAddr,
        dst_port: u16,
        flags: TcpFlags,
        at: DateTime<Utc>,
        config: &DetectorConfig,
    ) -> Option<AlertEvent> {
        // Only the opening segment of a handshake counts as an attempt.
        if !flags.is_pure_syn() {
            return None;
        }
        let service = Service::from_port(dst_port)?;

        let window = self.attempts.entry((src_ip, dst_port)).or_default();
        window.push(at, config.bf_window());

        let count = window.len();
        if count <= config.bf_threshold {
            return None;
        }

        window.clear();
        Some(AlertEvent {
            src_ip,
            attack_type: AttackType::BruteForce(service),
            description: format!(
                "{count} connection attempts against {} (port {dst_port}) in {}s",
                service.name(),
                config.bf_window_secs
            ),
            timestamp: at,
        })
    }

    pub fn is_idle(&self, src_ip: &IpAddr, dst_port: u16) -> bool {
        self.attempts
            .get(&(*src_ip, dst_port))
            .map_or(true, |w| w.is_empty())
    }
}
