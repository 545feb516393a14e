//! SYN flood detection
//!
//! Counts pure-SYN segments per source over a sliding window and splits the
//! verdict by how the volume is aimed: a handful of ports is a targeted
//! flood, volume far outweighing port diversity is a global flood, and
//! anything in between is left for the port-scan detector to claim.

use crate::window::TaggedWindow;
use nids_common::{AlertEvent, AttackType, DetectorConfig, FloodScope, TcpFlags};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::debug;

/// At most this many distinct destination ports still counts as aimed at a
/// specific service.
const TARGETED_PORT_LIMIT: usize = 5;

/// Packet volume must exceed `distinct_ports * GLOBAL_VOLUME_FACTOR` before
/// a spread-out burst is called a flood rather than a scan.
const GLOBAL_VOLUME_FACTOR: usize = 5;

#[derive(Default)]
pub struct SynFloodDetector {
    windows: HashMap<IpAddr, TaggedWindow>,
}

impl SynFloodDetector {
    pub fn on_packet(
        &mut self,
        src_ip: IpAddr,
        dst_port: u16,
        flags: TcpFlags,
        at: DateTime<Utc>,
        config: &DetectorConfig,
    ) -> Option<AlertEvent> {
        if !flags.is_pure_syn() {
            return None;
        }

        let window = self.windows.entry(src_ip).or_default();
        window.push(at, dst_port, config.window());

        let count = window.len();
        if count <= config.flood_threshold {
            return None;
        }

        let ports = window.distinct_ports();
        let scope = if ports <= TARGETED_PORT_LIMIT {
            FloodScope::Targeted
        } else if count > ports * GLOBAL_VOLUME_FACTOR {
            FloodScope::Global
        } else {
            // Many ports, modest volume: the port-scan detector owns this.
            debug!(%src_ip, count, ports, "SYN burst below flood profile, deferring to scan");
            return None;
        };

        // Debounce: the window must refill before this source alerts again.
        window.clear();

        let description = match scope {
            FloodScope::Targeted => format!(
                "{count} SYN packets in {}s against {ports} port(s)",
                config.window_secs
            ),
            FloodScope::Global => format!(
                "{count} SYN packets in {}s sprayed over {ports} ports",
                config.window_secs
            ),
        };
        Some(AlertEvent {
            src_ip,
            attack_type: AttackType::SynFlood(scope),
            description,
            timestamp: at,
        })
    }

    /// True when no window exists for `src_ip` (or it is empty).
    pub fn is_idle(&self, src_ip: &IpAddr) -> bool {
        self.windows.get(src_ip).map_or(true, |w| w.is_empty())
    }
}
