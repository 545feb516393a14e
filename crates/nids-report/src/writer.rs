//! Alert throttling
//!
//! A repeating (source, type) pair must not turn the alert log into a
//! per-packet write stream. The first occurrence is always written; repeats
//! inside the aggregation window are counted and flushed every tenth hit
//! with an aggregation marker in the description.

use nids_common::{AlertEvent, AttackType, ReportConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Wall-clock format shared by every persisted record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One persisted alert log entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: String,
    pub src_ip: IpAddr,
    #[serde(rename = "type")]
    pub attack_type: AttackType,
    pub description: String,
    pub count: u64,
}

struct ThrottleEntry {
    last_write_time: Instant,
    pending_count: u64,
}

/// Pure throttling state machine: feed it alerts, persist what it returns.
pub struct AlertThrottle {
    entries: HashMap<(IpAddr, AttackType), ThrottleEntry>,
    window: Duration,
}

impl AlertThrottle {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            entries: HashMap::new(),
            window: config.agg_window(),
        }
    }

    pub fn observe(&mut self, alert: &AlertEvent) -> Option<AlertRecord> {
        self.observe_at(alert, Instant::now())
    }

    /// Decide whether `alert` is written now. Returns the record to persist,
    /// or `None` while the burst is merely being counted.
    pub fn observe_at(&mut self, alert: &AlertEvent, now: Instant) -> Option<AlertRecord> {
        let key = (alert.src_ip, alert.attack_type);
        let timestamp = alert.timestamp.format(TIMESTAMP_FORMAT).to_string();

        match self.entries.get_mut(&key) {
            Some(entry) if now.duration_since(entry.last_write_time) < self.window => {
                entry.pending_count += 1;
                if entry.pending_count % 10 != 0 {
                    return None;
                }
                // Tenth repeat inside the window: flush the running count.
                let count = entry.pending_count;
                entry.pending_count = 1;
                entry.last_write_time = now;
                Some(AlertRecord {
                    timestamp,
                    src_ip: alert.src_ip,
                    attack_type: alert.attack_type,
                    description: format!("[Aggregated {count} times] {}", alert.description),
                    count,
                })
            }
            _ => {
                // First sighting of the key, or the window has lapsed.
                self.entries.insert(
                    key,
                    ThrottleEntry {
                        last_write_time: now,
                        pending_count: 1,
                    },
                );
                Some(AlertRecord {
                    timestamp,
                    src_ip: alert.src_ip,
                    attack_type: alert.attack_type,
                    description: alert.description.clone(),
                    count: 1,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nids_common::AttackType;

    fn alert(ip: &str, ty: AttackType) -> AlertEvent {
        AlertEvent {
            src_ip: ip.parse().unwrap(),
            attack_type: ty,
            description: "probe".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn first_occurrence_always_writes() {
        let mut throttle = AlertThrottle::new(&ReportConfig::default());
        let record = throttle
            .observe_at(&alert("1.2.3.4", AttackType::PortScan), Instant::now())
            .expect("first alert is never suppressed");
        assert_eq!(record.count, 1);
        assert_eq!(record.description, "probe");
    }

    #[test]
    fn burst_flushes_every_tenth() {
        let mut throttle = AlertThrottle::new(&ReportConfig::default());
        let now = Instant::now();
        let a = alert("1.2.3.4", AttackType::PortScan);

        assert!(throttle.observe_at(&a, now).is_some());
        let mut written = Vec::new();
        for i in 1..=20 {
            let t = now + Duration::from_millis(i * 10);
            if let Some(record) = throttle.observe_at(&a, t) {
                written.push(record);
            }
        }
        // Pending counts 2..=21: flushed at 10 and 20.
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].count, 10);
        assert!(written[0].description.starts_with("[Aggregated 10 times]"));
        assert_eq!(written[1].count, 10);
    }

    #[test]
    fn lapsed_window_writes_fresh() {
        let config = ReportConfig::default();
        let mut throttle = AlertThrottle::new(&config);
        let now = Instant::now();
        let a = alert("1.2.3.4", AttackType::PortScan);

        assert!(throttle.observe_at(&a, now).is_some());
        assert!(throttle
            .observe_at(&a, now + Duration::from_secs(1))
            .is_none());

        let record = throttle
            .observe_at(&a, now + config.agg_window())
            .expect("window lapsed");
        assert_eq!(record.count, 1);
        assert_eq!(record.description, "probe");
    }

    #[test]
    fn keys_throttle_independently() {
        let mut throttle = AlertThrottle::new(&ReportConfig::default());
        let now = Instant::now();

        assert!(throttle
            .observe_at(&alert("1.2.3.4", AttackType::PortScan), now)
            .is_some());
        // Different type, same source: separate key, written immediately.
        assert!(throttle
            .observe_at(&alert("1.2.3.4", AttackType::IpSpoofing), now)
            .is_some());
        // Different source, same type: also written.
        assert!(throttle
            .observe_at(&alert("4.3.2.1", AttackType::PortScan), now)
            .is_some());
    }
}
