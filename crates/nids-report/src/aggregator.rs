//! Attack session aggregation
//!
//! A burst of discrete alerts from one source is a single incident. Sessions
//! are keyed by (source, attack type), opened on the first alert (with a
//! one-shot notification), extended by every repeat, and finalized to the
//! attack log after sixty quiet seconds.
//!
//! The idle sweep runs on the write path: it is attached to each processed
//! alert, so with no traffic at all nothing finalizes. `sweep_at` is public
//! so a deployment can also drive it from a timer if that trade-off is not
//! acceptable.

use crate::sink::{AttackRecord, ReportSink};
use crate::writer::TIMESTAMP_FORMAT;
use nids_common::{AlertEvent, AttackType, ReportConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::info;

/// Serialized view of a session, used for both the live snapshot and (with
/// `logged_at` attached) the finished-attack log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub src_ip: IpAddr,
    #[serde(rename = "type")]
    pub attack_type: AttackType,
    pub start_time: String,
    pub end_time: String,
    pub count: u64,
    pub details: Vec<String>,
}

struct AttackSession {
    src_ip: IpAddr,
    attack_type: AttackType,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    first_seen: Instant,
    last_seen: Instant,
    count: u64,
    details: Vec<String>,
}

impl AttackSession {
    fn open(alert: &AlertEvent, now: Instant) -> Self {
        Self {
            src_ip: alert.src_ip,
            attack_type: alert.attack_type,
            start_time: alert.timestamp,
            end_time: alert.timestamp,
            first_seen: now,
            last_seen: now,
            count: 1,
            details: vec![alert.description.clone()],
        }
    }

    fn extend(&mut self, alert: &AlertEvent, now: Instant) {
        self.count += 1;
        self.last_seen = now;
        self.end_time = alert.timestamp;
        if !self.details.contains(&alert.description) {
            self.details.push(alert.description.clone());
        }
    }

    fn record(&self) -> SessionRecord {
        SessionRecord {
            src_ip: self.src_ip,
            attack_type: self.attack_type,
            start_time: self.start_time.format(TIMESTAMP_FORMAT).to_string(),
            end_time: self.end_time.format(TIMESTAMP_FORMAT).to_string(),
            count: self.count,
            details: self.details.clone(),
        }
    }
}

pub struct AttackAggregator {
    sessions: HashMap<(IpAddr, AttackType), AttackSession>,
    idle_timeout: Duration,
    sink: Box<dyn ReportSink>,
}

impl AttackAggregator {
    pub fn new(config: &ReportConfig, sink: Box<dyn ReportSink>) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout: config.idle_timeout(),
            sink,
        }
    }

    pub fn record(&mut self, alert: &AlertEvent) {
        self.record_at(alert, Instant::now());
    }

    /// Fold one alert into its session, publish the refreshed snapshot, then
    /// run the idle sweep.
    pub fn record_at(&mut self, alert: &AlertEvent, now: Instant) {
        let key = (alert.src_ip, alert.attack_type);
        match self.sessions.get_mut(&key) {
            Some(session) => session.extend(alert, now),
            None => {
                info!(src_ip = %alert.src_ip, attack_type = %alert.attack_type, "new attack session");
                self.sessions.insert(key, AttackSession::open(alert, now));
                self.sink.notify(
                    alert.attack_type,
                    alert.src_ip,
                    alert.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                );
            }
        }

        self.publish_snapshot();
        self.sweep_at(now);
    }

    /// Finalize every session idle past the timeout. Public so callers can
    /// also drive it independently of alert arrival.
    pub fn sweep_at(&mut self, now: Instant) {
        let idle_timeout = self.idle_timeout;
        let finished: Vec<(IpAddr, AttackType)> = self
            .sessions
            .iter()
            .filter(|(_, s)| now.duration_since(s.last_seen) > idle_timeout)
            .map(|(key, _)| *key)
            .collect();

        if finished.is_empty() {
            return;
        }

        for key in finished {
            if let Some(session) = self.sessions.remove(&key) {
                info!(
                    src_ip = %session.src_ip,
                    attack_type = %session.attack_type,
                    count = session.count,
                    "attack session finished"
                );
                self.sink.attack(AttackRecord {
                    session: session.record(),
                    logged_at: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
                });
            }
        }
        self.publish_snapshot();
    }

    /// Value copy of all active sessions, oldest first. Safe to hand to
    /// concurrent readers.
    pub fn snapshot(&self) -> Vec<SessionRecord> {
        let mut sessions: Vec<&AttackSession> = self.sessions.values().collect();
        sessions.sort_by_key(|s| s.first_seen);
        sessions.iter().map(|s| s.record()).collect()
    }

    pub fn active_len(&self) -> usize {
        self.sessions.len()
    }

    fn publish_snapshot(&self) {
        self.sink.snapshot(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use chrono::TimeZone;

    fn alert_at(ip: &str, ty: AttackType, secs: i64) -> AlertEvent {
        AlertEvent {
            src_ip: ip.parse().unwrap(),
            attack_type: ty,
            description: format!("evidence at {secs}"),
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        }
    }

    #[test]
    fn session_lifecycle_end_to_end() {
        let sink = RecordingSink::default();
        let mut aggregator =
            AttackAggregator::new(&ReportConfig::default(), Box::new(sink.clone()));
        let start = Instant::now();

        // t=0: session opens, exactly one notification.
        aggregator.record_at(&alert_at("3.3.3.3", AttackType::PortScan, 0), start);
        assert_eq!(aggregator.active_len(), 1);
        assert_eq!(sink.notifications().len(), 1);

        // t=30: same key extends, no new notification.
        aggregator.record_at(
            &alert_at("3.3.3.3", AttackType::PortScan, 30),
            start + Duration::from_secs(30),
        );
        assert_eq!(sink.notifications().len(), 1);
        let live = aggregator.snapshot();
        assert_eq!(live[0].count, 2);

        // t=91: unrelated key arrives; the first session has been idle 61s
        // and is swept out.
        aggregator.record_at(
            &alert_at("7.7.7.7", AttackType::IpSpoofing, 91),
            start + Duration::from_secs(91),
        );
        assert_eq!(aggregator.active_len(), 1);

        let finished = sink.attacks();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].session.count, 2);
        assert_eq!(finished[0].session.attack_type, AttackType::PortScan);

        let live: Vec<_> = aggregator
            .snapshot()
            .into_iter()
            .map(|s| s.attack_type)
            .collect();
        assert_eq!(live, vec![AttackType::IpSpoofing]);
    }

    #[test]
    fn no_activity_means_no_finalization() {
        let sink = RecordingSink::default();
        let mut aggregator =
            AttackAggregator::new(&ReportConfig::default(), Box::new(sink.clone()));
        let start = Instant::now();

        aggregator.record_at(&alert_at("3.3.3.3", AttackType::PortScan, 0), start);
        // Time passes, but nothing flows through the aggregator: the session
        // stays open until something does.
        assert_eq!(aggregator.active_len(), 1);
        assert!(sink.attacks().is_empty());

        aggregator.sweep_at(start + Duration::from_secs(120));
        assert_eq!(aggregator.active_len(), 0);
        assert_eq!(sink.attacks().len(), 1);
    }

    #[test]
    fn details_deduplicate_preserving_order() {
        let sink = RecordingSink::default();
        let mut aggregator =
            AttackAggregator::new(&ReportConfig::default(), Box::new(sink.clone()));
        let start = Instant::now();

        let mut first = alert_at("3.3.3.3", AttackType::PortScan, 0);
        first.description = "16 ports".to_string();
        let mut repeat = first.clone();
        repeat.timestamp = Utc.timestamp_opt(1_700_000_001, 0).unwrap();
        let mut other = first.clone();
        other.description = "17 ports".to_string();

        aggregator.record_at(&first, start);
        aggregator.record_at(&repeat, start + Duration::from_secs(1));
        aggregator.record_at(&other, start + Duration::from_secs(2));

        let live = aggregator.snapshot();
        assert_eq!(live[0].count, 3);
        assert_eq!(live[0].details, vec!["16 ports", "17 ports"]);
    }

    #[test]
    fn sessions_keyed_by_source_and_type() {
        let sink = RecordingSink::default();
        let mut aggregator =
            AttackAggregator::new(&ReportConfig::default(), Box::new(sink.clone()));
        let start = Instant::now();

        aggregator.record_at(&alert_at("3.3.3.3", AttackType::PortScan, 0), start);
        aggregator.record_at(&alert_at("3.3.3.3", AttackType::IpSpoofing, 1), start);
        aggregator.record_at(&alert_at("4.4.4.4", AttackType::PortScan, 2), start);
        assert_eq!(aggregator.active_len(), 3);
        assert_eq!(sink.notifications().len(), 3);
    }

    #[test]
    fn snapshot_published_on_every_mutation() {
        let sink = RecordingSink::default();
        let mut aggregator =
            AttackAggregator::new(&ReportConfig::default(), Box::new(sink.clone()));
        let start = Instant::now();

        aggregator.record_at(&alert_at("3.3.3.3", AttackType::PortScan, 0), start);
        aggregator.record_at(
            &alert_at("3.3.3.3", AttackType::PortScan, 1),
            start + Duration::from_secs(1),
        );
        let published = sink.snapshots();
        assert_eq!(published.len(), 2);
        assert_eq!(published[1][0].count, 2);

        // The sweep that removes a session republishes.
        aggregator.sweep_at(start + Duration::from_secs(120));
        let published = sink.snapshots();
        assert_eq!(published.len(), 3);
        assert!(published[2].is_empty());
    }
}
