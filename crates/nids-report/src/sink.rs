//! Report sinks
//!
//! The processing worker must never wait on a disk or a chat API. Everything
//! it produces goes through [`ReportSink`]: [`DirectSink`] performs the work
//! synchronously (and is what tests exercise), [`QueuedSink`] forwards jobs
//! over a bounded channel to a dedicated I/O worker thread and drops, with a
//! warning, rather than block when that worker falls behind.

use crate::aggregator::SessionRecord;
use crate::notify::Notifier;
use crate::store::JsonStore;
use crate::writer::AlertRecord;
use crossbeam_channel::{bounded, Receiver, Sender};
use nids_common::{AttackType, ReportConfig, StoreLayout};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Finished-session entry for the attack log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttackRecord {
    #[serde(flatten)]
    pub session: SessionRecord,
    pub logged_at: String,
}

pub trait ReportSink: Send {
    fn alert(&self, record: AlertRecord);
    fn attack(&self, record: AttackRecord);
    fn snapshot(&self, sessions: Vec<SessionRecord>);
    fn notify(&self, attack_type: AttackType, src_ip: IpAddr, timestamp: String);
}

/// Synchronous sink: owns the three stores and the notifier.
pub struct DirectSink {
    alerts: JsonStore,
    attacks: JsonStore,
    active: JsonStore,
    notifier: Box<dyn Notifier>,
}

impl DirectSink {
    pub fn new(layout: &StoreLayout, config: &ReportConfig, notifier: Box<dyn Notifier>) -> Self {
        Self {
            alerts: JsonStore::new(layout.alerts(), config.rotate_cap),
            attacks: JsonStore::new(layout.attacks(), config.rotate_cap),
            active: JsonStore::new(layout.active_attacks(), config.rotate_cap),
            notifier,
        }
    }
}

impl ReportSink for DirectSink {
    fn alert(&self, record: AlertRecord) {
        if let Err(err) = self.alerts.append(&record) {
            warn!(error = %err, "failed to persist alert");
        }
    }

    fn attack(&self, record: AttackRecord) {
        if let Err(err) = self.attacks.append(&record) {
            warn!(error = %err, "failed to persist finished attack");
        }
    }

    fn snapshot(&self, sessions: Vec<SessionRecord>) {
        if let Err(err) = self.active.overwrite(&sessions) {
            warn!(error = %err, "failed to write live snapshot");
        }
    }

    fn notify(&self, attack_type: AttackType, src_ip: IpAddr, timestamp: String) {
        if !self.notifier.notify(attack_type, src_ip, &timestamp) {
            debug!(%src_ip, %attack_type, "notification not delivered");
        }
    }
}

enum ReportJob {
    Alert(AlertRecord),
    Attack(AttackRecord),
    Snapshot(Vec<SessionRecord>),
    Notify {
        attack_type: AttackType,
        src_ip: IpAddr,
        timestamp: String,
    },
}

/// Sink half of the queued pipeline; clones share the same worker.
#[derive(Clone)]
pub struct QueuedSink {
    tx: Sender<ReportJob>,
}

impl QueuedSink {
    /// Spawn the I/O worker around `inner` and return the sink feeding it.
    /// The worker exits once every `QueuedSink` clone is dropped.
    pub fn spawn(inner: DirectSink, queue_size: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = bounded(queue_size);
        let handle = std::thread::spawn(move || Self::worker_loop(rx, inner));
        (Self { tx }, handle)
    }

    fn worker_loop(rx: Receiver<ReportJob>, inner: DirectSink) {
        for job in rx {
            match job {
                ReportJob::Alert(record) => inner.alert(record),
                ReportJob::Attack(record) => inner.attack(record),
                ReportJob::Snapshot(sessions) => inner.snapshot(sessions),
                ReportJob::Notify {
                    attack_type,
                    src_ip,
                    timestamp,
                } => inner.notify(attack_type, src_ip, timestamp),
            }
        }
        debug!("report worker drained and stopped");
    }

    fn enqueue(&self, job: ReportJob) {
        if self.tx.try_send(job).is_err() {
            warn!("report queue saturated, dropping job");
        }
    }
}

impl ReportSink for QueuedSink {
    fn alert(&self, record: AlertRecord) {
        self.enqueue(ReportJob::Alert(record));
    }

    fn attack(&self, record: AttackRecord) {
        self.enqueue(ReportJob::Attack(record));
    }

    fn snapshot(&self, sessions: Vec<SessionRecord>) {
        self.enqueue(ReportJob::Snapshot(sessions));
    }

    fn notify(&self, attack_type: AttackType, src_ip: IpAddr, timestamp: String) {
        self.enqueue(ReportJob::Notify {
            attack_type,
            src_ip,
            timestamp,
        });
    }
}

#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    inner: std::sync::Arc<std::sync::Mutex<Recorded>>,
}

#[cfg(test)]
#[derive(Default)]
struct Recorded {
    alerts: Vec<AlertRecord>,
    attacks: Vec<AttackRecord>,
    snapshots: Vec<Vec<SessionRecord>>,
    notifications: Vec<(AttackType, IpAddr, String)>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.inner.lock().unwrap().alerts.clone()
    }

    pub fn attacks(&self) -> Vec<AttackRecord> {
        self.inner.lock().unwrap().attacks.clone()
    }

    pub fn snapshots(&self) -> Vec<Vec<SessionRecord>> {
        self.inner.lock().unwrap().snapshots.clone()
    }

    pub fn notifications(&self) -> Vec<(AttackType, IpAddr, String)> {
        self.inner.lock().unwrap().notifications.clone()
    }
}

#[cfg(test)]
impl ReportSink for RecordingSink {
    fn alert(&self, record: AlertRecord) {
        self.inner.lock().unwrap().alerts.push(record);
    }

    fn attack(&self, record: AttackRecord) {
        self.inner.lock().unwrap().attacks.push(record);
    }

    fn snapshot(&self, sessions: Vec<SessionRecord>) {
        self.inner.lock().unwrap().snapshots.push(sessions);
    }

    fn notify(&self, attack_type: AttackType, src_ip: IpAddr, timestamp: String) {
        self.inner
            .lock()
            .unwrap()
            .notifications
            .push((attack_type, src_ip, timestamp));
    }
}
