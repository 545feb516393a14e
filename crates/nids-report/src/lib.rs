//! OpenNIDS Reporting
//!
//! Everything downstream of a detector alert:
//!
//! - Rotating, atomically-written JSON stores
//! - The alert throttler that bounds the write rate under bursts
//! - The attack-session aggregator with its idle-timeout lifecycle
//! - The report sink abstraction plus a queued I/O worker so slow disks or
//!   collaborators never stall the packet-processing worker
//! - Thin adapters for the external collaborators: notification (Telegram),
//!   firewall rules, geolocation

pub mod aggregator;
pub mod firewall;
pub mod geo;
pub mod notify;
pub mod sink;
pub mod store;
pub mod writer;

pub use aggregator::{AttackAggregator, SessionRecord};
pub use notify::{Notifier, NullNotifier, TelegramNotifier};
pub use sink::{AttackRecord, DirectSink, QueuedSink, ReportSink};
pub use store::JsonStore;
pub use writer::{AlertRecord, AlertThrottle};
