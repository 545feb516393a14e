//! OpenNIDS Detection Engine
//!
//! Seven stateful heuristic classifiers behind a single owned engine:
//!
//! - **SYN flood** (targeted/global split)
//! - **Port scan** (distinct low ports per source)
//! - **Brute force** (per authentication service)
//! - **ARP / IP / DNS spoofing** (identity-binding mismatches)
//! - **Abnormal TCP flags** (NULL / XMAS / SYN+FIN probes)
//!
//! The engine consults the allow/deny gate before any detector runs and
//! records no state for exempt sources. Detector windows are driven by the
//! event's declared timestamp, so a replayed event sequence reproduces the
//! exact same alerts.

pub mod brute;
pub mod engine;
pub mod flags;
pub mod flood;
pub mod gate;
pub mod reload;
pub mod scan;
pub mod spoof;
pub mod window;

pub use engine::DetectionEngine;
pub use gate::AccessGate;
pub use reload::Cached;
