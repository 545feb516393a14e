//! OpenNIDS daemon
//!
//! Wires the pieces into a running process: a packet source feeds normalized
//! events into a bounded channel, one worker thread owns the whole detection
//! pipeline, and a second worker absorbs all file and collaborator I/O.

pub mod capture;
pub mod config;
pub mod pipeline;

pub use capture::{PacketSource, ReplaySource, StdinSource};
pub use config::DaemonConfig;
pub use pipeline::IdsPipeline;
