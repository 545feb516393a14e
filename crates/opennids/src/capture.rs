//! Packet sources
//!
//! Capture and protocol decoding live outside this process; a source only
//! has to push normalized [`PacketEvent`] values into the bounded event
//! queue. Sends block when the queue is full, which is the backpressure
//! toward the producer.

use crossbeam_channel::Sender;
use nids_common::{NidsError, NidsResult, PacketEvent};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{info, warn};

pub trait PacketSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<PacketEvent>) -> NidsResult<()>;
}

/// Replays a JSON array of events from a file. Deterministic: the same file
/// produces the same alerts, which is also how end-to-end runs are driven
/// in development.
pub struct ReplaySource {
    path: PathBuf,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PacketSource for ReplaySource {
    fn run(self: Box<Self>, tx: Sender<PacketEvent>) -> NidsResult<()> {
        let raw = std::fs::read_to_string(&self.path)?;
        let events: Vec<PacketEvent> = serde_json::from_str(&raw)?;
        info!(count = events.len(), path = %self.path.display(), "replaying events");
        for event in events {
            tx.send(event)
                .map_err(|_| NidsError::Channel("event queue closed".to_string()))?;
        }
        Ok(())
    }
}

/// Reads one JSON event per line from stdin, the hand-off format an external
/// sniffer pipes into this process. Unparseable lines are dropped with a
/// warning; the stream keeps flowing.
pub struct StdinSource;

impl PacketSource for StdinSource {
    fn run(self: Box<Self>, tx: Sender<PacketEvent>) -> NidsResult<()> {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PacketEvent>(&line) {
                Ok(event) => {
                    tx.send(event)
                        .map_err(|_| NidsError::Channel("event queue closed".to_string()))?;
                }
                Err(err) => warn!(error = %err, "dropping undecodable event line"),
            }
        }
        Ok(())
    }
}
