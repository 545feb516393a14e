//! Sliding-window primitives
//!
//! All detector state is one of three shapes: a plain timestamp window, a
//! timestamp window tagged with a port, or a port-to-last-seen map. Eviction
//! is lazy: it happens on each touch of a key, never on a global timer, and
//! after every update a window holds only entries younger than the window
//! duration.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Time-ordered timestamps of recent observations.
#[derive(Debug, Default)]
pub struct TimeWindow {
    entries: VecDeque<DateTime<Utc>>,
}

impl TimeWindow {
    /// Record one observation at `now` and evict everything older than
    /// `window`.
    pub fn push(&mut self, now: DateTime<Utc>, window: Duration) {
        self.entries.push_back(now);
        self.evict(now, window);
    }

    fn evict(&mut self, now: DateTime<Utc>, window: Duration) {
        while let Some(first) = self.entries.front() {
            if now - *first < window {
                break;
            }
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Timestamps tagged with the destination port they were seen on.
#[derive(Debug, Default)]
pub struct TaggedWindow {
    entries: VecDeque<(DateTime<Utc>, u16)>,
}

impl TaggedWindow {
    pub fn push(&mut self, now: DateTime<Utc>, port: u16, window: Duration) {
        self.entries.push_back((now, port));
        while let Some((first, _)) = self.entries.front() {
            if now - *first < window {
                break;
            }
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct ports among the live entries.
    pub fn distinct_ports(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, port)| *port)
            .collect::<BTreeSet<u16>>()
            .len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Last-seen time per destination port.
#[derive(Debug, Default)]
pub struct PortWindow {
    ports: HashMap<u16, DateTime<Utc>>,
}

impl PortWindow {
    /// Record a touch of `port` at `now`, then drop every port not seen
    /// within `window`.
    pub fn touch(&mut self, port: u16, now: DateTime<Utc>, window: Duration) {
        self.ports.insert(port, now);
        self.ports.retain(|_, seen| now - *seen < window);
    }

    /// Distinct live ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn clear(&mut self) {
        self.ports.clear();
    }
}
