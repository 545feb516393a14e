//! Rotating JSON stores
//!
//! Flat-file persistence for dashboards and forensics. Append-mode stores
//! keep the newest `cap` entries; the live snapshot is replaced wholesale.
//! All writes go through the atomic temp-then-rename primitive, and corrupt
//! or missing content always degrades to an empty list.

use nids_common::persist::{atomic_write_json, read_json_or_default};
use nids_common::NidsResult;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub struct JsonStore {
    path: PathBuf,
    cap: usize,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            path: path.into(),
            cap,
        }
    }

    /// Append one record, dropping the oldest entries beyond the cap.
    pub fn append<T: Serialize>(&self, record: &T) -> NidsResult<()> {
        let mut entries: Vec<Value> = read_json_or_default(&self.path);
        entries.push(serde_json::to_value(record)?);
        if entries.len() > self.cap {
            let excess = entries.len() - self.cap;
            entries.drain(..excess);
        }
        atomic_write_json(&self.path, &entries)
    }

    /// Replace the whole store content (live snapshot semantics).
    pub fn overwrite<T: Serialize>(&self, records: &[T]) -> NidsResult<()> {
        atomic_write_json(&self.path, records)
    }

    /// Current content; corrupt or missing files read as empty.
    pub fn read_all(&self) -> Vec<Value> {
        read_json_or_default(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
