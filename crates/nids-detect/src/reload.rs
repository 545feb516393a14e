//! Cached file-backed values
//!
//! The gate reads its lists from disk on the hot path. [`Cached`] bounds that
//! cost: a value is re-checked at most once per interval, re-parsed only when
//! the backing file's mtime has advanced, and kept as-is on any failure.

use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use tracing::{debug, warn};

/// A value loaded from a file, refreshed lazily with an expiry interval.
pub struct Cached<T> {
    value: T,
    path: PathBuf,
    interval: std::time::Duration,
    checked_at: Option<Instant>,
    mtime: Option<SystemTime>,
    loader: fn(&Path) -> Option<T>,
}

impl<T> Cached<T> {
    /// `loader` returns `None` when the file is missing, unreadable, or
    /// unparseable; the cached value is then left untouched.
    pub fn new(
        path: impl Into<PathBuf>,
        interval: std::time::Duration,
        initial: T,
        loader: fn(&Path) -> Option<T>,
    ) -> Self {
        Self {
            value: initial,
            path: path.into(),
            interval,
            checked_at: None,
            mtime: None,
            loader,
        }
    }

    /// Current value without any refresh.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Replace the in-memory value after a local mutation has already been
    /// persisted, and remember the store's new mtime so the next expiry
    /// check does not re-parse our own write.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.mtime = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok();
    }

    /// Value as of `now`, refreshing if the interval has elapsed since the
    /// last check and the backing file has actually changed.
    pub fn get_at(&mut self, now: Instant) -> &T {
        let due = match self.checked_at {
            None => true,
            Some(at) => now.duration_since(at) >= self.interval,
        };
        if due {
            self.checked_at = Some(now);
            self.refresh();
        }
        &self.value
    }

    fn refresh(&mut self) {
        let mtime = match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            // Missing store: keep whatever we have (possibly the default).
            Err(_) => return,
        };
        if self.mtime == Some(mtime) {
            debug!(path = %self.path.display(), "store unchanged, skipping reload");
            return;
        }
        match (self.loader)(&self.path) {
            Some(value) => {
                self.value = value;
                self.mtime = Some(mtime);
            }
            None => {
                warn!(path = %self.path.display(), "reload failed, keeping previous value");
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
