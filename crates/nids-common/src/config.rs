//! Detection and reporting configuration
//!
//! Hand-tuned thresholds, all overridable. Defaults match the values the
//! heuristics were calibrated against.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Thresholds for the windowed detectors.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Sliding window for the flood and scan detectors, seconds.
    pub window_secs: u64,
    /// SYN packets within the window before a flood fires.
    pub flood_threshold: usize,
    /// Distinct low ports within the window before a scan fires.
    pub scan_threshold: usize,
    /// Connection attempts before brute force fires.
    pub bf_threshold: usize,
    /// Sliding window for the brute-force detector, seconds.
    pub bf_window_secs: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_secs: 10,    // flood/scan observation window
            flood_threshold: 30,
            scan_threshold: 15,
            bf_threshold: 5,
            bf_window_secs: 30,
        }
    }
}

impl DetectorConfig {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_secs as i64)
    }

    pub fn bf_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.bf_window_secs as i64)
    }
}

/// Throttling and session-lifecycle settings for the reporting side.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Repeat alerts for one (source, type) inside this window are
    /// aggregated instead of written, seconds.
    pub agg_window_secs: u64,
    /// Inactivity before an open session is considered finished, seconds.
    pub idle_timeout_secs: u64,
    /// Rotating stores keep at most this many entries.
    pub rotate_cap: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            agg_window_secs: 5,
            idle_timeout_secs: 60,
            rotate_cap: 500,
        }
    }
}

impl ReportConfig {
    pub fn agg_window(&self) -> Duration {
        Duration::from_secs(self.agg_window_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Allow/deny gate settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Backing lists are re-checked at most this often, seconds.
    pub reload_interval_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            reload_interval_secs: 5,
        }
    }
}

impl GateConfig {
    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs)
    }
}

/// Where the flat-file stores live. One directory holds everything the
/// dashboard and the gate read.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLayout {
    pub log_dir: PathBuf,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl StoreLayout {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    fn join(&self, name: &str) -> PathBuf {
        self.log_dir.join(name)
    }

    /// Rotating alert log.
    pub fn alerts(&self) -> PathBuf {
        self.join("alerts.json")
    }

    /// Rotating finished-attack log.
    pub fn attacks(&self) -> PathBuf {
        self.join("attacks.json")
    }

    /// Live snapshot of active sessions, overwritten in place.
    pub fn active_attacks(&self) -> PathBuf {
        self.join("active_attacks.json")
    }

    /// Whitelist backing store (JSON array of IPs).
    pub fn whitelist(&self) -> PathBuf {
        self.join("whitelist.json")
    }

    /// Firewall rules store; the gate reads its `blocklist` member.
    pub fn firewall_rules(&self) -> PathBuf {
        self.join("firewall_rules.json")
    }

    /// Notification dispatcher settings.
    pub fn notifications(&self) -> PathBuf {
        self.join("notifications.json")
    }

    /// Geolocation result cache.
    pub fn geo_cache(&self) -> PathBuf {
        self.join("geo_cache.json")
    }

    /// Create the directory if missing. Best effort; stores report their
    /// own write failures.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.log_dir)
    }

    pub fn dir(&self) -> &Path {
        &self.log_dir
    }
}
