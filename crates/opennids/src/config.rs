//! Daemon configuration

use nids_common::{DetectorConfig, GateConfig, NidsResult, ReportConfig, StoreLayout};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub detector: DetectorConfig,
    pub report: ReportConfig,
    pub gate: GateConfig,
    pub store: StoreLayout,
    /// Bounded queue between the capture source and the processing worker.
    pub event_queue_size: usize,
    /// Bounded queue between the processing worker and the I/O worker.
    pub report_queue_size: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            report: ReportConfig::default(),
            gate: GateConfig::default(),
            store: StoreLayout::default(),
            event_queue_size: 4096,
            report_queue_size: 1024,
        }
    }
}

impl DaemonConfig {
    pub fn load(path: &Path) -> NidsResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
