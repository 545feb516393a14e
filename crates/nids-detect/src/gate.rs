//! Allow/deny gate
//!
//! Sources on the whitelist are trusted; sources on the blocklist are
//! already being dealt with by the firewall. Either way the engine skips
//! them entirely, so trusted high-traffic peers never grow detector state.

use crate::reload::Cached;
use nids_common::persist::atomic_write_json;
use nids_common::{GateConfig, StoreLayout};
use serde_json::Value;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::Path;
use std::time::Instant;
use tracing::warn;

/// Addresses exempt even before any store exists.
fn default_safe() -> BTreeSet<IpAddr> {
    ["127.0.0.1", "::1"]
        .iter()
        .filter_map(|ip| ip.parse().ok())
        .collect()
}

fn parse_ips(values: &[Value]) -> BTreeSet<IpAddr> {
    values
        .iter()
        .filter_map(|v| v.as_str())
        .filter_map(|s| match s.parse() {
            Ok(ip) => Some(ip),
            Err(_) => {
                warn!(entry = s, "skipping non-IP list entry");
                None
            }
        })
        .collect()
}

/// Whitelist store: a bare JSON array of IP strings.
fn load_whitelist(path: &Path) -> Option<BTreeSet<IpAddr>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let entries: Vec<Value> = serde_json::from_str(&raw).ok()?;
    Some(parse_ips(&entries))
}

/// Blocklist store: the firewall rules object, `{"blocklist": [...]}`.
fn load_blocklist(path: &Path) -> Option<BTreeSet<IpAddr>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let root: Value = serde_json::from_str(&raw).ok()?;
    let entries = root.get("blocklist")?.as_array()?;
    Some(parse_ips(entries))
}

/// The gate itself: two independently reloaded lists.
pub struct AccessGate {
    whitelist: Cached<BTreeSet<IpAddr>>,
    blocklist: Cached<BTreeSet<IpAddr>>,
}

impl AccessGate {
    pub fn new(layout: &StoreLayout, config: &GateConfig) -> Self {
        let interval = config.reload_interval();
        Self {
            whitelist: Cached::new(layout.whitelist(), interval, default_safe(), load_whitelist),
            blocklist: Cached::new(
                layout.firewall_rules(),
                interval,
                BTreeSet::new(),
                load_blocklist,
            ),
        }
    }

    /// True when `ip` must be skipped by every detector.
    pub fn is_exempt_at(&mut self, ip: IpAddr, now: Instant) -> bool {
        self.whitelist.get_at(now).contains(&ip) || self.blocklist.get_at(now).contains(&ip)
    }

    pub fn is_exempt(&mut self, ip: IpAddr) -> bool {
        self.is_exempt_at(ip, Instant::now())
    }

    pub fn whitelist(&self) -> &BTreeSet<IpAddr> {
        self.whitelist.value()
    }

    pub fn blocklist(&self) -> &BTreeSet<IpAddr> {
        self.blocklist.value()
    }

    /// Add `ip` to the whitelist, persisting immediately. Returns false when
    /// the address was already present.
    pub fn add_to_whitelist(&mut self, ip: IpAddr) -> bool {
        let mut list = self.whitelist.value().clone();
        if !list.insert(ip) {
            return false;
        }
        self.persist_whitelist(list);
        true
    }

    /// Remove `ip` from the whitelist. Members of the default safe set are
    /// never removable.
    pub fn remove_from_whitelist(&mut self, ip: IpAddr) -> bool {
        if default_safe().contains(&ip) {
            warn!(%ip, "refusing to remove default-safe whitelist entry");
            return false;
        }
        let mut list = self.whitelist.value().clone();
        if !list.remove(&ip) {
            return false;
        }
        self.persist_whitelist(list);
        true
    }

    pub fn add_to_blocklist(&mut self, ip: IpAddr) -> bool {
        let mut list = self.blocklist.value().clone();
        if !list.insert(ip) {
            return false;
        }
        self.persist_blocklist(list);
        true
    }

    pub fn remove_from_blocklist(&mut self, ip: IpAddr) -> bool {
        let mut list = self.blocklist.value().clone();
        if !list.remove(&ip) {
            return false;
        }
        self.persist_blocklist(list);
        true
    }

    fn persist_whitelist(&mut self, list: BTreeSet<IpAddr>) {
        let entries: Vec<String> = list.iter().map(|ip| ip.to_string()).collect();
        if let Err(err) = atomic_write_json(self.whitelist.path(), &entries) {
            warn!(error = %err, "failed to persist whitelist");
        }
        self.whitelist.set(list);
    }

    fn persist_blocklist(&mut self, list: BTreeSet<IpAddr>) {
        let entries: Vec<String> = list.iter().map(|ip| ip.to_string()).collect();
        let root = serde_json::json!({ "blocklist": entries });
        if let Err(err) = atomic_write_json(self.blocklist.path(), &root) {
            warn!(error = %err, "failed to persist blocklist");
        }
        self.blocklist.set(list);
    }
}
