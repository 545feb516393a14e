//! Geolocation lookup
//!
//! Dashboard garnish, not detection input. Private and loopback sources
//! short-circuit to a local placeholder, answers are cached on disk, and a
//! failed lookup degrades to "Unknown" rather than an error.

use nids_common::persist::{atomic_write_json, read_json_or_default};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeoInfo {
    pub country: String,
    pub city: String,
    #[serde(rename = "countryCode")]
    pub country_code: String,
    #[serde(default)]
    pub isp: String,
}

impl GeoInfo {
    fn local() -> Self {
        Self {
            country: "Local Network".to_string(),
            city: "Private IP".to_string(),
            country_code: "LOC".to_string(),
            isp: String::new(),
        }
    }

    fn unknown() -> Self {
        Self {
            country: "Unknown".to_string(),
            city: "Unknown".to_string(),
            country_code: "?".to_string(),
            isp: String::new(),
        }
    }
}

/// ip-api.com response envelope.
#[derive(Deserialize)]
struct ApiReply {
    #[serde(default)]
    status: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    city: String,
    #[serde(default, rename = "countryCode")]
    country_code: String,
    #[serde(default)]
    isp: String,
}

pub struct GeoService {
    cache: HashMap<IpAddr, GeoInfo>,
    cache_path: PathBuf,
    client: reqwest::blocking::Client,
}

impl GeoService {
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        let cache_path = cache_path.into();
        Self {
            cache: read_json_or_default(&cache_path),
            cache_path,
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
        }
    }

    fn is_local(ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
            IpAddr::V6(v6) => v6.is_loopback(),
        }
    }

    /// Location info for `ip`, from cache or a live lookup.
    pub fn locate(&mut self, ip: IpAddr) -> GeoInfo {
        if Self::is_local(ip) {
            return GeoInfo::local();
        }
        if let Some(cached) = self.cache.get(&ip) {
            return cached.clone();
        }

        match self.lookup(ip) {
            Some(info) => {
                self.cache.insert(ip, info.clone());
                if let Err(err) = atomic_write_json(&self.cache_path, &self.cache) {
                    warn!(error = %err, "failed to persist geo cache");
                }
                info
            }
            None => GeoInfo::unknown(),
        }
    }

    fn lookup(&self, ip: IpAddr) -> Option<GeoInfo> {
        let url = format!("http://ip-api.com/json/{ip}");
        let reply: ApiReply = self.client.get(&url).send().ok()?.json().ok()?;
        if reply.status != "success" {
            return None;
        }
        Some(GeoInfo {
            country: reply.country,
            city: reply.city,
            country_code: reply.country_code,
            isp: reply.isp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn private_ranges_stay_local() {
        let dir = tempdir().unwrap();
        let mut geo = GeoService::new(dir.path().join("geo_cache.json"));
        for ip in ["127.0.0.1", "192.168.1.5", "10.0.0.1", "172.16.9.9", "::1"] {
            let info = geo.locate(ip.parse().unwrap());
            assert_eq!(info.country_code, "LOC");
        }
    }

    #[test]
    fn cache_is_consulted_before_the_network() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geo_cache.json");
        let seeded: HashMap<IpAddr, GeoInfo> = [(
            "93.184.216.34".parse().unwrap(),
            GeoInfo {
                country: "Exampleland".to_string(),
                city: "Edgetown".to_string(),
                country_code: "EX".to_string(),
                isp: "Example ISP".to_string(),
            },
        )]
        .into_iter()
        .collect();
        atomic_write_json(&path, &seeded).unwrap();

        let mut geo = GeoService::new(&path);
        let info = geo.locate("93.184.216.34".parse().unwrap());
        assert_eq!(info.country, "Exampleland");
    }
}
