//! Spoofing detection
//!
//! Three checks over two identity caches:
//!
//! - **ARP spoofing**: an ARP reply rebinding a known source IP to a new MAC.
//! - **IP spoofing**: any IP-carrying packet whose source MAC contradicts
//!   the ARP cache. Reads the same cache the ARP check maintains, never
//!   writes it.
//! - **DNS spoofing**: a response for a known transaction id whose answer
//!   set is not contained in what was recorded for that id.

use nids_common::{AlertEvent, AttackType};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;

struct DnsRecord {
    query_name: String,
    answers: BTreeSet<IpAddr>,
}

#[derive(Default)]
pub struct SpoofMonitor {
    /// src_ip -> lowercased MAC, learned from ARP replies.
    arp_cache: HashMap<IpAddr, String>,
    /// tx_id -> answers recorded for that transaction.
    dns_records: HashMap<u16, DnsRecord>,
}

impl SpoofMonitor {
    /// Handle an ARP reply. A cached MAC that differs from the new one fires
    /// once; the cache is then rebound to the new MAC, so a stable attacker
    /// does not re-alert until the binding flips again.
    pub fn on_arp_reply(
        &mut self,
        src_ip: IpAddr,
        src_mac: &str,
        at: DateTime<Utc>,
    ) -> Option<AlertEvent> {
        let mac = src_mac.to_ascii_lowercase();
        let previous = self.arp_cache.insert(src_ip, mac.clone());
        match previous {
            Some(known) if known != mac => Some(AlertEvent {
                src_ip,
                attack_type: AttackType::ArpSpoofing,
                description: format!("{src_ip} changed MAC address ({known} -> {mac})"),
                timestamp: at,
            }),
            _ => None,
        }
    }

    /// Check an IP-carrying packet's MAC against the ARP cache. Fires on
    /// every mismatched packet; never mutates the cache.
    pub fn on_ip_packet(
        &self,
        src_ip: IpAddr,
        src_mac: &str,
        at: DateTime<Utc>,
    ) -> Option<AlertEvent> {
        let mac = src_mac.to_ascii_lowercase();
        match self.arp_cache.get(&src_ip) {
            Some(known) if *known != mac => Some(AlertEvent {
                src_ip,
                attack_type: AttackType::IpSpoofing,
                description: format!("{src_ip} claimed by unknown MAC {mac} (expected {known})"),
                timestamp: at,
            }),
            _ => None,
        }
    }

    /// Handle a DNS response. The first sighting of a transaction id records
    /// its answers; later answer sets must be subsets of the record, and any
    /// new address both alerts and is merged into the record.
    pub fn on_dns_response(
        &mut self,
        src_ip: IpAddr,
        tx_id: u16,
        query_name: &str,
        answers: &BTreeSet<IpAddr>,
        at: DateTime<Utc>,
    ) -> Option<AlertEvent> {
        match self.dns_records.get_mut(&tx_id) {
            None => {
                self.dns_records.insert(
                    tx_id,
                    DnsRecord {
                        query_name: query_name.to_string(),
                        answers: answers.clone(),
                    },
                );
                None
            }
            Some(record) => {
                if answers.is_subset(&record.answers) {
                    return None;
                }
                let alert = AlertEvent {
                    src_ip,
                    attack_type: AttackType::DnsSpoofing,
                    description: format!(
                        "conflicting answers for {} (tx {tx_id})",
                        record.query_name
                    ),
                    timestamp: at,
                };
                record.answers.extend(answers.iter().copied());
                Some(alert)
            }
        }
    }

    pub fn cached_mac(&self, src_ip: &IpAddr) -> Option<&str> {
        self.arp_cache.get(src_ip).map(String::as_str)
    }

    pub fn has_dns_record(&self, tx_id: u16) -> bool {
        self.dns_records.contains_key(&tx_id)
    }
}
