//! Normalized packet events
//!
//! The capture collaborator decodes raw traffic into [`PacketEvent`] values;
//! the detection core consumes nothing else. Events are immutable and carry
//! the declared capture timestamp, which drives every sliding window.

use crate::attack::AttackType;
use crate::error::NidsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// TCP flag set, stored as a bitmask.
///
/// The wire form is the capture tool's flag string ("S", "FPU", "" for a
/// NULL probe), which is also how replay files spell it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TcpFlags(u8);

impl TcpFlags {
    pub const FIN: TcpFlags = TcpFlags(0x01);
    pub const SYN: TcpFlags = TcpFlags(0x02);
    pub const RST: TcpFlags = TcpFlags(0x04);
    pub const PSH: TcpFlags = TcpFlags(0x08);
    pub const ACK: TcpFlags = TcpFlags(0x10);
    pub const URG: TcpFlags = TcpFlags(0x20);

    /// Empty flag set (a NULL probe).
    pub const fn empty() -> Self {
        TcpFlags(0)
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True when every flag in `other` is also set here.
    pub const fn contains(&self, other: TcpFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Exactly SYN, nothing else. This is what both the flood and the
    /// brute-force detectors treat as a connection attempt.
    pub const fn is_pure_syn(&self) -> bool {
        self.0 == Self::SYN.0
    }

    pub const fn union(self, other: TcpFlags) -> Self {
        TcpFlags(self.0 | other.0)
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bit, ch) in [
            (Self::FIN, 'F'),
            (Self::SYN, 'S'),
            (Self::RST, 'R'),
            (Self::PSH, 'P'),
            (Self::ACK, 'A'),
            (Self::URG, 'U'),
        ] {
            if self.contains(bit) {
                write!(f, "{ch}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for TcpFlags {
    type Err = NidsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = TcpFlags::empty();
        for ch in s.chars() {
            flags = flags.union(match ch.to_ascii_uppercase() {
                'F' => Self::FIN,
                'S' => Self::SYN,
                'R' => Self::RST,
                'P' => Self::PSH,
                'A' => Self::ACK,
                'U' => Self::URG,
                other => return Err(NidsError::Parse(format!("unknown TCP flag '{other}'"))),
            });
        }
        Ok(flags)
    }
}

impl Serialize for TcpFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TcpFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// ARP operation code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ArpOp {
    Request,
    Reply,
}

impl TryFrom<u8> for ArpOp {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(ArpOp::Request),
            2 => Ok(ArpOp::Reply),
            other => Err(format!("unknown ARP op {other}")),
        }
    }
}

impl From<ArpOp> for u8 {
    fn from(op: ArpOp) -> u8 {
        match op {
            ArpOp::Request => 1,
            ArpOp::Reply => 2,
        }
    }
}

/// Protocol-specific portion of a packet event.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum Payload {
    Tcp {
        dst_port: u16,
        flags: TcpFlags,
    },
    Arp {
        op: ArpOp,
    },
    Dns {
        tx_id: u16,
        query_name: String,
        answer_ips: BTreeSet<IpAddr>,
        is_response: bool,
    },
}

/// A normalized, decoded packet as handed to the detection engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PacketEvent {
    /// Declared capture timestamp; monotone non-decreasing per source.
    pub timestamp: DateTime<Utc>,
    pub src_ip: IpAddr,
    /// Ethernet source, lowercased; absent when the capture layer could not
    /// see the link layer.
    pub src_mac: Option<String>,
    #[serde(flatten)]
    pub payload: Payload,
}

impl PacketEvent {
    pub fn tcp(
        timestamp: DateTime<Utc>,
        src_ip: IpAddr,
        src_mac: Option<&str>,
        dst_port: u16,
        flags: TcpFlags,
    ) -> Self {
        Self {
            timestamp,
            src_ip,
            src_mac: src_mac.map(|m| m.to_ascii_lowercase()),
            payload: Payload::Tcp { dst_port, flags },
        }
    }

    pub fn arp(timestamp: DateTime<Utc>, src_ip: IpAddr, src_mac: Option<&str>, op: ArpOp) -> Self {
        Self {
            timestamp,
            src_ip,
            src_mac: src_mac.map(|m| m.to_ascii_lowercase()),
            payload: Payload::Arp { op },
        }
    }

    pub fn dns_response(
        timestamp: DateTime<Utc>,
        src_ip: IpAddr,
        tx_id: u16,
        query_name: &str,
        answer_ips: impl IntoIterator<Item = IpAddr>,
    ) -> Self {
        Self {
            timestamp,
            src_ip,
            src_mac: None,
            payload: Payload::Dns {
                tx_id,
                query_name: query_name.to_string(),
                answer_ips: answer_ips.into_iter().collect(),
                is_response: true,
            },
        }
    }
}

/// A single detection, produced by one detector for one packet.
///
/// Ephemeral: consumed by the log writer and the session aggregator, never
/// persisted in this shape.
#[derive(Clone, Debug)]
pub struct AlertEvent {
    pub src_ip: IpAddr,
    pub attack_type: AttackType,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}
