//! Attack classification
//!
//! A closed enumeration instead of free-form strings: detector dispatch and
//! reporting get compile-time exhaustiveness, and every persisted record
//! carries the same human-readable tag.

use crate::error::NidsError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// How a SYN flood is aimed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloodScope {
    /// Concentrated on at most a handful of destination ports.
    Targeted,
    /// Spread wide, volume dominating port diversity.
    Global,
}

/// Authentication services watched by the brute-force detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Service {
    Ftp,
    Ssh,
    Telnet,
    Smb,
    Rdp,
    MySql,
}

impl Service {
    /// Fixed service-port table. Ports outside it are not brute-force
    /// candidates.
    pub const fn from_port(port: u16) -> Option<Service> {
        match port {
            21 => Some(Service::Ftp),
            22 => Some(Service::Ssh),
            23 => Some(Service::Telnet),
            445 => Some(Service::Smb),
            3389 => Some(Service::Rdp),
            3306 => Some(Service::MySql),
            _ => None,
        }
    }

    pub const fn port(&self) -> u16 {
        match self {
            Service::Ftp => 21,
            Service::Ssh => 22,
            Service::Telnet => 23,
            Service::Smb => 445,
            Service::Rdp => 3389,
            Service::MySql => 3306,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Service::Ftp => "FTP",
            Service::Ssh => "SSH",
            Service::Telnet => "Telnet",
            Service::Smb => "SMB",
            Service::Rdp => "RDP",
            Service::MySql => "MySQL",
        }
    }
}

/// Malformed TCP flag combinations, in detection priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlagProbe {
    /// No flags set at all.
    Null,
    /// FIN+PSH+URG lit up together.
    Xmas,
    /// SYN and FIN in the same segment.
    SynFin,
}

/// Every attack category the detector set can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttackType {
    SynFlood(FloodScope),
    PortScan,
    BruteForce(Service),
    ArpSpoofing,
    IpSpoofing,
    DnsSpoofing,
    AbnormalFlags(FlagProbe),
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackType::SynFlood(FloodScope::Targeted) => write!(f, "SYN Flood (Targeted)"),
            AttackType::SynFlood(FloodScope::Global) => write!(f, "SYN Flood (Global)"),
            AttackType::PortScan => write!(f, "Port Scan"),
            AttackType::BruteForce(service) => write!(f, "Brute Force ({})", service.name()),
            AttackType::ArpSpoofing => write!(f, "ARP Spoofing"),
            AttackType::IpSpoofing => write!(f, "IP Spoofing"),
            AttackType::DnsSpoofing => write!(f, "DNS Spoofing"),
            AttackType::AbnormalFlags(FlagProbe::Null) => write!(f, "Abnormal Flags (NULL)"),
            AttackType::AbnormalFlags(FlagProbe::Xmas) => write!(f, "Abnormal Flags (XMAS)"),
            AttackType::AbnormalFlags(FlagProbe::SynFin) => write!(f, "Abnormal Flags (SYN+FIN)"),
        }
    }
}

impl FromStr for AttackType {
    type Err = NidsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s {
            "SYN Flood (Targeted)" => AttackType::SynFlood(FloodScope::Targeted),
            "SYN Flood (Global)" => AttackType::SynFlood(FloodScope::Global),
            "Port Scan" => AttackType::PortScan,
            "Brute Force (FTP)" => AttackType::BruteForce(Service::Ftp),
            "Brute Force (SSH)" => AttackType::BruteForce(Service::Ssh),
            "Brute Force (Telnet)" => AttackType::BruteForce(Service::Telnet),
            "Brute Force (SMB)" => AttackType::BruteForce(Service::Smb),
            "Brute Force (RDP)" => AttackType::BruteForce(Service::Rdp),
            "Brute Force (MySQL)" => AttackType::BruteForce(Service::MySql),
            "ARP Spoofing" => AttackType::ArpSpoofing,
            "IP Spoofing" => AttackType::IpSpoofing,
            "DNS Spoofing" => AttackType::DnsSpoofing,
            "Abnormal Flags (NULL)" => AttackType::AbnormalFlags(FlagProbe::Null),
            "Abnormal Flags (XMAS)" => AttackType::AbnormalFlags(FlagProbe::Xmas),
            "Abnormal Flags (SYN+FIN)" => AttackType::AbnormalFlags(FlagProbe::SynFin),
            other => return Err(NidsError::Parse(format!("unknown attack tag '{other}'"))),
        };
        Ok(ty)
    }
}

impl Serialize for AttackType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AttackType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trip() {
        let all = [
            AttackType::SynFlood(FloodScope::Targeted),
            AttackType::SynFlood(FloodScope::Global),
            AttackType::PortScan,
            AttackType::BruteForce(Service::Ssh),
            AttackType::BruteForce(Service::MySql),
            AttackType::ArpSpoofing,
            AttackType::IpSpoofing,
            AttackType::DnsSpoofing,
            AttackType::AbnormalFlags(FlagProbe::Xmas),
        ];
        for ty in all {
            let parsed: AttackType = ty.to_string().parse().unwrap();
            assert_eq!(parsed, ty);
        }
        assert!("Teardrop".parse::<AttackType>().is_err());
    }

    #[test]
    fn service_port_table() {
        assert_eq!(Service::from_port(22), Some(Service::Ssh));
        assert_eq!(Service::from_port(3306), Some(Service::MySql));
        assert_eq!(Service::from_port(80), None);
        assert_eq!(Service::Rdp.port(), 3389);
        assert_eq!(Service::Smb.name(), "SMB");
    }
}
