//! Abnormal TCP flag probing
//!
//! Stateless: each segment is judged on its own. Checks run in priority
//! order and the first match wins, so a segment carrying F+P+U and S is
//! still an XMAS probe, not a SYN+FIN.

use nids_common::{AlertEvent, AttackType, FlagProbe, TcpFlags};
use chrono::{DateTime, Utc};
use std::net::IpAddr;

const XMAS: TcpFlags = TcpFlags::FIN.union(TcpFlags::PSH).union(TcpFlags::URG);
const SYN_FIN: TcpFlags = TcpFlags::SYN.union(TcpFlags::FIN);

pub fn classify(flags: TcpFlags) -> Option<FlagProbe> {
    if flags.is_empty() {
        Some(FlagProbe::Null)
    } else if flags.contains(XMAS) {
        Some(FlagProbe::Xmas)
    } else if flags.contains(SYN_FIN) {
        Some(FlagProbe::SynFin)
    } else {
        None
    }
}

/// Judge one segment's flag set, returning a fully-formed alert on a match.
pub fn probe_flags(src_ip: IpAddr, flags: TcpFlags, at: DateTime<Utc>) -> Option<AlertEvent> {
    let probe = classify(flags)?;
    let description = match probe {
        FlagProbe::Null => "NULL scan (no TCP flags set)".to_string(),
        FlagProbe::Xmas => "XMAS scan (FIN+PSH+URG)".to_string(),
        FlagProbe::SynFin => "illegal SYN+FIN combination".to_string(),
    };
    Some(AlertEvent {
        src_ip,
        attack_type: AttackType::AbnormalFlags(probe),
        description,
        timestamp: at,
    })
}
