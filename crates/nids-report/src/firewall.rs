//! Firewall collaborator
//!
//! Block/unblock by source address, applied through the system firewall.
//! Only UI/CLI layers call this; the detection core never blocks anything
//! on its own.

use std::net::IpAddr;
use std::process::Command;
use tracing::{info, warn};

/// Rule names carry this prefix so our rules can be listed and removed
/// without touching anything else in the ruleset.
const RULE_PREFIX: &str = "IDS_BLOCK_";

pub trait Firewall: Send {
    fn block(&self, ip: IpAddr) -> bool;
    fn unblock(&self, ip: IpAddr) -> bool;
    fn list_blocked(&self) -> Vec<IpAddr>;
}

/// iptables adapter. Rules are inserted into INPUT with a comment of the
/// form `IDS_BLOCK_<ip>`.
pub struct CommandFirewall;

impl CommandFirewall {
    fn run(args: &[&str]) -> Option<String> {
        match Command::new("iptables").args(args).output() {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                warn!(
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "iptables command failed"
                );
                None
            }
            Err(err) => {
                warn!(error = %err, "could not invoke iptables");
                None
            }
        }
    }

    fn comment(ip: IpAddr) -> String {
        format!("{RULE_PREFIX}{ip}")
    }
}

impl Firewall for CommandFirewall {
    fn block(&self, ip: IpAddr) -> bool {
        let source = ip.to_string();
        let comment = Self::comment(ip);
        let blocked = Self::run(&[
            "-I", "INPUT", "-s", &source, "-j", "DROP", "-m", "comment", "--comment", &comment,
        ])
        .is_some();
        if blocked {
            info!(%ip, "firewall block installed");
        }
        blocked
    }

    fn unblock(&self, ip: IpAddr) -> bool {
        let source = ip.to_string();
        let comment = Self::comment(ip);
        let removed = Self::run(&[
            "-D", "INPUT", "-s", &source, "-j", "DROP", "-m", "comment", "--comment", &comment,
        ])
        .is_some();
        if removed {
            info!(%ip, "firewall block removed");
        }
        removed
    }

    fn list_blocked(&self) -> Vec<IpAddr> {
        let Some(listing) = Self::run(&["-S", "INPUT"]) else {
            return Vec::new();
        };
        parse_rule_listing(&listing)
    }
}

fn parse_rule_listing(listing: &str) -> Vec<IpAddr> {
    let mut blocked = Vec::new();
    for line in listing.lines() {
        let Some(tagged) = line.split(RULE_PREFIX).nth(1) else {
            continue;
        };
        let candidate = tagged
            .split_whitespace()
            .next()
            .unwrap_or("")
            .trim_matches('"');
        if let Ok(ip) = candidate.parse() {
            if !blocked.contains(&ip) {
                blocked.push(ip);
            }
        }
    }
    blocked
}
