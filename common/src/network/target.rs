//! # Negotiation Target Model
//!
//! Defines the possible address inputs for a negotiation run.
//!
//! A target string can be:
//! * A single IP address or hostname.
//! * An IPv4 Range (e.g., `192.168.1.1-100`).
//! * A CIDR block (e.g., `192.168.1.0/24`).
//! * A comma-separated mix of the above.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use tracing::info;

use crate::network::address::Address;
use crate::network::range::{self, Ipv4Range};

/// Upper bound on how many addresses a single target expression may expand to.
pub const MAX_EXPANDED_ADDRESSES: usize = 65_536;

/// Represents a distinct set of addresses to negotiate with.
#[derive(Clone, Debug)]
pub enum Target {
    /// A single IP literal or hostname.
    Host { address: Address },
    /// A range of IPv4 addresses.
    Range { ipv4_range: Ipv4Range },
    /// Holds a list of different targets
    Multi { targets: Vec<Target> },
}

impl FromStr for Target {
    type Err = String;

    /// Parses a string into a `Target`.
    ///
    /// Supported formats:
    /// * **Host**: IPv4/IPv6 address or DNS name (e.g., "192.168.1.5", "esx01.lab").
    /// * **Range**: "Start-End" (e.g., "192.168.1.1-50", "192.168.1.1-192.168.1.50").
    /// * **CIDR**: "Network/Prefix" (e.g., "192.168.1.0/24").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.contains(',') {
            return parse_commas(s);
        }

        if let Some(target) = parse_ip(s) {
            return Ok(target);
        }

        if let Some(target) = parse_ip_range(s)? {
            return Ok(target);
        }

        if let Some(target) = parse_cidr_range(s)? {
            return Ok(target);
        }

        if let Some(target) = parse_hostname(s) {
            return Ok(target);
        }

        Err(format!("invalid target: {s}"))
    }
}

fn resolve_target(target: Target, seen: &mut HashSet<Address>, out: &mut Vec<Address>) -> anyhow::Result<()> {
    match target {
        Target::Host { address } => push_unique(address, seen, out),
        Target::Range { ipv4_range } => {
            anyhow::ensure!(
                out.len() + ipv4_range.len() <= MAX_EXPANDED_ADDRESSES,
                "range {}-{} expands past {MAX_EXPANDED_ADDRESSES} addresses",
                ipv4_range.start_addr,
                ipv4_range.end_addr
            );
            for ip in ipv4_range.to_iter() {
                push_unique(Address::from(ip), seen, out);
            }
        }
        Target::Multi { targets } => {
            for target in targets {
                resolve_target(target, seen, out)?;
            }
        }
    }
    Ok(())
}

fn push_unique(address: Address, seen: &mut HashSet<Address>, out: &mut Vec<Address>) {
    if seen.insert(address.clone()) {
        out.push(address);
    }
}

/// Expands a target into an ordered address list. The first occurrence of an address wins.
pub fn to_addresses(target: Target) -> anyhow::Result<Vec<Address>> {
    let mut seen = HashSet::new();
    let mut addresses = Vec::new();

    resolve_target(target, &mut seen, &mut addresses)?;

    let len: usize = addresses.len();
    let unit: &str = if len == 1 { "address has been" } else { "addresses have been" };
    info!("{len} {unit} parsed successfully");

    Ok(addresses)
}

/// Parses a comma-separated list of targets (e.g., "192.168.1.5, 10.0.0.1-50, esx01.lab").
pub fn parse_commas(s: &str) -> Result<Target, String> {
    let mut targets = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let target = Target::from_str(part)
            .map_err(|e| format!("Failed to parse target '{part}': {e}"))?;

        targets.push(target);
    }

    Ok(Target::Multi { targets })
}

/// Parses a single IP address.
fn parse_ip(s: &str) -> Option<Target> {
    s.parse::<IpAddr>().ok().map(|ip| Target::Host {
        address: Address::from(ip),
    })
}

/// Accepts RFC 1123 style names; anything made only of digits and dots is left to the IP parsers.
fn parse_hostname(s: &str) -> Option<Target> {
    let valid_label = |label: &str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };

    let all_numeric = s.chars().all(|c| c.is_ascii_digit() || c == '.');
    if s.is_empty() || s.len() > 253 || all_numeric || !s.split('.').all(valid_label) {
        return None;
    }

    Some(Target::Host {
        address: Address::new(s.to_ascii_lowercase()),
    })
}

/// Parses a range string like "1.1.1.1-2.2.2.2" or "1.1.1.1-50".
///
/// Returns `Ok(None)` when the left side is not an IPv4 literal, so hyphenated
/// hostnames like `10-host` can still be parsed. A left side shaped like a
/// dotted quad that fails to parse is an error.
fn parse_ip_range(s: &str) -> Result<Option<Target>, String> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let start_addr = match start_str.parse::<Ipv4Addr>() {
        Ok(addr) => addr,
        Err(e) if looks_like_dotted_quad(start_str) => {
            return Err(format!("Invalid start IP in range '{start_str}': {e}"));
        }
        Err(_) => return Ok(None),
    };

    let end_addr = parse_range_end_addr(end_str, &start_addr, s)?;

    let ipv4_range = Ipv4Range::new(start_addr, end_addr);
    Ok(Some(Target::Range { ipv4_range }))
}

fn looks_like_dotted_quad(s: &str) -> bool {
    s.split('.').count() == 4 && s.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Helper to parse the end address of a range.
///
/// Handles abbreviated forms like "192.168.1.1-50" (implies 192.168.1.50)
/// and full forms like "192.168.1.1-192.168.1.255".
fn parse_range_end_addr(
    end_str: &str,
    start_addr: &Ipv4Addr,
    original_s: &str,
) -> Result<Ipv4Addr, String> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }

    if end_str.is_empty() {
        return Err(format!("End range cannot be empty: {original_s}"));
    }

    let mut end_octets = start_addr.octets();
    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(|octet_str| octet_str.parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| format!("Invalid end range '{end_str}': {e}"))?;

    if partial_octets.len() > 4 {
        return Err(format!("End range has too many octets: {end_str}"));
    }

    let start_index = 4 - partial_octets.len();
    end_octets[start_index..].copy_from_slice(&partial_octets);

    Ok(Ipv4Addr::from(end_octets))
}

/// Parses CIDR notation like "192.168.1.0/24".
fn parse_cidr_range(s: &str) -> Result<Option<Target>, String> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let ipv4_addr = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("Invalid IP in CIDR '{ip_str}': {e}"))?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|e| format!("Invalid prefix in CIDR '{prefix_str}': {e}"))?;

    let ipv4_range = range::cidr_range(ipv4_addr, prefix).map_err(|e| e.to_string())?;

    Ok(Some(Target::Range { ipv4_range }))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
