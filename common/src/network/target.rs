//! # Scan Target Model
//!
//! Defines the possible inputs for an origin scan.
//!
//! This module handles parsing and representing targets, which can be:
//! * A single IPv4 address (host).
//! * An IPv4 range (e.g., `203.0.113.1-100`).
//! * A CIDR block (e.g., `203.0.113.0/24`), expanded to its usable hosts.
//! * A comma-separated mix of the above.

use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnetwork::Ipv4Network;

use crate::error::TargetError;
use crate::network::range::Ipv4Range;

/// Represents a distinct target to be probed.
#[derive(Clone, Debug)]
pub enum Target {
    /// A single candidate host.
    Host { addr: Ipv4Addr },
    /// A range of candidate addresses.
    Range { ipv4_range: Ipv4Range },
    /// Holds a list of different targets
    Multi { targets: Vec<Target> },
}

impl FromStr for Target {
    type Err = TargetError;

    /// Parses a string into a `Target`.
    ///
    /// Supported formats:
    /// * **Host**: single IPv4 address (e.g., "203.0.113.5").
    /// * **Range**: "Start-End" (e.g., "203.0.113.1-50", "203.0.113.1-203.0.113.50").
    /// * **CIDR**: "Network/Prefix" (e.g., "203.0.113.0/24").
    /// * **List**: comma-separated combination of the above.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.contains(',') {
            return parse_commas(s);
        }

        if let Some(target) = parse_host(s) {
            return Ok(target);
        }

        if let Some(target) = parse_ip_range(s)? {
            return Ok(target);
        }

        if let Some(target) = parse_cidr_range(s)? {
            return Ok(target);
        }

        Err(TargetError::Invalid(s.to_string()))
    }
}

/// Flattens a target into the ordered range list the scanner walks.
pub fn to_ranges(target: &Target) -> Vec<Ipv4Range> {
    let mut ranges = Vec::new();
    collect_ranges(target, &mut ranges);
    ranges
}

fn collect_ranges(target: &Target, ranges: &mut Vec<Ipv4Range>) {
    match target {
        Target::Host { addr } => ranges.push(Ipv4Range::single(*addr)),
        Target::Range { ipv4_range } => ranges.push(*ipv4_range),
        Target::Multi { targets } => {
            for target in targets {
                collect_ranges(target, ranges);
            }
        }
    }
}

/// Parses a comma-separated list of targets (e.g., "203.0.113.5, 10.0.0.1-50").
fn parse_commas(s: &str) -> Result<Target, TargetError> {
    let mut targets = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        targets.push(Target::from_str(part)?);
    }

    if targets.is_empty() {
        return Err(TargetError::Invalid(s.to_string()));
    }

    Ok(Target::Multi { targets })
}

/// Parses a single IPv4 address.
fn parse_host(s: &str) -> Option<Target> {
    s.parse::<Ipv4Addr>().ok().map(|addr| Target::Host { addr })
}

/// Parses a range string like "1.1.1.1-2.2.2.2" or "1.1.1.1-50".
fn parse_ip_range(s: &str) -> Result<Option<Target>, TargetError> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let start_addr = start_str
        .parse::<Ipv4Addr>()
        .map_err(|e| TargetError::InvalidRangeEnd(start_str.to_string(), e.to_string()))?;

    let end_addr = parse_range_end_addr(end_str, &start_addr)?;

    let ipv4_range = Ipv4Range::new(start_addr, end_addr)?;
    Ok(Some(Target::Range { ipv4_range }))
}

/// Helper to parse the end address of a range.
///
/// Handles abbreviated forms like "203.0.113.1-50" (implies 203.0.113.50)
/// and full forms like "203.0.113.1-203.0.113.255".
fn parse_range_end_addr(end_str: &str, start_addr: &Ipv4Addr) -> Result<Ipv4Addr, TargetError> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }

    let mut end_octets = start_addr.octets();
    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(|octet_str| octet_str.parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| TargetError::InvalidRangeEnd(end_str.to_string(), e.to_string()))?;

    if partial_octets.is_empty() {
        return Err(TargetError::InvalidRangeEnd(
            end_str.to_string(),
            "end of range cannot be empty".to_string(),
        ));
    }
    if partial_octets.len() > 4 {
        return Err(TargetError::InvalidRangeEnd(
            end_str.to_string(),
            "too many octets".to_string(),
        ));
    }

    let partial_len = partial_octets.len();
    let start_index = 4 - partial_len;
    end_octets[start_index..].copy_from_slice(&partial_octets);

    Ok(Ipv4Addr::from(end_octets))
}

/// Parses CIDR notation like "203.0.113.0/24".
///
/// Blocks below /31 are narrowed to their usable hosts: the network and
/// broadcast addresses cannot be origins worth probing.
fn parse_cidr_range(s: &str) -> Result<Option<Target>, TargetError> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let ipv4_addr = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|e| TargetError::InvalidCidr(s.to_string(), e.to_string()))?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|e| TargetError::InvalidCidr(s.to_string(), e.to_string()))?;

    let network = Ipv4Network::new(ipv4_addr, prefix)
        .map_err(|e| TargetError::InvalidCidr(s.to_string(), e.to_string()))?;

    let ipv4_range = if prefix >= 31 {
        Ipv4Range::new(network.network(), network.broadcast())?
    } else {
        let start = Ipv4Addr::from(u32::from(network.network()) + 1);
        let end = Ipv4Addr::from(u32::from(network.broadcast()) - 1);
        Ipv4Range::new(start, end)?
    };

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
