use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning user input into scannable address ranges.
///
/// All of these are setup errors: they surface before a single probe is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("invalid target: {0}")]
    Invalid(String),
    #[error("start address {start} is above end address {end}")]
    Reversed { start: Ipv4Addr, end: Ipv4Addr },
    #[error("invalid CIDR block '{0}': {1}")]
    InvalidCidr(String, String),
    #[error("invalid end of range '{0}': {1}")]
    InvalidRangeEnd(String, String),
}

/// Failures while loading or indexing the WAF/CDN provider range database.
#[derive(Debug, Error)]
pub enum WafError {
    #[error("failed to read WAF range database {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse WAF range database {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("provider '{provider}' carries an invalid IPv4 CIDR entry '{cidr}'")]
    InvalidCidr { provider: String, cidr: String },
}
