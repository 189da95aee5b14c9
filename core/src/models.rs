//! Result records produced by the worker pool and the aggregate shapes the
//! caller receives once a scan finishes.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Terminal state of one probed address. Exactly one per probe, no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeStatus {
    /// Exactly 200.
    Success,
    /// 300-399.
    Redirect,
    /// 400-499.
    ClientError,
    /// 500-599.
    ServerError,
    /// Transport failure attributable to the configured deadline.
    Timeout,
    /// Any other transport failure.
    Failed,
    /// Address fell inside a WAF/CDN provider range and was never probed.
    Skipped,
}

impl ProbeStatus {
    /// Maps a terminal HTTP status code onto its bucket class.
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => Self::Success,
            300..=399 => Self::Redirect,
            400..=499 => Self::ClientError,
            _ => Self::ServerError,
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "200",
            Self::Redirect => "3xx",
            Self::ClientError => "4xx",
            Self::ServerError => "5xx",
            Self::Timeout => "timeout",
            Self::Failed => "error",
            Self::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// One terminal record per probed address. Immutable once emitted; owned by
/// the aggregator after it crosses the results channel.
#[derive(Debug, Clone)]
pub struct IpResult {
    pub ip: Ipv4Addr,
    pub status: ProbeStatus,
    pub http_code: Option<u16>,
    pub response_time: Duration,
    /// SHA-256 of the first 64 KiB of the body, when content verification ran.
    pub body_hash: Option<String>,
    /// HTML title of the terminal response, truncated.
    pub title: Option<String>,
    /// Every observed hop, `"<status> <from> -> <to>"`, plus any validator
    /// annotations appended after the scan.
    pub redirect_chain: Vec<String>,
    pub error: Option<String>,
    /// Which provider range caused a skip.
    pub waf_provider: Option<String>,
}

impl IpResult {
    pub fn skipped(ip: Ipv4Addr, provider: &str) -> Self {
        Self {
            ip,
            status: ProbeStatus::Skipped,
            http_code: None,
            response_time: Duration::ZERO,
            body_hash: None,
            title: None,
            redirect_chain: Vec::new(),
            error: None,
            waf_provider: Some(provider.to_string()),
        }
    }

    pub fn failed(ip: Ipv4Addr, status: ProbeStatus, elapsed: Duration, error: String) -> Self {
        Self {
            ip,
            status,
            http_code: None,
            response_time: elapsed,
            body_hash: None,
            title: None,
            redirect_chain: Vec::new(),
            error: Some(error),
            waf_provider: None,
        }
    }
}

/// The five outcome buckets the aggregator drains results into.
///
/// Membership is a pure function of [`ProbeStatus`]; re-bucketing the same
/// records always yields the same sizes.
#[derive(Debug, Default)]
pub struct ResultBuckets {
    pub success: Vec<IpResult>,
    pub redirects: Vec<IpResult>,
    pub other: Vec<IpResult>,
    pub timeouts: Vec<IpResult>,
    pub errors: Vec<IpResult>,
}

impl ResultBuckets {
    pub fn push(&mut self, result: IpResult) {
        match result.status {
            ProbeStatus::Success => self.success.push(result),
            ProbeStatus::Redirect => self.redirects.push(result),
            ProbeStatus::ClientError | ProbeStatus::ServerError | ProbeStatus::Skipped => {
                self.other.push(result)
            }
            ProbeStatus::Timeout => self.timeouts.push(result),
            ProbeStatus::Failed => self.errors.push(result),
        }
    }

    pub fn len(&self) -> usize {
        self.success.len()
            + self.redirects.len()
            + self.other.len()
            + self.timeouts.len()
            + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scan-level statistics, finalized by the aggregator once every worker has
/// joined.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    pub total_ips: u64,
    pub scanned: u64,
    pub skipped: u64,
    pub success_count: u64,
    pub false_positive_count: u64,
    /// Per-provider skip counts, in provider registration order.
    pub waf_skips: Vec<(String, u64)>,
    pub duration: Duration,
}

/// Everything a finished scan hands back to the caller.
#[derive(Debug)]
pub struct ScanReport {
    pub buckets: ResultBuckets,
    pub summary: ScanSummary,
    /// Addresses whose 200 only existed because of the forged Host header.
    pub false_positives: Vec<Ipv4Addr>,
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: ProbeStatus) -> IpResult {
        IpResult {
            ip: Ipv4Addr::new(10, 0, 0, 1),
            status,
            http_code: None,
            response_time: Duration::ZERO,
            body_hash: None,
            title: None,
            redirect_chain: Vec::new(),
            error: None,
            waf_provider: None,
        }
    }

    #[test]
    fn status_classification_boundaries() {
        assert_eq!(ProbeStatus::from_code(200), ProbeStatus::Success);
        assert_eq!(ProbeStatus::from_code(301), ProbeStatus::Redirect);
        assert_eq!(ProbeStatus::from_code(399), ProbeStatus::Redirect);
        assert_eq!(ProbeStatus::from_code(404), ProbeStatus::ClientError);
        assert_eq!(ProbeStatus::from_code(500), ProbeStatus::ServerError);
        assert_eq!(ProbeStatus::from_code(599), ProbeStatus::ServerError);
    }

    #[test]
    fn bucketing_is_idempotent() {
        let statuses = [
            ProbeStatus::Success,
            ProbeStatus::Success,
            ProbeStatus::Redirect,
            ProbeStatus::ClientError,
            ProbeStatus::ServerError,
            ProbeStatus::Timeout,
            ProbeStatus::Failed,
            ProbeStatus::Skipped,
        ];

        let mut first = ResultBuckets::default();
        let mut second = ResultBuckets::default();
        for status in statuses {
            first.push(result(status));
            second.push(result(status));
        }

        assert_eq!(first.success.len(), second.success.len());
        assert_eq!(first.redirects.len(), second.redirects.len());
        assert_eq!(first.other.len(), second.other.len());
        assert_eq!(first.timeouts.len(), second.timeouts.len());
        assert_eq!(first.errors.len(), second.errors.len());

        assert_eq!(first.success.len(), 2);
        assert_eq!(first.other.len(), 3);
        assert_eq!(first.len(), statuses.len());
    }
}
