//! # IP-Pinning Redirect Follower
//!
//! Follows HTTP redirects while continuing to test the *same* candidate
//! address. A redirect is never allowed to move the probe to whatever host it
//! nominally points at; instead the outgoing request is rewritten so its
//! connection target stays the pinned IP while the Host header becomes the
//! redirected domain. That is what lets a multi-hop chain
//! (HTTP -> HTTPS -> path) validate the candidate without ever leaving it.
//!
//! One follower is bound to one probe and records every hop it sees.

use std::net::Ipv4Addr;

use url::Url;

/// What the engine should do after one redirect hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopDecision {
    /// Re-issue against `url` (connection target pinned back to the candidate
    /// IP) with `host_header` as the Host header.
    Continue { url: Url, host_header: String },
    /// Stop following; the last response is the terminal one.
    Stop,
}

pub struct RedirectFollower {
    pinned_ip: Ipv4Addr,
    /// Target domain for the first-hop check; `None` disables the check
    /// (the natural, Host-less re-probe of the validation phase).
    domain: Option<String>,
    max_hops: usize,
    hops: Vec<String>,
}

impl RedirectFollower {
    /// Follower for a Host-header probe: the first hop must stay on the
    /// target domain.
    pub fn new(pinned_ip: Ipv4Addr, domain: &str, max_hops: usize) -> Self {
        Self {
            pinned_ip,
            domain: Some(domain.to_string()),
            max_hops,
            hops: Vec::new(),
        }
    }

    /// Follower for the natural re-probe: no domain to hold the first hop to,
    /// same pinning and hop budget.
    pub fn natural(pinned_ip: Ipv4Addr, max_hops: usize) -> Self {
        Self {
            pinned_ip,
            domain: None,
            max_hops,
            hops: Vec::new(),
        }
    }

    /// Handles one hop: records it, then decides whether the chain continues.
    pub fn on_redirect(&mut self, status: u16, prev: &Url, location: &str) -> HopDecision {
        let Some(next) = resolve_location(prev, location) else {
            // An unparseable Location ends the chain; the last response is
            // still usable.
            return HopDecision::Stop;
        };

        self.hops.push(format!("{status} {prev} -> {next}"));

        let first_hop = self.hops.len() == 1;
        if first_hop {
            if let Some(domain) = &self.domain {
                if leaves_target(&next, domain) {
                    // A first hop pointing elsewhere means this candidate is
                    // not serving the target at all.
                    return HopDecision::Stop;
                }
            }
        }

        if self.budget_exhausted() {
            self.hops.push(format!("stopped after {} redirects", self.max_hops));
            return HopDecision::Stop;
        }

        let Some(host_header) = next.host_str().map(str::to_string) else {
            return HopDecision::Stop;
        };

        let mut pinned = next;
        if pinned.set_host(Some(&self.pinned_ip.to_string())).is_err() {
            return HopDecision::Stop;
        }

        HopDecision::Continue {
            url: pinned,
            host_header,
        }
    }

    pub fn chain(&self) -> &[String] {
        &self.hops
    }

    pub fn into_chain(self) -> Vec<String> {
        self.hops
    }

    fn budget_exhausted(&self) -> bool {
        self.hops.len() >= self.max_hops
    }
}

/// Does this destination point away from the target domain?
pub(crate) fn leaves_target(dest: &Url, domain: &str) -> bool {
    !dest
        .host_str()
        .map(|host| host.contains(domain))
        .unwrap_or(false)
}

/// Resolves a Location header value against the URL it was served from,
/// handling both absolute and relative forms.
fn resolve_location(prev: &Url, location: &str) -> Option<Url> {
    match Url::parse(location) {
        Ok(absolute) => Some(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => prev.join(location).ok(),
        Err(_) => None,
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
