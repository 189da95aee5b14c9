//! # WAF Range Filter
//!
//! The in-memory index the scanner consults for every candidate address:
//! "is this IP operated by a known CDN/WAF provider, and which one".
//!
//! Lookup is a linear first-match scan in provider registration order, which
//! is the tie-break when ranges overlap. The database stays around a hundred
//! entries, so no interval index is needed.

use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use ipnetwork::Ipv4Network;

use crate::config::WafOptions;
use crate::error::WafError;
use crate::waf::database::WafDatabase;
use crate::warn;

/// Default database location, relative to the working directory.
///
/// Unlike an explicitly named file, this one is allowed to be absent.
pub const DEFAULT_RANGES_FILE: &str = "waf_ranges.json";

#[derive(Debug)]
struct ProviderTag {
    id: String,
    name: String,
}

/// Read-only CIDR index over the selected providers, safe for concurrent
/// lookups. The per-provider skip counters are the only mutable state and
/// they are plain atomics.
#[derive(Debug)]
pub struct RangeFilter {
    entries: Vec<(Ipv4Network, usize)>,
    providers: Vec<ProviderTag>,
    counters: Vec<AtomicU64>,
}

impl RangeFilter {
    /// Builds the index from a database, optionally restricted to an
    /// allow-list of provider ids (case-insensitive).
    ///
    /// Every range entry of every selected provider must parse as an IPv4
    /// CIDR, otherwise construction fails.
    pub fn build(db: &WafDatabase, allow: Option<&[String]>) -> Result<Self, WafError> {
        let mut entries = Vec::new();
        let mut providers = Vec::new();

        for provider in &db.providers {
            if let Some(allowed) = allow {
                let wanted = allowed.iter().any(|id| id.eq_ignore_ascii_case(&provider.id));
                if !wanted {
                    continue;
                }
            }

            let provider_idx = providers.len();
            for cidr in &provider.ranges {
                let network: Ipv4Network =
                    cidr.parse().map_err(|_| WafError::InvalidCidr {
                        provider: provider.id.clone(),
                        cidr: cidr.clone(),
                    })?;
                entries.push((network, provider_idx));
            }

            providers.push(ProviderTag {
                id: provider.id.clone(),
                name: provider.name.clone(),
            });
        }

        let counters = providers.iter().map(|_| AtomicU64::new(0)).collect();

        Ok(Self {
            entries,
            providers,
            counters,
        })
    }

    /// Returns the id of the first provider whose ranges contain `ip`, and
    /// bumps that provider's skip counter.
    pub fn should_skip(&self, ip: Ipv4Addr) -> Option<&str> {
        for (network, provider_idx) in &self.entries {
            if network.contains(ip) {
                self.counters[*provider_idx].fetch_add(1, Ordering::Relaxed);
                return Some(&self.providers[*provider_idx].id);
            }
        }
        None
    }

    /// Per-provider `(name, skipped)` counts accumulated so far, in
    /// registration order, zero counts included.
    pub fn skip_counts(&self) -> Vec<(String, u64)> {
        self.providers
            .iter()
            .zip(&self.counters)
            .map(|(tag, count)| (tag.name.clone(), count.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn range_count(&self) -> usize {
        self.entries.len()
    }
}

/// Resolves the configured WAF options into an optional filter.
///
/// The asymmetry here is intentional: an explicitly named file that cannot be
/// loaded is a fatal setup error, while the implicit default file being
/// absent merely disables filtering. A default file that exists but fails to
/// parse is still fatal.
pub fn load(opts: &WafOptions) -> Result<Option<RangeFilter>, WafError> {
    if !opts.skip {
        return Ok(None);
    }

    let allow = opts.providers.as_deref();

    if let Some(path) = &opts.ranges_file {
        let db = WafDatabase::from_file(path)?;
        return Ok(Some(RangeFilter::build(&db, allow)?));
    }

    let default = Path::new(DEFAULT_RANGES_FILE);
    if !default.exists() {
        warn!(
            "WAF range database '{}' not found, scanning without provider filtering",
            DEFAULT_RANGES_FILE
        );
        return Ok(None);
    }

    let db = WafDatabase::from_file(default)?;
    Ok(Some(RangeFilter::build(&db, allow)?))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
