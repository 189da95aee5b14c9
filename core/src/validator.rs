//! # False-Positive Validator
//!
//! A shared-hosting box answers 200 for any Host header it recognizes, which
//! makes a forged-Host probe look like a found origin. This phase runs once
//! the pool has joined and re-probes every 200 that carried a redirect chain,
//! this time **without** a Host header, then diffs where the two chains end
//! up. An IP that only reaches the target domain because the scanner forged
//! the Host header gets downgraded, not silently kept.
//!
//! A 200 with no redirects has nothing Host-driven to diff and is left alone.

use std::net::Ipv4Addr;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::models::IpResult;
use crate::prober::Probe;

/// Re-probes the given success records and flags the ones whose natural
/// destination tells a different story. Flagged records get a warning
/// appended to their chain; the flagged addresses are returned.
///
/// A failed re-probe skips that address: validation is a best-effort
/// enhancement and its failures are invisible to the caller.
pub(crate) async fn validate(
    probe: &dyn Probe,
    domain: &str,
    successes: &mut [IpResult],
    cancel: &CancellationToken,
) -> Vec<Ipv4Addr> {
    let mut flagged = Vec::new();

    for result in successes.iter_mut() {
        if cancel.is_cancelled() {
            break;
        }
        if result.redirect_chain.is_empty() {
            continue;
        }

        let Some(original) = final_destination(&result.redirect_chain) else {
            continue;
        };
        let Some(natural_hops) = probe.natural_chain(result.ip).await else {
            continue;
        };
        let Some(natural) = final_destination(&natural_hops) else {
            continue;
        };

        if is_false_positive(&original, &natural, domain) {
            result.redirect_chain.push(format!(
                "⚠ Without Host header: {natural} (different from {original})"
            ));
            flagged.push(result.ip);
        }
    }

    flagged
}

/// The diff rule: both destinations known, their *hosts* differ, and the
/// natural one does not contain the target domain. A plain scheme upgrade
/// with an identical host is not suspicious.
pub(crate) fn is_false_positive(original: &str, natural: &str, domain: &str) -> bool {
    if original.is_empty() || natural.is_empty() {
        return false;
    }

    let (Some(original_host), Some(natural_host)) = (host_of(original), host_of(natural)) else {
        return false;
    };

    original_host != natural_host && !natural.contains(domain)
}

/// Last URL a chain arrived at. Hop entries look like
/// `"<status> <from> -> <to>"`; marker and warning lines carry no arrow and
/// are ignored.
pub(crate) fn final_destination(chain: &[String]) -> Option<String> {
    chain
        .iter()
        .rev()
        .find_map(|hop| hop.rsplit_once(" -> ").map(|(_, dest)| dest.to_string()))
}

fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw).ok()?.host_str().map(str::to_string)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
