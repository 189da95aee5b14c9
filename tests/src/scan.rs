use std::io::Write;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use originr_common::config::{ScanConfig, WafOptions};
use originr_common::network::range::Ipv4Range;
use originr_common::network::target::{self, Target};
use originr_core::models::ProbeStatus;
use originr_core::Scanner;

use crate::mock::{MockProbe, Scripted};

fn config(domain: &str, ranges: Vec<Ipv4Range>) -> ScanConfig {
    ScanConfig {
        domain: domain.to_string(),
        workers: 4,
        ranges,
        ..ScanConfig::default()
    }
}

fn single(ip: &str) -> Vec<Ipv4Range> {
    vec![Ipv4Range::single(ip.parse().unwrap())]
}

/// A 200 from the only address in range is a full, successful scan.
#[tokio::test]
async fn single_success_scan() {
    let probe = Arc::new(MockProbe::new().ok("10.0.0.1"));
    let scanner = Scanner::with_probe(config("target.com", single("10.0.0.1")), probe).unwrap();

    let report = scanner.scan(CancellationToken::new()).await.unwrap();

    assert_eq!(report.summary.total_ips, 1);
    assert_eq!(report.summary.scanned, 1);
    assert_eq!(report.summary.skipped, 0);
    assert_eq!(report.summary.success_count, 1);
    assert_eq!(report.buckets.success.len(), 1);
    assert_eq!(report.buckets.success[0].ip, Ipv4Addr::new(10, 0, 0, 1));
    assert!(report.false_positives.is_empty());
}

/// A /30 block yields two usable hosts; the one inside a provider range is
/// skipped and never probed.
#[tokio::test]
async fn waf_match_skips_without_probing() {
    let mut waf_file = tempfile::NamedTempFile::new().unwrap();
    waf_file
        .write_all(
            br#"{
                "last_updated": "2025-11-02",
                "sources": {},
                "providers": [
                    { "id": "cloudflare", "name": "Cloudflare", "ranges": ["192.0.2.1/32"] }
                ]
            }"#,
        )
        .unwrap();

    let ranges = target::to_ranges(&Target::from_str("192.0.2.0/30").unwrap());
    let mut cfg = config("target.com", ranges);
    cfg.waf = WafOptions {
        skip: true,
        providers: None,
        ranges_file: Some(waf_file.path().to_path_buf()),
        show_skipped: false,
    };

    let probe = Arc::new(MockProbe::new());
    let scanner = Scanner::with_probe(cfg, probe.clone()).unwrap();
    let report = scanner.scan(CancellationToken::new()).await.unwrap();

    assert_eq!(report.summary.total_ips, 2);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.summary.scanned, 1);
    assert_eq!(probe.probes_sent(), 1, "the filtered address must not be probed");
    assert_eq!(
        report.summary.waf_skips,
        vec![("Cloudflare".to_string(), 1)]
    );
    // show_skipped is off, so no record was emitted for it either
    assert!(report.buckets.other.is_empty());
}

/// The forged-Host 200 whose natural redirect lands elsewhere gets flagged
/// and annotated.
#[tokio::test]
async fn host_header_false_positive_is_flagged() {
    let probe = Arc::new(MockProbe::new().respond(
        "192.0.2.7",
        Scripted {
            code: 200,
            chain: vec!["301 http://192.0.2.7/ -> https://target.com/".to_string()],
            natural: Some(vec![
                "301 http://192.0.2.7/ -> https://shared-host.example/".to_string()
            ]),
        },
    ));

    let scanner = Scanner::with_probe(config("target.com", single("192.0.2.7")), probe).unwrap();
    let report = scanner.scan(CancellationToken::new()).await.unwrap();

    assert_eq!(report.summary.success_count, 1);
    assert_eq!(report.summary.false_positive_count, 1);
    assert_eq!(report.false_positives, vec![Ipv4Addr::new(192, 0, 2, 7)]);

    let chain = &report.buckets.success[0].redirect_chain;
    let warning = chain.last().unwrap();
    assert!(
        warning.starts_with("⚠ Without Host header: https://shared-host.example/"),
        "unexpected warning line: {warning}"
    );
}

/// A natural chain that still reaches the target domain is consistent
/// behavior, not a false positive.
#[tokio::test]
async fn consistent_redirects_are_not_flagged() {
    let probe = Arc::new(MockProbe::new().respond(
        "192.0.2.8",
        Scripted {
            code: 200,
            chain: vec!["301 http://192.0.2.8/ -> https://target.com/".to_string()],
            natural: Some(vec![
                // Scheme differs, host is the same: the classic upgrade case.
                "301 http://192.0.2.8/ -> http://target.com/".to_string(),
            ]),
        },
    ));

    let scanner = Scanner::with_probe(config("target.com", single("192.0.2.8")), probe).unwrap();
    let report = scanner.scan(CancellationToken::new()).await.unwrap();

    assert_eq!(report.summary.false_positive_count, 0);
    assert!(report.false_positives.is_empty());
}

/// A direct 200 with no redirect chain has nothing Host-driven to diff: it
/// is never re-probed and never flagged.
#[tokio::test]
async fn direct_200_is_not_validated() {
    let probe = Arc::new(MockProbe::new().ok("10.0.0.9"));
    let scanner =
        Scanner::with_probe(config("target.com", single("10.0.0.9")), probe.clone()).unwrap();

    let report = scanner.scan(CancellationToken::new()).await.unwrap();

    assert_eq!(report.summary.success_count, 1);
    assert_eq!(probe.natural_probes_sent(), 0);
    assert!(report.false_positives.is_empty());
}

/// A failed re-probe skips validation for that address instead of failing
/// the scan.
#[tokio::test]
async fn failed_revalidation_is_invisible() {
    let probe = Arc::new(MockProbe::new().respond(
        "192.0.2.9",
        Scripted {
            code: 200,
            chain: vec!["301 http://192.0.2.9/ -> https://target.com/".to_string()],
            natural: None,
        },
    ));

    let scanner = Scanner::with_probe(config("target.com", single("192.0.2.9")), probe).unwrap();
    let report = scanner.scan(CancellationToken::new()).await.unwrap();

    assert_eq!(report.summary.success_count, 1);
    assert_eq!(report.summary.false_positive_count, 0);
}

/// Non-200 results are discarded by default and kept with `show_all`.
#[tokio::test]
async fn show_all_keeps_non_200_results() {
    let ranges = single("10.0.0.5");

    let scanner =
        Scanner::with_probe(config("target.com", ranges.clone()), Arc::new(MockProbe::new()))
            .unwrap();
    let report = scanner.scan(CancellationToken::new()).await.unwrap();
    assert!(report.buckets.is_empty(), "default scan should drop the 404");

    let mut cfg = config("target.com", ranges);
    cfg.show_all = true;
    let scanner = Scanner::with_probe(cfg, Arc::new(MockProbe::new())).unwrap();
    let report = scanner.scan(CancellationToken::new()).await.unwrap();

    assert_eq!(report.buckets.other.len(), 1);
    assert_eq!(report.buckets.other[0].status, ProbeStatus::ClientError);
}

/// Every worker publishes every success; nothing is lost in the fan-in.
#[tokio::test]
async fn all_successes_survive_the_pipeline() {
    let mut probe = MockProbe::new();
    for host in 1..=100u8 {
        probe = probe.ok(&format!("10.1.0.{host}"));
    }

    let ranges = vec![Ipv4Range::new(
        Ipv4Addr::new(10, 1, 0, 1),
        Ipv4Addr::new(10, 1, 0, 100),
    )
    .unwrap()];
    let mut cfg = config("target.com", ranges);
    cfg.workers = 8;

    let scanner = Scanner::with_probe(cfg, Arc::new(probe)).unwrap();
    let report = scanner.scan(CancellationToken::new()).await.unwrap();

    assert_eq!(report.summary.total_ips, 100);
    assert_eq!(report.summary.scanned, 100);
    assert_eq!(report.buckets.success.len(), 100);
}

/// Progress reaches the total and the streaming callback sees each hit.
#[tokio::test]
async fn callbacks_fire_along_the_way() {
    let probe = Arc::new(MockProbe::new().ok("10.0.0.1").ok("10.0.0.2"));
    let ranges = vec![Ipv4Range::new(
        Ipv4Addr::new(10, 0, 0, 1),
        Ipv4Addr::new(10, 0, 0, 2),
    )
    .unwrap()];

    let seen_progress = Arc::new(AtomicU64::new(0));
    let seen_hits = Arc::new(AtomicU64::new(0));

    let progress_ref = seen_progress.clone();
    let hits_ref = seen_hits.clone();

    let scanner = Scanner::with_probe(config("target.com", ranges), probe)
        .unwrap()
        .on_progress(Arc::new(move |processed: u64, total: u64| {
            assert!(processed <= total);
            progress_ref.fetch_max(processed, Ordering::Relaxed);
        }))
        .on_result(Arc::new(move |result: &originr_core::models::IpResult| {
            assert_eq!(result.status, ProbeStatus::Success);
            hits_ref.fetch_add(1, Ordering::Relaxed);
        }));

    let report = scanner.scan(CancellationToken::new()).await.unwrap();

    assert_eq!(report.summary.scanned, 2);
    assert_eq!(seen_progress.load(Ordering::Relaxed), 2);
    assert_eq!(seen_hits.load(Ordering::Relaxed), 2);
}

/// Cancelling mid-scan stops promptly: fewer addresses scanned than exist,
/// and the call still returns a report instead of hanging.
#[tokio::test]
async fn cancellation_stops_the_pool() {
    let probe = Arc::new(MockProbe::new().with_delay(Duration::from_millis(25)));
    let ranges = vec![Ipv4Range::new(
        Ipv4Addr::new(10, 2, 0, 1),
        Ipv4Addr::new(10, 2, 0, 250),
    )
    .unwrap()];

    let scanner = Scanner::with_probe(config("target.com", ranges), probe).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(80)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(5), scanner.scan(cancel))
        .await
        .expect("cancelled scan must not hang")
        .unwrap();

    assert!(report.summary.scanned < report.summary.total_ips);
}
