//! # Worker-Pool Scanner
//!
//! The fan-out/fan-in pipeline: one feeder task walks the address cursor into
//! a bounded job channel, a fixed pool of workers probes and classifies, and
//! a single aggregator drains the bounded results channel into buckets.
//!
//! Shutdown order is load-bearing: the feeder closes the job channel exactly
//! once on exhaustion, the workers are joined, and only then does the results
//! channel close, letting the aggregator finish. Cancellation is immediate
//! and best-effort: in-flight probes are abandoned, not waited out.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use originr_common::config::ScanConfig;
use originr_common::network::range::AddrCursor;
use originr_common::waf::filter::{self, RangeFilter};

use crate::http;
use crate::models::{IpResult, ProbeStatus, ResultBuckets, ScanReport, ScanSummary};
use crate::prober::{Probe, Prober};
use crate::stats::ScanStats;
use crate::validator;

/// Best-effort progress hook, `(processed, total)`, called on every status
/// transition. Must not block the calling worker.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Best-effort streaming hook, called the moment a shown result exists.
/// Must not block the calling worker.
pub type ResultFn = Arc<dyn Fn(&IpResult) + Send + Sync>;

pub struct Scanner {
    cfg: Arc<ScanConfig>,
    filter: Option<Arc<RangeFilter>>,
    probe: Arc<dyn Probe>,
    on_progress: Option<ProgressFn>,
    on_result: Option<ResultFn>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("cfg", &self.cfg)
            .field("filter", &self.filter)
            .field("has_on_progress", &self.on_progress.is_some())
            .field("has_on_result", &self.on_result.is_some())
            .finish()
    }
}

impl Scanner {
    pub fn new(cfg: ScanConfig) -> anyhow::Result<Self> {
        let client = http::build_client(&cfg)?;
        Self::with_client(cfg, client)
    }

    /// Builds the scanner around an injected HTTP client, e.g. one wrapping
    /// a proxy. The scanner never assumes a bare client.
    pub fn with_client(cfg: ScanConfig, client: reqwest::Client) -> anyhow::Result<Self> {
        validate(&cfg)?;
        let filter = filter::load(&cfg.waf)?.map(Arc::new);
        let cfg = Arc::new(cfg);
        let probe: Arc<dyn Probe> = Arc::new(Prober::new(cfg.clone(), client)?);

        Ok(Self {
            cfg,
            filter,
            probe,
            on_progress: None,
            on_result: None,
        })
    }

    /// Builds the scanner around any [`Probe`] implementation. This is the
    /// seam for alternative transports and for driving the pool in tests.
    pub fn with_probe(cfg: ScanConfig, probe: Arc<dyn Probe>) -> anyhow::Result<Self> {
        validate(&cfg)?;
        let filter = filter::load(&cfg.waf)?.map(Arc::new);

        Ok(Self {
            cfg: Arc::new(cfg),
            filter,
            probe,
            on_progress: None,
            on_result: None,
        })
    }

    pub fn on_progress(mut self, callback: ProgressFn) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn on_result(mut self, callback: ResultFn) -> Self {
        self.on_result = Some(callback);
        self
    }

    /// Runs the scan to completion (or cancellation) and reports.
    ///
    /// Setup problems surface here as errors before any probe is sent;
    /// everything after that point is data on the report.
    pub async fn scan(&self, cancel: CancellationToken) -> anyhow::Result<ScanReport> {
        let cursor = AddrCursor::new(self.cfg.ranges.clone());
        let total = cursor.total();
        anyhow::ensure!(total > 0, "no addresses to scan");

        let started = Instant::now();
        let buffer = self.cfg.workers * 2;

        let jobs = Arc::new(Mutex::new(cursor.spawn_feeder(buffer, cancel.clone())));
        let (result_tx, mut result_rx) = mpsc::channel::<IpResult>(buffer);

        let aggregator = tokio::spawn(async move {
            let mut buckets = ResultBuckets::default();
            while let Some(result) = result_rx.recv().await {
                buckets.push(result);
            }
            buckets
        });

        let stats = Arc::new(ScanStats::default());
        let mut workers = Vec::with_capacity(self.cfg.workers);
        for _ in 0..self.cfg.workers {
            let worker = Worker {
                jobs: jobs.clone(),
                results: result_tx.clone(),
                probe: self.probe.clone(),
                filter: self.filter.clone(),
                stats: stats.clone(),
                cfg: self.cfg.clone(),
                cancel: cancel.clone(),
                on_progress: self.on_progress.clone(),
                on_result: self.on_result.clone(),
                total,
            };
            workers.push(tokio::spawn(worker.run()));
        }
        drop(result_tx);

        for worker in workers {
            worker.await.context("probe worker panicked")?;
        }
        // Every worker has dropped its sender by now, so the results channel
        // is closed and the aggregator drains to completion.
        let mut buckets = aggregator.await.context("result aggregator panicked")?;

        debug!(
            "pool joined after {:.2}s, validating {} successes",
            started.elapsed().as_secs_f64(),
            buckets.success.len()
        );

        let false_positives = validator::validate(
            self.probe.as_ref(),
            &self.cfg.domain,
            &mut buckets.success,
            &cancel,
        )
        .await;

        let summary = ScanSummary {
            total_ips: total,
            scanned: stats.scanned(),
            skipped: stats.skipped(),
            success_count: buckets.success.len() as u64,
            false_positive_count: false_positives.len() as u64,
            waf_skips: self
                .filter
                .as_ref()
                .map(|filter| filter.skip_counts())
                .unwrap_or_default(),
            duration: started.elapsed(),
        };

        Ok(ScanReport {
            buckets,
            summary,
            false_positives,
        })
    }
}

fn validate(cfg: &ScanConfig) -> anyhow::Result<()> {
    anyhow::ensure!(!cfg.domain.trim().is_empty(), "a target domain is required");
    anyhow::ensure!(cfg.workers > 0, "worker count must be at least 1");
    Ok(())
}

/// One probe worker. N of these run in parallel, pulling from the shared job
/// receiver until it closes or the scan is cancelled.
struct Worker {
    jobs: Arc<Mutex<mpsc::Receiver<Ipv4Addr>>>,
    results: mpsc::Sender<IpResult>,
    probe: Arc<dyn Probe>,
    filter: Option<Arc<RangeFilter>>,
    stats: Arc<ScanStats>,
    cfg: Arc<ScanConfig>,
    cancel: CancellationToken,
    on_progress: Option<ProgressFn>,
    on_result: Option<ResultFn>,
    total: u64,
}

impl Worker {
    async fn run(self) {
        loop {
            let next = {
                let mut jobs = self.jobs.lock().await;
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    addr = jobs.recv() => addr,
                }
            };
            let Some(ip) = next else { break };

            if let Some(provider) = self.waf_match(ip) {
                self.stats.record_skipped();
                if self.cfg.waf.show_skipped {
                    self.emit(IpResult::skipped(ip, &provider)).await;
                }
                self.report_progress();
                continue;
            }

            // Cancellation abandons the in-flight probe without emitting a
            // partial result for it.
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.probe.probe(ip) => result,
            };

            self.stats.record_scanned();

            if result.status == ProbeStatus::Success || self.cfg.show_all {
                self.emit(result).await;
            }

            self.report_progress();
        }
    }

    fn waf_match(&self, ip: Ipv4Addr) -> Option<String> {
        self.filter
            .as_ref()
            .and_then(|filter| filter.should_skip(ip))
            .map(str::to_string)
    }

    async fn emit(&self, result: IpResult) {
        if let Some(callback) = &self.on_result {
            callback(&result);
        }
        let _ = self.results.send(result).await;
    }

    fn report_progress(&self) {
        if let Some(callback) = &self.on_progress {
            callback(self.stats.processed(), self.total);
        }
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
