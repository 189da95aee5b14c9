//! A scripted [`Probe`] so the pool, aggregator and validator can be driven
//! without sockets. Unscripted addresses answer a plain 404.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use originr_core::models::{IpResult, ProbeStatus};
use originr_core::prober::Probe;

pub struct Scripted {
    pub code: u16,
    pub chain: Vec<String>,
    /// Chain the address produces when re-probed without a Host header;
    /// `None` simulates a failed re-probe.
    pub natural: Option<Vec<String>>,
}

#[derive(Default)]
pub struct MockProbe {
    responses: HashMap<Ipv4Addr, Scripted>,
    delay: Option<Duration>,
    probes: AtomicU64,
    natural_probes: AtomicU64,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a clean 200 with no redirect chain.
    pub fn ok(self, ip: &str) -> Self {
        self.respond(
            ip,
            Scripted {
                code: 200,
                chain: Vec::new(),
                natural: None,
            },
        )
    }

    pub fn respond(mut self, ip: &str, scripted: Scripted) -> Self {
        self.responses.insert(ip.parse().unwrap(), scripted);
        self
    }

    /// Makes every probe take this long, for cancellation scenarios.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn probes_sent(&self) -> u64 {
        self.probes.load(Ordering::Relaxed)
    }

    pub fn natural_probes_sent(&self) -> u64 {
        self.natural_probes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Probe for MockProbe {
    async fn probe(&self, ip: Ipv4Addr) -> IpResult {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.probes.fetch_add(1, Ordering::Relaxed);

        let (code, chain) = match self.responses.get(&ip) {
            Some(scripted) => (scripted.code, scripted.chain.clone()),
            None => (404, Vec::new()),
        };

        IpResult {
            ip,
            status: ProbeStatus::from_code(code),
            http_code: Some(code),
            response_time: Duration::from_millis(1),
            body_hash: None,
            title: None,
            redirect_chain: chain,
            error: None,
            waf_provider: None,
        }
    }

    async fn natural_chain(&self, ip: Ipv4Addr) -> Option<Vec<String>> {
        self.natural_probes.fetch_add(1, Ordering::Relaxed);
        self.responses
            .get(&ip)
            .and_then(|scripted| scripted.natural.clone())
    }
}
