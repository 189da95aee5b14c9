//! Probe client construction.
//!
//! Redirects are disabled at the transport and intercepted by the engine
//! instead, and certificate validation is off: a candidate is probed exactly
//! because its identity is unknown or mismatched.

use anyhow::Context;
use reqwest::redirect::Policy;
use reqwest::Client;

use originr_common::config::ScanConfig;

pub fn build_client(cfg: &ScanConfig) -> anyhow::Result<Client> {
    let mut builder = Client::builder()
        .redirect(Policy::none())
        .danger_accept_invalid_certs(true)
        .timeout(cfg.timeout)
        .connect_timeout(cfg.connect_timeout)
        // Every candidate is a distinct host; idle keep-alive sockets only
        // pile up file descriptors on large ranges.
        .pool_max_idle_per_host(0)
        .tcp_nodelay(true);

    if let Some(proxy) = &cfg.proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .with_context(|| format!("invalid proxy URL '{proxy}'"))?;
        builder = builder.proxy(proxy);
    }

    builder.build().context("failed to build the probe client")
}
