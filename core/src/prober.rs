//! # Single-Address Prober
//!
//! Issues the actual Host-header probe against one candidate IP, drives the
//! redirect follower, and classifies the terminal response.
//!
//! The [`Probe`] trait is the seam between the worker pool and the wire:
//! the pool only ever talks to the abstraction, so alternative transports
//! (or test doubles) slot in without touching scheduling logic.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{self, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response};
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use url::Url;

use originr_common::config::{ScanConfig, UserAgent};

use crate::models::{IpResult, ProbeStatus};
use crate::redirect::{HopDecision, RedirectFollower};

/// Body bytes sampled for hashing and title extraction.
const BODY_SAMPLE_LIMIT: usize = 64 * 1024;
/// Characters kept of an extracted HTML title.
const TITLE_LIMIT: usize = 100;

/// Realistic browser User-Agents for rotation.
const BROWSER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// One probe transaction against one candidate address.
#[async_trait]
pub trait Probe: Send + Sync {
    /// The Host-header probe: classify the candidate, record its chain.
    async fn probe(&self, ip: Ipv4Addr) -> IpResult;

    /// The natural re-probe: same wire behavior but no Host header and no
    /// first-hop domain abort. `None` when the transport fails.
    async fn natural_chain(&self, ip: Ipv4Addr) -> Option<Vec<String>>;
}

pub struct Prober {
    client: Client,
    cfg: Arc<ScanConfig>,
    method: Method,
    custom_header: Option<(HeaderName, HeaderValue)>,
}

impl Prober {
    pub fn new(cfg: Arc<ScanConfig>, client: Client) -> anyhow::Result<Self> {
        let method = Method::from_bytes(cfg.method.as_bytes())
            .with_context(|| format!("invalid HTTP method '{}'", cfg.method))?;

        let custom_header = cfg
            .custom_header
            .as_deref()
            .map(parse_header)
            .transpose()?;

        Ok(Self {
            client,
            cfg,
            method,
            custom_header,
        })
    }

    fn user_agent(&self) -> String {
        match &self.cfg.user_agent {
            UserAgent::Fixed(value) => value.clone(),
            UserAgent::Random => {
                let idx = rand::rng().random_range(0..BROWSER_AGENTS.len());
                BROWSER_AGENTS[idx].to_string()
            }
        }
    }

    async fn send(&self, url: Url, host: Option<&str>) -> reqwest::Result<Response> {
        let mut request = self.client.request(self.method.clone(), url);

        if let Some(host) = host {
            request = request.header(header::HOST, host);
        }
        request = request.header(header::USER_AGENT, self.user_agent());
        if let Some((name, value)) = &self.custom_header {
            request = request.header(name, value);
        }

        request.send().await
    }

    /// Issues the request and walks the redirect chain hop by hop, handing
    /// every 3xx to the follower and re-issuing whatever it rewrites.
    async fn drive(
        &self,
        ip: Ipv4Addr,
        mut follower: RedirectFollower,
        mut host_header: Option<String>,
    ) -> Result<(Response, Vec<String>), (reqwest::Error, Vec<String>)> {
        let mut current = probe_url(ip);

        loop {
            let response = match self.send(current.clone(), host_header.as_deref()).await {
                Ok(response) => response,
                Err(error) => return Err((error, follower.into_chain())),
            };

            let code = response.status().as_u16();
            if self.cfg.max_redirects == 0 || !(300..=399).contains(&code) {
                return Ok((response, follower.into_chain()));
            }

            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let Some(location) = location else {
                // 3xx without a usable Location is terminal as-is.
                return Ok((response, follower.into_chain()));
            };

            match follower.on_redirect(code, &current, &location) {
                HopDecision::Continue { url, host_header: next_host } => {
                    current = url;
                    host_header = Some(next_host);
                }
                HopDecision::Stop => return Ok((response, follower.into_chain())),
            }
        }
    }

    /// Pulls at most [`BODY_SAMPLE_LIMIT`] bytes, hashes them, and extracts
    /// the HTML title when the response says it is HTML.
    async fn inspect_body(&self, response: Response) -> (Option<String>, Option<String>) {
        let is_html = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("text/html"))
            .unwrap_or(false);

        let mut body: Vec<u8> = Vec::with_capacity(8 * 1024);
        let mut response = response;
        while let Ok(Some(chunk)) = response.chunk().await {
            let remaining = BODY_SAMPLE_LIMIT - body.len();
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let hash = format!("{:x}", Sha256::digest(&body));
        let title = if is_html {
            extract_title(&String::from_utf8_lossy(&body))
        } else {
            None
        };

        (Some(hash), title)
    }
}

#[async_trait]
impl Probe for Prober {
    async fn probe(&self, ip: Ipv4Addr) -> IpResult {
        let started = Instant::now();
        let follower = RedirectFollower::new(ip, &self.cfg.domain, self.cfg.max_redirects);

        match self.drive(ip, follower, Some(self.cfg.domain.clone())).await {
            Ok((response, redirect_chain)) => {
                let code = response.status().as_u16();
                let status = ProbeStatus::from_code(code);

                let (body_hash, title) = if self.cfg.verify_content && status == ProbeStatus::Success
                {
                    self.inspect_body(response).await
                } else {
                    (None, None)
                };

                IpResult {
                    ip,
                    status,
                    http_code: Some(code),
                    response_time: started.elapsed(),
                    body_hash,
                    title,
                    redirect_chain,
                    error: None,
                    waf_provider: None,
                }
            }
            Err((error, redirect_chain)) => {
                let status = if error.is_timeout() {
                    ProbeStatus::Timeout
                } else {
                    ProbeStatus::Failed
                };

                let mut result = IpResult::failed(ip, status, started.elapsed(), error.to_string());
                result.redirect_chain = redirect_chain;
                result
            }
        }
    }

    async fn natural_chain(&self, ip: Ipv4Addr) -> Option<Vec<String>> {
        let follower = RedirectFollower::natural(ip, self.cfg.max_redirects);

        match self.drive(ip, follower, None).await {
            Ok((_response, chain)) => Some(chain),
            Err(_) => None,
        }
    }
}

fn probe_url(ip: Ipv4Addr) -> Url {
    Url::parse(&format!("http://{ip}/")).expect("IPv4 probe URL is always valid")
}

fn parse_header(raw: &str) -> anyhow::Result<(HeaderName, HeaderValue)> {
    let (name, value) = raw
        .split_once(':')
        .context("custom header must look like 'Name: value'")?;

    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .with_context(|| format!("invalid header name in '{raw}'"))?;
    let value = HeaderValue::from_str(value.trim())
        .with_context(|| format!("invalid header value in '{raw}'"))?;

    Ok((name, value))
}

fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    let text: String = document.select(&selector).next()?.text().collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(trimmed.chars().take(TITLE_LIMIT).collect())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
