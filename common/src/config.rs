use std::path::PathBuf;
use std::time::Duration;

use crate::network::range::Ipv4Range;

/// How the User-Agent header is chosen for outgoing probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAgent {
    /// One fixed value for every request.
    Fixed(String),
    /// A fresh pick from the built-in browser list per request.
    Random,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self::Fixed(format!("originr/{}", env!("CARGO_PKG_VERSION")))
    }
}

/// WAF/CDN range filtering knobs.
#[derive(Debug, Clone, Default)]
pub struct WafOptions {
    /// Skip addresses that fall inside known WAF/CDN provider ranges.
    pub skip: bool,
    /// Restrict filtering to these provider ids; `None` means every
    /// provider in the database.
    pub providers: Option<Vec<String>>,
    /// Explicit range database path. Failing to load it is fatal, unlike the
    /// implicit default file which may simply be absent.
    pub ranges_file: Option<PathBuf>,
    /// Emit a result record for every skipped address.
    pub show_skipped: bool,
}

/// Everything one scan invocation needs to know.
///
/// Built once by the caller (the cli, or a test harness) and shared read-only
/// across the worker pool.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Domain injected into the Host header of every probe.
    pub domain: String,
    /// HTTP method for probes, validated when the scanner is built.
    pub method: String,
    /// Overall per-request deadline.
    pub timeout: Duration,
    /// TCP connect deadline, separate from the overall one.
    pub connect_timeout: Duration,
    /// Number of concurrent probe workers.
    pub workers: usize,
    /// Inclusive address ranges to walk.
    pub ranges: Vec<Ipv4Range>,
    pub waf: WafOptions,
    /// Maximum redirect hops to follow per probe. 0 disables following.
    pub max_redirects: usize,
    /// Hash the response body and pull the HTML title of 200 responses.
    pub verify_content: bool,
    /// Extra header sent with every probe, as a raw `"Name: value"` line.
    pub custom_header: Option<String>,
    pub user_agent: UserAgent,
    /// Proxy URL handed to the HTTP client builder.
    pub proxy: Option<String>,
    /// Keep non-200 results instead of discarding them as they arrive.
    pub show_all: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            method: "GET".to_string(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
            workers: 50,
            ranges: Vec::new(),
            waf: WafOptions::default(),
            max_redirects: 5,
            verify_content: false,
            custom_header: None,
            user_agent: UserAgent::default(),
            proxy: None,
            show_all: false,
        }
    }
}
