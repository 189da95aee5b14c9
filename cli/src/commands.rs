pub mod providers;
pub mod scan;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use originr_common::network::target::Target;

#[derive(Parser)]
#[command(name = "originr")]
#[command(about = "Find the origin server hiding behind a CDN or WAF.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress the banner and progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe candidate addresses for the target domain
    #[command(alias = "s")]
    Scan(ScanArgs),
    /// List the WAF/CDN providers known to the range database
    #[command(alias = "p")]
    Providers {
        /// Range database file (defaults to waf_ranges.json)
        #[arg(long)]
        waf_file: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct ScanArgs {
    /// Domain whose origin to hunt for
    #[arg(short, long)]
    pub domain: String,

    /// Candidate addresses: single IP, range, CIDR block, or a comma list.
    /// Repeatable.
    #[arg(short, long, required = true)]
    pub range: Vec<Target>,

    /// Concurrent probe workers
    #[arg(short, long, default_value_t = 50)]
    pub workers: usize,

    /// Per-request deadline in seconds
    #[arg(long, default_value_t = 5)]
    pub timeout: u64,

    /// TCP connect deadline in seconds
    #[arg(long, default_value_t = 3)]
    pub connect_timeout: u64,

    /// HTTP method used for probes
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    /// Maximum redirect hops to follow (0 disables following)
    #[arg(long, default_value_t = 5)]
    pub max_redirects: usize,

    /// Skip addresses inside known WAF/CDN provider ranges
    #[arg(long)]
    pub skip_waf: bool,

    /// Comma-separated provider ids to filter on (implies nothing else)
    #[arg(long, value_delimiter = ',')]
    pub waf_providers: Vec<String>,

    /// Explicit WAF range database file; failing to load it is fatal
    #[arg(long)]
    pub waf_file: Option<PathBuf>,

    /// Report skipped addresses instead of dropping them silently
    #[arg(long)]
    pub show_skipped: bool,

    /// Keep non-200 results in the report
    #[arg(long)]
    pub show_all: bool,

    /// Hash response bodies and extract HTML titles of hits
    #[arg(long)]
    pub verify_content: bool,

    /// Extra header for every probe, as 'Name: value'
    #[arg(long)]
    pub header: Option<String>,

    /// Fixed User-Agent for every probe
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Rotate through realistic browser User-Agents
    #[arg(long, conflicts_with = "user_agent")]
    pub random_agent: bool,

    /// Proxy URL for outgoing probes
    #[arg(long)]
    pub proxy: Option<String>,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
