use std::path::PathBuf;

use originr_common::waf::filter::DEFAULT_RANGES_FILE;
use originr_common::waf::WafDatabase;
use originr_common::{info, success};

use crate::terminal::print;

/// Lists the providers the range database knows about, mostly so operators
/// can build a `--waf-providers` allow-list without opening the JSON.
pub fn run(waf_file: Option<PathBuf>) -> anyhow::Result<()> {
    let path = waf_file.unwrap_or_else(|| PathBuf::from(DEFAULT_RANGES_FILE));
    let db = WafDatabase::from_file(&path)?;

    for provider in &db.providers {
        print::aligned_line(
            &provider.id,
            format!("{} ({} ranges)", provider.name, provider.ranges.len()),
        );
    }

    if !db.last_updated.is_empty() {
        info!("Range data last updated {}", db.last_updated);
    }
    success!("{} providers loaded from {}", db.providers.len(), path.display());

    Ok(())
}
