//! # WAF/CDN Provider Database
//!
//! On-disk JSON model of the provider range database. Loaded once at scan
//! setup and read-only for the scan's lifetime; refreshing the file itself
//! happens out-of-band.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::WafError;

/// One CDN/WAF operator and the CIDR blocks it announces.
#[derive(Debug, Clone, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub ranges: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WafDatabase {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub sources: HashMap<String, String>,
    pub providers: Vec<Provider>,
}

impl WafDatabase {
    /// Reads and parses a provider database file.
    ///
    /// Any failure here is fatal to scan setup; deciding whether a missing
    /// file is acceptable is the caller's job (see [`filter::load`]).
    ///
    /// [`filter::load`]: crate::waf::filter::load
    pub fn from_file(path: &Path) -> Result<Self, WafError> {
        let raw = fs::read_to_string(path).map_err(|source| WafError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| WafError::Parse {
            path: path.to_path_buf(),
            source,
        })
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "last_updated": "2025-11-02",
        "sources": { "cloudflare": "https://www.cloudflare.com/ips-v4" },
        "providers": [
            {
                "id": "cloudflare",
                "name": "Cloudflare",
                "description": "Cloudflare CDN and WAF",
                "ranges": ["173.245.48.0/20", "103.21.244.0/22"]
            },
            {
                "id": "fastly",
                "name": "Fastly",
                "ranges": ["151.101.0.0/16"]
            }
        ]
    }"#;

    #[test]
    fn parses_the_documented_format() {
        let db: WafDatabase = serde_json::from_str(SAMPLE).unwrap();

        assert_eq!(db.last_updated, "2025-11-02");
        assert_eq!(db.providers.len(), 2);
        assert_eq!(db.providers[0].id, "cloudflare");
        assert_eq!(db.providers[0].ranges.len(), 2);
        // description is optional
        assert!(db.providers[1].description.is_empty());
    }

    #[test]
    fn from_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let db = WafDatabase::from_file(file.path()).unwrap();
        assert_eq!(db.providers[1].id, "fastly");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = WafDatabase::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, WafError::Read { .. }));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ this is not json").unwrap();

        let err = WafDatabase::from_file(file.path()).unwrap_err();
        assert!(matches!(err, WafError::Parse { .. }));
    }
}
