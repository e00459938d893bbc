//! Global registrar configuration
//!
//! Thresholds and reserved-name lists are data, not constants: every
//! component takes a `&GlobalConfig` so tests can vary them freely. The one
//! exception is the diff operation cap, which is a hard safety property and
//! lives as a `const` in the deployer.

use serde::Deserialize;

/// One registered top-level domain managed by the registrar.
#[derive(Debug, Clone, Deserialize)]
pub struct DomainInfo {
    /// Domain name, e.g. `"ciao.su"`.
    pub name: String,
    /// Disabled domains are kept in config but skipped by orchestration.
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
    /// Cloudflare zone identifier for this domain.
    pub cloudflare_zone_id: String,
}

/// Registrar-wide configuration, loaded once and passed by reference into
/// every component entry point.
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    /// Domains this registrar instance manages.
    pub domains: Vec<DomainInfo>,

    /// Per-unit record count beyond which a review warning is raised.
    pub max_records_per_file: usize,

    /// Per-owner distinct-subdomain count beyond which a review warning is
    /// raised (counted across all domains).
    pub max_subdomains_per_owner: usize,

    /// Minimum spacing between any two outbound probe requests, in
    /// milliseconds.
    pub probe_interval_ms: u64,

    /// Relative names that can never be registered or touched by
    /// reconciliation, at any depth.
    pub reserved_subdomains: Vec<String>,

    /// Root-level names reserved for apex TXT verification records; a
    /// root-level CNAME may not use them.
    pub root_txt_reserved_names: Vec<String>,

    /// CNAME target suffixes for which a proxied sub-subdomain is known to
    /// work without extra provider features.
    pub proxied_cname_exceptions: Vec<String>,
}

impl GlobalConfig {
    /// Whether `name` (a relative label) is on the reserved-subdomain list.
    #[must_use]
    pub fn is_reserved_subdomain(&self, name: &str) -> bool {
        self.reserved_subdomains.iter().any(|r| r == name)
    }

    /// Whether `name` is reserved for apex TXT records.
    #[must_use]
    pub fn is_root_txt_reserved(&self, name: &str) -> bool {
        self.root_txt_reserved_names.iter().any(|r| r == name)
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            max_records_per_file: 10,
            max_subdomains_per_owner: 3,
            probe_interval_ms: 200,
            root_txt_reserved_names: vec!["_vercel".to_string()],
            reserved_subdomains: [
                "www", "_dmarc", "edgeonereclaim", "mail", "email", "webmail", "ns", "dns", "api", "cdn", "ftp",
                "sftp", "admin", "panel", "dashboard", "control", "dev", "test", "staging", "demo",
                "blog", "forum", "wiki", "docs", "app", "mobile", "static", "assets",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            proxied_cname_exceptions: vec![".pages.dev".to_string()],
        }
    }
}
