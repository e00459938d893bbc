//! Per-owner subdomain quota accounting.
//!
//! Ownership spans domains, so the checker accumulates one domain at a time
//! and only judges once every managed domain has been added.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::GlobalConfig;
use crate::registry::DomainRegistry;
use crate::validator::ValidationIssue;

/// Tracks which fully-qualified unit names each owner holds.
#[derive(Debug, Default)]
pub struct GlobalQuotaChecker {
    names_by_owner: BTreeMap<String, BTreeSet<String>>,
}

/// Counters over the accumulated state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaStats {
    pub owners: usize,
    pub names: usize,
}

impl GlobalQuotaChecker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every unit of `domain` against its owner.
    pub fn add_domain(&mut self, registry: &DomainRegistry, domain: &str) {
        for unit in registry.units_for_domain(domain) {
            self.names_by_owner
                .entry(unit.config.owner.github.clone())
                .or_default()
                .insert(unit.fqdn());
        }
    }

    /// One warning per owner over the limit, names sorted for stable output.
    #[must_use]
    pub fn check(&self, cfg: &GlobalConfig) -> Vec<ValidationIssue> {
        self.names_by_owner
            .iter()
            .filter(|(_, names)| names.len() > cfg.max_subdomains_per_owner)
            .map(|(owner, names)| {
                let listed: Vec<&str> = names.iter().map(String::as_str).collect();
                ValidationIssue::global_warning(format!(
                    "@{owner} holds {} subdomains (limit {}): {}",
                    names.len(),
                    cfg.max_subdomains_per_owner,
                    listed.join(", ")
                ))
            })
            .collect()
    }

    #[must_use]
    pub fn stats(&self) -> QuotaStats {
        QuotaStats {
            owners: self.names_by_owner.len(),
            names: self.names_by_owner.values().map(BTreeSet::len).sum(),
        }
    }
}
