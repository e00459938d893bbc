//! Registry of configuration units.
//!
//! The registry walks `domains/<domain>/<subdomain>.json`, validates each
//! unit through the schema, and keeps both outcomes: parsed units become
//! expanded records, broken units become [`UnitFailure`] entries. One broken
//! file never blocks the rest of the tree.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, warn};
use serde_json::Value;

use crate::config::GlobalConfig;
use crate::error::{CoreError, CoreResult};
use crate::schema::{
    expand_records, parse_domain_config, validate_subdomain_label, DomainConfig,
    ExpandedDnsRecord, FieldIssue,
};

/// One successfully validated unit with its expanded records.
#[derive(Debug, Clone)]
pub struct RegisteredUnit {
    pub domain: String,
    pub subdomain: String,
    /// Repository path of the unit file.
    pub config_file: String,
    pub config: DomainConfig,
    pub records: Vec<ExpandedDnsRecord>,
}

impl RegisteredUnit {
    /// The unit's own fully-qualified name, without trailing dot.
    #[must_use]
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.subdomain, self.domain)
    }
}

/// A unit that was rejected, with every issue found.
#[derive(Debug, Clone)]
pub struct UnitFailure {
    pub domain: String,
    pub subdomain: String,
    pub config_file: String,
    pub issues: Vec<FieldIssue>,
}

/// Counters for one registry load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub loaded_units: usize,
    pub failed_units: usize,
    pub total_records: usize,
    /// Distinct fully-qualified names across all expanded records.
    pub total_names: usize,
}

/// All units of all managed domains, keyed `(domain, subdomain)`.
#[derive(Debug, Default)]
pub struct DomainRegistry {
    units: BTreeMap<(String, String), RegisteredUnit>,
    failures: Vec<UnitFailure>,
}

fn unit_path(domain: &str, subdomain: &str) -> String {
    format!("domains/{domain}/{subdomain}.json")
}

impl DomainRegistry {
    /// Validate one raw unit and expand its records.
    ///
    /// # Errors
    ///
    /// Returns a [`UnitFailure`] carrying every issue when the subdomain
    /// name or the unit body is invalid.
    pub fn load_unit(
        domain: &str,
        subdomain: &str,
        raw: &Value,
        cfg: &GlobalConfig,
    ) -> Result<RegisteredUnit, Box<UnitFailure>> {
        let config_file = unit_path(domain, subdomain);
        let fail = |issues: Vec<FieldIssue>| {
            Box::new(UnitFailure {
                domain: domain.to_string(),
                subdomain: subdomain.to_string(),
                config_file: config_file.clone(),
                issues,
            })
        };

        // The file name is the subdomain; check it before the body so a
        // misnamed file fails with the real problem.
        if let Err(reason) = validate_subdomain_label(subdomain) {
            return Err(fail(vec![FieldIssue::new("", reason)]));
        }
        if cfg.is_reserved_subdomain(subdomain) {
            return Err(fail(vec![FieldIssue::new(
                "",
                format!("'{subdomain}' is a reserved subdomain"),
            )]));
        }

        match parse_domain_config(raw, cfg) {
            Ok(config) => {
                let records = expand_records(&config, subdomain, domain, &config_file);
                Ok(RegisteredUnit {
                    domain: domain.to_string(),
                    subdomain: subdomain.to_string(),
                    config_file,
                    config,
                    records,
                })
            }
            Err(issues) => Err(fail(issues)),
        }
    }

    /// Load every enabled domain's units from `root` (the directory holding
    /// `<domain>/<subdomain>.json` trees).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] when a domain directory exists but cannot
    /// be listed. A missing directory or a broken unit file is recorded and
    /// skipped instead.
    pub fn load_dir(root: &Path, cfg: &GlobalConfig) -> CoreResult<Self> {
        let mut registry = Self::default();

        for domain in cfg.domains.iter().filter(|d| d.enabled) {
            let dir = root.join(&domain.name);
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("domain directory {} does not exist, skipping", dir.display());
                    continue;
                }
                Err(source) => {
                    return Err(CoreError::Io {
                        path: dir.display().to_string(),
                        source,
                    })
                }
            };

            for entry in entries {
                let path = entry
                    .map_err(|source| CoreError::Io {
                        path: dir.display().to_string(),
                        source,
                    })?
                    .path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(subdomain) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                registry.load_file(&domain.name, subdomain, &path, cfg);
            }
        }

        let stats = registry.stats();
        debug!(
            "registry loaded: {} units, {} failures, {} records",
            stats.loaded_units, stats.failed_units, stats.total_records
        );
        Ok(registry)
    }

    fn load_file(&mut self, domain: &str, subdomain: &str, path: &Path, cfg: &GlobalConfig) {
        let make_failure = |issues: Vec<FieldIssue>| UnitFailure {
            domain: domain.to_string(),
            subdomain: subdomain.to_string(),
            config_file: unit_path(domain, subdomain),
            issues,
        };

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("cannot read {}: {e}", path.display());
                self.failures
                    .push(make_failure(vec![FieldIssue::new(
                        "",
                        format!("cannot read file: {e}"),
                    )]));
                return;
            }
        };
        let raw: Value = match serde_json::from_str(&text) {
            Ok(raw) => raw,
            Err(e) => {
                self.failures
                    .push(make_failure(vec![FieldIssue::new(
                        "",
                        format!("invalid JSON: {e}"),
                    )]));
                return;
            }
        };

        match Self::load_unit(domain, subdomain, &raw, cfg) {
            Ok(unit) => {
                self.units
                    .insert((domain.to_string(), subdomain.to_string()), unit);
            }
            Err(failure) => {
                warn!(
                    "unit {} rejected with {} issue(s)",
                    failure.config_file,
                    failure.issues.len()
                );
                self.failures.push(*failure);
            }
        }
    }

    /// Insert an already-validated unit. Mostly for tests and tooling.
    pub fn insert(&mut self, unit: RegisteredUnit) {
        self.units
            .insert((unit.domain.clone(), unit.subdomain.clone()), unit);
    }

    pub fn record_failure(&mut self, failure: UnitFailure) {
        self.failures.push(failure);
    }

    /// All units, in deterministic `(domain, subdomain)` order.
    pub fn units(&self) -> impl Iterator<Item = &RegisteredUnit> {
        self.units.values()
    }

    /// Units of one domain, in subdomain order.
    pub fn units_for_domain<'a>(
        &'a self,
        domain: &'a str,
    ) -> impl Iterator<Item = &'a RegisteredUnit> {
        self.units
            .range((domain.to_string(), String::new())..)
            .take_while(move |((d, _), _)| d == domain)
            .map(|(_, unit)| unit)
    }

    #[must_use]
    pub fn get(&self, domain: &str, subdomain: &str) -> Option<&RegisteredUnit> {
        self.units
            .get(&(domain.to_string(), subdomain.to_string()))
    }

    #[must_use]
    pub fn failures(&self) -> &[UnitFailure] {
        &self.failures
    }

    /// Every expanded record grouped by fully-qualified name, deterministic.
    #[must_use]
    pub fn records_by_fqdn(&self) -> BTreeMap<&str, Vec<&ExpandedDnsRecord>> {
        let mut index: BTreeMap<&str, Vec<&ExpandedDnsRecord>> = BTreeMap::new();
        for unit in self.units.values() {
            for record in &unit.records {
                index.entry(&record.payload.name).or_default().push(record);
            }
        }
        index
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            loaded_units: self.units.len(),
            failed_units: self.failures.len(),
            total_records: self.units.values().map(|u| u.records.len()).sum(),
            total_names: self.records_by_fqdn().len(),
        }
    }
}
