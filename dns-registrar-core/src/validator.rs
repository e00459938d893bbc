//! Domain-wide validation rules.
//!
//! Runs a fixed rule set over a loaded registry and produces a flat issue
//! list. Errors block deployment, warnings are advisory; that split is the
//! caller's to enforce, this engine only labels.

use serde::Serialize;

use dns_registrar_provider::RecordData;

use crate::config::GlobalConfig;
use crate::registry::{DomainRegistry, RegisteredUnit};
use crate::schema::RecordSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// What a finding is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum IssueScope {
    /// Spans units and domains (e.g. owner quotas).
    Global,
    /// One configuration unit as a whole.
    File { file: String },
    /// One specific record inside a unit.
    Record { file: String, fqdn: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    #[serde(flatten)]
    pub scope: IssueScope,
    pub severity: Severity,
    pub message: String,
}

impl ValidationIssue {
    fn file_error(file: &str, message: impl Into<String>) -> Self {
        Self {
            scope: IssueScope::File {
                file: file.to_string(),
            },
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn file_warning(file: &str, message: impl Into<String>) -> Self {
        Self {
            scope: IssueScope::File {
                file: file.to_string(),
            },
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    fn record_warning(file: &str, fqdn: &str, message: impl Into<String>) -> Self {
        Self {
            scope: IssueScope::Record {
                file: file.to_string(),
                fqdn: fqdn.to_string(),
            },
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub(crate) fn global_warning(message: impl Into<String>) -> Self {
        Self {
            scope: IssueScope::Global,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Outcome of one validation run.
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.issues.extend(issues);
    }
}

/// Run every rule over the registry. Rules are independent; ordering of the
/// resulting list follows registry iteration order and is deterministic.
#[must_use]
pub fn validate(registry: &DomainRegistry, cfg: &GlobalConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    for failure in registry.failures() {
        for issue in &failure.issues {
            report.push(ValidationIssue::file_error(
                &failure.config_file,
                issue.to_string(),
            ));
        }
    }

    for unit in registry.units() {
        check_unit(unit, cfg, &mut report);
    }

    report
}

fn check_unit(unit: &RegisteredUnit, cfg: &GlobalConfig, report: &mut ValidationReport) {
    let file = &unit.config_file;

    if !unit.config.has_routable_root() {
        report.push(ValidationIssue::file_warning(
            file,
            format!(
                "no A/AAAA/CNAME/NS record at '@'; {} may be unreachable",
                unit.fqdn()
            ),
        ));
    }

    if unit.config.record_count() > cfg.max_records_per_file {
        report.push(ValidationIssue::file_warning(
            file,
            format!(
                "{} records in one unit exceeds the maximum of {}",
                unit.config.record_count(),
                cfg.max_records_per_file
            ),
        ));
    }

    if unit.subdomain.len() < 3 {
        report.push(ValidationIssue::file_warning(
            file,
            format!(
                "subdomain '{}' is shorter than 3 characters; very short names need review",
                unit.subdomain
            ),
        ));
    }

    if unit.config.nocheck {
        report.push(ValidationIssue::file_warning(
            file,
            "health checks are disabled (nocheck); needs manual review",
        ));
    }

    for record in &unit.records {
        let fqdn = &record.payload.name;
        match record.provenance.source {
            RecordSource::RootLevel => {
                report.push(ValidationIssue::record_warning(
                    file,
                    fqdn,
                    "root-level record touches the domain apex zone; needs manual review",
                ));
            }
            RecordSource::Records => {
                let last_label = record
                    .provenance
                    .original_name
                    .rsplit('.')
                    .next()
                    .unwrap_or_default();
                if last_label == unit.subdomain {
                    report.push(ValidationIssue::record_warning(
                        file,
                        fqdn,
                        format!(
                            "name '{}' repeats the subdomain '{}'; did you mean '@'?",
                            record.provenance.original_name, unit.subdomain
                        ),
                    ));
                }

                if record.payload.proxied && record.provenance.original_name != "@" {
                    let trusted = matches!(
                        &record.payload.data,
                        RecordData::CNAME { target } if cfg
                            .proxied_cname_exceptions
                            .iter()
                            .any(|suffix| target.trim_end_matches('.').ends_with(suffix.as_str()))
                    );
                    if !trusted {
                        report.push(ValidationIssue::record_warning(
                            file,
                            fqdn,
                            "proxying below the unit root usually requires paid provider features",
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::registry::{DomainRegistry, UnitFailure};
    use crate::schema::FieldIssue;

    fn unit_raw(records: Value) -> Value {
        json!({
            "description": "test",
            "owner": {
                "github": "octocat",
                "name": "Octo Cat",
                "email": "octo@example.com"
            },
            "records": records
        })
    }

    fn registry_with(subdomain: &str, raw: &Value) -> DomainRegistry {
        let mut registry = DomainRegistry::default();
        registry.insert(
            DomainRegistry::load_unit("ciao.su", subdomain, raw, &GlobalConfig::default())
                .unwrap(),
        );
        registry
    }

    fn messages(report: &ValidationReport) -> Vec<&str> {
        report.issues.iter().map(|i| i.message.as_str()).collect()
    }

    #[test]
    fn load_failures_become_file_errors() {
        let mut registry = DomainRegistry::default();
        registry.record_failure(UnitFailure {
            domain: "ciao.su".to_string(),
            subdomain: "broken".to_string(),
            config_file: "domains/ciao.su/broken.json".to_string(),
            issues: vec![
                FieldIssue::new("records[0].content", "bad address"),
                FieldIssue::new("owner.email", "invalid email"),
            ],
        });
        let report = validate(&registry, &GlobalConfig::default());
        assert_eq!(report.errors().count(), 2);
        assert!(report.has_errors());
        assert!(matches!(
            &report.issues[0].scope,
            IssueScope::File { file } if file == "domains/ciao.su/broken.json"
        ));
    }

    #[test]
    fn unreachable_root_is_a_warning() {
        let raw = unit_raw(json!([
            {"type": "TXT", "name": "@", "content": "just text"}
        ]));
        let report = validate(&registry_with("myblog", &raw), &GlobalConfig::default());
        assert!(!report.has_errors());
        assert!(messages(&report).iter().any(|m| m.contains("unreachable")));
    }

    #[test]
    fn name_repeating_subdomain_is_flagged() {
        let raw = unit_raw(json!([
            {"type": "A", "name": "@", "content": "192.0.2.1"},
            {"type": "A", "name": "myblog", "content": "192.0.2.1"}
        ]));
        let report = validate(&registry_with("myblog", &raw), &GlobalConfig::default());
        let repeated: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.message.contains("did you mean '@'"))
            .collect();
        assert_eq!(repeated.len(), 1);
        assert!(matches!(
            &repeated[0].scope,
            IssueScope::Record { fqdn, .. } if fqdn == "myblog.myblog.ciao.su."
        ));
    }

    #[test]
    fn root_level_records_always_need_review() {
        let mut raw = unit_raw(json!([
            {"type": "A", "name": "@", "content": "192.0.2.1"}
        ]));
        raw["rootLevelRecords"] = json!([
            {"type": "TXT", "name": "_vercel", "content": "vc-domain-verify=abc"}
        ]);
        let report = validate(&registry_with("myblog", &raw), &GlobalConfig::default());
        assert!(messages(&report).iter().any(|m| m.contains("apex zone")));
    }

    #[test]
    fn record_count_and_short_name_and_nocheck() {
        let mut records = Vec::new();
        records.push(json!({"type": "A", "name": "@", "content": "192.0.2.1"}));
        for i in 0..10 {
            records.push(json!({"type": "A", "name": format!("n{i}"), "content": "192.0.2.1"}));
        }
        let mut raw = unit_raw(Value::Array(records));
        raw["nocheck"] = json!(true);

        let report = validate(&registry_with("ab", &raw), &GlobalConfig::default());
        let msgs = messages(&report);
        assert!(msgs.iter().any(|m| m.contains("exceeds the maximum")));
        assert!(msgs.iter().any(|m| m.contains("shorter than 3")));
        assert!(msgs.iter().any(|m| m.contains("nocheck")));
        assert!(!report.has_errors());
    }

    #[test]
    fn proxied_below_root_warns_unless_trusted_target() {
        let raw = unit_raw(json!([
            {"type": "A", "name": "@", "content": "192.0.2.1"},
            {"type": "CNAME", "name": "docs", "content": "project.pages.dev", "proxied": true},
            {"type": "A", "name": "api2", "content": "192.0.2.1", "proxied": true}
        ]));
        let report = validate(&registry_with("myblog", &raw), &GlobalConfig::default());
        let proxied: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.message.contains("proxying below"))
            .collect();
        assert_eq!(proxied.len(), 1);
        assert!(matches!(
            &proxied[0].scope,
            IssueScope::Record { fqdn, .. } if fqdn == "api2.myblog.ciao.su."
        ));
    }

    #[test]
    fn proxied_at_root_is_fine() {
        let raw = unit_raw(json!([
            {"type": "A", "name": "@", "content": "192.0.2.1", "proxied": true}
        ]));
        let report = validate(&registry_with("myblog", &raw), &GlobalConfig::default());
        assert!(!messages(&report).iter().any(|m| m.contains("proxying")));
    }
}
