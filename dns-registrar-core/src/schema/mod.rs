//! Record schema: parse one raw configuration unit into a typed
//! [`DomainConfig`], or fail with field-level issues.
//!
//! Nothing in this module panics or returns early on the first problem;
//! issues accumulate so a contributor sees every mistake in one pass, and
//! the registry stores the issue list as data.

mod content;
mod cross;
mod expand;

pub use expand::{display_remote, expand_records, ExpandedDnsRecord, Provenance, RecordSource};

use serde::Serialize;
use serde_json::Value;

use dns_registrar_provider::{
    canonical_fqdn, canonical_txt, RecordData, RecordSettings, TTL_AUTO,
};

use crate::config::GlobalConfig;
use content::{
    validate_hex, validate_hostname, validate_ipv4, validate_ipv6, validate_relative_name,
    validate_root_level_name, validate_txt, CAA_TAGS,
};

pub(crate) use content::validate_subdomain_label;

const MIN_TTL: u64 = 60;
const MAX_TTL: u64 = 86400;

/// One field-level problem found while parsing a configuration unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// JSON-ish path to the offending field, empty for unit-level problems.
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "({}) {}", self.path, self.message)
        }
    }
}

/// Identity of the person a configuration unit belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Owner {
    /// GitHub handle, `[a-zA-Z0-9-]+`.
    pub github: String,
    pub name: String,
    pub email: String,
}

/// A record's relative name within its unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordName {
    /// The `@` marker: the unit's (or domain's) own root.
    Apex,
    Label(String),
}

impl RecordName {
    #[must_use]
    pub fn is_apex(&self) -> bool {
        matches!(self, Self::Apex)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Apex => "@",
            Self::Label(label) => label,
        }
    }
}

impl std::fmt::Display for RecordName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated DNS record, still relative to its unit.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsRecordEntry {
    pub name: RecordName,
    /// Seconds, or the provider-automatic sentinel.
    pub ttl: u32,
    pub proxied: bool,
    pub settings: RecordSettings,
    pub data: RecordData,
}

/// One fully validated configuration unit.
#[derive(Debug, Clone)]
pub struct DomainConfig {
    pub description: String,
    pub owner: Owner,
    /// Opts the unit out of health probing.
    pub nocheck: bool,
    /// Records under the unit's own subdomain.
    pub records: Vec<DnsRecordEntry>,
    /// TXT/CNAME records applied at the domain apex.
    pub root_level_records: Vec<DnsRecordEntry>,
}

impl DomainConfig {
    /// Whether any `@` record could resolve the unit's root to a host.
    #[must_use]
    pub fn has_routable_root(&self) -> bool {
        self.records
            .iter()
            .any(|r| r.name.is_apex() && r.data.routable())
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len() + self.root_level_records.len()
    }
}

/// Parse and validate one raw configuration unit.
///
/// # Errors
///
/// Returns every field-level and cross-record issue found; the unit is
/// usable only when the list would be empty.
pub fn parse_domain_config(
    raw: &Value,
    cfg: &GlobalConfig,
) -> Result<DomainConfig, Vec<FieldIssue>> {
    let mut issues = Vec::new();

    let Some(obj) = raw.as_object() else {
        return Err(vec![FieldIssue::new(
            "",
            "configuration unit must be a JSON object",
        )]);
    };

    for key in obj.keys() {
        if !matches!(
            key.as_str(),
            "description" | "owner" | "nocheck" | "records" | "rootLevelRecords"
        ) {
            issues.push(FieldIssue::new(key.clone(), "unknown field"));
        }
    }

    let description = match obj.get("description") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::String(_)) => {
            issues.push(FieldIssue::new("description", "must not be empty"));
            String::new()
        }
        Some(_) => {
            issues.push(FieldIssue::new("description", "must be a string"));
            String::new()
        }
        None => {
            issues.push(FieldIssue::new("description", "missing required field"));
            String::new()
        }
    };

    let owner = parse_owner(obj.get("owner"), &mut issues);

    let nocheck = match obj.get("nocheck") {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            issues.push(FieldIssue::new("nocheck", "must be a boolean"));
            false
        }
    };

    let records = match obj.get("records") {
        Some(Value::Array(items)) => {
            if items.is_empty() {
                issues.push(FieldIssue::new("records", "at least one record is required"));
            }
            items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| parse_record(item, &format!("records[{i}]"), &mut issues))
                .collect()
        }
        Some(_) => {
            issues.push(FieldIssue::new("records", "must be an array"));
            Vec::new()
        }
        None => {
            issues.push(FieldIssue::new("records", "missing required field"));
            Vec::new()
        }
    };

    let root_level_records = match obj.get("rootLevelRecords") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                parse_root_level_record(item, &format!("rootLevelRecords[{i}]"), cfg, &mut issues)
            })
            .collect(),
        Some(_) => {
            issues.push(FieldIssue::new("rootLevelRecords", "must be an array"));
            Vec::new()
        }
    };

    // Cross-record rules assume every record parsed; partial data would
    // produce misleading secondary findings.
    if issues.is_empty() {
        issues.extend(cross::cross_record_issues(&records));
    }

    if issues.is_empty() {
        Ok(DomainConfig {
            description,
            owner: owner.unwrap_or(Owner {
                github: String::new(),
                name: String::new(),
                email: String::new(),
            }),
            nocheck,
            records,
            root_level_records,
        })
    } else {
        Err(issues)
    }
}

fn parse_owner(value: Option<&Value>, issues: &mut Vec<FieldIssue>) -> Option<Owner> {
    let Some(value) = value else {
        issues.push(FieldIssue::new("owner", "missing required field"));
        return None;
    };
    let Some(obj) = value.as_object() else {
        issues.push(FieldIssue::new("owner", "must be an object"));
        return None;
    };

    for key in obj.keys() {
        if !matches!(key.as_str(), "github" | "name" | "email") {
            issues.push(FieldIssue::new(format!("owner.{key}"), "unknown field"));
        }
    }

    let github = require_string(obj, "github", "owner.github", issues)?;
    if github.is_empty()
        || !github
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        issues.push(FieldIssue::new(
            "owner.github",
            "GitHub handle may only contain letters, digits and hyphens",
        ));
        return None;
    }

    let name = require_string(obj, "name", "owner.name", issues)?;
    if name.is_empty() {
        issues.push(FieldIssue::new("owner.name", "must not be empty"));
        return None;
    }

    let email = require_string(obj, "email", "owner.email", issues)?;
    let valid_email = matches!(
        email.split_once('@'),
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    );
    if !valid_email {
        issues.push(FieldIssue::new("owner.email", "invalid email address"));
        return None;
    }

    Some(Owner {
        github,
        name,
        email,
    })
}

fn require_string(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    path: &str,
    issues: &mut Vec<FieldIssue>,
) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            issues.push(FieldIssue::new(path, "must be a string"));
            None
        }
        None => {
            issues.push(FieldIssue::new(path, "missing required field"));
            None
        }
    }
}

fn require_integer(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    max: u64,
    path: &str,
    issues: &mut Vec<FieldIssue>,
) -> Option<u64> {
    match obj.get(key) {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) if v <= max => Some(v),
            _ => {
                issues.push(FieldIssue::new(
                    format!("{path}.{key}"),
                    format!("must be an integer between 0 and {max}"),
                ));
                None
            }
        },
        Some(_) => {
            issues.push(FieldIssue::new(
                format!("{path}.{key}"),
                "must be an integer",
            ));
            None
        }
        None => {
            issues.push(FieldIssue::new(
                format!("{path}.{key}"),
                "missing required field",
            ));
            None
        }
    }
}

/// Field names accepted for a given record type, beyond the base set.
fn allowed_extra_fields(record_type: &str) -> &'static [&'static str] {
    match record_type {
        "MX" => &["content", "priority"],
        "DS" | "SRV" => &["data"],
        _ => &["content"],
    }
}

fn parse_record(value: &Value, path: &str, issues: &mut Vec<FieldIssue>) -> Option<DnsRecordEntry> {
    let before = issues.len();

    let Some(obj) = value.as_object() else {
        issues.push(FieldIssue::new(path, "record must be a JSON object"));
        return None;
    };

    let record_type = match obj.get("type") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            issues.push(FieldIssue::new(format!("{path}.type"), "must be a string"));
            return None;
        }
        None => {
            issues.push(FieldIssue::new(
                format!("{path}.type"),
                "missing required field",
            ));
            return None;
        }
    };

    let extra = allowed_extra_fields(&record_type);
    for key in obj.keys() {
        let base = matches!(key.as_str(), "type" | "name" | "ttl" | "proxied" | "settings");
        if !base && !extra.contains(&key.as_str()) {
            issues.push(FieldIssue::new(format!("{path}.{key}"), "unknown field"));
        }
    }

    let name = match obj.get("name") {
        Some(Value::String(s)) if s == "@" => Some(RecordName::Apex),
        Some(Value::String(s)) => match validate_relative_name(s) {
            Ok(()) => Some(RecordName::Label(s.clone())),
            Err(reason) => {
                issues.push(FieldIssue::new(format!("{path}.name"), reason));
                None
            }
        },
        Some(_) => {
            issues.push(FieldIssue::new(format!("{path}.name"), "must be a string"));
            None
        }
        None => {
            issues.push(FieldIssue::new(
                format!("{path}.name"),
                "missing required field",
            ));
            None
        }
    };

    let ttl = match obj.get("ttl") {
        None => Some(TTL_AUTO),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) if v == u64::from(TTL_AUTO) || (MIN_TTL..=MAX_TTL).contains(&v) => {
                Some(u32::try_from(v).unwrap_or(TTL_AUTO))
            }
            _ => {
                issues.push(FieldIssue::new(
                    format!("{path}.ttl"),
                    format!("must be {TTL_AUTO} (automatic) or between {MIN_TTL} and {MAX_TTL}"),
                ));
                None
            }
        },
        Some(_) => {
            issues.push(FieldIssue::new(format!("{path}.ttl"), "must be an integer"));
            None
        }
    };

    let proxied = match obj.get("proxied") {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            issues.push(FieldIssue::new(
                format!("{path}.proxied"),
                "must be a boolean",
            ));
            false
        }
    };

    let settings = parse_settings(obj.get("settings"), record_type == "CNAME", path, issues);

    let data = parse_record_data(obj, &record_type, path, issues);

    if let Some(data) = &data {
        if proxied && !data.proxiable() {
            issues.push(FieldIssue::new(
                format!("{path}.proxied"),
                format!("{record_type} records cannot be proxied"),
            ));
        }
    }

    if issues.len() > before {
        return None;
    }
    Some(DnsRecordEntry {
        name: name?,
        ttl: ttl?,
        proxied,
        settings,
        data: data?,
    })
}

fn parse_settings(
    value: Option<&Value>,
    allow_flatten: bool,
    path: &str,
    issues: &mut Vec<FieldIssue>,
) -> RecordSettings {
    let mut settings = RecordSettings::default();
    let Some(value) = value else {
        return settings;
    };
    let Some(obj) = value.as_object() else {
        issues.push(FieldIssue::new(
            format!("{path}.settings"),
            "must be an object",
        ));
        return settings;
    };

    for (key, field) in obj {
        let target = match key.as_str() {
            "ipv4_only" => Some(&mut settings.ipv4_only),
            "ipv6_only" => Some(&mut settings.ipv6_only),
            "flatten_cname" if allow_flatten => Some(&mut settings.flatten_cname),
            _ => None,
        };
        match (target, field) {
            (Some(slot), Value::Bool(b)) => *slot = *b,
            (Some(_), _) => issues.push(FieldIssue::new(
                format!("{path}.settings.{key}"),
                "must be a boolean",
            )),
            (None, _) => issues.push(FieldIssue::new(
                format!("{path}.settings.{key}"),
                "unknown field",
            )),
        }
    }
    settings
}

fn content_string<'a>(
    obj: &'a serde_json::Map<String, Value>,
    path: &str,
    issues: &mut Vec<FieldIssue>,
) -> Option<&'a str> {
    match obj.get("content") {
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            issues.push(FieldIssue::new(
                format!("{path}.content"),
                "must be a string",
            ));
            None
        }
        None => {
            issues.push(FieldIssue::new(
                format!("{path}.content"),
                "missing required field",
            ));
            None
        }
    }
}

fn structured_object<'a>(
    obj: &'a serde_json::Map<String, Value>,
    key: &str,
    allowed: &[&str],
    path: &str,
    issues: &mut Vec<FieldIssue>,
) -> Option<&'a serde_json::Map<String, Value>> {
    match obj.get(key) {
        Some(Value::Object(inner)) => {
            for field in inner.keys() {
                if !allowed.contains(&field.as_str()) {
                    issues.push(FieldIssue::new(
                        format!("{path}.{key}.{field}"),
                        "unknown field",
                    ));
                }
            }
            Some(inner)
        }
        Some(_) => {
            issues.push(FieldIssue::new(
                format!("{path}.{key}"),
                "must be an object",
            ));
            None
        }
        None => {
            issues.push(FieldIssue::new(
                format!("{path}.{key}"),
                "missing required field",
            ));
            None
        }
    }
}

fn checked_content(
    obj: &serde_json::Map<String, Value>,
    path: &str,
    check: impl Fn(&str) -> Result<(), String>,
    issues: &mut Vec<FieldIssue>,
) -> Option<String> {
    let raw = content_string(obj, path, issues)?;
    match check(raw) {
        Ok(()) => Some(raw.to_string()),
        Err(reason) => {
            issues.push(FieldIssue::new(format!("{path}.content"), reason));
            None
        }
    }
}

// Numeric casts below are range-checked by `require_integer` first.
#[allow(clippy::too_many_lines, clippy::cast_possible_truncation)]
fn parse_record_data(
    obj: &serde_json::Map<String, Value>,
    record_type: &str,
    path: &str,
    issues: &mut Vec<FieldIssue>,
) -> Option<RecordData> {
    match record_type {
        "A" => Some(RecordData::A {
            address: checked_content(obj, path, validate_ipv4, issues)?,
        }),
        "AAAA" => Some(RecordData::AAAA {
            address: checked_content(obj, path, validate_ipv6, issues)?,
        }),
        "CAA" => {
            let inner = structured_object(obj, "content", &["flags", "tag", "value"], path, issues)?;
            let inner_path = format!("{path}.content");
            let flags = require_integer(inner, "flags", 255, &inner_path, issues);
            let tag = require_string(inner, "tag", &format!("{inner_path}.tag"), issues)
                .and_then(|tag| {
                    if CAA_TAGS.contains(&tag.as_str()) {
                        Some(tag)
                    } else {
                        issues.push(FieldIssue::new(
                            format!("{inner_path}.tag"),
                            format!("must be one of: {}", CAA_TAGS.join(", ")),
                        ));
                        None
                    }
                });
            let value = require_string(inner, "value", &format!("{inner_path}.value"), issues)
                .and_then(|v| {
                    if v.is_empty() {
                        issues.push(FieldIssue::new(
                            format!("{inner_path}.value"),
                            "must not be empty",
                        ));
                        None
                    } else {
                        Some(v)
                    }
                });
            Some(RecordData::CAA {
                flags: flags? as u8,
                tag: tag?,
                value: value?,
            })
        }
        "CNAME" => Some(RecordData::CNAME {
            target: canonical_fqdn(&checked_content(obj, path, validate_hostname, issues)?),
        }),
        "TXT" => Some(RecordData::TXT {
            text: canonical_txt(&checked_content(obj, path, validate_txt, issues)?),
        }),
        "MX" => {
            let exchange = checked_content(obj, path, validate_hostname, issues);
            let priority = require_integer(obj, "priority", 65535, path, issues);
            Some(RecordData::MX {
                priority: priority? as u16,
                exchange: canonical_fqdn(&exchange?),
            })
        }
        "NS" => Some(RecordData::NS {
            nameserver: canonical_fqdn(&checked_content(obj, path, validate_hostname, issues)?),
        }),
        "DS" => {
            let inner = structured_object(
                obj,
                "data",
                &["key_tag", "algorithm", "digest_type", "digest"],
                path,
                issues,
            )?;
            let inner_path = format!("{path}.data");
            let key_tag = require_integer(inner, "key_tag", 65535, &inner_path, issues);
            let algorithm = require_integer(inner, "algorithm", 255, &inner_path, issues);
            let digest_type = require_integer(inner, "digest_type", 255, &inner_path, issues);
            let digest = require_string(inner, "digest", &format!("{inner_path}.digest"), issues)
                .and_then(|digest| match validate_hex(&digest) {
                    Ok(()) => Some(digest),
                    Err(reason) => {
                        issues.push(FieldIssue::new(format!("{inner_path}.digest"), reason));
                        None
                    }
                });
            Some(RecordData::DS {
                key_tag: key_tag? as u16,
                algorithm: algorithm? as u8,
                digest_type: digest_type? as u8,
                digest: digest?,
            })
        }
        "SRV" => {
            let inner = structured_object(
                obj,
                "data",
                &["priority", "weight", "port", "target"],
                path,
                issues,
            )?;
            let inner_path = format!("{path}.data");
            let priority = require_integer(inner, "priority", 65535, &inner_path, issues);
            let weight = require_integer(inner, "weight", 65535, &inner_path, issues);
            let port = require_integer(inner, "port", 65535, &inner_path, issues);
            let target = require_string(inner, "target", &format!("{inner_path}.target"), issues)
                .and_then(|target| match validate_hostname(&target) {
                    Ok(()) => Some(canonical_fqdn(&target)),
                    Err(reason) => {
                        issues.push(FieldIssue::new(format!("{inner_path}.target"), reason));
                        None
                    }
                });
            Some(RecordData::SRV {
                priority: priority? as u16,
                weight: weight? as u16,
                port: port? as u16,
                target: target?,
            })
        }
        other => {
            issues.push(FieldIssue::new(
                format!("{path}.type"),
                format!("unsupported record type '{other}'"),
            ));
            None
        }
    }
}

/// Root-level records ride the same grammar with three extra constraints:
/// TXT/CNAME only, single-label names off both reserved lists, and no proxy.
fn parse_root_level_record(
    value: &Value,
    path: &str,
    cfg: &GlobalConfig,
    issues: &mut Vec<FieldIssue>,
) -> Option<DnsRecordEntry> {
    let record_type = value
        .as_object()
        .and_then(|obj| obj.get("type"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if !matches!(record_type.as_str(), "TXT" | "CNAME") {
        issues.push(FieldIssue::new(
            format!("{path}.type"),
            "only TXT and CNAME records are allowed at root level",
        ));
        return None;
    }

    let before = issues.len();
    let record = parse_record(value, path, issues)?;

    match &record.name {
        RecordName::Apex => {
            issues.push(FieldIssue::new(
                format!("{path}.name"),
                "root-level records must use an explicit name, not '@'",
            ));
        }
        RecordName::Label(label) => {
            if let Err(reason) = validate_root_level_name(label) {
                issues.push(FieldIssue::new(format!("{path}.name"), reason));
            } else if cfg.is_reserved_subdomain(label) {
                issues.push(FieldIssue::new(
                    format!("{path}.name"),
                    format!("'{label}' is a reserved subdomain"),
                ));
            } else if record_type == "CNAME" && cfg.is_root_txt_reserved(label) {
                issues.push(FieldIssue::new(
                    format!("{path}.name"),
                    format!("'{label}' is reserved for TXT records and cannot hold a CNAME"),
                ));
            }
        }
    }

    if record_type == "CNAME" && record.proxied {
        issues.push(FieldIssue::new(
            format!("{path}.proxied"),
            "root-level CNAME records cannot be proxied",
        ));
    }

    if issues.len() > before {
        return None;
    }
    Some(record)
}

#[cfg(test)]
mod tests;
