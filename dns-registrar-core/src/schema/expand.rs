//! Expansion of validated unit records into provider-shaped payloads.
//!
//! A unit's records are written relative to the unit; reconciliation and
//! reporting both want fully-qualified payloads plus provenance pointing
//! back at the file a record came from.

use serde_json::Value;

use dns_registrar_provider::{RecordPayload, RemoteRecord};

use super::{DnsRecordEntry, DomainConfig, RecordName};

/// Which section of a unit a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Records,
    RootLevel,
}

/// Where an expanded record came from, for warnings and reports.
#[derive(Debug, Clone)]
pub struct Provenance {
    /// Name as written in the unit (`@` or a relative label).
    pub original_name: String,
    /// GitHub handle of the unit owner.
    pub owner: String,
    pub source: RecordSource,
    /// Repository path of the unit, e.g. `domains/ciao.su/myblog.json`.
    pub config_file: String,
}

/// One provider-shaped record plus the provenance of its configuration.
#[derive(Debug, Clone)]
pub struct ExpandedDnsRecord {
    pub payload: RecordPayload,
    pub provenance: Provenance,
}

impl ExpandedDnsRecord {
    /// One-line rendition for logs and reports:
    /// `blog.ciao.su. A {"address":"1.2.3.4",...} (@octocat)`.
    #[must_use]
    pub fn display_string(&self) -> String {
        format!(
            "{} {} {} (@{})",
            self.payload.name,
            self.payload.data.record_type(),
            payload_fields(&self.payload),
            self.provenance.owner,
        )
    }
}

/// The payload's fields minus name and type, as sorted-key JSON. Serves as
/// a stable human-readable value column.
fn payload_fields(payload: &RecordPayload) -> String {
    match serde_json::to_value(payload) {
        Ok(Value::Object(mut map)) => {
            map.remove("name");
            map.remove("type");
            Value::Object(map).to_string()
        }
        _ => String::new(),
    }
}

/// Fully qualify a record name within `domain`.
fn expand_name(name: &RecordName, subdomain: &str, domain: &str, source: RecordSource) -> String {
    match source {
        RecordSource::RootLevel => format!("{}.{domain}.", name.as_str()),
        RecordSource::Records => match name {
            RecordName::Apex => format!("{subdomain}.{domain}."),
            RecordName::Label(label) => format!("{label}.{subdomain}.{domain}."),
        },
    }
}

fn expand_one(
    entry: &DnsRecordEntry,
    subdomain: &str,
    domain: &str,
    source: RecordSource,
    owner: &str,
    config_file: &str,
) -> ExpandedDnsRecord {
    ExpandedDnsRecord {
        payload: RecordPayload {
            name: expand_name(&entry.name, subdomain, domain, source),
            ttl: entry.ttl,
            proxied: entry.proxied,
            settings: entry.settings,
            data: entry.data.clone(),
        },
        provenance: Provenance {
            original_name: entry.name.as_str().to_string(),
            owner: owner.to_string(),
            source,
            config_file: config_file.to_string(),
        },
    }
}

/// Expand every record of one unit into provider-shaped payloads.
#[must_use]
pub fn expand_records(
    config: &DomainConfig,
    subdomain: &str,
    domain: &str,
    config_file: &str,
) -> Vec<ExpandedDnsRecord> {
    let owner = &config.owner.github;
    let mut out = Vec::with_capacity(config.record_count());
    out.extend(config.records.iter().map(|entry| {
        expand_one(entry, subdomain, domain, RecordSource::Records, owner, config_file)
    }));
    out.extend(config.root_level_records.iter().map(|entry| {
        expand_one(entry, subdomain, domain, RecordSource::RootLevel, owner, config_file)
    }));
    out
}

/// Render a remote record the same way expanded records render, so diff
/// reports read uniformly.
#[must_use]
pub fn display_remote(record: &RemoteRecord) -> String {
    format!(
        "{} {} {} (remote)",
        record.payload.name,
        record.payload.data.record_type(),
        payload_fields(&record.payload),
    )
}
