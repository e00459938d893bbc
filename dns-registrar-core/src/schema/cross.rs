//! Rules that only make sense across the records of one unit.
//!
//! These run after every record parsed cleanly; partial parses would make
//! the findings here misleading.

use std::collections::BTreeMap;

use dns_registrar_provider::DnsRecordType;

use super::{DnsRecordEntry, FieldIssue, RecordName};

/// Validate relationships between the records of a single unit.
pub(super) fn cross_record_issues(records: &[DnsRecordEntry]) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    // index per name, preserving declaration order
    let mut by_name: BTreeMap<&str, Vec<(usize, &DnsRecordEntry)>> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        by_name.entry(record.name.as_str()).or_default().push((i, record));
    }

    for (name, group) in &by_name {
        let has = |t: DnsRecordType| group.iter().any(|(_, r)| r.data.record_type() == t);

        // CNAME only conflicts with address records; TXT/MX and friends may
        // share the name
        let has_address = group.iter().any(|(_, r)| {
            matches!(
                r.data.record_type(),
                DnsRecordType::A | DnsRecordType::AAAA
            )
        });
        if has(DnsRecordType::CNAME) && has_address {
            for (i, record) in group {
                if record.data.record_type() == DnsRecordType::CNAME {
                    issues.push(FieldIssue::new(
                        format!("records[{i}].type"),
                        format!("CNAME at '{name}' cannot coexist with A/AAAA records at the same name"),
                    ));
                }
            }
        }

        let proxied_flags: Vec<bool> = group
            .iter()
            .filter(|(_, r)| r.data.proxiable())
            .map(|(_, r)| r.proxied)
            .collect();
        if proxied_flags.iter().any(|&p| p) && proxied_flags.iter().any(|&p| !p) {
            issues.push(FieldIssue::new(
                "records",
                format!("records at '{name}' mix proxied and unproxied; all address records at one name must agree"),
            ));
        }

        if has(DnsRecordType::NS) {
            for (i, record) in group {
                if !matches!(
                    record.data.record_type(),
                    DnsRecordType::NS | DnsRecordType::DS
                ) {
                    issues.push(FieldIssue::new(
                        format!("records[{i}].type"),
                        format!(
                            "'{name}' is delegated via NS; only DS records may accompany it"
                        ),
                    ));
                }
            }
        }

        if has(DnsRecordType::DS) && !has(DnsRecordType::NS) {
            for (i, record) in group {
                if record.data.record_type() == DnsRecordType::DS {
                    issues.push(FieldIssue::new(
                        format!("records[{i}].type"),
                        format!("DS at '{name}' requires an NS record at the same name"),
                    ));
                }
            }
        }
    }

    // A record under a delegated name belongs to the foreign nameserver, not
    // to this zone. Strict descendants only; the NS name itself is fine.
    for (i, record) in records.iter().enumerate() {
        let RecordName::Label(label) = &record.name else {
            continue;
        };
        let delegated = records.iter().any(|other| {
            other.data.record_type() == DnsRecordType::NS
                && is_strict_descendant(label, &other.name)
        });
        if delegated {
            issues.push(FieldIssue::new(
                format!("records[{i}].name"),
                format!(
                    "'{label}' falls under a delegated subtree and would be served by the delegated nameserver"
                ),
            ));
        }
    }

    issues
}

/// Whether `label` sits strictly below `ancestor` in the unit's name tree.
fn is_strict_descendant(label: &str, ancestor: &RecordName) -> bool {
    match ancestor {
        // Everything except the apex itself is below the apex.
        RecordName::Apex => true,
        RecordName::Label(parent) => {
            label.len() > parent.len() + 1 && label.ends_with(&format!(".{parent}"))
        }
    }
}
