use serde_json::{json, Value};

use dns_registrar_provider::{RecordData, TTL_AUTO};

use super::*;

fn cfg() -> GlobalConfig {
    GlobalConfig::default()
}

fn unit_with_records(records: Value) -> Value {
    json!({
        "description": "My project",
        "owner": {
            "github": "octocat",
            "name": "Octo Cat",
            "email": "octo@example.com"
        },
        "records": records
    })
}

fn parse_ok(raw: &Value) -> DomainConfig {
    parse_domain_config(raw, &cfg()).expect("unit should parse")
}

fn parse_err(raw: &Value) -> Vec<FieldIssue> {
    parse_domain_config(raw, &cfg()).expect_err("unit should be rejected")
}

fn has_issue(issues: &[FieldIssue], path: &str, needle: &str) -> bool {
    issues
        .iter()
        .any(|i| i.path == path && i.message.contains(needle))
}

#[test]
fn minimal_unit_parses() {
    let raw = unit_with_records(json!([
        {"type": "A", "name": "@", "content": "192.0.2.1"}
    ]));
    let config = parse_ok(&raw);
    assert_eq!(config.records.len(), 1);
    assert_eq!(config.records[0].ttl, TTL_AUTO);
    assert!(!config.records[0].proxied);
    assert!(config.records[0].name.is_apex());
    assert!(!config.nocheck);
    assert!(config.root_level_records.is_empty());
    assert!(config.has_routable_root());
}

#[test]
fn missing_required_fields_are_each_reported() {
    let issues = parse_err(&json!({}));
    assert!(has_issue(&issues, "description", "missing"));
    assert!(has_issue(&issues, "owner", "missing"));
    assert!(has_issue(&issues, "records", "missing"));
}

#[test]
fn unknown_fields_rejected_at_every_level() {
    let mut raw = unit_with_records(json!([
        {"type": "A", "name": "@", "content": "192.0.2.1", "comment": "hi"}
    ]));
    raw["extra"] = json!(true);
    raw["owner"]["twitter"] = json!("@octocat");
    let issues = parse_err(&raw);
    assert!(has_issue(&issues, "extra", "unknown field"));
    assert!(has_issue(&issues, "owner.twitter", "unknown field"));
    assert!(has_issue(&issues, "records[0].comment", "unknown field"));
}

#[test]
fn owner_grammar() {
    let mut raw = unit_with_records(json!([
        {"type": "A", "name": "@", "content": "192.0.2.1"}
    ]));
    raw["owner"]["github"] = json!("not valid!");
    assert!(has_issue(&parse_err(&raw), "owner.github", "letters"));

    raw["owner"]["github"] = json!("octocat");
    raw["owner"]["email"] = json!("not-an-email");
    assert!(has_issue(&parse_err(&raw), "owner.email", "invalid email"));
}

#[test]
fn cname_target_and_txt_content_are_canonicalized() {
    let raw = unit_with_records(json!([
        {"type": "CNAME", "name": "@", "content": "me.github.io"},
        {"type": "TXT", "name": "_probe", "content": "v=spf1 -all"}
    ]));
    let config = parse_ok(&raw);
    assert_eq!(
        config.records[0].data,
        RecordData::CNAME {
            target: "me.github.io.".to_string()
        }
    );
    assert_eq!(
        config.records[1].data,
        RecordData::TXT {
            text: "\"v=spf1 -all\"".to_string()
        }
    );
}

#[test]
fn ttl_bounds() {
    let base = |ttl: Value| {
        let mut record = json!({"type": "A", "name": "@", "content": "192.0.2.1"});
        record["ttl"] = ttl;
        unit_with_records(json!([record]))
    };
    assert_eq!(parse_ok(&base(json!(1))).records[0].ttl, TTL_AUTO);
    assert_eq!(parse_ok(&base(json!(300))).records[0].ttl, 300);
    assert_eq!(parse_ok(&base(json!(86400))).records[0].ttl, 86400);
    assert!(has_issue(&parse_err(&base(json!(59))), "records[0].ttl", "between"));
    assert!(has_issue(&parse_err(&base(json!(86401))), "records[0].ttl", "between"));
    assert!(has_issue(&parse_err(&base(json!("auto"))), "records[0].ttl", "integer"));
}

#[test]
fn proxied_only_on_proxiable_types() {
    let raw = unit_with_records(json!([
        {"type": "TXT", "name": "@", "content": "hello", "proxied": true}
    ]));
    assert!(has_issue(
        &parse_err(&raw),
        "records[0].proxied",
        "TXT records cannot be proxied"
    ));

    let raw = unit_with_records(json!([
        {"type": "A", "name": "@", "content": "192.0.2.1", "proxied": true}
    ]));
    assert!(parse_ok(&raw).records[0].proxied);
}

#[test]
fn flatten_cname_setting_is_cname_only() {
    let raw = unit_with_records(json!([
        {"type": "CNAME", "name": "@", "content": "me.github.io",
         "settings": {"flatten_cname": true}}
    ]));
    assert!(parse_ok(&raw).records[0].settings.flatten_cname);

    let raw = unit_with_records(json!([
        {"type": "A", "name": "@", "content": "192.0.2.1",
         "settings": {"flatten_cname": true}}
    ]));
    assert!(has_issue(
        &parse_err(&raw),
        "records[0].settings.flatten_cname",
        "unknown field"
    ));
}

#[test]
fn mx_requires_priority() {
    let raw = unit_with_records(json!([
        {"type": "MX", "name": "@", "content": "mail.example.com"}
    ]));
    assert!(has_issue(&parse_err(&raw), "records[0].priority", "missing"));

    let raw = unit_with_records(json!([
        {"type": "MX", "name": "@", "content": "mail.example.com", "priority": 10}
    ]));
    assert_eq!(
        parse_ok(&raw).records[0].data,
        RecordData::MX {
            priority: 10,
            exchange: "mail.example.com.".to_string()
        }
    );
}

#[test]
fn caa_structured_content() {
    let raw = unit_with_records(json!([
        {"type": "CAA", "name": "@",
         "content": {"flags": 0, "tag": "issue", "value": "letsencrypt.org"}}
    ]));
    assert_eq!(
        parse_ok(&raw).records[0].data,
        RecordData::CAA {
            flags: 0,
            tag: "issue".to_string(),
            value: "letsencrypt.org".to_string()
        }
    );

    let raw = unit_with_records(json!([
        {"type": "CAA", "name": "@",
         "content": {"flags": 0, "tag": "bogus", "value": "x"}}
    ]));
    assert!(has_issue(
        &parse_err(&raw),
        "records[0].content.tag",
        "must be one of"
    ));
}

#[test]
fn ds_and_srv_structured_data() {
    let raw = unit_with_records(json!([
        {"type": "NS", "name": "@", "content": "ns1.example.com"},
        {"type": "DS", "name": "@",
         "data": {"key_tag": 2371, "algorithm": 13, "digest_type": 2, "digest": "abCDef0123"}}
    ]));
    let config = parse_ok(&raw);
    assert_eq!(
        config.records[1].data,
        RecordData::DS {
            key_tag: 2371,
            algorithm: 13,
            digest_type: 2,
            digest: "abCDef0123".to_string()
        }
    );

    let raw = unit_with_records(json!([
        {"type": "SRV", "name": "_sip._tcp",
         "data": {"priority": 10, "weight": 5, "port": 5060, "target": "sip.example.com"}}
    ]));
    assert_eq!(
        parse_ok(&raw).records[0].data,
        RecordData::SRV {
            priority: 10,
            weight: 5,
            port: 5060,
            target: "sip.example.com.".to_string()
        }
    );

    let raw = unit_with_records(json!([
        {"type": "SRV", "name": "_sip._tcp",
         "data": {"priority": 10, "weight": 5, "port": 70000, "target": "sip.example.com"}}
    ]));
    assert!(has_issue(
        &parse_err(&raw),
        "records[0].data.port",
        "between 0 and 65535"
    ));
}

#[test]
fn unsupported_type_rejected() {
    let raw = unit_with_records(json!([
        {"type": "SPF", "name": "@", "content": "v=spf1 -all"}
    ]));
    assert!(has_issue(&parse_err(&raw), "records[0].type", "unsupported"));
}

#[test]
fn empty_records_array_rejected() {
    let issues = parse_err(&unit_with_records(json!([])));
    assert!(has_issue(&issues, "records", "at least one"));
}

#[test]
fn issues_accumulate_across_records() {
    let raw = unit_with_records(json!([
        {"type": "A", "name": "@", "content": "999.0.0.1"},
        {"type": "AAAA", "name": "@", "content": "not-v6"}
    ]));
    let issues = parse_err(&raw);
    assert!(has_issue(&issues, "records[0].content", "IPv4"));
    assert!(has_issue(&issues, "records[1].content", "IPv6"));
}

#[test]
fn cross_record_rules_fire_on_clean_parse() {
    let raw = unit_with_records(json!([
        {"type": "CNAME", "name": "@", "content": "me.github.io"},
        {"type": "A", "name": "@", "content": "192.0.2.1"}
    ]));
    let issues = parse_err(&raw);
    assert!(issues.iter().any(|i| i.message.contains("CNAME")));
}

#[test]
fn root_level_types_and_names_are_restricted() {
    let mut raw = unit_with_records(json!([
        {"type": "A", "name": "@", "content": "192.0.2.1"}
    ]));

    raw["rootLevelRecords"] = json!([
        {"type": "A", "name": "verify", "content": "192.0.2.1"}
    ]);
    assert!(has_issue(
        &parse_err(&raw),
        "rootLevelRecords[0].type",
        "only TXT and CNAME"
    ));

    raw["rootLevelRecords"] = json!([
        {"type": "TXT", "name": "@", "content": "token"}
    ]);
    assert!(has_issue(
        &parse_err(&raw),
        "rootLevelRecords[0].name",
        "explicit name"
    ));

    raw["rootLevelRecords"] = json!([
        {"type": "TXT", "name": "www", "content": "token"}
    ]);
    assert!(has_issue(
        &parse_err(&raw),
        "rootLevelRecords[0].name",
        "reserved subdomain"
    ));

    raw["rootLevelRecords"] = json!([
        {"type": "CNAME", "name": "_vercel", "content": "cname.vercel-dns.com"}
    ]);
    assert!(has_issue(
        &parse_err(&raw),
        "rootLevelRecords[0].name",
        "reserved for TXT"
    ));

    raw["rootLevelRecords"] = json!([
        {"type": "TXT", "name": "a.b", "content": "token"}
    ]);
    assert!(has_issue(
        &parse_err(&raw),
        "rootLevelRecords[0].name",
        "root-level name"
    ));

    raw["rootLevelRecords"] = json!([
        {"type": "CNAME", "name": "shop", "content": "shop.example.com", "proxied": true}
    ]);
    assert!(has_issue(
        &parse_err(&raw),
        "rootLevelRecords[0].proxied",
        "cannot be proxied"
    ));

    raw["rootLevelRecords"] = json!([
        {"type": "TXT", "name": "_vercel", "content": "vc-domain-verify=abc"}
    ]);
    let config = parse_ok(&raw);
    assert_eq!(config.root_level_records.len(), 1);
    assert_eq!(config.record_count(), 2);
}

#[test]
fn non_object_unit_rejected() {
    let issues = parse_err(&json!(["not", "an", "object"]));
    assert_eq!(issues.len(), 1);
    assert!(issues[0].message.contains("JSON object"));
}
