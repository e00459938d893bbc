//! Cloudflare API 类型定义与 wire ↔ payload 转换

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProviderError, Result};
use crate::types::{
    canonical_fqdn, canonical_txt, BatchPatch, RecordData, RecordPayload, RecordSettings,
};

pub(crate) const PROVIDER_NAME: &str = "cloudflare";

/// Cloudflare API 通用响应
#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    pub errors: Option<Vec<CloudflareApiError>>,
    pub result_info: Option<CloudflareResultInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareApiError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareResultInfo {
    pub total_count: u32,
}

/// Map a Cloudflare error code to a structured error.
/// Reference: <https://api.cloudflare.com/#getting-started-responses>
pub(crate) fn map_api_error(code: i32, message: String) -> ProviderError {
    match code {
        // 6003/6103/6111: malformed auth headers, 9109: unauthorized, 10000: authentication error
        6003 | 6103 | 6111 | 9109 | 10000 => ProviderError::InvalidCredentials {
            provider: PROVIDER_NAME.to_string(),
            raw_message: Some(message),
        },
        // 9106/9107: zone missing or not owned by this account
        7003 | 9106 | 9107 => ProviderError::ZoneNotFound {
            provider: PROVIDER_NAME.to_string(),
            zone_id: "<requested>".to_string(),
            raw_message: Some(message),
        },
        10001 => ProviderError::PermissionDenied {
            provider: PROVIDER_NAME.to_string(),
            raw_message: Some(message),
        },
        _ => ProviderError::Unknown {
            provider: PROVIDER_NAME.to_string(),
            raw_code: Some(code.to_string()),
            raw_message: message,
        },
    }
}

// ============ DNS record wire shapes ============

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct CfRecordSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flatten_cname: Option<bool>,
}

/// Cloudflare DNS record 结构（响应）
#[derive(Debug, Deserialize)]
pub(crate) struct CfDnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
    /// SRV/CAA/DS 等复杂记录类型的结构化数据
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub priority: Option<u16>,
    pub ttl: u32,
    #[serde(default)]
    pub proxied: Option<bool>,
    #[serde(default)]
    pub settings: Option<CfRecordSettings>,
}

#[derive(Debug, Deserialize)]
struct CfCaaData {
    flags: u8,
    tag: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct CfDsData {
    key_tag: u16,
    algorithm: u8,
    digest_type: u8,
    digest: String,
}

#[derive(Debug, Deserialize)]
struct CfSrvData {
    priority: u16,
    weight: u16,
    port: u16,
    target: String,
}

impl CfDnsRecord {
    fn content(&self) -> Result<&str> {
        self.content
            .as_deref()
            .ok_or_else(|| ProviderError::ParseError {
                provider: PROVIDER_NAME.to_string(),
                detail: format!("{} record '{}' has no content", self.record_type, self.name),
            })
    }

    fn structured<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let data = self.data.clone().ok_or_else(|| ProviderError::ParseError {
            provider: PROVIDER_NAME.to_string(),
            detail: format!("{} record '{}' has no data", self.record_type, self.name),
        })?;
        serde_json::from_value(data).map_err(|e| ProviderError::ParseError {
            provider: PROVIDER_NAME.to_string(),
            detail: format!("{} record '{}': {e}", self.record_type, self.name),
        })
    }

    /// Convert into the provider-neutral payload, applying the same name and
    /// content canonicalization the schema applies to desired records.
    /// Cloudflare returns names without the trailing dot; the neutral model
    /// always carries it, so both sides of a diff compare equal.
    pub fn to_payload(&self) -> Result<RecordPayload> {
        let data = match self.record_type.as_str() {
            "A" => RecordData::A {
                address: self.content()?.to_string(),
            },
            "AAAA" => RecordData::AAAA {
                address: self.content()?.to_string(),
            },
            "CAA" => {
                let caa: CfCaaData = self.structured()?;
                RecordData::CAA {
                    flags: caa.flags,
                    tag: caa.tag,
                    value: caa.value,
                }
            }
            "CNAME" => RecordData::CNAME {
                target: canonical_fqdn(self.content()?),
            },
            "TXT" => RecordData::TXT {
                text: canonical_txt(self.content()?),
            },
            "MX" => RecordData::MX {
                priority: self.priority.unwrap_or(0),
                exchange: canonical_fqdn(self.content()?),
            },
            "NS" => RecordData::NS {
                nameserver: canonical_fqdn(self.content()?),
            },
            "DS" => {
                let ds: CfDsData = self.structured()?;
                RecordData::DS {
                    key_tag: ds.key_tag,
                    algorithm: ds.algorithm,
                    digest_type: ds.digest_type,
                    digest: ds.digest,
                }
            }
            "SRV" => {
                let srv: CfSrvData = self.structured()?;
                RecordData::SRV {
                    priority: srv.priority,
                    weight: srv.weight,
                    port: srv.port,
                    target: canonical_fqdn(&srv.target),
                }
            }
            other => {
                return Err(ProviderError::UnsupportedRecordType {
                    provider: PROVIDER_NAME.to_string(),
                    record_type: other.to_string(),
                })
            }
        };

        let settings = self.settings.unwrap_or_default();
        Ok(RecordPayload {
            name: canonical_fqdn(&self.name),
            ttl: self.ttl,
            proxied: self.proxied.unwrap_or(false),
            settings: RecordSettings {
                ipv4_only: settings.ipv4_only.unwrap_or(false),
                ipv6_only: settings.ipv6_only.unwrap_or(false),
                flatten_cname: settings.flatten_cname.unwrap_or(false),
            },
            data,
        })
    }
}

/// Cloudflare DNS record 结构（请求体）
#[derive(Debug, Serialize)]
pub(crate) struct CfRecordBody {
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<u16>,
    ttl: u32,
    proxied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<CfRecordSettings>,
}

impl From<&RecordPayload> for CfRecordBody {
    fn from(payload: &RecordPayload) -> Self {
        let (content, data, priority) = match &payload.data {
            RecordData::A { address } | RecordData::AAAA { address } => {
                (Some(address.clone()), None, None)
            }
            RecordData::CAA { flags, tag, value } => (
                None,
                Some(serde_json::json!({
                    "flags": flags,
                    "tag": tag,
                    "value": value,
                })),
                None,
            ),
            RecordData::CNAME { target } => (Some(target.clone()), None, None),
            RecordData::TXT { text } => (Some(text.clone()), None, None),
            RecordData::MX { priority, exchange } => {
                (Some(exchange.clone()), None, Some(*priority))
            }
            RecordData::NS { nameserver } => (Some(nameserver.clone()), None, None),
            RecordData::DS {
                key_tag,
                algorithm,
                digest_type,
                digest,
            } => (
                None,
                Some(serde_json::json!({
                    "key_tag": key_tag,
                    "algorithm": algorithm,
                    "digest_type": digest_type,
                    "digest": digest,
                })),
                None,
            ),
            RecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => (
                None,
                Some(serde_json::json!({
                    "priority": priority,
                    "weight": weight,
                    "port": port,
                    "target": target,
                })),
                None,
            ),
        };

        let settings = payload.settings;
        let has_settings = settings.ipv4_only || settings.ipv6_only || settings.flatten_cname;

        Self {
            record_type: payload.data.record_type().to_string(),
            // back to Cloudflare's dot-less name form
            name: payload.name.trim_end_matches('.').to_string(),
            content,
            data,
            priority,
            ttl: payload.ttl,
            proxied: payload.proxied,
            settings: has_settings.then(|| CfRecordSettings {
                ipv4_only: settings.ipv4_only.then_some(true),
                ipv6_only: settings.ipv6_only.then_some(true),
                flatten_cname: settings.flatten_cname.then_some(true),
            }),
        }
    }
}

// ============ Batch wire shapes ============

#[derive(Debug, Serialize)]
pub(crate) struct CfBatchDelete {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CfBatchPatch {
    pub id: String,
    #[serde(flatten)]
    pub body: CfRecordBody,
}

/// POST /zones/{id}/dns_records/batch 请求体
#[derive(Debug, Serialize)]
pub(crate) struct CfBatchBody {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deletes: Vec<CfBatchDelete>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<CfBatchPatch>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub posts: Vec<CfRecordBody>,
}

impl CfBatchBody {
    pub fn new(
        deletes: &[String],
        patches: &[BatchPatch],
        posts: &[RecordPayload],
    ) -> Self {
        Self {
            deletes: deletes
                .iter()
                .map(|id| CfBatchDelete { id: id.clone() })
                .collect(),
            patches: patches
                .iter()
                .map(|p| CfBatchPatch {
                    id: p.id.clone(),
                    body: CfRecordBody::from(&p.payload),
                })
                .collect(),
            posts: posts.iter().map(CfRecordBody::from).collect(),
        }
    }
}

/// Batch 响应 result：每类操作返回受影响的记录列表
#[derive(Debug, Deserialize)]
pub(crate) struct CfBatchResult {
    #[serde(default)]
    pub deletes: Option<Vec<Value>>,
    #[serde(default)]
    pub patches: Option<Vec<Value>>,
    #[serde(default)]
    pub posts: Option<Vec<Value>>,
}
