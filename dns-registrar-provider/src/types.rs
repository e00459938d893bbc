use serde::{Deserialize, Serialize};

// ============ Record Types ============

/// DNS record type discriminant.
///
/// Serialized as uppercase strings (`"A"`, `"AAAA"`, `"CNAME"`, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DnsRecordType {
    A,
    AAAA,
    CAA,
    CNAME,
    TXT,
    MX,
    NS,
    DS,
    SRV,
}

impl std::fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::CAA => "CAA",
            Self::CNAME => "CNAME",
            Self::TXT => "TXT",
            Self::MX => "MX",
            Self::NS => "NS",
            Self::DS => "DS",
            Self::SRV => "SRV",
        };
        f.write_str(s)
    }
}

/// Type-safe representation of DNS record data.
///
/// Each variant carries the fields specific to that record type. Every site
/// that branches on record type matches this enum exhaustively, so adding a
/// record type is a compile-time-checked change everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecordData {
    /// A record — maps a name to an IPv4 address.
    A { address: String },

    /// AAAA record — maps a name to an IPv6 address.
    AAAA { address: String },

    /// CAA record — Certificate Authority Authorization.
    CAA { flags: u8, tag: String, value: String },

    /// CNAME record — alias to another name. Target is a FQDN with a
    /// trailing dot.
    CNAME { target: String },

    /// TXT record — quoted text content.
    TXT { text: String },

    /// MX record — mail exchange server.
    MX { priority: u16, exchange: String },

    /// NS record — delegation to an authoritative name server.
    NS { nameserver: String },

    /// DS record — DNSSEC delegation signer digest.
    DS {
        key_tag: u16,
        algorithm: u8,
        digest_type: u8,
        digest: String,
    },

    /// SRV record — service locator.
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
}

impl RecordData {
    /// Returns the [`DnsRecordType`] discriminant for this record data.
    #[must_use]
    pub fn record_type(&self) -> DnsRecordType {
        match self {
            Self::A { .. } => DnsRecordType::A,
            Self::AAAA { .. } => DnsRecordType::AAAA,
            Self::CAA { .. } => DnsRecordType::CAA,
            Self::CNAME { .. } => DnsRecordType::CNAME,
            Self::TXT { .. } => DnsRecordType::TXT,
            Self::MX { .. } => DnsRecordType::MX,
            Self::NS { .. } => DnsRecordType::NS,
            Self::DS { .. } => DnsRecordType::DS,
            Self::SRV { .. } => DnsRecordType::SRV,
        }
    }

    /// Returns the primary value for display (the address for A/AAAA, the
    /// target for CNAME/SRV, the exchange for MX, and so on).
    #[must_use]
    pub fn display_value(&self) -> &str {
        match self {
            Self::A { address } | Self::AAAA { address } => address,
            Self::CAA { value, .. } => value,
            Self::CNAME { target } | Self::SRV { target, .. } => target,
            Self::TXT { text } => text,
            Self::MX { exchange, .. } => exchange,
            Self::NS { nameserver } => nameserver,
            Self::DS { digest, .. } => digest,
        }
    }

    /// Whether the provider edge can proxy traffic for this record type.
    #[must_use]
    pub fn proxiable(&self) -> bool {
        matches!(
            self,
            Self::A { .. } | Self::AAAA { .. } | Self::CNAME { .. }
        )
    }

    /// Whether a record of this type at the apex can resolve to a host at
    /// all, i.e. whether an HTTP probe of the name can ever succeed.
    #[must_use]
    pub fn routable(&self) -> bool {
        matches!(
            self,
            Self::A { .. } | Self::AAAA { .. } | Self::CNAME { .. } | Self::NS { .. }
        )
    }
}

/// Per-record provider settings.
///
/// All fields default to `false`; defaults are serialized explicitly so two
/// records that differ only in omitted settings normalize identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordSettings {
    #[serde(default)]
    pub ipv4_only: bool,
    #[serde(default)]
    pub ipv6_only: bool,
    /// Resolve the CNAME chain at the edge and serve the final address.
    /// Only meaningful for CNAME records.
    #[serde(default)]
    pub flatten_cname: bool,
}

/// TTL sentinel meaning "let the provider pick" (Cloudflare: automatic).
pub const TTL_AUTO: u32 = 1;

/// Canonicalize a hostname used as record content: FQDN with trailing dot.
///
/// Desired and remote records both pass through this, so a provider that
/// strips the dot never causes a spurious diff.
#[must_use]
pub fn canonical_fqdn(host: &str) -> String {
    if host.ends_with('.') {
        host.to_string()
    } else {
        format!("{host}.")
    }
}

/// Canonicalize TXT content: RFC 1035 quoted form.
#[must_use]
pub fn canonical_txt(text: &str) -> String {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        text.to_string()
    } else {
        format!("\"{text}\"")
    }
}

/// A record in provider wire shape: fully-qualified name plus type-specific
/// data, ready to diff or submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPayload {
    /// Fully-qualified record name.
    pub name: String,
    /// TTL in seconds, or [`TTL_AUTO`].
    pub ttl: u32,
    /// Whether traffic is relayed through the provider edge.
    pub proxied: bool,
    #[serde(default)]
    pub settings: RecordSettings,
    #[serde(flatten)]
    pub data: RecordData,
}

impl RecordPayload {
    /// Grouping key for reconciliation: records with the same name and type
    /// belong to the same diff group.
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{}:{}", self.name, self.data.record_type())
    }

    /// Canonical JSON form with sorted keys.
    ///
    /// Two payloads are the same record iff their canonical forms are equal,
    /// independent of field insertion order on either side.
    #[must_use]
    pub fn canonical_json(&self) -> String {
        // Serializing a plain struct into a Value cannot fail.
        serde_json::to_value(self)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}

/// A record as it currently exists at the provider, with its provider id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Provider-assigned record identifier.
    pub id: String,
    pub payload: RecordPayload,
}

// ============ Batch Types ============

/// One patch entry in a batch: replace the record with this provider id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPatch {
    pub id: String,
    pub payload: RecordPayload,
}

/// An atomic batch of zone changes. The gateway applies all of it or none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Provider ids of records to delete.
    pub deletes: Vec<String>,
    /// Records to replace in place.
    pub patches: Vec<BatchPatch>,
    /// New records to create.
    pub posts: Vec<RecordPayload>,
}

impl BatchRequest {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.patches.is_empty() && self.posts.is_empty()
    }
}

/// Counts reported by the provider after a successful batch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}
