use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all gateway operations.
///
/// Each variant carries a `provider` field naming the implementation that
/// produced it. All variants serialize for structured error reporting.
///
/// # Retryable Errors
///
/// [`NetworkError`](Self::NetworkError), [`Timeout`](Self::Timeout) and
/// [`RateLimited`](Self::RateLimited) are transient: a caller-side retry with
/// backoff may succeed. Everything else is a hard failure.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ProviderError {
    /// A network-level error (DNS resolution failure, connection refused, etc.).
    #[error("[{provider}] Network error: {detail}")]
    NetworkError { provider: String, detail: String },

    /// The HTTP request timed out.
    #[error("[{provider}] Request timeout: {detail}")]
    Timeout { provider: String, detail: String },

    /// The API rate limit has been exceeded (HTTP 429 or equivalent).
    #[error("[{provider}] Rate limited")]
    RateLimited {
        provider: String,
        /// Suggested wait in seconds before retrying, if the API provided one.
        retry_after: Option<u64>,
        raw_message: Option<String>,
    },

    /// The provided credentials are invalid or expired.
    #[error("[{provider}] Invalid credentials")]
    InvalidCredentials {
        provider: String,
        raw_message: Option<String>,
    },

    /// The authenticated token lacks permission for the requested operation.
    #[error("[{provider}] Permission denied")]
    PermissionDenied {
        provider: String,
        raw_message: Option<String>,
    },

    /// The specified zone was not found.
    #[error("[{provider}] Zone '{zone_id}' not found")]
    ZoneNotFound {
        provider: String,
        zone_id: String,
        raw_message: Option<String>,
    },

    /// A remote record uses a type this library does not model.
    #[error("[{provider}] Unsupported record type: {record_type}")]
    UnsupportedRecordType {
        provider: String,
        record_type: String,
    },

    /// The zone holds more records than the single-page design limit.
    ///
    /// Listing is deliberately unpaginated; a zone this large means the
    /// registrar's architecture assumptions no longer hold.
    #[error("[{provider}] Zone record count {count} exceeds the {limit}-record design limit")]
    TooManyRecords {
        provider: String,
        count: u32,
        limit: u32,
    },

    /// Failed to parse the provider's API response.
    #[error("[{provider}] Parse error: {detail}")]
    ParseError { provider: String, detail: String },

    /// Failed to serialize a request body.
    #[error("[{provider}] Serialization error: {detail}")]
    SerializationError { provider: String, detail: String },

    /// An unrecognized error from the provider API.
    #[error("[{provider}] {raw_message}")]
    Unknown {
        provider: String,
        raw_code: Option<String>,
        raw_message: String,
    },
}

impl ProviderError {
    /// Whether a caller-side retry with backoff may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. } | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }
}

/// Convenience alias for `Result<T, ProviderError>`.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_network_error() {
        let e = ProviderError::NetworkError {
            provider: "cloudflare".to_string(),
            detail: "connection refused".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "[cloudflare] Network error: connection refused"
        );
    }

    #[test]
    fn display_too_many_records() {
        let e = ProviderError::TooManyRecords {
            provider: "cloudflare".to_string(),
            count: 6001,
            limit: 5000,
        };
        assert_eq!(
            e.to_string(),
            "[cloudflare] Zone record count 6001 exceeds the 5000-record design limit"
        );
    }

    #[test]
    fn retryable_variants() {
        assert!(ProviderError::Timeout {
            provider: "t".into(),
            detail: "5s".into(),
        }
        .is_retryable());
        assert!(ProviderError::RateLimited {
            provider: "t".into(),
            retry_after: Some(2),
            raw_message: None,
        }
        .is_retryable());
        assert!(!ProviderError::InvalidCredentials {
            provider: "t".into(),
            raw_message: None,
        }
        .is_retryable());
        assert!(!ProviderError::ParseError {
            provider: "t".into(),
            detail: "bad json".into(),
        }
        .is_retryable());
    }

    #[test]
    fn serialize_tagged_by_code() {
        let e = ProviderError::RateLimited {
            provider: "cloudflare".to_string(),
            retry_after: Some(60),
            raw_message: None,
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"code\":\"RateLimited\""));
        assert!(json.contains("\"retry_after\":60"));
    }

    #[test]
    fn deserialize_round_trip() {
        let original = ProviderError::ZoneNotFound {
            provider: "cloudflare".to_string(),
            zone_id: "abc123".to_string(),
            raw_message: None,
        };
        let json = serde_json::to_string(&original).unwrap();
        let back: ProviderError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), original.to_string());
    }
}
