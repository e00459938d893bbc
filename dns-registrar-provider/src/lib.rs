//! # dns-registrar-provider
//!
//! DNS provider gateway abstraction for the community subdomain registrar.
//!
//! The registrar core only needs two zone operations — list everything and
//! apply one atomic batch — expressed by the [`ZoneGateway`] trait. This
//! crate also owns the provider-neutral wire model ([`RecordData`],
//! [`RecordPayload`]) that the reconciliation engine diffs on, and a
//! Cloudflare implementation ([`CloudflareGateway`]) speaking the
//! `dns_records` and `dns_records/batch` endpoints.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dns_registrar_provider::{CloudflareGateway, ZoneGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = CloudflareGateway::new("api-token".to_string())?;
//!     let records = gateway.list_records("zone-id").await?;
//!     for record in &records {
//!         println!(
//!             "{} {} -> {}",
//!             record.payload.name,
//!             record.payload.data.record_type(),
//!             record.payload.data.display_value()
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, ProviderError>`](ProviderError).
//! Transient variants ([`ProviderError::NetworkError`],
//! [`ProviderError::Timeout`], [`ProviderError::RateLimited`]) answer
//! `true` to [`ProviderError::is_retryable`]; idempotent reads retry them
//! transparently, mutations leave retry policy to the caller.

mod cloudflare;
mod error;
mod http_client;
mod traits;
mod types;

pub use cloudflare::CloudflareGateway;
pub use error::{ProviderError, Result};
pub use http_client::HttpUtils;
pub use traits::ZoneGateway;
pub use types::{
    canonical_fqdn, canonical_txt, BatchOutcome, BatchPatch, BatchRequest, DnsRecordType,
    RecordData, RecordPayload, RecordSettings, RemoteRecord, TTL_AUTO,
};
