//! Cloudflare zone gateway

mod http;
mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{ProviderError, Result};
use crate::traits::ZoneGateway;
use crate::types::{BatchOutcome, BatchRequest, RemoteRecord};

use types::{CfBatchBody, CfBatchResult, CfDnsRecord, PROVIDER_NAME};

pub(crate) const CF_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// 单次列出整个 zone 的设计上限；超过说明系统假设已经失效
const MAX_LIST_RECORDS: u32 = 5000;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Cloudflare implementation of [`ZoneGateway`], authenticated with a
/// bearer API token.
pub struct CloudflareGateway {
    pub(crate) client: Client,
    pub(crate) api_token: String,
}

impl CloudflareGateway {
    /// Build a gateway with the default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NetworkError`] if the TLS backend cannot be
    /// initialized.
    pub fn new(api_token: String) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::NetworkError {
                provider: PROVIDER_NAME.to_string(),
                detail: format!("HTTP client initialization failed: {e}"),
            })?;
        Ok(Self { client, api_token })
    }
}

#[async_trait]
impl ZoneGateway for CloudflareGateway {
    async fn list_records(&self, zone_id: &str) -> Result<Vec<RemoteRecord>> {
        let path = format!("/zones/{zone_id}/dns_records?per_page={MAX_LIST_RECORDS}");
        let (records, total_count): (Vec<CfDnsRecord>, Option<u32>) = self.get(&path).await?;

        if let Some(total) = total_count {
            if total > MAX_LIST_RECORDS {
                return Err(ProviderError::TooManyRecords {
                    provider: PROVIDER_NAME.to_string(),
                    count: total,
                    limit: MAX_LIST_RECORDS,
                });
            }
        }

        records
            .iter()
            .map(|record| {
                Ok(RemoteRecord {
                    id: record.id.clone(),
                    payload: record.to_payload()?,
                })
            })
            .collect()
    }

    async fn batch_apply(&self, zone_id: &str, request: &BatchRequest) -> Result<BatchOutcome> {
        let body = CfBatchBody::new(&request.deletes, &request.patches, &request.posts);
        let result: CfBatchResult = self
            .post(&format!("/zones/{zone_id}/dns_records/batch"), &body)
            .await?;

        Ok(BatchOutcome {
            created: result.posts.map_or(0, |v| v.len()),
            updated: result.patches.map_or(0, |v| v.len()),
            deleted: result.deletes.map_or(0, |v| v.len()),
        })
    }
}
