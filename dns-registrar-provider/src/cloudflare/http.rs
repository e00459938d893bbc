//! Cloudflare HTTP 请求方法

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ProviderError, Result};
use crate::http_client::HttpUtils;

use super::types::{map_api_error, CloudflareResponse, PROVIDER_NAME};
use super::{CloudflareGateway, CF_API_BASE};

/// Transparent retries for idempotent reads. Mutations are never retried
/// here; the caller owns retry policy for those.
const LIST_MAX_RETRIES: u32 = 2;

impl CloudflareGateway {
    fn unwrap_envelope<T>(envelope: CloudflareResponse<T>) -> Result<(T, Option<u32>)> {
        if !envelope.success {
            let (code, message) = envelope
                .errors
                .and_then(|errors| errors.into_iter().next().map(|e| (e.code, e.message)))
                .unwrap_or((0, "Unknown error".to_string()));
            log::error!("[{PROVIDER_NAME}] API error {code}: {message}");
            return Err(map_api_error(code, message));
        }

        let total_count = envelope.result_info.map(|info| info.total_count);
        envelope
            .result
            .map(|result| (result, total_count))
            .ok_or_else(|| ProviderError::ParseError {
                provider: PROVIDER_NAME.to_string(),
                detail: "response is missing the result field".to_string(),
            })
    }

    /// 执行 GET 请求（幂等，带重试）
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<(T, Option<u32>)> {
        let url = format!("{CF_API_BASE}{path}");

        let (_, body) = HttpUtils::execute_request_with_retry(
            || {
                self.client
                    .get(&url)
                    .header("Authorization", format!("Bearer {}", self.api_token))
            },
            PROVIDER_NAME,
            &format!("GET {url}"),
            LIST_MAX_RETRIES,
        )
        .await?;

        let envelope: CloudflareResponse<T> = HttpUtils::parse_json(&body, PROVIDER_NAME)?;
        Self::unwrap_envelope(envelope)
    }

    /// 执行 POST 请求（不重试：批量变更不是幂等操作）
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{CF_API_BASE}{path}");
        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(body);

        let (_, text) =
            HttpUtils::execute_request(request, PROVIDER_NAME, &format!("POST {url}")).await?;

        let envelope: CloudflareResponse<T> = HttpUtils::parse_json(&text, PROVIDER_NAME)?;
        Self::unwrap_envelope(envelope).map(|(result, _)| result)
    }
}
