use async_trait::async_trait;

use crate::error::Result;
use crate::types::{BatchOutcome, BatchRequest, RemoteRecord};

/// Gateway to one DNS provider's zone API.
///
/// The reconciliation engine only ever needs two operations: read the whole
/// zone, and apply one atomic batch of changes. Implementations must
/// guarantee all-or-nothing application of a batch — no partial visibility.
///
/// Errors are never recovered inside the gateway beyond transparent
/// transport retries; callers own the retry-with-backoff policy.
#[async_trait]
pub trait ZoneGateway: Send + Sync {
    /// List every record in the zone.
    async fn list_records(&self, zone_id: &str) -> Result<Vec<RemoteRecord>>;

    /// Apply one atomic batch (deletes, then patches, then posts).
    ///
    /// Either the whole batch is applied or none of it is.
    async fn batch_apply(&self, zone_id: &str, request: &BatchRequest) -> Result<BatchOutcome>;
}
