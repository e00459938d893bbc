//! Reconciliation: diff desired records against provider state and apply
//! the result as one atomic batch.
//!
//! The diff is defensive by construction. Apex and reserved names are
//! dropped from both sides before comparison, and an oversized diff is
//! marked unusable instead of applied.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use dns_registrar_provider::{
    canonical_fqdn, BatchOutcome, BatchPatch, BatchRequest, RecordPayload, RemoteRecord,
    ZoneGateway,
};

use crate::config::{DomainInfo, GlobalConfig};
use crate::error::{CoreError, CoreResult};
use crate::schema::{display_remote, ExpandedDnsRecord};

/// Hard cap on operations in one diff. A sum above this marks the diff
/// unusable; it is a safety property, not a tunable.
pub const MAX_DIFF_OPERATIONS: usize = 200;

/// The computed change set for one zone.
#[derive(Debug, Default)]
pub struct DeploymentDiff {
    /// False when the operation count tripped [`MAX_DIFF_OPERATIONS`].
    /// An unavailable diff must never be applied.
    pub available: bool,
    pub to_create: Vec<RecordPayload>,
    pub to_update: Vec<BatchPatch>,
    pub to_delete: Vec<RemoteRecord>,
}

impl DeploymentDiff {
    #[must_use]
    pub fn total_operations(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_operations() == 0
    }
}

/// Whether reconciliation must keep its hands off `fqdn` entirely.
///
/// The apex itself and anything at or under a reserved subdomain is out of
/// bounds on both sides of the diff, so such a record is neither created nor
/// deleted no matter where it appears. Names outside the domain are treated
/// the same way.
fn is_untouchable(fqdn: &str, domain: &str, cfg: &GlobalConfig) -> bool {
    let name = fqdn.trim_end_matches('.');
    if name == domain {
        return true;
    }
    let Some(relative) = name.strip_suffix(&format!(".{domain}")) else {
        return true;
    };
    // label directly under the apex decides the whole subtree
    let top = relative.rsplit('.').next().unwrap_or(relative);
    cfg.is_reserved_subdomain(top)
}

/// Compute the change set turning `remote` into `desired` for one domain.
#[must_use]
pub fn diff_records(
    desired: &[ExpandedDnsRecord],
    remote: Vec<RemoteRecord>,
    domain: &str,
    cfg: &GlobalConfig,
) -> DeploymentDiff {
    let mut groups: BTreeMap<String, (Vec<RecordPayload>, Vec<RemoteRecord>)> = BTreeMap::new();

    for record in desired {
        if is_untouchable(&record.payload.name, domain, cfg) {
            warn!(
                "desired record {} is untouchable, ignoring ({})",
                record.display_string(),
                record.provenance.config_file
            );
            continue;
        }
        groups
            .entry(record.payload.identity())
            .or_default()
            .0
            .push(record.payload.clone());
    }
    for mut record in remote {
        // gateways may hand back dot-less names; identity and canonical JSON
        // both include the name, so normalize before grouping
        record.payload.name = canonical_fqdn(&record.payload.name);
        if is_untouchable(&record.payload.name, domain, cfg) {
            debug!("remote record {} is untouchable, ignoring", record.payload.name);
            continue;
        }
        groups
            .entry(record.payload.identity())
            .or_default()
            .1
            .push(record);
    }

    let mut diff = DeploymentDiff {
        available: true,
        ..DeploymentDiff::default()
    };

    for (identity, (mut wanted, mut actual)) in groups {
        // drop exact matches first; they are no-ops
        wanted.retain(|payload| {
            let canon = payload.canonical_json();
            if let Some(pos) = actual
                .iter()
                .position(|r| r.payload.canonical_json() == canon)
            {
                actual.swap_remove(pos);
                false
            } else {
                true
            }
        });

        // Pair leftovers positionally into updates: one operation instead of
        // a delete plus a create. Which desired entry lands on which id is
        // arbitrary; the records are interchangeable within the group.
        let pairs = wanted.len().min(actual.len());
        debug!(
            "group {identity}: {} to pair, {} create, {} delete",
            pairs,
            wanted.len() - pairs,
            actual.len() - pairs
        );
        for (payload, existing) in wanted.drain(..pairs).zip(actual.drain(..pairs)) {
            diff.to_update.push(BatchPatch {
                id: existing.id,
                payload,
            });
        }
        diff.to_create.append(&mut wanted);
        for record in &actual {
            debug!("planned delete: {}", display_remote(record));
        }
        diff.to_delete.append(&mut actual);
    }

    let total = diff.total_operations();
    if total > MAX_DIFF_OPERATIONS {
        warn!(
            "diff for {domain} holds {total} operations (cap {MAX_DIFF_OPERATIONS}), marking unavailable"
        );
        diff.available = false;
    } else {
        info!(
            "diff for {domain}: {} create, {} update, {} delete",
            diff.to_create.len(),
            diff.to_update.len(),
            diff.to_delete.len()
        );
    }
    diff
}

/// Reconciles one domain's zone through a [`ZoneGateway`].
pub struct DomainDeployer<'a> {
    gateway: &'a dyn ZoneGateway,
    cfg: &'a GlobalConfig,
    domain: &'a DomainInfo,
}

impl<'a> DomainDeployer<'a> {
    #[must_use]
    pub fn new(gateway: &'a dyn ZoneGateway, cfg: &'a GlobalConfig, domain: &'a DomainInfo) -> Self {
        Self {
            gateway,
            cfg,
            domain,
        }
    }

    /// Fetch the zone's current records and diff them against `desired`.
    ///
    /// # Errors
    ///
    /// Provider failures propagate untouched; retry policy belongs to the
    /// caller.
    pub async fn calculate_diff(
        &self,
        desired: &[ExpandedDnsRecord],
    ) -> CoreResult<DeploymentDiff> {
        let remote = self
            .gateway
            .list_records(&self.domain.cloudflare_zone_id)
            .await?;
        debug!(
            "zone {} currently holds {} records",
            self.domain.name,
            remote.len()
        );
        Ok(diff_records(desired, remote, &self.domain.name, self.cfg))
    }

    /// Submit the diff as one atomic batch.
    ///
    /// Consumes the diff: record ids inside it are spent whether the batch
    /// succeeds or fails, so a retry must start from a fresh diff.
    ///
    /// # Errors
    ///
    /// [`CoreError::DiffUnavailable`] when the diff tripped the operation
    /// cap; provider errors propagate to the caller otherwise.
    pub async fn apply_diff(&self, diff: DeploymentDiff) -> CoreResult<BatchOutcome> {
        if !diff.available {
            return Err(CoreError::DiffUnavailable {
                total: diff.total_operations(),
            });
        }
        if diff.is_empty() {
            info!("zone {} already in sync", self.domain.name);
            return Ok(BatchOutcome::default());
        }

        let request = BatchRequest {
            deletes: diff.to_delete.into_iter().map(|r| r.id).collect(),
            patches: diff.to_update,
            posts: diff.to_create,
        };
        let outcome = self
            .gateway
            .batch_apply(&self.domain.cloudflare_zone_id, &request)
            .await?;
        info!(
            "zone {} applied: {} created, {} updated, {} deleted",
            self.domain.name, outcome.created, outcome.updated, outcome.deleted
        );
        Ok(outcome)
    }
}
