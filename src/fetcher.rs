// src/fetcher.rs

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::gateway::{ChainGateway, GatewayError};
use crate::governance::{Proposal, ProposalId};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Proposal count query failed: {0}")]
    CountQueryFailed(#[source] GatewayError),
    #[error("Block height query failed: {0}")]
    HeightQueryFailed(#[source] GatewayError),
    #[error("Treasury balance query failed: {0}")]
    BalanceQueryFailed(#[source] GatewayError),
}

impl FetchError {
    /// Whether re-running the read cycle might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::CountQueryFailed(e) | Self::HeightQueryFailed(e) | Self::BalanceQueryFailed(e) => e.is_retryable(),
        }
    }
}

/// Limits for one read cycle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FetchPolicy {
    /// Record queries allowed in flight at once.
    pub max_concurrency: usize,
    /// Total tries per query, first attempt included.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub retry_base_delay_ms: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            max_attempts: 3,
            retry_base_delay_ms: 250,
        }
    }
}

impl FetchPolicy {
    fn backoff(&self, failed_attempts: u32) -> Duration {
        let factor = 1u64 << failed_attempts.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(factor))
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is used up.
pub async fn with_retry<T, F, Fut>(policy: &FetchPolicy, what: &str, mut op: F) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.backoff(attempt);
                debug!("[Fetch] {} failed (attempt {}/{}): {}. Retrying in {:?}", what, attempt, max_attempts, e, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// An identifier that could not be turned into a proposal this cycle.
#[derive(Debug)]
pub struct DroppedRecord {
    pub id: ProposalId,
    pub reason: GatewayError,
}

/// Result of one read cycle over all proposals.
#[derive(Debug, Default)]
pub struct ProposalBatch {
    /// Height the statuses were derived at.
    pub height: u64,
    /// Most recent first.
    pub proposals: Vec<Proposal>,
    /// Ids lost to errors. Ids the ledger reports as absent are not listed.
    pub dropped: Vec<DroppedRecord>,
}

pub struct ProposalFetcher {
    gateway: Arc<dyn ChainGateway>,
    policy: FetchPolicy,
}

impl ProposalFetcher {
    pub fn new(gateway: Arc<dyn ChainGateway>, policy: FetchPolicy) -> Self {
        Self { gateway, policy }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetches every proposal with ids `1..=count` and derives its status.
    ///
    /// Records are queried concurrently, at most `max_concurrency` at a
    /// time. Dropping the returned future aborts queries still in flight.
    pub async fn fetch_all(&self) -> Result<ProposalBatch, FetchError> {
        let gateway: &dyn ChainGateway = self.gateway.as_ref();
        let count = with_retry(&self.policy, "proposal count", move || gateway.proposal_count())
            .await
            .map_err(FetchError::CountQueryFailed)?;
        let height = with_retry(&self.policy, "block height", move || gateway.current_block_height())
            .await
            .map_err(FetchError::HeightQueryFailed)?;

        let mut batch = ProposalBatch {
            height,
            ..ProposalBatch::default()
        };
        if count == 0 {
            info!("[Fetch] Ledger reports no proposals.");
            return Ok(batch);
        }

        let permits = Arc::new(Semaphore::new(self.policy.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut task_ids = HashMap::new();
        for id in 1..=count {
            let gateway = Arc::clone(&self.gateway);
            let permits = Arc::clone(&permits);
            let policy = self.policy.clone();
            let handle = tasks.spawn(async move {
                // The semaphore is never closed, so acquire only fails if that changes.
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (id, Err(GatewayError::Unavailable("fetch cancelled".to_string()))),
                };
                let what = format!("proposal #{}", id);
                let outcome = with_retry(&policy, &what, || gateway.proposal_record(id)).await;
                (id, outcome)
            });
            task_ids.insert(handle.id(), id);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, (id, Ok(Some(record))))) => batch.proposals.push(Proposal::from_record(id, record, height)),
                Ok((_, (id, Ok(None)))) => debug!("[Fetch] Proposal #{} is absent on the ledger, skipping.", id),
                Ok((_, (id, Err(reason)))) => {
                    warn!("[Fetch] Dropping proposal #{}: {}", id, reason);
                    batch.dropped.push(DroppedRecord { id, reason });
                }
                Err(e) => match task_ids.get(&e.id()) {
                    Some(&id) => {
                        error!("[Fetch] Record task for proposal #{} failed: {}", id, e);
                        batch.dropped.push(DroppedRecord {
                            id,
                            reason: GatewayError::Unavailable(format!("record task failed: {}", e)),
                        });
                    }
                    None => error!("[Fetch] Record task failed: {}", e),
                },
            }
        }

        batch.proposals.sort_by(|a, b| b.id.cmp(&a.id));
        batch.dropped.sort_by_key(|d| d.id);
        info!(
            "[Fetch] Loaded {} of {} proposals at height {} ({} dropped).",
            batch.proposals.len(),
            count,
            height,
            batch.dropped.len()
        );
        Ok(batch)
    }
}
