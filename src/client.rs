// src/client.rs

use std::sync::Arc;

use crate::config::Config;
use crate::fetcher::{with_retry, FetchError, FetchPolicy, ProposalBatch, ProposalFetcher};
use crate::gateway::{ChainGateway, GatewayError, VoteReceipt};
use crate::governance::{Principal, ProposalId};
use crate::receipts;
use crate::rpc_client::RpcClient;
use crate::stats::DaoStats;

/// Proposals and the stats computed from them, read in the same cycle.
#[derive(Debug)]
pub struct DaoSnapshot {
    pub batch: ProposalBatch,
    pub stats: DaoStats,
}

/// Entry point for the read side of the DAO. Holds no state between calls
/// beyond the gateway it was given.
pub struct DaoClient {
    gateway: Arc<dyn ChainGateway>,
    fetcher: ProposalFetcher,
}

impl DaoClient {
    pub fn new(gateway: Arc<dyn ChainGateway>, policy: FetchPolicy) -> Self {
        let fetcher = ProposalFetcher::new(Arc::clone(&gateway), policy);
        Self { gateway, fetcher }
    }

    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let rpc = RpcClient::new(config)?;
        Ok(Self::new(Arc::new(rpc), config.fetch.clone()))
    }

    pub async fn proposals(&self) -> Result<ProposalBatch, FetchError> {
        self.fetcher.fetch_all().await
    }

    /// Runs the proposal cycle and the treasury balance query side by side.
    pub async fn snapshot(&self) -> Result<DaoSnapshot, FetchError> {
        let gateway: &dyn ChainGateway = self.gateway.as_ref();
        let policy = self.fetcher.policy();
        let (batch, balance) = tokio::join!(
            self.fetcher.fetch_all(),
            with_retry(policy, "treasury balance", move || gateway.treasury_balance())
        );
        let batch = batch?;
        let balance = balance.map_err(FetchError::BalanceQueryFailed)?;
        let stats = DaoStats::aggregate(&batch.proposals, balance);
        Ok(DaoSnapshot { batch, stats })
    }

    pub async fn stats(&self) -> Result<DaoStats, FetchError> {
        self.snapshot().await.map(|snapshot| snapshot.stats)
    }

    pub async fn vote_receipt(&self, proposal_id: ProposalId, voter: &Principal) -> Option<VoteReceipt> {
        receipts::find_receipt(self.gateway.as_ref(), proposal_id, voter).await
    }

    pub async fn has_voted(&self, proposal_id: ProposalId, voter: &Principal) -> bool {
        receipts::has_voted(self.gateway.as_ref(), proposal_id, voter).await
    }
}
