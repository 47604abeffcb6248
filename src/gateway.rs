// src/gateway.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::governance::{Principal, ProposalId, RawProposalRecord, VoteChoice};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
    #[error("Ledger rejected query ({code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("Malformed {what} from gateway: {reason}")]
    MalformedRecord { what: &'static str, reason: String },
}

impl GatewayError {
    /// Transport-level failures are worth another attempt. A ledger that
    /// answered with an error or unparseable data will answer the same again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Unavailable(_))
    }

    pub fn malformed(what: &'static str, reason: impl ToString) -> Self {
        Self::MalformedRecord {
            what,
            reason: reason.to_string(),
        }
    }
}

/// Proof that a principal voted. Only its presence is authoritative; the
/// details are whatever the contract chose to record.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteReceipt {
    #[serde(default)]
    pub choice: Option<VoteChoice>,
    #[serde(default, with = "crate::serde_helpers::option_uint64")]
    pub weight: Option<u64>,
}

/// Read-only view of the ledger.
///
/// Implementations must be safe to call concurrently; the fetcher fans
/// out many queries against one shared instance.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Number of proposals created so far. Ids run from 1 to this value.
    async fn proposal_count(&self) -> Result<u64, GatewayError>;

    /// `Ok(None)` when the ledger has no record for `id`.
    async fn proposal_record(&self, id: ProposalId) -> Result<Option<RawProposalRecord>, GatewayError>;

    async fn vote_receipt(&self, id: ProposalId, voter: &Principal) -> Result<Option<VoteReceipt>, GatewayError>;

    async fn current_block_height(&self) -> Result<u64, GatewayError>;

    /// Treasury holdings in the smallest currency unit.
    async fn treasury_balance(&self) -> Result<u128, GatewayError>;
}
