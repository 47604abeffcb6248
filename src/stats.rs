// src/stats.rs

use serde::Serialize;

use crate::governance::{Proposal, ProposalStatus, MICRO_UNITS_PER_TOKEN};
use crate::serde_helpers;

/// DAO-wide summary, rebuilt from scratch on every read cycle.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DaoStats {
    pub total_proposals: usize,
    /// Proposals still in their voting window.
    pub active_proposals: usize,
    /// For, against and abstain weight summed over every proposal.
    #[serde(with = "serde_helpers::uint128")]
    pub total_votes: u128,
    /// Treasury holdings in the smallest currency unit. Not vote weight.
    #[serde(with = "serde_helpers::uint128")]
    pub treasury_balance: u128,
}

impl DaoStats {
    /// Single pass over `proposals`. The balance comes from its own ledger query.
    pub fn aggregate(proposals: &[Proposal], treasury_balance: u128) -> Self {
        proposals.iter().fold(
            Self {
                treasury_balance,
                ..Self::default()
            },
            |mut stats, proposal| {
                stats.total_proposals += 1;
                if proposal.status == ProposalStatus::Voting {
                    stats.active_proposals += 1;
                }
                stats.total_votes = stats.total_votes.saturating_add(proposal.total_votes());
                stats
            },
        )
    }

    /// Whole tokens, for display.
    pub fn treasury_balance_tokens(&self) -> f64 {
        self.treasury_balance as f64 / MICRO_UNITS_PER_TOKEN as f64
    }
}
