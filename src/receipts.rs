// src/receipts.rs

use log::debug;

use crate::gateway::{ChainGateway, VoteReceipt};
use crate::governance::{Principal, ProposalId};

/// The receipt `voter` holds for `proposal_id`, if any.
///
/// Informational only: any gateway failure reads as "not voted". The
/// contract itself accepts or rejects ballots.
pub async fn find_receipt(gateway: &dyn ChainGateway, proposal_id: ProposalId, voter: &Principal) -> Option<VoteReceipt> {
    if voter.as_str().trim().is_empty() {
        return None;
    }
    match gateway.vote_receipt(proposal_id, voter).await {
        Ok(receipt) => receipt,
        Err(e) => {
            debug!("[Receipt] Lookup for {} on proposal #{} failed, treating as not voted: {}", voter, proposal_id, e);
            None
        }
    }
}

pub async fn has_voted(gateway: &dyn ChainGateway, proposal_id: ProposalId, voter: &Principal) -> bool {
    find_receipt(gateway, proposal_id, voter).await.is_some()
}
