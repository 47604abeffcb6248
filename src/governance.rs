// src/governance.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::serde_helpers;

/// Identifier assigned by the ledger when a proposal is created. Starts at 1.
pub type ProposalId = u64;

/// Ledger block time. One block is roughly ten minutes, six per hour.
pub const BLOCK_TIME: Duration = Duration::from_secs(600);
pub const BLOCKS_PER_HOUR: u64 = 6;

/// Smallest currency units per whole token.
pub const MICRO_UNITS_PER_TOKEN: u128 = 1_000_000;

/// Address of an account or contract on the ledger.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Principal(pub String);

impl Principal {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

/// The transfer a proposal asks the treasury to make.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalPayload {
    pub kind: String,
    /// Amount in the smallest currency unit.
    #[serde(with = "serde_helpers::uint128")]
    pub amount: u128,
    pub recipient: Principal,
    #[serde(default, with = "serde_helpers::option_hex", skip_serializing_if = "Option::is_none")]
    pub memo: Option<Vec<u8>>,
}

/// A proposal exactly as the ledger stores it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawProposalRecord {
    pub proposer: Principal,
    pub payload: ProposalPayload,
    #[serde(with = "serde_helpers::uint64")]
    pub start_height: u64,
    #[serde(with = "serde_helpers::uint64")]
    pub end_height: u64,
    /// Timelock expiry. `None` until the proposal is queued.
    #[serde(default, with = "serde_helpers::option_uint64")]
    pub eta: Option<u64>,
    #[serde(with = "serde_helpers::uint64")]
    pub for_votes: u64,
    #[serde(with = "serde_helpers::uint64")]
    pub against_votes: u64,
    #[serde(with = "serde_helpers::uint64")]
    pub abstain_votes: u64,
    pub executed: bool,
    pub cancelled: bool,
}

impl RawProposalRecord {
    /// Sum of all three tallies.
    pub fn total_votes(&self) -> u128 {
        u128::from(self.for_votes) + u128::from(self.against_votes) + u128::from(self.abstain_votes)
    }

    /// Only a strict majority of for over against passes. A tie fails.
    pub fn passed(&self) -> bool {
        self.for_votes > self.against_votes
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalStatus {
    /// Voting window still open.
    Voting,
    /// Passed, timelock not yet expired (or not yet queued).
    Queued,
    /// Passed and timelock expired; executable.
    Ready,
    Executed,
    Cancelled,
    /// Voting closed without a strict majority for.
    Failed,
}

impl ProposalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Executed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Voting => "Voting",
            Self::Queued => "Queued",
            Self::Ready => "Ready",
            Self::Executed => "Executed",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Status plus countdown figures, which are only set while voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedStatus {
    pub status: ProposalStatus,
    pub blocks_remaining: Option<u64>,
    pub time_remaining: Option<Duration>,
}

/// Computes the lifecycle status of a record at `current_height`.
///
/// Rules are checked in order and the first match wins:
/// cancelled, executed, voting window open, failed vote, queued, ready.
pub fn derive_status(record: &RawProposalRecord, current_height: u64) -> DerivedStatus {
    let settled = |status| DerivedStatus {
        status,
        blocks_remaining: None,
        time_remaining: None,
    };

    if record.cancelled {
        return settled(ProposalStatus::Cancelled);
    }
    if record.executed {
        return settled(ProposalStatus::Executed);
    }
    if current_height < record.end_height {
        let blocks = record.end_height - current_height;
        return DerivedStatus {
            status: ProposalStatus::Voting,
            blocks_remaining: Some(blocks),
            time_remaining: Some(blocks_to_duration(blocks)),
        };
    }
    if !record.passed() {
        return settled(ProposalStatus::Failed);
    }
    // An eta of 0 is the contract's "not queued yet" sentinel.
    match record.eta {
        Some(eta) if eta > 0 && current_height >= eta => settled(ProposalStatus::Ready),
        _ => settled(ProposalStatus::Queued),
    }
}

fn blocks_to_duration(blocks: u64) -> Duration {
    let secs = BLOCK_TIME.as_secs().saturating_mul(blocks);
    Duration::from_secs(secs)
}

/// A proposal record together with everything derived from it for one read cycle.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: ProposalId,
    #[serde(flatten)]
    pub record: RawProposalRecord,
    pub status: ProposalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks_remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serde_helpers::option_duration_secs")]
    pub time_remaining: Option<Duration>,
}

impl Proposal {
    pub fn from_record(id: ProposalId, record: RawProposalRecord, current_height: u64) -> Self {
        let derived = derive_status(&record, current_height);
        Self {
            id,
            record,
            status: derived.status,
            blocks_remaining: derived.blocks_remaining,
            time_remaining: derived.time_remaining,
        }
    }

    pub fn title(&self) -> String {
        format!("Proposal #{}", self.id)
    }

    /// The memo text if there is one, otherwise a summary of the payload kind.
    pub fn description(&self) -> String {
        let memo = self
            .record
            .payload
            .memo
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).trim_end_matches('\0').trim().to_string())
            .filter(|text| !text.is_empty());

        memo.unwrap_or_else(|| format!("{} transfer", self.record.payload.kind))
    }

    pub fn hours_remaining(&self) -> Option<u64> {
        self.blocks_remaining.map(|blocks| blocks / BLOCKS_PER_HOUR)
    }

    pub fn total_votes(&self) -> u128 {
        self.record.total_votes()
    }

    /// Percentages of for and against out of all votes cast, abstentions included.
    pub fn vote_shares(&self) -> VoteShares {
        let total = self.total_votes();
        if total == 0 {
            return VoteShares::default();
        }
        let pct = |votes: u64| votes as f64 * 100.0 / total as f64;
        VoteShares {
            for_percent: pct(self.record.for_votes),
            against_percent: pct(self.record.against_votes),
        }
    }

    /// Whether a ballot may still be cast. The ledger has the final word.
    pub fn accepts_votes(&self) -> bool {
        self.status == ProposalStatus::Voting
    }
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoteShares {
    pub for_percent: f64,
    pub against_percent: f64,
}

/// Ballot choice as encoded by the governance contract.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum VoteChoice {
    Against = 0,
    For = 1,
    Abstain = 2,
}

impl VoteChoice {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for VoteChoice {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Against),
            1 => Ok(Self::For),
            2 => Ok(Self::Abstain),
            other => Err(format!("unknown vote choice {}", other)),
        }
    }
}

impl From<VoteChoice> for u8 {
    fn from(choice: VoteChoice) -> Self {
        choice.code()
    }
}

/// What the core hands the transaction-submission layer for a ballot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteIntent {
    pub proposal_id: ProposalId,
    pub choice: VoteChoice,
}

impl VoteIntent {
    /// Returns `None` when the proposal no longer accepts votes.
    pub fn for_proposal(proposal: &Proposal, choice: VoteChoice) -> Option<Self> {
        proposal.accepts_votes().then_some(Self {
            proposal_id: proposal.id,
            choice,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProposalFilter {
    #[default]
    All,
    Voting,
    /// Queued and Ready.
    Queued,
}

impl ProposalFilter {
    pub fn matches(self, proposal: &Proposal) -> bool {
        match self {
            Self::All => true,
            Self::Voting => proposal.status == ProposalStatus::Voting,
            Self::Queued => matches!(proposal.status, ProposalStatus::Queued | ProposalStatus::Ready),
        }
    }

    pub fn apply<'a>(self, proposals: &'a [Proposal]) -> impl Iterator<Item = &'a Proposal> + 'a {
        proposals.iter().filter(move |p| self.matches(p))
    }
}

impl FromStr for ProposalFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "voting" => Ok(Self::Voting),
            "queued" => Ok(Self::Queued),
            other => Err(format!("unknown filter '{}', expected all, voting or queued", other)),
        }
    }
}
