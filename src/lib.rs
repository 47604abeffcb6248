// src/lib.rs

pub mod client;
pub mod config;
pub mod fetcher;
pub mod gateway;
pub mod governance;
pub mod receipts;
pub mod rpc_client;
pub mod serde_helpers;
pub mod stats;

pub use client::{DaoClient, DaoSnapshot};
pub use config::{Config, ConfigError};
pub use fetcher::{DroppedRecord, FetchError, FetchPolicy, ProposalBatch, ProposalFetcher};
pub use gateway::{ChainGateway, GatewayError, VoteReceipt};
pub use governance::{
    derive_status, DerivedStatus, Principal, Proposal, ProposalFilter, ProposalId, ProposalPayload,
    ProposalStatus, RawProposalRecord, VoteChoice, VoteIntent,
};
pub use stats::DaoStats;
