// File: tests/common/mod.rs

#![allow(dead_code)]

use async_trait::async_trait;
use dao_governance_client::{
    ChainGateway, FetchPolicy, GatewayError, Principal, ProposalId, ProposalPayload, RawProposalRecord,
    VoteReceipt,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const PROPOSER: &str = "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7";
pub const RECIPIENT: &str = "SP3FBR2AGK5H9QBDH3EEN6DF8EK8JY7RX8QJ5SVTE";

pub fn record(end_height: u64, for_votes: u64, against_votes: u64, abstain_votes: u64) -> RawProposalRecord {
    RawProposalRecord {
        proposer: Principal::from(PROPOSER),
        payload: ProposalPayload {
            kind: "stx-transfer".to_string(),
            amount: 1_000_000,
            recipient: Principal::from(RECIPIENT),
            memo: None,
        },
        start_height: end_height.saturating_sub(1008),
        end_height,
        eta: None,
        for_votes,
        against_votes,
        abstain_votes,
        executed: false,
        cancelled: false,
    }
}

pub fn fast_policy(max_concurrency: usize) -> FetchPolicy {
    FetchPolicy {
        max_concurrency,
        max_attempts: 3,
        retry_base_delay_ms: 1,
    }
}

/// In-memory ledger with knobs for absent ids, flaky ids and broken ids.
#[derive(Default)]
pub struct MockGateway {
    pub count: u64,
    pub height: u64,
    pub balance: u128,
    records: HashMap<ProposalId, RawProposalRecord>,
    receipts: HashMap<(ProposalId, String), VoteReceipt>,
    malformed: HashSet<ProposalId>,
    panics: HashSet<ProposalId>,
    transient_failures: Mutex<HashMap<ProposalId, u32>>,
    count_failures: Mutex<u32>,
    balance_unavailable: bool,
    receipts_unavailable: bool,
    latency: Duration,
    record_calls: Mutex<HashMap<ProposalId, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockGateway {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    /// Stores `record` under `id` and bumps the count to cover it.
    pub fn with_record(mut self, id: ProposalId, record: RawProposalRecord) -> Self {
        self.records.insert(id, record);
        self.count = self.count.max(id);
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn with_balance(mut self, balance: u128) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_receipt(self, id: ProposalId, voter: &str) -> Self {
        self.with_ballot(id, voter, VoteReceipt::default())
    }

    pub fn with_ballot(mut self, id: ProposalId, voter: &str, receipt: VoteReceipt) -> Self {
        self.receipts.insert((id, voter.to_string()), receipt);
        self
    }

    pub fn with_malformed(mut self, id: ProposalId) -> Self {
        self.malformed.insert(id);
        self.count = self.count.max(id);
        self
    }

    /// Queries for `id` panic inside the gateway.
    pub fn with_panic(mut self, id: ProposalId) -> Self {
        self.panics.insert(id);
        self.count = self.count.max(id);
        self
    }

    /// The first `times` queries for `id` fail with a transport error.
    pub fn with_transient_failures(self, id: ProposalId, times: u32) -> Self {
        if let Ok(mut failures) = self.transient_failures.lock() {
            failures.insert(id, times);
        }
        self
    }

    pub fn with_count_failures(self, times: u32) -> Self {
        if let Ok(mut failures) = self.count_failures.lock() {
            *failures = times;
        }
        self
    }

    pub fn with_balance_unavailable(mut self) -> Self {
        self.balance_unavailable = true;
        self
    }

    pub fn with_receipts_unavailable(mut self) -> Self {
        self.receipts_unavailable = true;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn record_calls(&self, id: ProposalId) -> u32 {
        self.record_calls.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    pub fn total_record_calls(&self) -> u32 {
        self.record_calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainGateway for MockGateway {
    async fn proposal_count(&self) -> Result<u64, GatewayError> {
        let mut failures = self.count_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(GatewayError::Unavailable("node offline".to_string()));
        }
        Ok(self.count)
    }

    async fn proposal_record(&self, id: ProposalId) -> Result<Option<RawProposalRecord>, GatewayError> {
        *self.record_calls.lock().unwrap().entry(id).or_insert(0) += 1;
        if self.panics.contains(&id) {
            panic!("gateway bug on #{}", id);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);
        if !self.latency.is_zero() {
            // Vary completion order so callers cannot rely on it.
            let jitter = Duration::from_millis(id * 7 % 5);
            tokio::time::sleep(self.latency + jitter).await;
        }

        {
            let mut failures = self.transient_failures.lock().unwrap();
            if let Some(left) = failures.get_mut(&id) {
                if *left > 0 {
                    *left -= 1;
                    return Err(GatewayError::Unavailable(format!("timeout on #{}", id)));
                }
            }
        }
        if self.malformed.contains(&id) {
            return Err(GatewayError::malformed("proposal record", "missing field `payload`"));
        }
        Ok(self.records.get(&id).cloned())
    }

    async fn vote_receipt(&self, id: ProposalId, voter: &Principal) -> Result<Option<VoteReceipt>, GatewayError> {
        if self.receipts_unavailable {
            return Err(GatewayError::Unavailable("receipt index offline".to_string()));
        }
        Ok(self.receipts.get(&(id, voter.as_str().to_string())).cloned())
    }

    async fn current_block_height(&self) -> Result<u64, GatewayError> {
        Ok(self.height)
    }

    async fn treasury_balance(&self) -> Result<u128, GatewayError> {
        if self.balance_unavailable {
            return Err(GatewayError::Unavailable("balance query timed out".to_string()));
        }
        Ok(self.balance)
    }
}
