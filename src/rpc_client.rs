// src/rpc_client.rs

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::Config;
use crate::gateway::{ChainGateway, GatewayError, VoteReceipt};
use crate::governance::{Principal, ProposalId, RawProposalRecord};
use crate::serde_helpers;

const READ_ONLY_METHOD: &str = "contract_callReadOnly";
const BLOCK_HEIGHT_METHOD: &str = "chain_getBlockHeight";
const BALANCE_METHOD: &str = "account_getBalance";

const FN_NEXT_PROPOSAL_ID: &str = "get-next-proposal-id";
const FN_GET_PROPOSAL: &str = "get-proposal";
const FN_GET_RECEIPT: &str = "get-receipt";

#[derive(Serialize, Deserialize)]
struct JsonRpcRequest<T> {
    id: u64,
    jsonrpc: String,
    method: String,
    params: T,
}

#[derive(Serialize, Deserialize, Debug)]
struct JsonRpcResponse<T> {
    id: u64,
    jsonrpc: String,
    result: Option<T>,
    error: Option<JsonRpcErrorDetail>,
}

#[derive(Serialize, Deserialize, Debug)]
struct JsonRpcErrorDetail {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct Uint64(#[serde(with = "serde_helpers::uint64")] u64);

#[derive(Deserialize)]
struct Uint128(#[serde(with = "serde_helpers::uint128")] u128);

/// JSON-RPC client for a ledger node exposing read-only contract calls.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    contract_id: String,
    treasury: Principal,
    next_request_id: AtomicU64,
}

impl RpcClient {
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.rpc_url.clone(),
            contract_id: config.contract_id(),
            treasury: config.treasury_principal(),
            next_request_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Option<Value>, GatewayError> {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            id,
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        };

        let response = self.http.post(&self.url).json(&request).send().await?;
        if let Some(err) = status_error(method, response.status()) {
            return Err(err);
        }

        // A body cut off mid-read is a transport failure; only bytes that
        // arrived whole and still fail to parse are malformed.
        let bytes = response.bytes().await?;
        let body: JsonRpcResponse<Value> =
            serde_json::from_slice(&bytes).map_err(|e| GatewayError::malformed("rpc response", e))?;
        if body.id != id {
            return Err(GatewayError::malformed(
                "rpc response",
                format!("expected id {}, got {}", id, body.id),
            ));
        }
        if let Some(err) = body.error {
            return Err(GatewayError::Rejected {
                code: err.code,
                message: err.message,
            });
        }
        Ok(body.result)
    }

    async fn call_read_only(&self, function: &str, args: Value) -> Result<Option<Value>, GatewayError> {
        debug!("[RPC] {}::{} {}", self.contract_id, function, args);
        self.call(READ_ONLY_METHOD, json!([self.contract_id, function, args])).await
    }
}

#[async_trait]
impl ChainGateway for RpcClient {
    async fn proposal_count(&self) -> Result<u64, GatewayError> {
        let result = self.call_read_only(FN_NEXT_PROPOSAL_ID, json!([])).await?;
        decode_proposal_count(result)
    }

    async fn proposal_record(&self, id: ProposalId) -> Result<Option<RawProposalRecord>, GatewayError> {
        let result = self.call_read_only(FN_GET_PROPOSAL, json!([id])).await?;
        decode_proposal(result)
    }

    async fn vote_receipt(&self, id: ProposalId, voter: &Principal) -> Result<Option<VoteReceipt>, GatewayError> {
        let result = self.call_read_only(FN_GET_RECEIPT, json!([id, voter])).await?;
        Ok(decode_receipt(result))
    }

    async fn current_block_height(&self) -> Result<u64, GatewayError> {
        let result = self.call(BLOCK_HEIGHT_METHOD, json!([])).await?;
        decode_uint64("block height", result)
    }

    async fn treasury_balance(&self) -> Result<u128, GatewayError> {
        let result = self.call(BALANCE_METHOD, json!([self.treasury])).await?;
        let value = unwrap_optional(result).ok_or_else(|| GatewayError::malformed("treasury balance", "empty result"))?;
        serde_json::from_value::<Uint128>(value)
            .map(|Uint128(balance)| balance)
            .map_err(|e| GatewayError::malformed("treasury balance", e))
    }
}

/// Maps a non-success HTTP status to a gateway error. 408 and 429 are the
/// node shedding load, so they retry like a 5xx.
fn status_error(method: &str, status: StatusCode) -> Option<GatewayError> {
    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS {
        return Some(GatewayError::Unavailable(format!("{} answered {}", method, status)));
    }
    if status.is_client_error() {
        return Some(GatewayError::Rejected {
            code: i64::from(status.as_u16()),
            message: format!("{} {}", method, status),
        });
    }
    None
}

// Contract optionals may come back wrapped as `{"value": ...}`.
fn unwrap_optional(result: Option<Value>) -> Option<Value> {
    match result {
        None | Some(Value::Null) => None,
        Some(Value::Object(mut map)) if map.len() == 1 && map.contains_key("value") => {
            map.remove("value").filter(|v| !v.is_null())
        }
        Some(other) => Some(other),
    }
}

fn decode_uint64(what: &'static str, result: Option<Value>) -> Result<u64, GatewayError> {
    let value = unwrap_optional(result).ok_or_else(|| GatewayError::malformed(what, "empty result"))?;
    serde_json::from_value::<Uint64>(value)
        .map(|Uint64(n)| n)
        .map_err(|e| GatewayError::malformed(what, e))
}

/// The contract exposes the next id to be assigned; ids start at 1.
fn decode_proposal_count(result: Option<Value>) -> Result<u64, GatewayError> {
    decode_uint64("proposal count", result).map(|next_id| next_id.saturating_sub(1))
}

fn decode_proposal(result: Option<Value>) -> Result<Option<RawProposalRecord>, GatewayError> {
    match unwrap_optional(result) {
        None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| GatewayError::malformed("proposal record", e)),
    }
}

fn decode_receipt(result: Option<Value>) -> Option<VoteReceipt> {
    match unwrap_optional(result) {
        None | Some(Value::Bool(false)) => None,
        Some(value) => Some(serde_json::from_value(value).unwrap_or_default()),
    }
}
