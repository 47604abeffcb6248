// src/config.rs

use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path};
use thiserror::Error;

use crate::fetcher::FetchPolicy;
use crate::governance::Principal;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where the DAO lives and how hard to lean on the node that serves it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub rpc_url: String,
    /// Deployer principal of the governance contract.
    pub contract_address: String,
    pub contract_name: String,
    /// Account holding DAO funds. Defaults to the governance contract itself.
    pub treasury_address: Option<String>,
    pub request_timeout_secs: u64,
    pub fetch: FetchPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8080".to_string(),
            contract_address: "SP000000000000000000002Q6VF78".to_string(),
            contract_name: "dao-core".to_string(),
            treasury_address: None,
            request_timeout_secs: 10,
            fetch: FetchPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::Invalid("rpc_url is empty".to_string()));
        }
        if self.contract_address.trim().is_empty() || self.contract_name.trim().is_empty() {
            return Err(ConfigError::Invalid("contract address and name are required".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be positive".to_string()));
        }
        if self.fetch.max_concurrency == 0 {
            return Err(ConfigError::Invalid("fetch.max_concurrency must be positive".to_string()));
        }
        if self.fetch.max_attempts == 0 {
            return Err(ConfigError::Invalid("fetch.max_attempts must be positive".to_string()));
        }
        Ok(())
    }

    /// `address.name`, the form the node expects in contract calls.
    pub fn contract_id(&self) -> String {
        format!("{}.{}", self.contract_address, self.contract_name)
    }

    pub fn treasury_principal(&self) -> Principal {
        match &self.treasury_address {
            Some(address) => Principal::new(address.clone()),
            None => Principal::new(self.contract_id()),
        }
    }
}
