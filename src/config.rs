use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::domain::types::RelayerType;
use serde::Deserialize;
use std::time::Duration;

pub const RPC_URL_ENV: &str = "EVM_GOVERNANCE_RPC_URL";
pub const MANA_URL_ENV: &str = "EVM_GOVERNANCE_MANA_URL";

const DEFAULT_MANA_URL: &str = "https://mana.box";
const DEFAULT_IPFS_GATEWAY: &str = "https://pineapple.fyi";
const DEFAULT_MAX_RESPONSE_BYTES: u64 = 2 * 1024 * 1024;
const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 8;
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 10_000;

/// Runtime settings for one chain's action client.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    #[serde(default)]
    pub fallback_rpc_url: Option<String>,
    #[serde(default = "default_mana_url")]
    pub mana_url: String,
    #[serde(default = "default_ipfs_gateway")]
    pub ipfs_gateway: String,
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,
    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: usize,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default)]
    pub low_priority_relayers: Vec<RelayerType>,
}

fn default_mana_url() -> String {
    DEFAULT_MANA_URL.to_string()
}

fn default_ipfs_gateway() -> String {
    DEFAULT_IPFS_GATEWAY.to_string()
}

fn default_max_response_bytes() -> u64 {
    DEFAULT_MAX_RESPONSE_BYTES
}

fn default_max_concurrent_queries() -> usize {
    DEFAULT_MAX_CONCURRENT_QUERIES
}

fn default_query_timeout_ms() -> u64 {
    DEFAULT_QUERY_TIMEOUT_MS
}

/// Fan-out limits for voting power queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryLimits {
    pub max_concurrency: usize,
    pub query_timeout: Duration,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENT_QUERIES,
            query_timeout: Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS),
        }
    }
}

impl ClientConfig {
    pub fn new(chain_id: u64, rpc_url: &str) -> Self {
        Self {
            chain_id,
            rpc_url: rpc_url.to_string(),
            fallback_rpc_url: None,
            mana_url: default_mana_url(),
            ipfs_gateway: default_ipfs_gateway(),
            max_response_bytes: default_max_response_bytes(),
            max_concurrent_queries: default_max_concurrent_queries(),
            query_timeout_ms: default_query_timeout_ms(),
            low_priority_relayers: Vec::new(),
        }
    }

    pub fn from_toml_str(raw: &str) -> GovernanceResult<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|error| GovernanceError::Config(format!("invalid client config: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `EVM_GOVERNANCE_*` environment overrides, then re-validate.
    pub fn with_env_overrides(mut self) -> GovernanceResult<Self> {
        if let Some(rpc_url) = non_empty_env(RPC_URL_ENV) {
            self.rpc_url = rpc_url;
        }
        if let Some(mana_url) = non_empty_env(MANA_URL_ENV) {
            self.mana_url = mana_url;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> GovernanceResult<()> {
        if self.rpc_url.trim().is_empty() {
            return Err(GovernanceError::Config("rpc_url must be non-empty".to_string()));
        }
        if self.mana_url.trim().is_empty() {
            return Err(GovernanceError::Config("mana_url must be non-empty".to_string()));
        }
        if self.ipfs_gateway.trim().is_empty() {
            return Err(GovernanceError::Config(
                "ipfs_gateway must be non-empty".to_string(),
            ));
        }
        if self.max_concurrent_queries == 0 {
            return Err(GovernanceError::Config(
                "max_concurrent_queries must be at least 1".to_string(),
            ));
        }
        if self.query_timeout_ms == 0 {
            return Err(GovernanceError::Config(
                "query_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            max_concurrency: self.max_concurrent_queries,
            query_timeout: Duration::from_millis(self.query_timeout_ms),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
