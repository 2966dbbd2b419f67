/// Client for the mana relayer.
///
/// Two surfaces: `send` forwards a signed EIP-712 envelope for relayed submission, and
/// `/eth_rpc/{chainId}` dispatches permissionless calls (finalize, execute,
/// executeQueuedProposal) that the relayer pays gas for.
use crate::config::ClientConfig;
use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::features::http_fetch::HttpTransport;
use async_trait::async_trait;
use serde_json::{json, Value};

#[async_trait]
pub trait EnvelopeRelay: Send + Sync {
    async fn send(&self, envelope: &Value) -> GovernanceResult<Value>;
}

#[async_trait]
pub trait ExecutionDispatcher: Send + Sync {
    async fn execution_call(
        &self,
        chain_id: u64,
        method: &str,
        params: Value,
    ) -> GovernanceResult<Value>;
}

pub struct ManaClient {
    mana_url: String,
    transport: HttpTransport,
}

impl ManaClient {
    pub fn new(mana_url: &str, max_response_bytes: u64) -> GovernanceResult<Self> {
        let mana_url = mana_url.trim().trim_end_matches('/');
        if mana_url.is_empty() {
            return Err(GovernanceError::Config(
                "mana url is not configured".to_string(),
            ));
        }
        Ok(Self {
            mana_url: mana_url.to_string(),
            transport: HttpTransport::new(max_response_bytes),
        })
    }

    pub fn from_config(config: &ClientConfig) -> GovernanceResult<Self> {
        Self::new(&config.mana_url, config.max_response_bytes)
    }

    pub fn eth_rpc_url(&self, chain_id: u64) -> String {
        format!("{}/eth_rpc/{chain_id}", self.mana_url)
    }

    async fn rpc(&self, url: &str, method: &str, params: Value) -> GovernanceResult<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": Value::Null
        });
        let response = self
            .transport
            .post_json(url, &body)
            .await
            .map_err(|error| GovernanceError::Relayer(format!("{method} failed: {error}")))?;
        unwrap_rpc_result(method, response)
    }
}

fn unwrap_rpc_result(method: &str, response: Value) -> GovernanceResult<Value> {
    if let Some(error) = response.get("error").filter(|error| !error.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(GovernanceError::Relayer(format!(
            "{method} rejected: {message}"
        )));
    }
    Ok(response.get("result").cloned().unwrap_or(Value::Null))
}

#[async_trait]
impl EnvelopeRelay for ManaClient {
    async fn send(&self, envelope: &Value) -> GovernanceResult<Value> {
        log::info!("relay_send url={}", self.mana_url);
        self.rpc(&self.mana_url, "send", json!({ "envelope": envelope }))
            .await
    }
}

#[async_trait]
impl ExecutionDispatcher for ManaClient {
    async fn execution_call(
        &self,
        chain_id: u64,
        method: &str,
        params: Value,
    ) -> GovernanceResult<Value> {
        let url = self.eth_rpc_url(chain_id);
        log::info!("execution_call chain_id={chain_id} method={method}");
        self.rpc(&url, method, params).await
    }
}
