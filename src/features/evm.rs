use crate::config::ClientConfig;
use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::domain::hex::{normalize_address, normalize_hex_blob, parse_hex_u64};
use crate::features::http_fetch::HttpTransport;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Read-only chain access used for account probes and voting power queries.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn chain_id(&self) -> GovernanceResult<u64>;

    /// Deployed bytecode at `address`; `"0x"` for externally owned accounts.
    async fn get_code(&self, address: &str) -> GovernanceResult<String>;

    /// `eth_call` evaluated at `block` (latest when `None`).
    async fn call(&self, to: &str, calldata: &str, block: Option<u64>) -> GovernanceResult<String>;
}

/// True when the account has contract code deployed.
pub async fn is_contract_account(
    provider: &dyn ChainProvider,
    address: &str,
) -> GovernanceResult<bool> {
    let code = provider.get_code(address).await?;
    let is_contract = code != "0x";
    log::debug!("account_probe address={address} is_contract={is_contract}");
    Ok(is_contract)
}

pub struct HttpEvmRpcClient {
    rpc_url: String,
    fallback_rpc_url: Option<String>,
    transport: HttpTransport,
}

impl HttpEvmRpcClient {
    pub fn new(
        rpc_url: &str,
        fallback_rpc_url: Option<String>,
        max_response_bytes: u64,
    ) -> GovernanceResult<Self> {
        let rpc_url = rpc_url.trim();
        if rpc_url.is_empty() {
            return Err(GovernanceError::Config(
                "evm rpc url is not configured".to_string(),
            ));
        }
        Ok(Self {
            rpc_url: rpc_url.to_string(),
            fallback_rpc_url: fallback_rpc_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            transport: HttpTransport::new(max_response_bytes),
        })
    }

    /// Bound every request by `timeout`; voting power queries pass their query deadline
    /// so a timed-out query also closes its socket.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.transport =
            HttpTransport::with_request_timeout(self.transport.max_response_bytes(), timeout);
        self
    }

    pub fn from_config(config: &ClientConfig) -> GovernanceResult<Self> {
        Ok(Self::new(
            &config.rpc_url,
            config.fallback_rpc_url.clone(),
            config.max_response_bytes,
        )?
        .with_request_timeout(config.query_limits().query_timeout))
    }

    async fn eth_chain_id(&self) -> Result<u64, String> {
        let raw = self.rpc_result_str("eth_chainId", json!([])).await?;
        parse_hex_u64(&raw, "eth_chainId")
    }

    async fn eth_get_code(&self, address: &str) -> Result<String, String> {
        let address = normalize_address(address)?;
        let raw = self
            .rpc_result_str("eth_getCode", json!([address, "latest"]))
            .await?;
        normalize_hex_blob(&raw, "eth_getCode result")
    }

    async fn eth_call(&self, to: &str, calldata: &str, block: Option<u64>) -> Result<String, String> {
        let to = normalize_address(to)?;
        let calldata = normalize_hex_blob(calldata, "eth_call data")?;
        let response = self
            .rpc_result_str(
                "eth_call",
                json!([{"to": to, "data": calldata}, block_tag(block)]),
            )
            .await?;
        normalize_hex_blob(&response, "eth_call result")
    }

    async fn rpc_result_str(&self, method: &str, params: Value) -> Result<String, String> {
        let response = self
            .rpc_call(method, params)
            .await
            .map_err(|error| format!("{method} failed: {error}"))?;
        response
            .get("result")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| format!("{method} result was missing"))
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, String> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        let value = self.http_post(&body).await?;
        if let Some(error) = value.get("error") {
            return Err(format!("rpc returned error for {method}: {error}"));
        }
        Ok(value)
    }

    async fn http_post(&self, body: &Value) -> Result<Value, String> {
        match self.transport.post_json(&self.rpc_url, body).await {
            Ok(value) => Ok(value),
            Err(primary_error) => {
                if let Some(fallback_url) = self.fallback_rpc_url.as_deref() {
                    self.transport
                        .post_json(fallback_url, body)
                        .await
                        .map_err(|fallback_error| {
                            format!(
                                "primary rpc failed: {primary_error}; fallback rpc failed: {fallback_error}"
                            )
                        })
                } else {
                    Err(primary_error)
                }
            }
        }
    }
}

fn block_tag(block: Option<u64>) -> String {
    match block {
        Some(number) => format!("0x{number:x}"),
        None => "latest".to_string(),
    }
}

#[async_trait]
impl ChainProvider for HttpEvmRpcClient {
    async fn chain_id(&self) -> GovernanceResult<u64> {
        self.eth_chain_id().await.map_err(GovernanceError::Rpc)
    }

    async fn get_code(&self, address: &str) -> GovernanceResult<String> {
        self.eth_get_code(address).await.map_err(GovernanceError::Rpc)
    }

    async fn call(&self, to: &str, calldata: &str, block: Option<u64>) -> GovernanceResult<String> {
        self.eth_call(to, calldata, block)
            .await
            .map_err(GovernanceError::Rpc)
    }
}
