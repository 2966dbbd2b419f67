/// Strategy metadata resolution.
///
/// Parsed metadata entries carry a `payload` that is either inline JSON or an
/// `ipfs://` URI. IPFS payloads are fetched through an HTTP gateway.
use crate::config::ClientConfig;
use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::features::http_fetch::HttpTransport;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

const IPFS_SCHEME: &str = "ipfs://";

#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// `None` payloads resolve to `None`.
    async fn resolve(&self, payload: Option<&str>) -> GovernanceResult<Option<Value>>;
}

pub struct IpfsMetadataResolver {
    gateway: String,
    transport: HttpTransport,
}

impl IpfsMetadataResolver {
    pub fn new(gateway: &str, max_response_bytes: u64) -> GovernanceResult<Self> {
        let gateway = gateway.trim().trim_end_matches('/');
        if gateway.is_empty() {
            return Err(GovernanceError::Config(
                "ipfs gateway is not configured".to_string(),
            ));
        }
        Ok(Self {
            gateway: gateway.to_string(),
            transport: HttpTransport::new(max_response_bytes),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.transport =
            HttpTransport::with_request_timeout(self.transport.max_response_bytes(), timeout);
        self
    }

    pub fn from_config(config: &ClientConfig) -> GovernanceResult<Self> {
        Ok(Self::new(&config.ipfs_gateway, config.max_response_bytes)?
            .with_request_timeout(config.query_limits().query_timeout))
    }

    pub fn gateway_url(&self, uri: &str) -> Option<String> {
        let cid_path = uri.trim().strip_prefix(IPFS_SCHEME)?;
        if cid_path.is_empty() {
            return None;
        }
        Some(format!("{}/ipfs/{cid_path}", self.gateway))
    }
}

#[async_trait]
impl MetadataResolver for IpfsMetadataResolver {
    async fn resolve(&self, payload: Option<&str>) -> GovernanceResult<Option<Value>> {
        let Some(payload) = payload.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Ok(None);
        };
        if !payload.starts_with(IPFS_SCHEME) {
            return parse_inline(payload).map(Some);
        }

        let url = self
            .gateway_url(payload)
            .ok_or_else(|| GovernanceError::Metadata(format!("invalid ipfs uri {payload}")))?;
        log::debug!("metadata_fetch url={url}");
        self.transport
            .get_json(&url)
            .await
            .map(Some)
            .map_err(GovernanceError::Metadata)
    }
}

fn parse_inline(payload: &str) -> GovernanceResult<Value> {
    serde_json::from_str(payload)
        .map_err(|error| GovernanceError::Metadata(format!("invalid inline metadata: {error}")))
}
