/// Per-chain network configuration.
///
/// The registry is parsed once (from the bundled `networks.toml` or a caller-supplied
/// document) and is immutable afterwards; actions hold an `Arc<NetworkConfig>` for
/// the chain they were built for.
///
/// # Sections
/// - **Document schema**: the TOML layout, with shared CREATE2 deployment tables.
/// - **NetworkConfig**: authenticator / strategy lookups for one chain.
/// - **NetworkRegistry**: chain-id and network-id lookups with explicit errors.
use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::domain::hex::normalize_address;
use crate::domain::types::{AuthenticatorKind, StrategyKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

const BUNDLED_NETWORKS: &str = include_str!("networks.toml");

// ── Document schema ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize, Default)]
struct DeploymentTables {
    #[serde(default)]
    authenticators: BTreeMap<String, AuthenticatorKind>,
    #[serde(default)]
    strategies: BTreeMap<String, StrategyKind>,
}

#[derive(Clone, Debug, Deserialize)]
struct NetworkEntry {
    chain_id: u64,
    network_id: String,
    name: String,
    #[serde(default)]
    authenticators: BTreeMap<String, AuthenticatorKind>,
    #[serde(default)]
    strategies: BTreeMap<String, StrategyKind>,
}

#[derive(Clone, Debug, Deserialize)]
struct NetworksDocument {
    #[serde(default)]
    deployments: DeploymentTables,
    #[serde(default)]
    networks: Vec<NetworkEntry>,
}

// ── NetworkConfig ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub network_id: String,
    pub name: String,
    authenticators: BTreeMap<String, AuthenticatorKind>,
    strategies: BTreeMap<String, StrategyKind>,
}

impl NetworkConfig {
    pub fn new(
        chain_id: u64,
        network_id: &str,
        name: &str,
        authenticators: impl IntoIterator<Item = (String, AuthenticatorKind)>,
        strategies: impl IntoIterator<Item = (String, StrategyKind)>,
    ) -> GovernanceResult<Self> {
        Ok(Self {
            chain_id,
            network_id: network_id.trim().to_string(),
            name: name.trim().to_string(),
            authenticators: normalize_table(authenticators)?,
            strategies: normalize_table(strategies)?,
        })
    }

    /// Authenticator type for a deployed address, `None` when this chain does not know it.
    pub fn authenticator_kind(&self, address: &str) -> Option<AuthenticatorKind> {
        let normalized = normalize_address(address).ok()?;
        self.authenticators.get(&normalized).copied()
    }

    pub fn strategy_kind(&self, address: &str) -> Option<StrategyKind> {
        let normalized = normalize_address(address).ok()?;
        self.strategies.get(&normalized).copied()
    }

    pub fn is_strategy_supported(&self, address: &str) -> bool {
        self.strategy_kind(address).is_some()
    }

    pub fn strategies(&self) -> impl Iterator<Item = (&str, StrategyKind)> {
        self.strategies
            .iter()
            .map(|(address, kind)| (address.as_str(), *kind))
    }
}

fn normalize_table<K: Copy>(
    entries: impl IntoIterator<Item = (String, K)>,
) -> GovernanceResult<BTreeMap<String, K>> {
    entries
        .into_iter()
        .map(|(address, kind)| {
            normalize_address(&address)
                .map(|normalized| (normalized, kind))
                .map_err(GovernanceError::Config)
        })
        .collect()
}

// ── NetworkRegistry ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct NetworkRegistry {
    by_chain: BTreeMap<u64, Arc<NetworkConfig>>,
    chain_by_network_id: BTreeMap<String, u64>,
}

impl NetworkRegistry {
    /// Registry of every chain this crate ships deployments for.
    pub fn bundled() -> GovernanceResult<Self> {
        Self::from_toml_str(BUNDLED_NETWORKS)
    }

    /// Process-wide bundled registry, parsed on first use.
    pub fn global() -> GovernanceResult<&'static NetworkRegistry> {
        static REGISTRY: OnceLock<GovernanceResult<NetworkRegistry>> = OnceLock::new();
        REGISTRY
            .get_or_init(Self::bundled)
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn from_toml_str(raw: &str) -> GovernanceResult<Self> {
        let document: NetworksDocument = toml::from_str(raw)
            .map_err(|error| GovernanceError::Config(format!("invalid networks toml: {error}")))?;

        let mut registry = Self::default();
        for entry in document.networks {
            let mut authenticators = document.deployments.authenticators.clone();
            authenticators.extend(entry.authenticators);
            let mut strategies = document.deployments.strategies.clone();
            strategies.extend(entry.strategies);
            let config = NetworkConfig::new(
                entry.chain_id,
                &entry.network_id,
                &entry.name,
                authenticators,
                strategies,
            )?;
            registry.insert(config)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, config: NetworkConfig) -> GovernanceResult<()> {
        if config.network_id.is_empty() {
            return Err(GovernanceError::Config(format!(
                "network_id must be non-empty for chain {}",
                config.chain_id
            )));
        }
        if self.by_chain.contains_key(&config.chain_id) {
            return Err(GovernanceError::Config(format!(
                "duplicate network entry for chain {}",
                config.chain_id
            )));
        }
        if self.chain_by_network_id.contains_key(&config.network_id) {
            return Err(GovernanceError::Config(format!(
                "duplicate network id {}",
                config.network_id
            )));
        }
        self.chain_by_network_id
            .insert(config.network_id.clone(), config.chain_id);
        self.by_chain.insert(config.chain_id, Arc::new(config));
        Ok(())
    }

    pub fn get(&self, chain_id: u64) -> GovernanceResult<Arc<NetworkConfig>> {
        self.by_chain
            .get(&chain_id)
            .cloned()
            .ok_or(GovernanceError::UnsupportedChain(chain_id))
    }

    /// Chain id for a short network id such as `eth` or `sep`.
    pub fn chain_id_for(&self, network_id: &str) -> GovernanceResult<u64> {
        self.chain_by_network_id
            .get(network_id.trim())
            .copied()
            .ok_or_else(|| GovernanceError::UnsupportedNetworkId(network_id.to_string()))
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        self.by_chain.keys().copied().collect()
    }
}
