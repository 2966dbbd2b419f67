/// Authenticator and strategy selection for a wallet connector.
///
/// Given a space's authenticators and strategies, pick the authenticator the
/// connected wallet can use and the strategies this chain knows how to evaluate.
use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::domain::types::{
    AuthenticatorKind, Connector, ConnectorFamily, IndexedStrategy, RelayerType, EVM_CONNECTORS,
};
use crate::network::NetworkConfig;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickedStrategies {
    pub relayer_type: Option<RelayerType>,
    pub authenticator: String,
    pub strategies: Vec<IndexedStrategy>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedAuthenticator {
    pub address: String,
    pub kind: AuthenticatorKind,
    pub relayer_type: Option<RelayerType>,
}

pub trait StrategyPicker: Send + Sync {
    fn select_authenticator(
        &self,
        authenticators: &[String],
        connector: Connector,
        is_contract: bool,
    ) -> GovernanceResult<SelectedAuthenticator>;

    fn select_strategies(
        &self,
        strategies: &[String],
        strategies_indices: &[u32],
    ) -> GovernanceResult<Vec<IndexedStrategy>>;

    fn pick(
        &self,
        authenticators: &[String],
        strategies: &[String],
        strategies_indices: &[u32],
        connector: Connector,
        is_contract: bool,
    ) -> GovernanceResult<PickedStrategies> {
        let selected = self.select_authenticator(authenticators, connector, is_contract)?;
        let strategies = self.select_strategies(strategies, strategies_indices)?;
        let relayer_type = match selected.relayer_type {
            Some(RelayerType::Evm) if is_contract => Some(RelayerType::EvmTx),
            other => other,
        };
        log::debug!(
            "strategy_pick connector={connector} is_contract={is_contract} authenticator={} relayer={} strategies={}",
            selected.address,
            relayer_type.map(|relayer| relayer.as_str()).unwrap_or("none"),
            strategies.len()
        );
        Ok(PickedStrategies {
            relayer_type,
            authenticator: selected.address,
            strategies,
        })
    }
}

/// Picker for the EVM connector family.
pub struct EvmStrategyPicker {
    config: Arc<NetworkConfig>,
    manager_connectors: Vec<Connector>,
    low_priority_relayers: Vec<RelayerType>,
}

impl EvmStrategyPicker {
    pub fn new(config: Arc<NetworkConfig>) -> Self {
        Self {
            config,
            manager_connectors: EVM_CONNECTORS.to_vec(),
            low_priority_relayers: Vec::new(),
        }
    }

    pub fn with_manager_connectors(mut self, connectors: &[Connector]) -> Self {
        self.manager_connectors = connectors.to_vec();
        self
    }

    pub fn with_low_priority_relayers(mut self, relayers: &[RelayerType]) -> Self {
        self.low_priority_relayers = relayers.to_vec();
        self
    }

    fn priority(&self, relayer_type: Option<RelayerType>) -> u8 {
        match relayer_type {
            Some(relayer) if self.low_priority_relayers.contains(&relayer) => 2,
            Some(_) => 0,
            None => 1,
        }
    }

    /// Relayer-backed authenticators take any EVM-family connector; direct ones only
    /// the configured manager connectors.
    fn accepts(&self, relayer_type: Option<RelayerType>, connector: Connector) -> bool {
        match relayer_type {
            Some(RelayerType::Evm | RelayerType::EvmTx) => {
                connector.family() == ConnectorFamily::Evm
            }
            None => self.manager_connectors.contains(&connector),
        }
    }
}

impl StrategyPicker for EvmStrategyPicker {
    fn select_authenticator(
        &self,
        authenticators: &[String],
        connector: Connector,
        is_contract: bool,
    ) -> GovernanceResult<SelectedAuthenticator> {
        let mut candidates = authenticators
            .iter()
            .filter_map(|address| {
                let kind = self.config.authenticator_kind(address)?;
                Some(SelectedAuthenticator {
                    address: address.clone(),
                    kind,
                    relayer_type: kind.relayer_type(),
                })
            })
            .filter(|candidate| !is_contract || candidate.kind.supports_contract_accounts())
            .collect::<Vec<_>>();
        candidates.sort_by_key(|candidate| self.priority(candidate.relayer_type));

        candidates
            .into_iter()
            .find(|candidate| self.accepts(candidate.relayer_type, connector))
            .ok_or_else(|| GovernanceError::NoCompatibleAuthenticator {
                connector: connector.to_string(),
                is_contract,
            })
    }

    fn select_strategies(
        &self,
        strategies: &[String],
        strategies_indices: &[u32],
    ) -> GovernanceResult<Vec<IndexedStrategy>> {
        let selected = strategies
            .iter()
            .zip(strategies_indices.iter())
            .filter(|(address, _)| self.config.is_strategy_supported(address))
            .map(|(address, index)| IndexedStrategy {
                index: *index,
                address: address.clone(),
            })
            .collect::<Vec<_>>();
        if !strategies.is_empty() && selected.is_empty() {
            return Err(GovernanceError::NoSupportedStrategies);
        }
        Ok(selected)
    }
}
