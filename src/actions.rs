/// Governance action facade for one EVM chain.
///
/// Every wallet-bound operation follows the same sequence: verify the wallet is on
/// the expected chain, probe whether the acting account is a contract, pick an
/// authenticator and strategies, build the payload, then submit through the relayer
/// or directly from the wallet. Nothing is retried; the first failure is returned.
use crate::clients::{DirectSubmitter, EthSigClient, EthTxClient, RelayedSubmitter};
use crate::config::{ClientConfig, QueryLimits};
use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::domain::types::{
    ActionReceipt, Choice, Connector, ExecutionStrategyRef, IndexedStrategy, MetaTransaction,
    Proposal, ProposeData, RelayerType, SnapshotInfo, Space, StrategyParsedMetadata,
    StrategyWithMetadata, SubmitOptions, UpdateProposalData, VoteData, VotingPower,
};
use crate::domain::hex::normalize_address;
use crate::features::evm::{is_contract_account, ChainProvider, HttpEvmRpcClient};
use crate::features::mana::{ExecutionDispatcher, ManaClient};
use crate::features::metadata::{IpfsMetadataResolver, MetadataResolver};
use crate::features::signer::{verify_network, WalletSigner};
use crate::network::{NetworkConfig, NetworkRegistry};
use crate::strategy::execution::{
    convert_to_meta_transactions, execution_data, ExecutorTable,
};
use crate::strategy::picker::{EvmStrategyPicker, StrategyPicker};
use crate::strategy::power::{VotingPowerAggregator, VotingPowerRequest};
use crate::strategy::registry::StrategyRegistry;
use futures::future::try_join_all;
use serde_json::{json, Value};
use std::sync::Arc;

/// Proposal body shared by `propose` and `update_proposal`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProposalDraft {
    /// IPFS CID of the proposal metadata document.
    pub cid: String,
    pub execution_strategy: Option<String>,
    pub transactions: Vec<MetaTransaction>,
}

impl ProposalDraft {
    fn metadata_uri(&self) -> String {
        format!("ipfs://{}", self.cid)
    }
}

/// Injectable collaborators of [`EvmActions`].
pub struct ActionComponents {
    pub registry: Arc<NetworkRegistry>,
    pub network: Arc<NetworkConfig>,
    pub provider: Arc<dyn ChainProvider>,
    pub picker: Arc<dyn StrategyPicker>,
    pub direct: Arc<dyn DirectSubmitter>,
    pub relayed: Arc<dyn RelayedSubmitter>,
    pub dispatcher: Arc<dyn ExecutionDispatcher>,
    pub metadata: Arc<dyn MetadataResolver>,
    pub strategies: Arc<StrategyRegistry>,
    pub limits: QueryLimits,
}

pub struct EvmActions {
    chain_id: u64,
    registry: Arc<NetworkRegistry>,
    provider: Arc<dyn ChainProvider>,
    picker: Arc<dyn StrategyPicker>,
    direct: Arc<dyn DirectSubmitter>,
    relayed: Arc<dyn RelayedSubmitter>,
    dispatcher: Arc<dyn ExecutionDispatcher>,
    metadata: Arc<dyn MetadataResolver>,
    strategies: Arc<StrategyRegistry>,
    limits: QueryLimits,
}

/// Production wiring: JSON-RPC provider, mana relayer, IPFS gateway and the strategy
/// registry for `config.chain_id`.
pub fn create_actions(
    registry: Arc<NetworkRegistry>,
    config: &ClientConfig,
) -> GovernanceResult<EvmActions> {
    config.validate()?;
    let network = registry.get(config.chain_id)?;
    let strategies = Arc::new(StrategyRegistry::from_network(&network));
    let mana = Arc::new(ManaClient::from_config(config)?);
    let picker = EvmStrategyPicker::new(network.clone())
        .with_low_priority_relayers(&config.low_priority_relayers);

    Ok(EvmActions::with_components(ActionComponents {
        registry,
        network: network.clone(),
        provider: Arc::new(HttpEvmRpcClient::from_config(config)?),
        picker: Arc::new(picker),
        direct: Arc::new(EthTxClient::new(strategies.clone())),
        relayed: Arc::new(EthSigClient::new(
            network.chain_id,
            strategies.clone(),
            mana.clone(),
        )),
        dispatcher: mana,
        metadata: Arc::new(IpfsMetadataResolver::from_config(config)?),
        strategies,
        limits: config.query_limits(),
    }))
}

impl EvmActions {
    pub fn with_components(components: ActionComponents) -> Self {
        Self {
            chain_id: components.network.chain_id,
            registry: components.registry,
            provider: components.provider,
            picker: components.picker,
            direct: components.direct,
            relayed: components.relayed,
            dispatcher: components.dispatcher,
            metadata: components.metadata,
            strategies: components.strategies,
            limits: components.limits,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn submit_options(&self, account: &str) -> GovernanceResult<SubmitOptions> {
        let is_contract = is_contract_account(self.provider.as_ref(), account).await?;
        Ok(SubmitOptions {
            no_wait: is_contract,
        })
    }

    fn selected_execution_strategy(
        &self,
        space: &dyn ExecutorTable,
        draft: &ProposalDraft,
    ) -> GovernanceResult<ExecutionStrategyRef> {
        match draft.execution_strategy.as_deref() {
            Some(address) => {
                let data = execution_data(space, address, &draft.transactions)?;
                Ok(ExecutionStrategyRef {
                    addr: address.to_string(),
                    params: data.primary_params()?.to_string(),
                })
            }
            None => Ok(ExecutionStrategyRef::none()),
        }
    }

    async fn with_metadata<'m>(
        &self,
        strategies: Vec<IndexedStrategy>,
        lookup: impl Fn(&IndexedStrategy) -> Option<&'m StrategyParsedMetadata>,
    ) -> GovernanceResult<Vec<StrategyWithMetadata>> {
        let pending = strategies.into_iter().map(|strategy| {
            let payload = lookup(&strategy).map(|entry| entry.payload.clone());
            async move {
                let payload = payload.ok_or(GovernanceError::MissingStrategyMetadata(strategy.index))?;
                let metadata = self.metadata.resolve(payload.as_deref()).await?;
                Ok::<_, GovernanceError>(StrategyWithMetadata {
                    index: strategy.index,
                    address: strategy.address,
                    metadata,
                })
            }
        });
        try_join_all(pending).await
    }

    pub async fn propose(
        &self,
        wallet: &dyn WalletSigner,
        connector: Connector,
        account: &str,
        space: &Space,
        draft: &ProposalDraft,
    ) -> GovernanceResult<ActionReceipt> {
        verify_network(wallet, self.chain_id).await?;
        let options = self.submit_options(account).await?;

        let indices = (0..space.voting_power_validation_strategy_strategies.len())
            .map(|index| u32::try_from(index).unwrap_or(u32::MAX))
            .collect::<Vec<_>>();
        let picked = self.picker.pick(
            &space.authenticators,
            &space.voting_power_validation_strategy_strategies,
            &indices,
            connector,
            options.no_wait,
        )?;
        let execution_strategy = self.selected_execution_strategy(space, draft)?;
        let strategies = self
            .with_metadata(picked.strategies, |strategy| {
                usize::try_from(strategy.index).ok().and_then(|index| {
                    space
                        .voting_power_validation_strategies_parsed_metadata
                        .get(index)
                })
            })
            .await?;

        let data = ProposeData {
            space: space.id.clone(),
            authenticator: picked.authenticator,
            strategies,
            execution_strategy,
            metadata_uri: draft.metadata_uri(),
        };
        log::info!(
            "action_prepare action=propose space={} relayer={}",
            space.id,
            relayer_label(picked.relayer_type)
        );
        if picked.relayer_type == Some(RelayerType::Evm) {
            return self.relayed.propose(wallet, &data).await;
        }
        self.direct.propose(wallet, &data, options).await
    }

    pub async fn update_proposal(
        &self,
        wallet: &dyn WalletSigner,
        connector: Connector,
        account: &str,
        space: &Space,
        proposal_id: u64,
        draft: &ProposalDraft,
    ) -> GovernanceResult<ActionReceipt> {
        verify_network(wallet, self.chain_id).await?;
        let options = self.submit_options(account).await?;

        let indices = (0..space.voting_power_validation_strategy_strategies.len())
            .map(|index| u32::try_from(index).unwrap_or(u32::MAX))
            .collect::<Vec<_>>();
        let picked = self.picker.pick(
            &space.authenticators,
            &space.voting_power_validation_strategy_strategies,
            &indices,
            connector,
            options.no_wait,
        )?;
        let execution_strategy = self.selected_execution_strategy(space, draft)?;

        let data = UpdateProposalData {
            space: space.id.clone(),
            proposal: proposal_id,
            authenticator: picked.authenticator,
            execution_strategy,
            metadata_uri: draft.metadata_uri(),
        };
        log::info!(
            "action_prepare action=update_proposal space={} proposal={proposal_id} relayer={}",
            space.id,
            relayer_label(picked.relayer_type)
        );
        if picked.relayer_type == Some(RelayerType::Evm) {
            return self.relayed.update_proposal(wallet, &data).await;
        }
        self.direct.update_proposal(wallet, &data, options).await
    }

    pub async fn cancel_proposal(
        &self,
        wallet: &dyn WalletSigner,
        proposal: &Proposal,
    ) -> GovernanceResult<ActionReceipt> {
        verify_network(wallet, self.chain_id).await?;
        let address = wallet.address().await?;
        let options = self.submit_options(&address).await?;
        self.direct
            .cancel(wallet, &proposal.space.id, proposal.proposal_id, options)
            .await
    }

    pub async fn vote(
        &self,
        wallet: &dyn WalletSigner,
        connector: Connector,
        account: &str,
        proposal: &Proposal,
        choice: Choice,
    ) -> GovernanceResult<ActionReceipt> {
        verify_network(wallet, self.chain_id).await?;
        let options = self.submit_options(account).await?;

        let picked = self.picker.pick(
            &proposal.space.authenticators,
            &proposal.strategies,
            &proposal.strategies_indices,
            connector,
            options.no_wait,
        )?;
        let strategies = self
            .with_metadata(picked.strategies, |strategy| {
                proposal
                    .space
                    .strategies_parsed_metadata
                    .iter()
                    .find(|entry| entry.index == strategy.index)
            })
            .await?;

        let data = VoteData {
            space: proposal.space.id.clone(),
            authenticator: picked.authenticator,
            strategies,
            proposal: proposal.proposal_id,
            choice: choice.sdk_code(),
            metadata_uri: String::new(),
            chain_id: self.chain_id,
        };
        log::info!(
            "action_prepare action=vote space={} proposal={} relayer={}",
            proposal.space.id,
            proposal.proposal_id,
            relayer_label(picked.relayer_type)
        );
        if picked.relayer_type == Some(RelayerType::Evm) {
            return self.relayed.vote(wallet, &data).await;
        }
        self.direct.vote(wallet, &data, options).await
    }

    pub async fn finalize_proposal(
        &self,
        wallet: &dyn WalletSigner,
        proposal: &Proposal,
    ) -> GovernanceResult<ActionReceipt> {
        verify_network(wallet, self.chain_id).await?;
        self.dispatcher
            .execution_call(
                self.chain_id,
                "finalizeProposal",
                json!({
                    "space": proposal.space.id,
                    "proposalId": proposal.proposal_id
                }),
            )
            .await?;
        Ok(ActionReceipt::Empty)
    }

    fn proposal_execution_params(&self, proposal: &Proposal) -> GovernanceResult<String> {
        let transactions = convert_to_meta_transactions(&proposal.execution)?;
        let data = execution_data(&proposal.space, &proposal.execution_strategy, &transactions)?;
        Ok(data.primary_params()?.to_string())
    }

    pub async fn execute_transactions(
        &self,
        wallet: &dyn WalletSigner,
        proposal: &Proposal,
    ) -> GovernanceResult<ActionReceipt> {
        verify_network(wallet, self.chain_id).await?;
        let execution_params = self.proposal_execution_params(proposal)?;
        let result = self
            .dispatcher
            .execution_call(
                self.chain_id,
                "execute",
                json!({
                    "space": proposal.space.id,
                    "proposalId": proposal.proposal_id,
                    "executionParams": execution_params
                }),
            )
            .await?;
        Ok(ActionReceipt::Dispatched(result))
    }

    pub async fn execute_queued_proposal(
        &self,
        wallet: &dyn WalletSigner,
        proposal: &Proposal,
    ) -> GovernanceResult<ActionReceipt> {
        verify_network(wallet, self.chain_id).await?;
        let execution_params = self.proposal_execution_params(proposal)?;
        let result = self
            .dispatcher
            .execution_call(
                self.chain_id,
                "executeQueuedProposal",
                json!({
                    "space": proposal.space.id,
                    "executionStrategy": proposal.execution_strategy,
                    "executionParams": execution_params
                }),
            )
            .await?;
        Ok(ActionReceipt::Dispatched(result))
    }

    pub async fn veto_proposal(
        &self,
        wallet: &dyn WalletSigner,
        proposal: &Proposal,
    ) -> GovernanceResult<ActionReceipt> {
        verify_network(wallet, self.chain_id).await?;
        self.direct
            .veto_execution(wallet, &proposal.execution_strategy, &proposal.execution_hash)
            .await
    }

    pub async fn set_voting_delay(
        &self,
        wallet: &dyn WalletSigner,
        space: &Space,
        voting_delay: u32,
    ) -> GovernanceResult<ActionReceipt> {
        verify_network(wallet, self.chain_id).await?;
        let address = wallet.address().await?;
        let options = self.submit_options(&address).await?;
        self.direct
            .set_voting_delay(wallet, &space.id, voting_delay, options)
            .await
    }

    pub async fn set_min_voting_duration(
        &self,
        wallet: &dyn WalletSigner,
        space: &Space,
        min_voting_duration: u32,
    ) -> GovernanceResult<ActionReceipt> {
        verify_network(wallet, self.chain_id).await?;
        let address = wallet.address().await?;
        let options = self.submit_options(&address).await?;
        self.direct
            .set_min_voting_duration(wallet, &space.id, min_voting_duration, options)
            .await
    }

    pub async fn set_max_voting_duration(
        &self,
        wallet: &dyn WalletSigner,
        space: &Space,
        max_voting_duration: u32,
    ) -> GovernanceResult<ActionReceipt> {
        verify_network(wallet, self.chain_id).await?;
        let address = wallet.address().await?;
        let options = self.submit_options(&address).await?;
        self.direct
            .set_max_voting_duration(wallet, &space.id, max_voting_duration, options)
            .await
    }

    /// `delegation_contract` is `<networkId>:<address>`; the wallet must be on that
    /// network, which need not be this client's chain.
    pub async fn delegate(
        &self,
        wallet: &dyn WalletSigner,
        space: &Space,
        network_id: &str,
        delegatee: &str,
        delegation_contract: &str,
    ) -> GovernanceResult<ActionReceipt> {
        let expected_chain = self.registry.chain_id_for(network_id)?;
        verify_network(wallet, expected_chain).await?;

        let contract = parse_delegation_contract(delegation_contract)?;
        log::info!(
            "action_prepare action=delegate space={} chain_id={expected_chain} contract={contract}",
            space.id
        );
        self.direct.delegate(wallet, &contract, delegatee).await
    }

    pub async fn send(&self, envelope: &Value) -> GovernanceResult<Value> {
        self.relayed.send(envelope).await
    }

    pub async fn get_voting_power(
        &self,
        space_id: &str,
        strategies_addresses: &[String],
        strategies_params: &[String],
        strategies_metadata: &[StrategyParsedMetadata],
        voter: &str,
        snapshot: SnapshotInfo,
    ) -> GovernanceResult<Vec<VotingPower>> {
        log::debug!(
            "voting_power_request space={space_id} voter={voter} strategies={}",
            strategies_addresses.len()
        );
        let aggregator = VotingPowerAggregator {
            registry: &self.strategies,
            provider: self.provider.as_ref(),
            metadata: self.metadata.as_ref(),
            chain_id: self.chain_id,
            limits: self.limits,
        };
        aggregator
            .get_voting_power(VotingPowerRequest {
                strategies_addresses,
                strategies_params,
                strategies_metadata,
                voter,
                snapshot,
            })
            .await
    }
}

fn relayer_label(relayer_type: Option<RelayerType>) -> &'static str {
    relayer_type.map(|relayer| relayer.as_str()).unwrap_or("none")
}

fn parse_delegation_contract(raw: &str) -> GovernanceResult<String> {
    let (_network, address) = raw
        .split_once(':')
        .ok_or_else(|| GovernanceError::InvalidDelegationContract(raw.to_string()))?;
    normalize_address(address)
        .map_err(|_error| GovernanceError::InvalidDelegationContract(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegation_contract_reference_is_network_prefixed() {
        assert_eq!(
            parse_delegation_contract("sep:0x4444444444444444444444444444444444444444")
                .expect("reference should parse"),
            "0x4444444444444444444444444444444444444444"
        );
        assert!(matches!(
            parse_delegation_contract("0x4444444444444444444444444444444444444444"),
            Err(GovernanceError::InvalidDelegationContract(_))
        ));
        assert!(matches!(
            parse_delegation_contract("sep:not-an-address"),
            Err(GovernanceError::InvalidDelegationContract(_))
        ));
    }

    #[test]
    fn drafts_point_at_ipfs() {
        let draft = ProposalDraft {
            cid: "bafkreiabc".to_string(),
            ..ProposalDraft::default()
        };
        assert_eq!(draft.metadata_uri(), "ipfs://bafkreiabc");
    }

    #[test]
    fn production_wiring_rejects_unknown_chains() {
        let registry = Arc::new(NetworkRegistry::bundled().expect("bundled registry"));
        let config = ClientConfig::new(56, "https://bsc-dataseed.binance.org");
        assert!(matches!(
            create_actions(registry, &config),
            Err(GovernanceError::UnsupportedChain(56))
        ));
    }
}
