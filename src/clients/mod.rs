/// Submission clients for governance actions.
///
/// [`DirectSubmitter`] sends transactions from the wallet account through the `ethTx`
/// authenticator (or straight to the target for owner-only calls).
/// [`RelayedSubmitter`] has the wallet sign an EIP-712 envelope that the relayer
/// submits through a signature authenticator.
pub mod eth_sig;
pub mod eth_tx;

pub use eth_sig::EthSigClient;
pub use eth_tx::EthTxClient;

use crate::domain::error::GovernanceResult;
use crate::domain::types::{
    ActionReceipt, ProposeData, StrategyWithMetadata, SubmitOptions, UpdateProposalData, VoteData,
};
use crate::features::signer::WalletSigner;
use crate::strategy::registry::StrategyRegistry;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait DirectSubmitter: Send + Sync {
    async fn propose(
        &self,
        wallet: &dyn WalletSigner,
        data: &ProposeData,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt>;

    async fn update_proposal(
        &self,
        wallet: &dyn WalletSigner,
        data: &UpdateProposalData,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt>;

    async fn vote(
        &self,
        wallet: &dyn WalletSigner,
        data: &VoteData,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt>;

    async fn cancel(
        &self,
        wallet: &dyn WalletSigner,
        space: &str,
        proposal: u64,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt>;

    async fn veto_execution(
        &self,
        wallet: &dyn WalletSigner,
        execution_strategy: &str,
        execution_hash: &str,
    ) -> GovernanceResult<ActionReceipt>;

    async fn set_voting_delay(
        &self,
        wallet: &dyn WalletSigner,
        space: &str,
        voting_delay: u32,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt>;

    async fn set_min_voting_duration(
        &self,
        wallet: &dyn WalletSigner,
        space: &str,
        min_voting_duration: u32,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt>;

    async fn set_max_voting_duration(
        &self,
        wallet: &dyn WalletSigner,
        space: &str,
        max_voting_duration: u32,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt>;

    async fn delegate(
        &self,
        wallet: &dyn WalletSigner,
        votes_contract: &str,
        delegatee: &str,
    ) -> GovernanceResult<ActionReceipt>;
}

#[async_trait]
pub trait RelayedSubmitter: Send + Sync {
    async fn propose(
        &self,
        wallet: &dyn WalletSigner,
        data: &ProposeData,
    ) -> GovernanceResult<ActionReceipt>;

    async fn update_proposal(
        &self,
        wallet: &dyn WalletSigner,
        data: &UpdateProposalData,
    ) -> GovernanceResult<ActionReceipt>;

    async fn vote(&self, wallet: &dyn WalletSigner, data: &VoteData)
        -> GovernanceResult<ActionReceipt>;

    /// Forward an already signed envelope.
    async fn send(&self, envelope: &Value) -> GovernanceResult<Value>;
}

/// `(index, params)` pairs the contracts expect for each picked strategy.
pub(crate) fn user_strategy_params(
    registry: &StrategyRegistry,
    voter: &str,
    strategies: &[StrategyWithMetadata],
) -> GovernanceResult<Vec<(u32, String)>> {
    strategies
        .iter()
        .map(|strategy| {
            let params = match registry.get(&strategy.address) {
                Some(implementation) => {
                    implementation.user_params(voter, strategy.metadata.as_ref())?
                }
                None => "0x".to_string(),
            };
            Ok((strategy.index, params))
        })
        .collect()
}
