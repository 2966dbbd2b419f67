use crate::clients::{user_strategy_params, DirectSubmitter};
use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::domain::hex::{encode_hex_blob, normalize_address};
use crate::domain::types::{
    ActionReceipt, ProposeData, SubmitOptions, UpdateProposalData, VoteData,
};
use crate::features::signer::{TransactionRequest, WalletSigner};
use crate::strategy::abi::{
    canonical_signature, encode_abi_params, encode_function_call, function_selector, parse_types,
};
use crate::strategy::registry::StrategyRegistry;
use alloy_primitives::U256;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

const PROPOSE_INPUTS: &[&str] = &["address", "string", "tuple(address,bytes)", "bytes"];
const UPDATE_PROPOSAL_INPUTS: &[&str] = &["address", "uint256", "tuple(address,bytes)", "string"];
const VOTE_INPUTS: &[&str] = &["address", "uint256", "uint8", "tuple(uint8,bytes)[]", "string"];
const AUTHENTICATE_INPUTS: &[&str] = &["address", "bytes4", "bytes"];
const INDEXED_STRATEGIES: &str = "tuple(uint8 index, bytes params)[]";

/// Submits governance calls as transactions from the wallet account.
pub struct EthTxClient {
    strategies: Arc<StrategyRegistry>,
}

/// A call encoded for `authenticate(target, selector, data)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedCall {
    pub authenticator: String,
    pub calldata: String,
}

impl EthTxClient {
    pub fn new(strategies: Arc<StrategyRegistry>) -> Self {
        Self { strategies }
    }

    pub fn encode_propose(
        &self,
        author: &str,
        data: &ProposeData,
    ) -> GovernanceResult<AuthenticatedCall> {
        let user_strategies =
            user_strategy_params(&self.strategies, author, &data.strategies)?;
        let validation_params = encode_indexed_strategies(&user_strategies)?;
        let args = vec![
            json!(author),
            json!(data.metadata_uri),
            json!([data.execution_strategy.addr, data.execution_strategy.params]),
            json!(validation_params),
        ];
        authenticated_call(
            &data.authenticator,
            &data.space,
            "propose",
            PROPOSE_INPUTS,
            &args,
        )
    }

    pub fn encode_update_proposal(
        &self,
        author: &str,
        data: &UpdateProposalData,
    ) -> GovernanceResult<AuthenticatedCall> {
        let args = vec![
            json!(author),
            json!(data.proposal.to_string()),
            json!([data.execution_strategy.addr, data.execution_strategy.params]),
            json!(data.metadata_uri),
        ];
        authenticated_call(
            &data.authenticator,
            &data.space,
            "updateProposal",
            UPDATE_PROPOSAL_INPUTS,
            &args,
        )
    }

    pub fn encode_vote(&self, voter: &str, data: &VoteData) -> GovernanceResult<AuthenticatedCall> {
        let user_strategies = user_strategy_params(&self.strategies, voter, &data.strategies)?;
        let args = vec![
            json!(voter),
            json!(data.proposal.to_string()),
            json!(u64::from(data.choice)),
            Value::Array(
                user_strategies
                    .iter()
                    .map(|(index, params)| json!([u64::from(*index), params]))
                    .collect(),
            ),
            json!(data.metadata_uri),
        ];
        authenticated_call(&data.authenticator, &data.space, "vote", VOTE_INPUTS, &args)
    }

    async fn submit(
        &self,
        wallet: &dyn WalletSigner,
        action: &str,
        to: &str,
        calldata: String,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        let request = TransactionRequest {
            to: to.to_string(),
            data: calldata,
            value: U256::ZERO,
        };
        let hash = wallet.send_transaction(&request).await?;
        log::info!(
            "action_submit action={action} path=direct to={to} tx_hash={hash} no_wait={}",
            options.no_wait
        );
        if options.no_wait {
            return Ok(ActionReceipt::Transaction {
                hash,
                confirmed: false,
            });
        }
        wallet.wait_for_receipt(&hash).await?;
        Ok(ActionReceipt::Transaction {
            hash,
            confirmed: true,
        })
    }

    async fn submit_call(
        &self,
        wallet: &dyn WalletSigner,
        to: &str,
        function: &str,
        inputs: &[&str],
        args: &[Value],
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        let to = normalize_address(to).map_err(GovernanceError::Encoding)?;
        let specs = parse_types(inputs).map_err(GovernanceError::Encoding)?;
        let calldata =
            encode_function_call(function, &specs, args).map_err(GovernanceError::Encoding)?;
        self.submit(wallet, function, &to, encode_hex_blob(&calldata), options)
            .await
    }
}

fn encode_indexed_strategies(strategies: &[(u32, String)]) -> GovernanceResult<String> {
    let specs = parse_types(&[INDEXED_STRATEGIES]).map_err(GovernanceError::Encoding)?;
    let rows = strategies
        .iter()
        .map(|(index, params)| json!([u64::from(*index), params]))
        .collect::<Vec<_>>();
    let encoded =
        encode_abi_params(&specs, &[Value::Array(rows)]).map_err(GovernanceError::Encoding)?;
    Ok(encode_hex_blob(&encoded))
}

/// Encode `function(args)` on `target` wrapped in the authenticator's `authenticate`.
fn authenticated_call(
    authenticator: &str,
    target: &str,
    function: &str,
    inputs: &[&str],
    args: &[Value],
) -> GovernanceResult<AuthenticatedCall> {
    let authenticator = normalize_address(authenticator).map_err(GovernanceError::Encoding)?;
    let target = normalize_address(target).map_err(GovernanceError::Encoding)?;
    let specs = parse_types(inputs).map_err(GovernanceError::Encoding)?;
    let signature = canonical_signature(function, &specs).map_err(GovernanceError::Encoding)?;
    let selector = function_selector(&signature);
    let function_args = encode_abi_params(&specs, args).map_err(GovernanceError::Encoding)?;

    let authenticate_specs = parse_types(AUTHENTICATE_INPUTS).map_err(GovernanceError::Encoding)?;
    let calldata = encode_function_call(
        "authenticate",
        &authenticate_specs,
        &[
            json!(target),
            json!(encode_hex_blob(&selector)),
            json!(encode_hex_blob(&function_args)),
        ],
    )
    .map_err(GovernanceError::Encoding)?;
    Ok(AuthenticatedCall {
        authenticator,
        calldata: encode_hex_blob(&calldata),
    })
}

#[async_trait]
impl DirectSubmitter for EthTxClient {
    async fn propose(
        &self,
        wallet: &dyn WalletSigner,
        data: &ProposeData,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        let author = wallet.address().await?;
        let call = self.encode_propose(&author, data)?;
        self.submit(wallet, "propose", &call.authenticator, call.calldata, options)
            .await
    }

    async fn update_proposal(
        &self,
        wallet: &dyn WalletSigner,
        data: &UpdateProposalData,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        let author = wallet.address().await?;
        let call = self.encode_update_proposal(&author, data)?;
        self.submit(
            wallet,
            "update_proposal",
            &call.authenticator,
            call.calldata,
            options,
        )
        .await
    }

    async fn vote(
        &self,
        wallet: &dyn WalletSigner,
        data: &VoteData,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        let voter = wallet.address().await?;
        let call = self.encode_vote(&voter, data)?;
        self.submit(wallet, "vote", &call.authenticator, call.calldata, options)
            .await
    }

    async fn cancel(
        &self,
        wallet: &dyn WalletSigner,
        space: &str,
        proposal: u64,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        self.submit_call(
            wallet,
            space,
            "cancel",
            &["uint256"],
            &[json!(proposal.to_string())],
            options,
        )
        .await
    }

    async fn veto_execution(
        &self,
        wallet: &dyn WalletSigner,
        execution_strategy: &str,
        execution_hash: &str,
    ) -> GovernanceResult<ActionReceipt> {
        self.submit_call(
            wallet,
            execution_strategy,
            "veto",
            &["bytes32"],
            &[json!(execution_hash)],
            SubmitOptions::default(),
        )
        .await
    }

    async fn set_voting_delay(
        &self,
        wallet: &dyn WalletSigner,
        space: &str,
        voting_delay: u32,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        self.submit_call(
            wallet,
            space,
            "setVotingDelay",
            &["uint32"],
            &[json!(voting_delay)],
            options,
        )
        .await
    }

    async fn set_min_voting_duration(
        &self,
        wallet: &dyn WalletSigner,
        space: &str,
        min_voting_duration: u32,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        self.submit_call(
            wallet,
            space,
            "setMinVotingDuration",
            &["uint32"],
            &[json!(min_voting_duration)],
            options,
        )
        .await
    }

    async fn set_max_voting_duration(
        &self,
        wallet: &dyn WalletSigner,
        space: &str,
        max_voting_duration: u32,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        self.submit_call(
            wallet,
            space,
            "setMaxVotingDuration",
            &["uint32"],
            &[json!(max_voting_duration)],
            options,
        )
        .await
    }

    async fn delegate(
        &self,
        wallet: &dyn WalletSigner,
        votes_contract: &str,
        delegatee: &str,
    ) -> GovernanceResult<ActionReceipt> {
        self.submit_call(
            wallet,
            votes_contract,
            "delegate",
            &["address"],
            &[json!(delegatee)],
            SubmitOptions { no_wait: true },
        )
        .await
    }
}
