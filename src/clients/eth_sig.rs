/// Relayed submission through EIP-712 signatures.
///
/// The wallet signs a typed-data message bound to the authenticator contract; the
/// signed envelope goes to the relayer, which submits and pays for the transaction.
use crate::clients::{user_strategy_params, RelayedSubmitter};
use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::domain::hex::{encode_hex_blob, normalize_address};
use crate::domain::types::{
    ActionReceipt, ExecutionStrategyRef, ProposeData, StrategyWithMetadata, UpdateProposalData,
    VoteData,
};
use crate::features::mana::EnvelopeRelay;
use crate::features::signer::WalletSigner;
use crate::strategy::abi::{encode_abi_params, parse_types};
use crate::strategy::registry::StrategyRegistry;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

const DOMAIN_NAME: &str = "snapshot-x";
const DOMAIN_VERSION: &str = "1";

pub struct EthSigClient {
    chain_id: u64,
    strategies: Arc<StrategyRegistry>,
    relay: Arc<dyn EnvelopeRelay>,
}

impl EthSigClient {
    pub fn new(
        chain_id: u64,
        strategies: Arc<StrategyRegistry>,
        relay: Arc<dyn EnvelopeRelay>,
    ) -> Self {
        Self {
            chain_id,
            strategies,
            relay,
        }
    }

    fn domain(&self, authenticator: &str) -> GovernanceResult<Value> {
        let verifying_contract =
            normalize_address(authenticator).map_err(GovernanceError::Encoding)?;
        Ok(json!({
            "name": DOMAIN_NAME,
            "version": DOMAIN_VERSION,
            "chainId": self.chain_id,
            "verifyingContract": verifying_contract
        }))
    }

    pub fn propose_typed_data(&self, author: &str, data: &ProposeData) -> GovernanceResult<Value> {
        let user_strategies = user_strategy_params(&self.strategies, author, &data.strategies)?;
        let specs =
            parse_types(&["tuple(uint8 index, bytes params)[]"]).map_err(GovernanceError::Encoding)?;
        let rows = user_strategies
            .iter()
            .map(|(index, params)| json!([u64::from(*index), params]))
            .collect::<Vec<_>>();
        let validation_params =
            encode_abi_params(&specs, &[Value::Array(rows)]).map_err(GovernanceError::Encoding)?;
        Ok(json!({
            "domain": self.domain(&data.authenticator)?,
            "types": {
                "Propose": [
                    {"name": "author", "type": "address"},
                    {"name": "space", "type": "address"},
                    {"name": "executionStrategy", "type": "Strategy"},
                    {"name": "userProposalValidationParams", "type": "bytes"},
                    {"name": "metadataURI", "type": "string"},
                    {"name": "salt", "type": "uint256"}
                ],
                "Strategy": strategy_type()
            },
            "primaryType": "Propose",
            "message": {
                "author": author,
                "space": data.space,
                "executionStrategy": strategy_message(&data.execution_strategy),
                "userProposalValidationParams": encode_hex_blob(&validation_params),
                "metadataURI": data.metadata_uri,
                "salt": new_salt()
            }
        }))
    }

    pub fn update_proposal_typed_data(
        &self,
        author: &str,
        data: &UpdateProposalData,
    ) -> GovernanceResult<Value> {
        Ok(json!({
            "domain": self.domain(&data.authenticator)?,
            "types": {
                "UpdateProposal": [
                    {"name": "author", "type": "address"},
                    {"name": "space", "type": "address"},
                    {"name": "proposalId", "type": "uint256"},
                    {"name": "executionStrategy", "type": "Strategy"},
                    {"name": "metadataURI", "type": "string"},
                    {"name": "salt", "type": "uint256"}
                ],
                "Strategy": strategy_type()
            },
            "primaryType": "UpdateProposal",
            "message": {
                "author": author,
                "space": data.space,
                "proposalId": data.proposal.to_string(),
                "executionStrategy": strategy_message(&data.execution_strategy),
                "metadataURI": data.metadata_uri,
                "salt": new_salt()
            }
        }))
    }

    pub fn vote_typed_data(&self, voter: &str, data: &VoteData) -> GovernanceResult<Value> {
        let user_strategies = user_strategy_params(&self.strategies, voter, &data.strategies)?;
        Ok(json!({
            "domain": self.domain(&data.authenticator)?,
            "types": {
                "Vote": [
                    {"name": "space", "type": "address"},
                    {"name": "voter", "type": "address"},
                    {"name": "proposalId", "type": "uint256"},
                    {"name": "choice", "type": "uint8"},
                    {"name": "userVotingStrategies", "type": "IndexedStrategy[]"},
                    {"name": "voteMetadataURI", "type": "string"}
                ],
                "IndexedStrategy": [
                    {"name": "index", "type": "uint8"},
                    {"name": "params", "type": "bytes"}
                ]
            },
            "primaryType": "Vote",
            "message": {
                "space": data.space,
                "voter": voter,
                "proposalId": data.proposal.to_string(),
                "choice": data.choice,
                "userVotingStrategies": user_strategies
                    .iter()
                    .map(|(index, params)| json!({"index": index, "params": params}))
                    .collect::<Vec<_>>(),
                "voteMetadataURI": data.metadata_uri
            }
        }))
    }

    async fn sign_and_send(
        &self,
        wallet: &dyn WalletSigner,
        action: &str,
        typed_data: Value,
        data: Value,
    ) -> GovernanceResult<ActionReceipt> {
        let address = wallet.address().await?;
        let signature = wallet.sign_typed_data(&typed_data).await?;
        let envelope = json!({
            "signatureData": {
                "address": address,
                "signature": signature,
                "domain": typed_data["domain"],
                "types": typed_data["types"],
                "message": typed_data["message"],
                "primaryType": typed_data["primaryType"]
            },
            "data": data
        });
        let result = self.relay.send(&envelope).await?;
        log::info!(
            "action_submit action={action} path=relayed chain_id={} signer={address}",
            self.chain_id
        );
        Ok(ActionReceipt::Relayed(result))
    }
}

fn strategy_type() -> Value {
    json!([
        {"name": "addr", "type": "address"},
        {"name": "params", "type": "bytes"}
    ])
}

fn strategy_message(strategy: &ExecutionStrategyRef) -> Value {
    json!({"addr": strategy.addr, "params": strategy.params})
}

fn strategies_payload(strategies: &[StrategyWithMetadata]) -> Value {
    Value::Array(
        strategies
            .iter()
            .map(|strategy| {
                json!({
                    "index": strategy.index,
                    "address": strategy.address,
                    "metadata": strategy.metadata
                })
            })
            .collect(),
    )
}

fn new_salt() -> String {
    rand::random::<u64>().to_string()
}

#[async_trait]
impl RelayedSubmitter for EthSigClient {
    async fn propose(
        &self,
        wallet: &dyn WalletSigner,
        data: &ProposeData,
    ) -> GovernanceResult<ActionReceipt> {
        let author = wallet.address().await?;
        let typed_data = self.propose_typed_data(&author, data)?;
        let payload = json!({
            "space": data.space,
            "authenticator": data.authenticator,
            "strategies": strategies_payload(&data.strategies),
            "executionStrategy": strategy_message(&data.execution_strategy),
            "metadataUri": data.metadata_uri
        });
        self.sign_and_send(wallet, "propose", typed_data, payload)
            .await
    }

    async fn update_proposal(
        &self,
        wallet: &dyn WalletSigner,
        data: &UpdateProposalData,
    ) -> GovernanceResult<ActionReceipt> {
        let author = wallet.address().await?;
        let typed_data = self.update_proposal_typed_data(&author, data)?;
        let payload = json!({
            "space": data.space,
            "proposal": data.proposal,
            "authenticator": data.authenticator,
            "executionStrategy": strategy_message(&data.execution_strategy),
            "metadataUri": data.metadata_uri
        });
        self.sign_and_send(wallet, "update_proposal", typed_data, payload)
            .await
    }

    async fn vote(
        &self,
        wallet: &dyn WalletSigner,
        data: &VoteData,
    ) -> GovernanceResult<ActionReceipt> {
        let voter = wallet.address().await?;
        let typed_data = self.vote_typed_data(&voter, data)?;
        let payload = json!({
            "space": data.space,
            "authenticator": data.authenticator,
            "strategies": strategies_payload(&data.strategies),
            "proposal": data.proposal,
            "choice": data.choice,
            "metadataUri": data.metadata_uri,
            "chainId": data.chain_id
        });
        self.sign_and_send(wallet, "vote", typed_data, payload).await
    }

    async fn send(&self, envelope: &Value) -> GovernanceResult<Value> {
        self.relay.send(envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingRelay, RecordingWallet};

    const AUTHENTICATOR: &str = "0x5f9b7d78c9a37a439d78f801e0e339c6e711e260";
    const SPACE: &str = "0x0000000000000000000000000000000000000abc";

    fn client(relay: Arc<RecordingRelay>) -> EthSigClient {
        EthSigClient::new(11_155_111, Arc::new(StrategyRegistry::default()), relay)
    }

    fn vote_data() -> VoteData {
        VoteData {
            space: SPACE.to_string(),
            authenticator: AUTHENTICATOR.to_string(),
            strategies: vec![StrategyWithMetadata {
                index: 1,
                address: "0xc1245c5dca7885c73e32294140f1e5d30688c202".to_string(),
                metadata: None,
            }],
            proposal: 12,
            choice: 2,
            metadata_uri: String::new(),
            chain_id: 11_155_111,
        }
    }

    #[test]
    fn typed_data_domain_binds_chain_and_authenticator() {
        let relay = Arc::new(RecordingRelay::default());
        let typed = client(relay)
            .vote_typed_data("0x1111111111111111111111111111111111111111", &vote_data())
            .expect("typed data should build");
        assert_eq!(
            typed["domain"],
            json!({
                "name": "snapshot-x",
                "version": "1",
                "chainId": 11_155_111,
                "verifyingContract": AUTHENTICATOR
            })
        );
        assert_eq!(typed["primaryType"], "Vote");
        assert_eq!(
            typed["message"]["userVotingStrategies"],
            json!([{"index": 1, "params": "0x"}])
        );
    }

    #[test]
    fn propose_messages_get_fresh_salts() {
        let relay = Arc::new(RecordingRelay::default());
        let client = client(relay);
        let data = ProposeData {
            space: SPACE.to_string(),
            authenticator: AUTHENTICATOR.to_string(),
            strategies: Vec::new(),
            execution_strategy: ExecutionStrategyRef::none(),
            metadata_uri: "ipfs://bafy".to_string(),
        };
        let author = "0x1111111111111111111111111111111111111111";
        let first = client
            .propose_typed_data(author, &data)
            .expect("typed data should build");
        let second = client
            .propose_typed_data(author, &data)
            .expect("typed data should build");
        assert_eq!(first["message"]["metadataURI"], "ipfs://bafy");
        assert_ne!(first["message"]["salt"], second["message"]["salt"]);
    }

    #[tokio::test]
    async fn vote_envelope_reaches_the_relayer() {
        let relay = Arc::new(RecordingRelay::default());
        let wallet = RecordingWallet::new(11_155_111);
        let receipt = client(relay.clone())
            .vote(&wallet, &vote_data())
            .await
            .expect("vote should relay");
        assert!(matches!(receipt, ActionReceipt::Relayed(_)));

        let envelopes = relay.envelopes();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0]["data"]["choice"], 2);
        assert_eq!(envelopes[0]["signatureData"]["primaryType"], "Vote");
        assert_eq!(
            envelopes[0]["signatureData"]["signature"],
            json!(wallet.signatures()[0])
        );
        assert!(wallet.sent_transactions().is_empty());
    }
}
