/// Voting strategy implementations keyed by deployed address.
///
/// Each strategy computes a voter's power at a block and produces the `params` blob a
/// vote or proposal submits for it. The registry is derived from a chain's
/// [`NetworkConfig`] and is immutable afterwards.
use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::domain::hex::{decode_hex_blob, encode_hex_blob, normalize_address};
use crate::domain::types::StrategyKind;
use crate::features::evm::ChainProvider;
use crate::network::NetworkConfig;
use crate::strategy::abi::{
    decode_abi_params, encode_abi_params, encode_function_call, parse_types, AbiTypeSpec,
};
use alloy_primitives::{keccak256, B256, U256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

const EMPTY_PARAMS: &str = "0x";

#[async_trait]
pub trait VotingStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn get_voting_power(
        &self,
        strategy_address: &str,
        voter: &str,
        metadata: Option<&Value>,
        block: u64,
        params: &str,
        provider: &dyn ChainProvider,
    ) -> GovernanceResult<U256>;

    /// Per-voter params submitted alongside the strategy index.
    fn user_params(&self, _voter: &str, _metadata: Option<&Value>) -> GovernanceResult<String> {
        Ok(EMPTY_PARAMS.to_string())
    }
}

// ── Vanilla ──────────────────────────────────────────────────────────────────

/// One vote per account.
pub struct VanillaStrategy;

#[async_trait]
impl VotingStrategy for VanillaStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Vanilla
    }

    async fn get_voting_power(
        &self,
        _strategy_address: &str,
        _voter: &str,
        _metadata: Option<&Value>,
        _block: u64,
        _params: &str,
        _provider: &dyn ChainProvider,
    ) -> GovernanceResult<U256> {
        Ok(U256::from(1u8))
    }
}

// ── Token checkpoints (comp, ozVotes) ────────────────────────────────────────

/// Delegated token votes read from the token contract named in the strategy params.
pub struct TokenVotesStrategy {
    kind: StrategyKind,
    function_name: &'static str,
}

impl TokenVotesStrategy {
    pub fn comp() -> Self {
        Self {
            kind: StrategyKind::Comp,
            function_name: "getCurrentVotes",
        }
    }

    pub fn oz_votes() -> Self {
        Self {
            kind: StrategyKind::OzVotes,
            function_name: "getVotes",
        }
    }
}

#[async_trait]
impl VotingStrategy for TokenVotesStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn get_voting_power(
        &self,
        _strategy_address: &str,
        voter: &str,
        _metadata: Option<&Value>,
        block: u64,
        params: &str,
        provider: &dyn ChainProvider,
    ) -> GovernanceResult<U256> {
        let token = normalize_address(params).map_err(|error| {
            GovernanceError::Encoding(format!("{} params must be a token address: {error}", self.kind.as_str()))
        })?;
        let inputs = parse_types(&["address"]).map_err(GovernanceError::Encoding)?;
        let calldata = encode_function_call(self.function_name, &inputs, &[json!(voter)])
            .map_err(GovernanceError::Encoding)?;
        let raw = provider
            .call(&token, &encode_hex_blob(&calldata), Some(block))
            .await?;
        decode_uint256(&raw)
    }
}

fn decode_uint256(raw: &str) -> GovernanceResult<U256> {
    let bytes = decode_hex_blob(raw, "eth_call result").map_err(GovernanceError::Rpc)?;
    let decoded = decode_abi_params(&[AbiTypeSpec::primitive("uint256")], &bytes)
        .map_err(GovernanceError::Rpc)?;
    decoded
        .first()
        .and_then(Value::as_str)
        .and_then(|value| value.parse::<U256>().ok())
        .ok_or_else(|| GovernanceError::Rpc("eth_call returned no uint256".to_string()))
}

// ── Whitelist (merkle) ───────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize)]
struct WhitelistEntry {
    address: String,
    #[serde(rename = "votingPower")]
    voting_power: Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhitelistMember {
    pub address: String,
    pub voting_power: U256,
}

/// Allow-list of fixed voting powers, proven on chain against a merkle root.
pub struct WhitelistStrategy;

impl WhitelistStrategy {
    pub fn members(metadata: Option<&Value>) -> GovernanceResult<Vec<WhitelistMember>> {
        let tree = metadata
            .and_then(|metadata| metadata.get("tree"))
            .cloned()
            .ok_or_else(|| GovernanceError::Metadata("whitelist metadata has no tree".to_string()))?;
        let entries: Vec<WhitelistEntry> = serde_json::from_value(tree).map_err(|error| {
            GovernanceError::Metadata(format!("invalid whitelist tree: {error}"))
        })?;
        entries
            .into_iter()
            .map(|entry| {
                let address = normalize_address(&entry.address).map_err(GovernanceError::Metadata)?;
                let voting_power = match &entry.voting_power {
                    Value::String(raw) => raw.parse::<U256>().ok(),
                    Value::Number(raw) => raw.as_u64().map(U256::from),
                    _ => None,
                }
                .ok_or_else(|| {
                    GovernanceError::Metadata(format!("invalid votingPower for {address}"))
                })?;
                Ok(WhitelistMember {
                    address,
                    voting_power,
                })
            })
            .collect()
    }
}

#[async_trait]
impl VotingStrategy for WhitelistStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Whitelist
    }

    async fn get_voting_power(
        &self,
        _strategy_address: &str,
        voter: &str,
        metadata: Option<&Value>,
        _block: u64,
        _params: &str,
        _provider: &dyn ChainProvider,
    ) -> GovernanceResult<U256> {
        let voter = normalize_address(voter).map_err(GovernanceError::Encoding)?;
        Ok(Self::members(metadata)?
            .into_iter()
            .find(|member| member.address == voter)
            .map(|member| member.voting_power)
            .unwrap_or(U256::ZERO))
    }

    fn user_params(&self, voter: &str, metadata: Option<&Value>) -> GovernanceResult<String> {
        let voter = normalize_address(voter).map_err(GovernanceError::Encoding)?;
        let members = Self::members(metadata)?;
        let position = members
            .iter()
            .position(|member| member.address == voter)
            .ok_or_else(|| GovernanceError::Metadata(format!("{voter} is not whitelisted")))?;
        let tree = MerkleTree::build(&members)?;
        let proof = tree
            .proof(position)
            .iter()
            .map(|node| Value::String(encode_hex_blob(node.as_slice())))
            .collect::<Vec<_>>();
        let member = &members[position];
        let specs = parse_types(&["bytes32[]", "tuple(address,uint96)"])
            .map_err(GovernanceError::Encoding)?;
        let encoded = encode_abi_params(
            &specs,
            &[
                Value::Array(proof),
                json!([member.address, member.voting_power.to_string()]),
            ],
        )
        .map_err(GovernanceError::Encoding)?;
        Ok(encode_hex_blob(&encoded))
    }
}

/// OpenZeppelin standard merkle tree over `(address, uint96)` leaves.
pub struct MerkleTree {
    nodes: Vec<B256>,
    /// Tree index of each input leaf, by input position.
    leaf_positions: Vec<usize>,
}

impl MerkleTree {
    pub fn build(members: &[WhitelistMember]) -> GovernanceResult<Self> {
        if members.is_empty() {
            return Err(GovernanceError::Metadata(
                "whitelist tree must not be empty".to_string(),
            ));
        }
        let mut hashed = members
            .iter()
            .enumerate()
            .map(|(position, member)| leaf_hash(member).map(|hash| (hash, position)))
            .collect::<GovernanceResult<Vec<_>>>()?;
        hashed.sort_by(|left, right| left.0.cmp(&right.0));

        let len = hashed.len() * 2 - 1;
        let mut nodes = vec![B256::ZERO; len];
        let mut leaf_positions = vec![0usize; members.len()];
        for (sorted_index, (hash, position)) in hashed.iter().enumerate() {
            let tree_index = len - 1 - sorted_index;
            nodes[tree_index] = *hash;
            leaf_positions[*position] = tree_index;
        }
        for index in (0..len - hashed.len()).rev() {
            nodes[index] = hash_pair(nodes[2 * index + 1], nodes[2 * index + 2]);
        }
        Ok(Self {
            nodes,
            leaf_positions,
        })
    }

    pub fn root(&self) -> B256 {
        self.nodes[0]
    }

    pub fn proof(&self, position: usize) -> Vec<B256> {
        let mut proof = Vec::new();
        let Some(mut index) = self.leaf_positions.get(position).copied() else {
            return proof;
        };
        while index > 0 {
            let sibling = if index % 2 == 1 { index + 1 } else { index - 1 };
            proof.push(self.nodes[sibling]);
            index = (index - 1) / 2;
        }
        proof
    }
}

fn leaf_hash(member: &WhitelistMember) -> GovernanceResult<B256> {
    let specs = parse_types(&["address", "uint96"]).map_err(GovernanceError::Encoding)?;
    let encoded = encode_abi_params(
        &specs,
        &[json!(member.address), json!(member.voting_power.to_string())],
    )
    .map_err(GovernanceError::Encoding)?;
    Ok(keccak256(keccak256(encoded)))
}

fn hash_pair(left: B256, right: B256) -> B256 {
    let (first, second) = if left <= right { (left, right) } else { (right, left) };
    let mut buffer = [0u8; 64];
    buffer[..32].copy_from_slice(first.as_slice());
    buffer[32..].copy_from_slice(second.as_slice());
    keccak256(buffer)
}

/// Root recomputed from a leaf and its proof; mirrors the on-chain verifier.
pub fn process_proof(member: &WhitelistMember, proof: &[B256]) -> GovernanceResult<B256> {
    let mut computed = leaf_hash(member)?;
    for node in proof {
        computed = hash_pair(computed, *node);
    }
    Ok(computed)
}

// ── Registry ─────────────────────────────────────────────────────────────────

pub fn strategy_for_kind(kind: StrategyKind) -> Arc<dyn VotingStrategy> {
    match kind {
        StrategyKind::Vanilla => Arc::new(VanillaStrategy),
        StrategyKind::Comp => Arc::new(TokenVotesStrategy::comp()),
        StrategyKind::OzVotes => Arc::new(TokenVotesStrategy::oz_votes()),
        StrategyKind::Whitelist => Arc::new(WhitelistStrategy),
    }
}

#[derive(Clone, Default)]
pub struct StrategyRegistry {
    by_address: BTreeMap<String, Arc<dyn VotingStrategy>>,
}

impl StrategyRegistry {
    pub fn from_network(config: &NetworkConfig) -> Self {
        let by_address = config
            .strategies()
            .map(|(address, kind)| (address.to_string(), strategy_for_kind(kind)))
            .collect();
        Self { by_address }
    }

    /// Register or replace the implementation behind `address`.
    pub fn insert(
        &mut self,
        address: &str,
        strategy: Arc<dyn VotingStrategy>,
    ) -> GovernanceResult<()> {
        let address = normalize_address(address).map_err(GovernanceError::Config)?;
        self.by_address.insert(address, strategy);
        Ok(())
    }

    pub fn get(&self, address: &str) -> Option<Arc<dyn VotingStrategy>> {
        let address = normalize_address(address).ok()?;
        self.by_address.get(&address).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeChainProvider;

    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";
    const CAROL: &str = "0x3333333333333333333333333333333333333333";

    fn whitelist_metadata() -> Value {
        json!({
            "tree": [
                {"address": ALICE, "votingPower": "10"},
                {"address": BOB, "votingPower": 20},
                {"address": CAROL, "votingPower": "30"}
            ]
        })
    }

    #[tokio::test]
    async fn vanilla_counts_every_voter_once() {
        let provider = FakeChainProvider::new(1);
        let power = VanillaStrategy
            .get_voting_power(ALICE, BOB, None, 100, EMPTY_PARAMS, &provider)
            .await
            .expect("vanilla never fails");
        assert_eq!(power, U256::from(1u8));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn comp_reads_token_votes_at_the_snapshot_block() {
        let provider = FakeChainProvider::new(1);
        let token = "0x4444444444444444444444444444444444444444";
        provider.set_call_result(token, &format!("0x{:064x}", 1_500u64));
        let power = TokenVotesStrategy::comp()
            .get_voting_power(ALICE, BOB, None, 17_000_000, token, &provider)
            .await
            .expect("comp query should succeed");
        assert_eq!(power, U256::from(1_500u64));

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to, token);
        assert_eq!(calls[0].block, Some(17_000_000));
        assert!(calls[0].data.starts_with(&crate::strategy::abi::function_selector_hex(
            "getCurrentVotes(address)"
        )));
    }

    #[tokio::test]
    async fn token_strategies_reject_non_address_params() {
        let provider = FakeChainProvider::new(1);
        let error = TokenVotesStrategy::oz_votes()
            .get_voting_power(ALICE, BOB, None, 1, "0x", &provider)
            .await
            .expect_err("params must be a token address");
        assert!(matches!(error, GovernanceError::Encoding(_)));
    }

    #[tokio::test]
    async fn whitelist_power_comes_from_the_tree() {
        let provider = FakeChainProvider::new(1);
        let metadata = whitelist_metadata();
        let bob = WhitelistStrategy
            .get_voting_power(ALICE, BOB, Some(&metadata), 1, EMPTY_PARAMS, &provider)
            .await
            .expect("whitelist lookup should succeed");
        assert_eq!(bob, U256::from(20u8));
        let stranger = WhitelistStrategy
            .get_voting_power(
                ALICE,
                "0x5555555555555555555555555555555555555555",
                Some(&metadata),
                1,
                EMPTY_PARAMS,
                &provider,
            )
            .await
            .expect("unknown voter has zero power");
        assert_eq!(stranger, U256::ZERO);
    }

    #[test]
    fn merkle_proofs_verify_against_the_root() {
        let members = WhitelistStrategy::members(Some(&whitelist_metadata()))
            .expect("tree should parse");
        let tree = MerkleTree::build(&members).expect("tree should build");
        for (position, member) in members.iter().enumerate() {
            let root = process_proof(member, &tree.proof(position)).expect("proof should hash");
            assert_eq!(root, tree.root(), "proof for {} should verify", member.address);
        }
    }

    #[test]
    fn single_member_tree_root_is_the_leaf() {
        let member = WhitelistMember {
            address: ALICE.to_string(),
            voting_power: U256::from(7u8),
        };
        let tree = MerkleTree::build(std::slice::from_ref(&member)).expect("tree should build");
        assert!(tree.proof(0).is_empty());
        assert_eq!(tree.root(), leaf_hash(&member).expect("leaf should hash"));
    }

    #[test]
    fn whitelist_user_params_decode_to_proof_and_member() {
        let metadata = whitelist_metadata();
        let params = WhitelistStrategy
            .user_params(CAROL, Some(&metadata))
            .expect("carol is whitelisted");
        let specs =
            parse_types(&["bytes32[]", "tuple(address,uint96)"]).expect("types should parse");
        let decoded = decode_abi_params(
            &specs,
            &decode_hex_blob(&params, "params").expect("params are hex"),
        )
        .expect("params should decode");
        assert_eq!(decoded[1], json!([CAROL, "30"]));
        assert_eq!(decoded[0].as_array().map(Vec::len), Some(2));

        let error = WhitelistStrategy
            .user_params("0x5555555555555555555555555555555555555555", Some(&metadata))
            .expect_err("stranger has no proof");
        assert!(matches!(error, GovernanceError::Metadata(_)));
    }

    #[test]
    fn registry_is_built_from_network_tables() {
        let config = NetworkConfig::new(
            31_337,
            "anvil",
            "Anvil",
            Vec::new(),
            vec![
                (ALICE.to_uppercase().replace("0X", "0x"), StrategyKind::Vanilla),
                (BOB.to_string(), StrategyKind::Whitelist),
            ],
        )
        .expect("config should build");
        let registry = StrategyRegistry::from_network(&config);
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get(ALICE).map(|strategy| strategy.kind()),
            Some(StrategyKind::Vanilla)
        );
        assert!(registry.get(CAROL).is_none());
        assert_eq!(
            VanillaStrategy
                .user_params(ALICE, None)
                .expect("default params"),
            "0x"
        );
    }
}
