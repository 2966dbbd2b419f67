use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// ── Wallet connectors ────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    Injected,
    WalletConnect,
    WalletLink,
    Gnosis,
    Unicorn,
    ArgentX,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectorFamily {
    Evm,
    Starknet,
}

pub const EVM_CONNECTORS: &[Connector] = &[
    Connector::Injected,
    Connector::WalletConnect,
    Connector::WalletLink,
    Connector::Gnosis,
    Connector::Unicorn,
];

impl Connector {
    pub fn family(&self) -> ConnectorFamily {
        match self {
            Self::ArgentX => ConnectorFamily::Starknet,
            _ => ConnectorFamily::Evm,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Injected => "injected",
            Self::WalletConnect => "walletconnect",
            Self::WalletLink => "walletlink",
            Self::Gnosis => "gnosis",
            Self::Unicorn => "unicorn",
            Self::ArgentX => "argentx",
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Authenticators, relayers, strategies ─────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthenticatorKind {
    #[serde(rename = "ethSig")]
    EthSig,
    #[serde(rename = "ethSigV2")]
    EthSigV2,
    #[serde(rename = "ethTx")]
    EthTx,
}

impl AuthenticatorKind {
    /// Relayer that submits actions authorized by this authenticator, `None` when the
    /// wallet submits the transaction itself.
    pub fn relayer_type(&self) -> Option<RelayerType> {
        match self {
            Self::EthSig | Self::EthSigV2 => Some(RelayerType::Evm),
            Self::EthTx => None,
        }
    }

    /// Contract accounts cannot produce an ECDSA signature recoverable to their own
    /// address, so only transaction-based authentication works for them.
    pub fn supports_contract_accounts(&self) -> bool {
        matches!(self, Self::EthTx)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RelayerType {
    Evm,
    EvmTx,
}

impl RelayerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::EvmTx => "evm-tx",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    #[serde(rename = "vanilla")]
    Vanilla,
    #[serde(rename = "comp")]
    Comp,
    #[serde(rename = "ozVotes")]
    OzVotes,
    #[serde(rename = "whitelist")]
    Whitelist,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vanilla => "vanilla",
            Self::Comp => "comp",
            Self::OzVotes => "ozVotes",
            Self::Whitelist => "whitelist",
        }
    }

    /// Token-backed strategies whose params hold the voting token address.
    pub fn is_token_backed(&self) -> bool {
        matches!(self, Self::Comp | Self::OzVotes)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ExecutionStrategyType {
    SimpleQuorumAvatar,
    SimpleQuorumTimelock,
    Axiom,
    #[serde(untagged)]
    Other(String),
}

impl ExecutionStrategyType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "SimpleQuorumAvatar" => Self::SimpleQuorumAvatar,
            "SimpleQuorumTimelock" => Self::SimpleQuorumTimelock,
            "Axiom" => Self::Axiom,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ExecutionStrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SimpleQuorumAvatar => f.write_str("SimpleQuorumAvatar"),
            Self::SimpleQuorumTimelock => f.write_str("SimpleQuorumTimelock"),
            Self::Axiom => f.write_str("Axiom"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

// ── Spaces and proposals ─────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct StrategyParsedMetadata {
    pub index: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub decimals: u32,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Space {
    pub id: String,
    #[serde(default)]
    pub authenticators: Vec<String>,
    #[serde(default)]
    pub executors: Vec<String>,
    #[serde(default)]
    pub executors_types: Vec<String>,
    #[serde(default)]
    pub voting_power_validation_strategy_strategies: Vec<String>,
    #[serde(default)]
    pub voting_power_validation_strategy_strategies_params: Vec<String>,
    #[serde(default)]
    pub voting_power_validation_strategies_parsed_metadata: Vec<StrategyParsedMetadata>,
    #[serde(default)]
    pub strategies: Vec<String>,
    #[serde(default)]
    pub strategies_params: Vec<String>,
    #[serde(default)]
    pub strategies_indices: Vec<u32>,
    #[serde(default)]
    pub strategies_parsed_metadata: Vec<StrategyParsedMetadata>,
}

/// The slice of a space that a proposal carries with it.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProposalSpace {
    pub id: String,
    #[serde(default)]
    pub authenticators: Vec<String>,
    #[serde(default)]
    pub executors: Vec<String>,
    #[serde(default)]
    pub executors_types: Vec<String>,
    #[serde(default)]
    pub strategies_parsed_metadata: Vec<StrategyParsedMetadata>,
}

/// A transaction as stored by the indexer for proposal execution.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProposalTransaction {
    pub to: String,
    #[serde(default = "default_zero_quantity")]
    pub value: String,
    #[serde(default = "default_empty_data")]
    pub data: String,
    #[serde(default = "default_zero_quantity")]
    pub salt: String,
}

fn default_zero_quantity() -> String {
    "0".to_string()
}

fn default_empty_data() -> String {
    "0x".to_string()
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Proposal {
    pub proposal_id: u64,
    pub space: ProposalSpace,
    #[serde(default)]
    pub strategies: Vec<String>,
    #[serde(default)]
    pub strategies_indices: Vec<u32>,
    #[serde(default)]
    pub strategies_params: Vec<String>,
    #[serde(default)]
    pub execution_strategy: String,
    #[serde(default)]
    pub execution_strategy_type: String,
    #[serde(default)]
    pub execution: Vec<ProposalTransaction>,
    #[serde(default)]
    pub execution_hash: String,
}

// ── Picker output and payloads ───────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IndexedStrategy {
    pub index: u32,
    pub address: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StrategyWithMetadata {
    pub index: u32,
    pub address: String,
    pub metadata: Option<Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MetaTransaction {
    pub to: String,
    pub value: U256,
    pub data: String,
    pub operation: u8,
    pub salt: U256,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExecutionStrategyRef {
    pub addr: String,
    pub params: String,
}

impl ExecutionStrategyRef {
    pub fn none() -> Self {
        Self {
            addr: ZERO_ADDRESS.to_string(),
            params: "0x".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    For,
    Against,
    Abstain,
}

impl Choice {
    pub fn sdk_code(&self) -> u8 {
        match self {
            Self::Against => 0,
            Self::For => 1,
            Self::Abstain => 2,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProposeData {
    pub space: String,
    pub authenticator: String,
    pub strategies: Vec<StrategyWithMetadata>,
    pub execution_strategy: ExecutionStrategyRef,
    pub metadata_uri: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UpdateProposalData {
    pub space: String,
    pub proposal: u64,
    pub authenticator: String,
    pub execution_strategy: ExecutionStrategyRef,
    pub metadata_uri: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VoteData {
    pub space: String,
    pub authenticator: String,
    pub strategies: Vec<StrategyWithMetadata>,
    pub proposal: u64,
    pub choice: u8,
    pub metadata_uri: String,
    pub chain_id: u64,
}

/// Options for the direct submission path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Return as soon as the transaction is broadcast instead of waiting for a receipt.
    pub no_wait: bool,
}

/// What a governance action produced.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ActionReceipt {
    Transaction { hash: String, confirmed: bool },
    Relayed(Value),
    Dispatched(Value),
    Empty,
}

// ── Voting power ─────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub at: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VotingPower {
    pub address: String,
    pub value: U256,
    pub decimals: u32,
    pub symbol: String,
    pub token: Option<String>,
    pub swap_link: Option<String>,
}

impl VotingPower {
    /// Placeholder for a strategy address missing from the registry.
    pub fn unknown(address: &str) -> Self {
        Self {
            address: address.to_string(),
            value: U256::ZERO,
            decimals: 0,
            symbol: String::new(),
            token: None,
            swap_link: None,
        }
    }
}
