use thiserror::Error;

/// Every failure the action layer surfaces to its caller.
///
/// Unknown voting strategies have no variant; the aggregator reports them as zero-value
/// entries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("wallet is connected to chain {actual}, expected chain {expected}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("chain {0} is not supported")]
    UnsupportedChain(u64),

    #[error("network id {0} is not supported")]
    UnsupportedNetworkId(String),

    #[error("no authenticator is compatible with connector {connector} (contract account: {is_contract})")]
    NoCompatibleAuthenticator { connector: String, is_contract: bool },

    #[error("none of the space strategies are supported on this network")]
    NoSupportedStrategies,

    #[error("voting power requires a snapshot block number")]
    MissingSnapshotBlock,

    #[error("strategy inputs have mismatched lengths: addresses={addresses} params={params} metadata={metadata}")]
    LengthMismatch {
        addresses: usize,
        params: usize,
        metadata: usize,
    },

    #[error("no supported executor configured for this space: {0}")]
    NoSupportedExecutor(String),

    #[error("execution strategy {0} is not supported")]
    UnsupportedExecutionStrategy(String),

    #[error("parsed metadata missing for strategy index {0}")]
    MissingStrategyMetadata(u32),

    #[error("invalid delegation contract reference: {0}")]
    InvalidDelegationContract(String),

    #[error("voting power query for strategy {address} timed out after {timeout_ms}ms")]
    QueryTimeout { address: String, timeout_ms: u64 },

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("relayer error: {0}")]
    Relayer(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("wallet does not support switching chains")]
    ChainSwitchUnsupported,

    #[error("strategy metadata error: {0}")]
    Metadata(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl GovernanceError {
    /// True for conditions the user can fix from the wallet (switch network, change
    /// wallet type) rather than programming or infrastructure faults.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            Self::WrongNetwork { .. } | Self::NoCompatibleAuthenticator { .. }
        )
    }
}

pub type GovernanceResult<T> = Result<T, GovernanceError>;
