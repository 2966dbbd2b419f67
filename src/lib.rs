pub mod actions;
pub mod clients;
pub mod config;
pub mod domain;
pub mod features;
pub mod network;
pub mod strategy;

#[cfg(test)]
mod test_support;

pub use actions::{create_actions, ActionComponents, EvmActions, ProposalDraft};
pub use config::{ClientConfig, QueryLimits};
pub use domain::error::{GovernanceError, GovernanceResult};
pub use domain::types::{
    ActionReceipt, AuthenticatorKind, Choice, Connector, ExecutionStrategyRef,
    ExecutionStrategyType, IndexedStrategy, MetaTransaction, Proposal, ProposalSpace,
    ProposalTransaction, RelayerType, SnapshotInfo, Space, StrategyKind, StrategyParsedMetadata,
    StrategyWithMetadata, SubmitOptions, VotingPower,
};
pub use network::{NetworkConfig, NetworkRegistry};
