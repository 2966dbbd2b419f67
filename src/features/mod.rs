pub mod evm;
pub mod http_fetch;
pub mod mana;
pub mod metadata;
pub mod signer;

pub use evm::{ChainProvider, HttpEvmRpcClient};
pub use mana::{EnvelopeRelay, ExecutionDispatcher, ManaClient};
pub use metadata::{IpfsMetadataResolver, MetadataResolver};
pub use signer::{verify_network, TransactionRequest, WalletSigner};
