use crate::domain::error::{GovernanceError, GovernanceResult};
use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub to: String,
    pub data: String,
    #[serde(default)]
    pub value: U256,
}

/// Wallet that holds the acting account's keys.
///
/// Implementations wrap whatever the host application connects to (browser wallet
/// bridge, hardware signer, local key for scripts). The crate never sees key material.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn address(&self) -> GovernanceResult<String>;

    async fn chain_id(&self) -> GovernanceResult<u64>;

    /// Ask the wallet to move to `chain_id`. Wallets that cannot switch keep the default.
    async fn switch_chain(&self, _chain_id: u64) -> GovernanceResult<()> {
        Err(GovernanceError::ChainSwitchUnsupported)
    }

    /// EIP-712 signature over `typed_data` (`{domain, types, primaryType, message}`).
    async fn sign_typed_data(&self, typed_data: &Value) -> GovernanceResult<String>;

    /// Broadcast a transaction from the wallet account, returning its hash.
    async fn send_transaction(&self, request: &TransactionRequest) -> GovernanceResult<String>;

    async fn wait_for_receipt(&self, tx_hash: &str) -> GovernanceResult<()>;
}

/// Ensure the wallet is on `expected`, asking it to switch once when it is not.
pub async fn verify_network(wallet: &dyn WalletSigner, expected: u64) -> GovernanceResult<()> {
    let actual = wallet.chain_id().await?;
    if actual == expected {
        return Ok(());
    }

    log::debug!("network_switch_requested expected={expected} actual={actual}");
    if let Err(error) = wallet.switch_chain(expected).await {
        log::debug!("network_switch_failed expected={expected} error={error}");
        return Err(GovernanceError::WrongNetwork { expected, actual });
    }

    let switched = wallet.chain_id().await?;
    if switched != expected {
        return Err(GovernanceError::WrongNetwork {
            expected,
            actual: switched,
        });
    }
    Ok(())
}
