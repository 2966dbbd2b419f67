#![allow(dead_code)]

use async_trait::async_trait;
use evm_governance::clients::{DirectSubmitter, RelayedSubmitter};
use evm_governance::features::evm::ChainProvider;
use evm_governance::features::mana::ExecutionDispatcher;
use evm_governance::features::metadata::MetadataResolver;
use evm_governance::features::signer::{TransactionRequest, WalletSigner};
use evm_governance::network::{NetworkConfig, NetworkRegistry};
use evm_governance::strategy::picker::EvmStrategyPicker;
use evm_governance::strategy::registry::StrategyRegistry;
use evm_governance::domain::types::{ProposeData, UpdateProposalData, VoteData};
use evm_governance::{
    ActionComponents, ActionReceipt, AuthenticatorKind, EvmActions, GovernanceError,
    GovernanceResult, QueryLimits, StrategyKind, SubmitOptions,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CHAIN_ID: u64 = 11_155_111;
pub const ETH_SIG: &str = "0x5f9b7d78c9a37a439d78f801e0e339c6e711e260";
pub const ETH_TX: &str = "0xba06e6ccb877c332181a6867c05c8b746a21aed1";
pub const VANILLA: &str = "0xc1245c5dca7885c73e32294140f1e5d30688c202";
pub const WHITELIST: &str = "0x34f0afff5a739bbf3e285615f50e40ee31e6ae6b";
pub const COMP: &str = "0x0c2de612982efd102803161fc7c74cca15db932c";
pub const OZ_VOTES: &str = "0x2c8631584474e750cedf2fb6a904f2e84777aefe";
pub const UNKNOWN_STRATEGY: &str = "0x9999999999999999999999999999999999999999";
pub const AVATAR: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const SPACE: &str = "0x0000000000000000000000000000000000000abc";
pub const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";
pub const SAFE: &str = "0x2222222222222222222222222222222222222222";
pub const TOKEN: &str = "0x4444444444444444444444444444444444444444";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn network() -> Arc<NetworkConfig> {
    Arc::new(
        NetworkConfig::new(
            CHAIN_ID,
            "sep",
            "Sepolia",
            vec![
                (ETH_SIG.to_string(), AuthenticatorKind::EthSig),
                (ETH_TX.to_string(), AuthenticatorKind::EthTx),
            ],
            vec![
                (VANILLA.to_string(), StrategyKind::Vanilla),
                (WHITELIST.to_string(), StrategyKind::Whitelist),
                (COMP.to_string(), StrategyKind::Comp),
                (OZ_VOTES.to_string(), StrategyKind::OzVotes),
            ],
        )
        .expect("network config should build"),
    )
}

// ── Chain ────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeChain {
    pub code: Mutex<BTreeMap<String, String>>,
    pub call_results: Mutex<BTreeMap<String, String>>,
    pub call_delay: Mutex<Option<Duration>>,
    pub code_probes: AtomicUsize,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl FakeChain {
    pub fn with_contract(self, address: &str) -> Self {
        self.code
            .lock()
            .expect("code lock")
            .insert(address.to_string(), "0x6080604052".to_string());
        self
    }

    pub fn with_votes(self, token: &str, votes: u64) -> Self {
        self.call_results
            .lock()
            .expect("call lock")
            .insert(token.to_string(), format!("0x{votes:064x}"));
        self
    }

    pub fn with_call_delay(self, delay: Duration) -> Self {
        *self.call_delay.lock().expect("delay lock") = Some(delay);
        self
    }

    pub fn total_queries(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `eth_call`s running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainProvider for FakeChain {
    async fn chain_id(&self) -> GovernanceResult<u64> {
        Ok(CHAIN_ID)
    }

    async fn get_code(&self, address: &str) -> GovernanceResult<String> {
        self.code_probes.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .code
            .lock()
            .expect("code lock")
            .get(address)
            .cloned()
            .unwrap_or_else(|| "0x".to_string()))
    }

    async fn call(&self, to: &str, _calldata: &str, _block: Option<u64>) -> GovernanceResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let delay = *self.call_delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.call_results
            .lock()
            .expect("call lock")
            .get(to)
            .cloned()
            .ok_or_else(|| GovernanceError::Rpc(format!("execution reverted at {to}")))
    }
}

// ── Wallet ───────────────────────────────────────────────────────────────────

pub struct FakeWallet {
    pub chain_id: u64,
    pub address: String,
}

impl FakeWallet {
    pub fn on(chain_id: u64) -> Self {
        Self {
            chain_id,
            address: ACCOUNT.to_string(),
        }
    }
}

#[async_trait]
impl WalletSigner for FakeWallet {
    async fn address(&self) -> GovernanceResult<String> {
        Ok(self.address.clone())
    }

    async fn chain_id(&self) -> GovernanceResult<u64> {
        Ok(self.chain_id)
    }

    async fn sign_typed_data(&self, _typed_data: &Value) -> GovernanceResult<String> {
        Ok(format!("0x{}", "22".repeat(65)))
    }

    async fn send_transaction(&self, _request: &TransactionRequest) -> GovernanceResult<String> {
        Ok(format!("0x{}", "33".repeat(32)))
    }

    async fn wait_for_receipt(&self, _tx_hash: &str) -> GovernanceResult<()> {
        Ok(())
    }
}

// ── Submitters ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum Submission {
    DirectPropose(ProposeData, SubmitOptions),
    DirectUpdate(UpdateProposalData, SubmitOptions),
    DirectVote(VoteData, SubmitOptions),
    Cancel(String, u64, SubmitOptions),
    Veto(String, String),
    Setting(&'static str, String, u32, SubmitOptions),
    Delegate(String, String),
    RelayedPropose(ProposeData),
    RelayedUpdate(UpdateProposalData),
    RelayedVote(VoteData),
    Send(Value),
    Dispatch(u64, String, Value),
}

#[derive(Default)]
pub struct Recorder {
    pub submissions: Mutex<Vec<Submission>>,
}

impl Recorder {
    pub fn record(&self, submission: Submission) {
        self.submissions.lock().expect("recorder lock").push(submission);
    }

    pub fn all(&self) -> Vec<Submission> {
        self.submissions.lock().expect("recorder lock").clone()
    }
}

fn tx_receipt(options: SubmitOptions) -> ActionReceipt {
    ActionReceipt::Transaction {
        hash: format!("0x{}", "44".repeat(32)),
        confirmed: !options.no_wait,
    }
}

#[async_trait]
impl DirectSubmitter for Recorder {
    async fn propose(
        &self,
        _wallet: &dyn WalletSigner,
        data: &ProposeData,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        self.record(Submission::DirectPropose(data.clone(), options));
        Ok(tx_receipt(options))
    }

    async fn update_proposal(
        &self,
        _wallet: &dyn WalletSigner,
        data: &UpdateProposalData,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        self.record(Submission::DirectUpdate(data.clone(), options));
        Ok(tx_receipt(options))
    }

    async fn vote(
        &self,
        _wallet: &dyn WalletSigner,
        data: &VoteData,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        self.record(Submission::DirectVote(data.clone(), options));
        Ok(tx_receipt(options))
    }

    async fn cancel(
        &self,
        _wallet: &dyn WalletSigner,
        space: &str,
        proposal: u64,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        self.record(Submission::Cancel(space.to_string(), proposal, options));
        Ok(tx_receipt(options))
    }

    async fn veto_execution(
        &self,
        _wallet: &dyn WalletSigner,
        execution_strategy: &str,
        execution_hash: &str,
    ) -> GovernanceResult<ActionReceipt> {
        self.record(Submission::Veto(
            execution_strategy.to_string(),
            execution_hash.to_string(),
        ));
        Ok(tx_receipt(SubmitOptions::default()))
    }

    async fn set_voting_delay(
        &self,
        _wallet: &dyn WalletSigner,
        space: &str,
        voting_delay: u32,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        self.record(Submission::Setting("voting_delay", space.to_string(), voting_delay, options));
        Ok(tx_receipt(options))
    }

    async fn set_min_voting_duration(
        &self,
        _wallet: &dyn WalletSigner,
        space: &str,
        min_voting_duration: u32,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        self.record(Submission::Setting(
            "min_voting_duration",
            space.to_string(),
            min_voting_duration,
            options,
        ));
        Ok(tx_receipt(options))
    }

    async fn set_max_voting_duration(
        &self,
        _wallet: &dyn WalletSigner,
        space: &str,
        max_voting_duration: u32,
        options: SubmitOptions,
    ) -> GovernanceResult<ActionReceipt> {
        self.record(Submission::Setting(
            "max_voting_duration",
            space.to_string(),
            max_voting_duration,
            options,
        ));
        Ok(tx_receipt(options))
    }

    async fn delegate(
        &self,
        _wallet: &dyn WalletSigner,
        votes_contract: &str,
        delegatee: &str,
    ) -> GovernanceResult<ActionReceipt> {
        self.record(Submission::Delegate(
            votes_contract.to_string(),
            delegatee.to_string(),
        ));
        Ok(tx_receipt(SubmitOptions { no_wait: true }))
    }
}

#[async_trait]
impl RelayedSubmitter for Recorder {
    async fn propose(
        &self,
        _wallet: &dyn WalletSigner,
        data: &ProposeData,
    ) -> GovernanceResult<ActionReceipt> {
        self.record(Submission::RelayedPropose(data.clone()));
        Ok(ActionReceipt::Relayed(json!({"relayed": "propose"})))
    }

    async fn update_proposal(
        &self,
        _wallet: &dyn WalletSigner,
        data: &UpdateProposalData,
    ) -> GovernanceResult<ActionReceipt> {
        self.record(Submission::RelayedUpdate(data.clone()));
        Ok(ActionReceipt::Relayed(json!({"relayed": "update_proposal"})))
    }

    async fn vote(
        &self,
        _wallet: &dyn WalletSigner,
        data: &VoteData,
    ) -> GovernanceResult<ActionReceipt> {
        self.record(Submission::RelayedVote(data.clone()));
        Ok(ActionReceipt::Relayed(json!({"relayed": "vote"})))
    }

    async fn send(&self, envelope: &Value) -> GovernanceResult<Value> {
        self.record(Submission::Send(envelope.clone()));
        Ok(json!({"accepted": true}))
    }
}

#[async_trait]
impl ExecutionDispatcher for Recorder {
    async fn execution_call(
        &self,
        chain_id: u64,
        method: &str,
        params: Value,
    ) -> GovernanceResult<Value> {
        self.record(Submission::Dispatch(chain_id, method.to_string(), params));
        Ok(json!({"txId": "0xfeed"}))
    }
}

// ── Metadata ─────────────────────────────────────────────────────────────────

/// Parses inline JSON payloads and counts resolutions.
#[derive(Default)]
pub struct InlineMetadata {
    pub resolved: AtomicUsize,
}

#[async_trait]
impl MetadataResolver for InlineMetadata {
    async fn resolve(&self, payload: Option<&str>) -> GovernanceResult<Option<Value>> {
        self.resolved.fetch_add(1, Ordering::SeqCst);
        payload
            .map(|raw| {
                serde_json::from_str(raw)
                    .map_err(|error| GovernanceError::Metadata(error.to_string()))
            })
            .transpose()
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

pub struct Harness {
    pub actions: EvmActions,
    pub chain: Arc<FakeChain>,
    pub recorder: Arc<Recorder>,
    pub metadata: Arc<InlineMetadata>,
}

impl Harness {
    pub fn new(chain: FakeChain) -> Self {
        Self::with_limits(chain, QueryLimits::default())
    }

    pub fn with_limits(chain: FakeChain, limits: QueryLimits) -> Self {
        init_logging();
        let network = network();
        let chain = Arc::new(chain);
        let recorder = Arc::new(Recorder::default());
        let metadata = Arc::new(InlineMetadata::default());
        let registry = Arc::new(NetworkRegistry::bundled().expect("bundled registry"));
        let actions = EvmActions::with_components(ActionComponents {
            registry,
            network: network.clone(),
            provider: chain.clone(),
            picker: Arc::new(EvmStrategyPicker::new(network.clone())),
            direct: recorder.clone(),
            relayed: recorder.clone(),
            dispatcher: recorder.clone(),
            metadata: metadata.clone(),
            strategies: Arc::new(StrategyRegistry::from_network(&network)),
            limits,
        });
        Self {
            actions,
            chain,
            recorder,
            metadata,
        }
    }
}
