use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::features::evm::ChainProvider;
use crate::features::mana::EnvelopeRelay;
use crate::features::signer::{TransactionRequest, WalletSigner};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

pub(crate) const WALLET_ADDRESS: &str = "0x1111111111111111111111111111111111111111";

/// Runs `f` with temporary host environment variable overrides under a global
/// process-wide lock to avoid cross-test races.
pub(crate) fn with_locked_host_env<T>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("host env lock should not be poisoned");

    let previous = vars
        .iter()
        .map(|(name, _)| ((*name).to_string(), std::env::var(name).ok()))
        .collect::<Vec<_>>();

    for (name, value) in vars {
        set_env(name, *value);
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    for (name, value) in previous {
        set_env(&name, value.as_deref());
    }

    match result {
        Ok(output) => output,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

fn set_env(name: &str, value: Option<&str>) {
    match value {
        Some(v) => {
            #[allow(unused_unsafe)]
            unsafe {
                std::env::set_var(name, v);
            }
        }
        None => {
            #[allow(unused_unsafe)]
            unsafe {
                std::env::remove_var(name);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub to: String,
    pub data: String,
    pub block: Option<u64>,
}

/// In-memory chain: code per address, canned `eth_call` results per target.
pub(crate) struct FakeChainProvider {
    chain_id: u64,
    code: Mutex<BTreeMap<String, String>>,
    call_results: Mutex<BTreeMap<String, String>>,
    calls: Mutex<Vec<RecordedCall>>,
    code_probes: AtomicUsize,
}

impl FakeChainProvider {
    pub(crate) fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            code: Mutex::new(BTreeMap::new()),
            call_results: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            code_probes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set_code(&self, address: &str, code: &str) {
        self.code
            .lock()
            .expect("code lock")
            .insert(address.to_ascii_lowercase(), code.to_string());
    }

    pub(crate) fn set_call_result(&self, to: &str, result: &str) {
        self.call_results
            .lock()
            .expect("call results lock")
            .insert(to.to_ascii_lowercase(), result.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    pub(crate) fn code_probe_count(&self) -> usize {
        self.code_probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainProvider for FakeChainProvider {
    async fn chain_id(&self) -> GovernanceResult<u64> {
        Ok(self.chain_id)
    }

    async fn get_code(&self, address: &str) -> GovernanceResult<String> {
        self.code_probes.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .code
            .lock()
            .expect("code lock")
            .get(&address.to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| "0x".to_string()))
    }

    async fn call(&self, to: &str, calldata: &str, block: Option<u64>) -> GovernanceResult<String> {
        let to = to.to_ascii_lowercase();
        self.calls.lock().expect("calls lock").push(RecordedCall {
            to: to.clone(),
            data: calldata.to_string(),
            block,
        });
        self.call_results
            .lock()
            .expect("call results lock")
            .get(&to)
            .cloned()
            .ok_or_else(|| GovernanceError::Rpc(format!("execution reverted at {to}")))
    }
}

/// Wallet that records every request and answers with deterministic values.
pub(crate) struct RecordingWallet {
    address: String,
    chain_id: AtomicU64,
    can_switch: bool,
    switch_requests: Mutex<Vec<u64>>,
    sent: Mutex<Vec<TransactionRequest>>,
    receipts: Mutex<Vec<String>>,
    signatures: Mutex<Vec<String>>,
}

impl RecordingWallet {
    pub(crate) fn new(chain_id: u64) -> Self {
        Self {
            address: WALLET_ADDRESS.to_string(),
            chain_id: AtomicU64::new(chain_id),
            can_switch: false,
            switch_requests: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            receipts: Mutex::new(Vec::new()),
            signatures: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_chain_switching(mut self) -> Self {
        self.can_switch = true;
        self
    }

    pub(crate) fn switch_requests(&self) -> Vec<u64> {
        self.switch_requests.lock().expect("switch lock").clone()
    }

    pub(crate) fn sent_transactions(&self) -> Vec<TransactionRequest> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub(crate) fn receipts_awaited(&self) -> Vec<String> {
        self.receipts.lock().expect("receipts lock").clone()
    }

    pub(crate) fn signatures(&self) -> Vec<String> {
        self.signatures.lock().expect("signatures lock").clone()
    }
}

#[async_trait]
impl WalletSigner for RecordingWallet {
    async fn address(&self) -> GovernanceResult<String> {
        Ok(self.address.clone())
    }

    async fn chain_id(&self) -> GovernanceResult<u64> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> GovernanceResult<()> {
        self.switch_requests
            .lock()
            .expect("switch lock")
            .push(chain_id);
        if !self.can_switch {
            return Err(GovernanceError::ChainSwitchUnsupported);
        }
        self.chain_id.store(chain_id, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_typed_data(&self, typed_data: &Value) -> GovernanceResult<String> {
        if typed_data.get("primaryType").and_then(Value::as_str).is_none() {
            return Err(GovernanceError::Wallet("typed data has no primaryType".to_string()));
        }
        let mut signatures = self.signatures.lock().expect("signatures lock");
        let signature = format!("0x{}{:02x}", "11".repeat(64), signatures.len() + 1);
        signatures.push(signature.clone());
        Ok(signature)
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> GovernanceResult<String> {
        let mut sent = self.sent.lock().expect("sent lock");
        sent.push(request.clone());
        Ok(format!("0x{:064x}", sent.len()))
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> GovernanceResult<()> {
        self.receipts
            .lock()
            .expect("receipts lock")
            .push(tx_hash.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingRelay {
    envelopes: Mutex<Vec<Value>>,
}

impl RecordingRelay {
    pub(crate) fn envelopes(&self) -> Vec<Value> {
        self.envelopes.lock().expect("envelopes lock").clone()
    }
}

#[async_trait]
impl EnvelopeRelay for RecordingRelay {
    async fn send(&self, envelope: &Value) -> GovernanceResult<Value> {
        let mut envelopes = self.envelopes.lock().expect("envelopes lock");
        envelopes.push(envelope.clone());
        Ok(json!({"id": format!("0x{:064x}", envelopes.len())}))
    }
}
