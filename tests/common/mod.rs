//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;

use send_engine::broadcast::{BroadcastTransport, Broadcaster, TransportResponse};
use send_engine::builder::UnsignedTransaction;
use send_engine::chain::Chain;
use send_engine::config::{EvmChainConfig, SolanaConfig};
use send_engine::engine::{ChainServices, StaticWallets, Wallet};
use send_engine::fees::FeeEstimator;
use send_engine::lifecycle::MemoryStore;
use send_engine::resilience::RetryPolicy;
use send_engine::signer::{derive_address, KeyHandle, Signer, SigningOracle};
use send_engine::state::{ChainState, ChainStateReader};
use send_engine::{SendEngine, SendResult};

pub const EVM_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const EVM_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const EVM_DESTINATION: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

pub fn key(bytes: &[u8]) -> KeyHandle {
    KeyHandle::from_bytes(bytes.to_vec()).unwrap()
}

pub fn address_for(chain: Chain, secret: &[u8]) -> String {
    derive_address(chain, &key(secret)).unwrap()
}

/// Oracle returning fixed key bytes per wallet id.
#[derive(Default)]
pub struct StaticOracle {
    keys: HashMap<String, Vec<u8>>,
}

impl StaticOracle {
    pub fn with(mut self, wallet_id: &str, secret: &[u8]) -> Self {
        self.keys.insert(wallet_id.to_string(), secret.to_vec());
        self
    }
}

#[async_trait]
impl SigningOracle for StaticOracle {
    async fn key_material(&self, wallet_id: &str) -> SendResult<KeyHandle> {
        let bytes = self
            .keys
            .get(wallet_id)
            .cloned()
            .ok_or_else(|| send_engine::SendError::Key(format!("no key for {}", wallet_id)))?;
        KeyHandle::from_bytes(bytes)
    }
}

/// Transport that plays back responses; the last one repeats.
pub struct ScriptedTransport {
    chain: Chain,
    responses: Mutex<VecDeque<TransportResponse>>,
    submissions: AtomicU32,
    landed: AtomicBool,
}

impl ScriptedTransport {
    pub fn new(chain: Chain, responses: Vec<TransportResponse>) -> Arc<Self> {
        Arc::new(Self {
            chain,
            responses: Mutex::new(responses.into()),
            submissions: AtomicU32::new(0),
            landed: AtomicBool::new(false),
        })
    }

    pub fn submissions(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// What `lookup` answers from now on.
    pub fn set_landed(&self, landed: bool) {
        self.landed.store(landed, Ordering::SeqCst);
    }
}

#[async_trait]
impl BroadcastTransport for ScriptedTransport {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn send_raw(&self, _raw: &[u8]) -> TransportResponse {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap()
        }
    }

    async fn lookup(&self, _hash: &str) -> SendResult<bool> {
        Ok(self.landed.load(Ordering::SeqCst))
    }
}

/// Reader that serves a fixed snapshot.
pub struct FixedReader {
    chain: Chain,
    state: Mutex<ChainState>,
    current: AtomicBool,
}

impl FixedReader {
    pub fn new(chain: Chain, state: ChainState) -> Arc<Self> {
        Arc::new(Self {
            chain,
            state: Mutex::new(state),
            current: AtomicBool::new(true),
        })
    }

    pub fn set_state(&self, state: ChainState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn set_current(&self, current: bool) {
        self.current.store(current, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainStateReader for FixedReader {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn snapshot(&self, _address: &str) -> SendResult<ChainState> {
        Ok(self.state.lock().unwrap().clone())
    }

    async fn balance(&self, _address: &str) -> SendResult<U256> {
        Ok(self.state.lock().unwrap().spendable())
    }

    async fn is_current(&self, _address: &str, _unsigned: &UnsignedTransaction) -> SendResult<bool> {
        Ok(self.current.load(Ordering::SeqCst))
    }
}

pub fn fast_retries(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(1))
}

pub fn account_state(nonce: u64, balance_wei: u64) -> ChainState {
    ChainState::Account {
        chain_id: 1,
        nonce,
        balance: U256::from(balance_wei),
    }
}

/// Ethereum services over fakes; fees come from the static table (30 gwei normal).
pub fn evm_services(reader: Arc<FixedReader>, transport: Arc<ScriptedTransport>, attempts: u32) -> ChainServices {
    ChainServices::new(
        FeeEstimator::evm(&EvmChainConfig::default(), None),
        reader,
        Broadcaster::new(transport, fast_retries(attempts)),
    )
}

pub fn solana_services(reader: Arc<FixedReader>, transport: Arc<ScriptedTransport>) -> ChainServices {
    ChainServices::new(
        FeeEstimator::solana(&SolanaConfig::default()),
        reader,
        Broadcaster::new(transport, fast_retries(3)),
    )
}

pub fn engine(
    chain: Chain,
    services: ChainServices,
    wallet_address: &str,
    oracle: StaticOracle,
) -> (SendEngine, MemoryStore) {
    let store = MemoryStore::new();
    let mut all = HashMap::new();
    all.insert(chain, services);
    let wallets = StaticWallets::new([Wallet {
        id: "w1".to_string(),
        chain,
        address: wallet_address.to_string(),
    }]);
    let engine = SendEngine::new(
        all,
        Signer::new(Arc::new(oracle)),
        Arc::new(store.clone()),
        Arc::new(wallets),
    );
    (engine, store)
}

pub fn evm_key() -> Vec<u8> {
    hex::decode(EVM_KEY).unwrap()
}
