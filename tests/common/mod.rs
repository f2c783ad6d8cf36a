//! 测试辅助模块
//! 提供离线链适配器和编排服务构建函数

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use seedwallet::domain::amount;
use seedwallet::domain::chain_profile::{ChainFamily, ChainProfile};
use seedwallet::error::{WalletError, WalletResult};
use seedwallet::infrastructure::storage::{MemoryStore, PersistenceStore};
use seedwallet::service::{
    AdapterSet, ChainAdapter, OrchestratorOptions, RecordingSink, WalletOrchestrator,
};
use seedwallet::utils::address_validator::{
    encode_ethereum_address, encode_solana_address, AddressValidator,
};

pub const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// 已记录的转账
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTransfer {
    pub private_key: Vec<u8>,
    pub to: String,
    pub amount_native: Decimal,
}

/// 不访问网络的链适配器：余额来自内存表，转账只记录
pub struct FakeAdapter {
    profile: &'static ChainProfile,
    balances: Mutex<HashMap<String, u128>>,
    transfers: Mutex<Vec<RecordedTransfer>>,
    fail_balance: Mutex<bool>,
    reject_transfers: Mutex<bool>,
}

impl FakeAdapter {
    pub fn new(family: ChainFamily) -> Self {
        Self {
            profile: ChainProfile::of(family),
            balances: Mutex::new(HashMap::new()),
            transfers: Mutex::new(Vec::new()),
            fail_balance: Mutex::new(false),
            reject_transfers: Mutex::new(false),
        }
    }

    pub fn set_balance(&self, address: &str, balance: u128) {
        self.balances
            .lock()
            .unwrap()
            .insert(address.to_string(), balance);
    }

    pub fn fail_balance_queries(&self, fail: bool) {
        *self.fail_balance.lock().unwrap() = fail;
    }

    pub fn reject_transfers(&self, reject: bool) {
        *self.reject_transfers.lock().unwrap() = reject;
    }

    pub fn transfers(&self) -> Vec<RecordedTransfer> {
        self.transfers.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainAdapter for FakeAdapter {
    fn profile(&self) -> &'static ChainProfile {
        self.profile
    }

    fn encode_address(&self, public_key: &[u8]) -> WalletResult<String> {
        match self.profile.family {
            ChainFamily::Solana => encode_solana_address(public_key),
            ChainFamily::Ethereum => encode_ethereum_address(public_key),
        }
    }

    fn validate_address(&self, address: &str) -> WalletResult<()> {
        AddressValidator::ensure_recipient(self.profile.family, address)
    }

    async fn fetch_balance(&self, address: &str) -> WalletResult<u128> {
        tokio::task::yield_now().await;
        if *self.fail_balance.lock().unwrap() {
            return Err(WalletError::balance_query(
                self.profile.family,
                anyhow::anyhow!("connection refused"),
            ));
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(0))
    }

    async fn transfer(
        &self,
        private_key: &[u8],
        to: &str,
        amount_native: Decimal,
    ) -> WalletResult<String> {
        self.validate_address(to)?;
        amount::to_smallest_units(amount_native, self.profile)?;

        if *self.reject_transfers.lock().unwrap() {
            return Err(WalletError::transfer_rejected(
                self.profile.family,
                anyhow::anyhow!("insufficient funds for fee"),
            ));
        }

        let mut transfers = self.transfers.lock().unwrap();
        transfers.push(RecordedTransfer {
            private_key: private_key.to_vec(),
            to: to.to_string(),
            amount_native,
        });
        Ok(format!("fake-tx-{}", transfers.len()))
    }

    fn faucet_hint(&self) -> &'static str {
        "https://faucet.example"
    }
}

/// 可以让写入失败的内存存储
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_puts: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PersistenceStore for FlakyStore {
    async fn get(&self, key: &str) -> WalletResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> WalletResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(WalletError::Storage(anyhow::anyhow!("disk full")));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> WalletResult<()> {
        self.inner.delete(key).await
    }
}

pub struct Harness {
    pub orchestrator: WalletOrchestrator,
    pub sink: Arc<RecordingSink>,
    pub solana: Arc<FakeAdapter>,
    pub ethereum: Arc<FakeAdapter>,
}

/// 用离线适配器和给定存储构建编排服务
pub async fn harness(store: Arc<dyn PersistenceStore>, options: OrchestratorOptions) -> Harness {
    let solana = Arc::new(FakeAdapter::new(ChainFamily::Solana));
    let ethereum = Arc::new(FakeAdapter::new(ChainFamily::Ethereum));
    let adapters = AdapterSet::new()
        .with_adapter(solana.clone())
        .with_adapter(ethereum.clone());
    let sink = Arc::new(RecordingSink::new());

    let orchestrator = WalletOrchestrator::open(adapters, store, sink.clone(), options)
        .await
        .expect("orchestrator should open");

    Harness {
        orchestrator,
        sink,
        solana,
        ethereum,
    }
}
