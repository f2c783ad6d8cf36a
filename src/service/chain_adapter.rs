//! 链适配器
//!
//! 每个链族实现同一组能力：地址编码、余额查询、原生币转账和测试币入口。
//! 编排层只依赖这个 trait，具体链的 RPC 细节留在各自的实现里。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::config::NetworkConfig;
use crate::domain::chain_profile::{ChainFamily, ChainProfile};
use crate::error::{WalletError, WalletResult};
use crate::service::ethereum_adapter::EthereumAdapter;
use crate::service::solana_adapter::SolanaAdapter;

#[async_trait]
pub trait ChainAdapter: Send + Sync {
    fn profile(&self) -> &'static ChainProfile;

    fn family(&self) -> ChainFamily {
        self.profile().family
    }

    /// 公钥 → 链原生地址
    fn encode_address(&self, public_key: &[u8]) -> WalletResult<String>;

    /// 收款地址校验，失败返回 InvalidRecipient
    fn validate_address(&self, address: &str) -> WalletResult<()>;

    /// 查询余额（最小单位）
    async fn fetch_balance(&self, address: &str) -> WalletResult<u128>;

    /// 原生币转账，返回交易标识（Solana 签名 / Ethereum 交易哈希）
    ///
    /// 返回时交易已被账本确认
    async fn transfer(
        &self,
        private_key: &[u8],
        to: &str,
        amount_native: Decimal,
    ) -> WalletResult<String>;

    /// 测试币领取入口
    fn faucet_hint(&self) -> &'static str;
}

/// 按链族索引的适配器集合
#[derive(Clone, Default)]
pub struct AdapterSet {
    adapters: BTreeMap<ChainFamily, Arc<dyn ChainAdapter>>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用网络配置构建两个链族的 RPC 适配器
    pub fn from_config(network: &NetworkConfig) -> WalletResult<Self> {
        let timeout = Duration::from_secs(network.rpc_timeout_secs);
        let poll_interval = Duration::from_millis(network.confirmation_poll_ms);

        let solana = SolanaAdapter::new(
            &network.solana_rpc_url,
            timeout,
            poll_interval,
            network.confirmation_max_polls,
        )?;
        let ethereum = EthereumAdapter::new(&network.ethereum_rpc_url, timeout, poll_interval)?;

        Ok(Self::new()
            .with_adapter(Arc::new(solana))
            .with_adapter(Arc::new(ethereum)))
    }

    /// 注册（或替换）某个链族的适配器
    pub fn with_adapter(mut self, adapter: Arc<dyn ChainAdapter>) -> Self {
        self.adapters.insert(adapter.family(), adapter);
        self
    }

    pub fn get(&self, family: ChainFamily) -> WalletResult<Arc<dyn ChainAdapter>> {
        self.adapters
            .get(&family)
            .cloned()
            .ok_or_else(|| WalletError::Config(format!("no adapter registered for {}", family)))
    }

    pub fn families(&self) -> impl Iterator<Item = ChainFamily> + '_ {
        self.adapters.keys().copied()
    }
}
