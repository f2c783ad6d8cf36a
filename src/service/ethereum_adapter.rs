//! Ethereum 适配器
//!
//! 余额通过 eth_getBalance 直接查询；转账交给 ethers 的 SignerMiddleware
//! 处理 nonce、gas 和链 ID，然后等待一个区块确认。

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TransactionRequest, U256, U64};
use rust_decimal::Decimal;
use serde_json::json;

use crate::domain::amount;
use crate::domain::chain_profile::{ChainFamily, ChainProfile, ETHEREUM};
use crate::error::{WalletError, WalletResult};
use crate::infrastructure::rpc_client::JsonRpcClient;
use crate::infrastructure::rpc_validator;
use crate::service::chain_adapter::ChainAdapter;
use crate::utils::address_validator::{
    decode_ethereum_address, encode_ethereum_address, AddressValidator,
};

pub const ETHEREUM_FAUCET_URL: &str = "https://www.alchemy.com/faucets/ethereum-sepolia";

pub struct EthereumAdapter {
    rpc: JsonRpcClient,
    provider: Provider<Http>,
}

impl EthereumAdapter {
    pub fn new(rpc_url: &str, timeout: Duration, poll_interval: Duration) -> WalletResult<Self> {
        let rpc = JsonRpcClient::new(rpc_url, timeout)
            .map_err(|e| WalletError::Config(format!("ethereum rpc client: {:#}", e)))?;
        let url = reqwest::Url::parse(rpc_url)
            .map_err(|e| WalletError::Config(format!("ethereum provider url: {}", e)))?;
        // nonce、gas、发送和回执查询共用同一个超时
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::Config(format!("ethereum provider client: {}", e)))?;
        let provider =
            Provider::new(Http::new_with_client(url, http_client)).interval(poll_interval);

        Ok(Self { rpc, provider })
    }

    async fn send_and_confirm(
        &self,
        wallet: LocalWallet,
        to: Address,
        value: U256,
    ) -> anyhow::Result<String> {
        let chain_id = self
            .provider
            .get_chainid()
            .await
            .context("Failed to query chain id")?;
        let wallet = wallet.with_chain_id(chain_id.as_u64());
        let client = SignerMiddleware::new(self.provider.clone(), wallet);

        let request = TransactionRequest::new().to(to).value(value);
        let pending = client
            .send_transaction(request, None)
            .await
            .context("Failed to submit transaction")?;
        let tx_hash = format!("{:#x}", pending.tx_hash());

        tracing::info!(tx_hash = %tx_hash, chain_id = %chain_id, "ethereum transfer submitted");

        let receipt = pending
            .await
            .context("Failed while waiting for receipt")?
            .with_context(|| format!("transaction {} dropped from mempool", tx_hash))?;

        if receipt.status != Some(U64::from(1)) {
            anyhow::bail!("transaction {} reverted", tx_hash);
        }

        rpc_validator::validate_tx_hash(&format!("{:#x}", receipt.transaction_hash))
    }
}

#[async_trait]
impl ChainAdapter for EthereumAdapter {
    fn profile(&self) -> &'static ChainProfile {
        &ETHEREUM
    }

    fn encode_address(&self, public_key: &[u8]) -> WalletResult<String> {
        encode_ethereum_address(public_key)
    }

    fn validate_address(&self, address: &str) -> WalletResult<()> {
        AddressValidator::ensure_recipient(ChainFamily::Ethereum, address)
    }

    async fn fetch_balance(&self, address: &str) -> WalletResult<u128> {
        let result = self
            .rpc
            .call("eth_getBalance", json!([address, "latest"]))
            .await
            .map_err(|e| WalletError::balance_query(ChainFamily::Ethereum, e))?;

        let quantity = result.as_str().ok_or_else(|| {
            WalletError::balance_query(
                ChainFamily::Ethereum,
                anyhow::anyhow!("eth_getBalance result is not a string: {}", result),
            )
        })?;

        rpc_validator::validate_balance(quantity)
            .map_err(|e| WalletError::balance_query(ChainFamily::Ethereum, e))
    }

    async fn transfer(
        &self,
        private_key: &[u8],
        to: &str,
        amount_native: Decimal,
    ) -> WalletResult<String> {
        let recipient = Address::from(decode_ethereum_address(to)?);
        let wei = amount::to_smallest_units(amount_native, &ETHEREUM)?;
        let wallet = LocalWallet::from_bytes(private_key).map_err(|e| {
            WalletError::DerivationFailure(format!("invalid ethereum private key: {}", e))
        })?;
        let from = format!("{:#x}", wallet.address());

        let tx_hash = self
            .send_and_confirm(wallet, recipient, U256::from(wei))
            .await
            .map_err(|e| WalletError::transfer_rejected(ChainFamily::Ethereum, e))?;

        tracing::info!(from = %from, to = %to, wei = %wei, tx_hash = %tx_hash, "ethereum transfer confirmed");
        Ok(tx_hash)
    }

    fn faucet_hint(&self) -> &'static str {
        ETHEREUM_FAUCET_URL
    }
}
