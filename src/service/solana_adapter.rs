//! Solana 适配器
//!
//! 余额走 getBalance；转账手工组装 legacy 交易（单条 System Program Transfer 指令），
//! ed25519 签名后经 sendTransaction 广播，再轮询 getSignatureStatuses 直到确认。

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use rust_decimal::Decimal;
use serde_json::json;

use crate::domain::amount;
use crate::domain::chain_profile::{ChainFamily, ChainProfile, SOLANA};
use crate::error::{WalletError, WalletResult};
use crate::infrastructure::rpc_client::JsonRpcClient;
use crate::infrastructure::rpc_validator;
use crate::service::chain_adapter::ChainAdapter;
use crate::utils::address_validator::{
    decode_solana_address, encode_solana_address, AddressValidator,
};

pub const SOLANA_FAUCET_URL: &str = "https://faucet.solana.com";

/// System Program 地址（全零公钥）
const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

/// System Program 指令编号：Transfer
const SYSTEM_TRANSFER_INSTRUCTION: u32 = 2;

pub struct SolanaAdapter {
    rpc: JsonRpcClient,
    poll_interval: Duration,
    max_polls: u32,
}

impl SolanaAdapter {
    pub fn new(
        rpc_url: &str,
        timeout: Duration,
        poll_interval: Duration,
        max_polls: u32,
    ) -> WalletResult<Self> {
        let rpc = JsonRpcClient::new(rpc_url, timeout)
            .map_err(|e| WalletError::Config(format!("solana rpc client: {:#}", e)))?;
        Ok(Self {
            rpc,
            poll_interval,
            max_polls,
        })
    }

    async fn latest_blockhash(&self) -> anyhow::Result<[u8; 32]> {
        let result = self
            .rpc
            .call("getLatestBlockhash", json!([{ "commitment": "confirmed" }]))
            .await?;
        rpc_validator::validate_blockhash(&result)
    }

    async fn send_transaction(&self, wire: &[u8]) -> anyhow::Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(wire);
        let result = self
            .rpc
            .call(
                "sendTransaction",
                json!([
                    encoded,
                    {
                        "encoding": "base64",
                        "skipPreflight": false,
                        "preflightCommitment": "confirmed"
                    }
                ]),
            )
            .await?;

        let signature = result
            .as_str()
            .context("Missing signature in sendTransaction result")?;
        rpc_validator::validate_signature(signature)
    }

    /// 轮询签名状态，直到 confirmed / finalized 或账本报错
    async fn await_confirmation(&self, signature: &str) -> anyhow::Result<()> {
        for attempt in 1..=self.max_polls {
            let result = self
                .rpc
                .call(
                    "getSignatureStatuses",
                    json!([[signature], { "searchTransactionHistory": true }]),
                )
                .await?;

            match parse_signature_status(&result)? {
                SignatureStatus::Confirmed => {
                    tracing::debug!(signature = %signature, attempt, "solana transfer confirmed");
                    return Ok(());
                }
                SignatureStatus::Failed(err) => {
                    anyhow::bail!("transaction {} failed on chain: {}", signature, err)
                }
                SignatureStatus::Pending => {
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        anyhow::bail!(
            "transaction {} not confirmed after {} polls",
            signature,
            self.max_polls
        )
    }
}

#[async_trait]
impl ChainAdapter for SolanaAdapter {
    fn profile(&self) -> &'static ChainProfile {
        &SOLANA
    }

    fn encode_address(&self, public_key: &[u8]) -> WalletResult<String> {
        encode_solana_address(public_key)
    }

    fn validate_address(&self, address: &str) -> WalletResult<()> {
        AddressValidator::ensure_recipient(ChainFamily::Solana, address)
    }

    async fn fetch_balance(&self, address: &str) -> WalletResult<u128> {
        let result = self
            .rpc
            .call("getBalance", json!([address, { "commitment": "confirmed" }]))
            .await
            .map_err(|e| WalletError::balance_query(ChainFamily::Solana, e))?;

        rpc_validator::validate_lamports(&result)
            .map_err(|e| WalletError::balance_query(ChainFamily::Solana, e))
    }

    async fn transfer(
        &self,
        private_key: &[u8],
        to: &str,
        amount_native: Decimal,
    ) -> WalletResult<String> {
        let recipient = decode_solana_address(to)?;
        let lamports = amount::to_smallest_units(amount_native, &SOLANA)?;
        let lamports = u64::try_from(lamports).map_err(|_| {
            WalletError::InvalidAmount(format!("{} SOL exceeds the lamport range", amount_native))
        })?;
        let signing_key = signing_key_from_keypair(private_key)?;
        let sender = signing_key.verifying_key().to_bytes();

        let blockhash = self
            .latest_blockhash()
            .await
            .map_err(|e| WalletError::transfer_rejected(ChainFamily::Solana, e))?;

        let message = build_transfer_message(&sender, &recipient, lamports, &blockhash);
        let wire = sign_transaction(&signing_key, &message);

        let signature = self
            .send_transaction(&wire)
            .await
            .map_err(|e| WalletError::transfer_rejected(ChainFamily::Solana, e))?;

        tracing::info!(
            from = %bs58::encode(sender).into_string(),
            to = %to,
            lamports,
            signature = %signature,
            "solana transfer submitted"
        );

        self.await_confirmation(&signature)
            .await
            .map_err(|e| WalletError::transfer_rejected(ChainFamily::Solana, e))?;

        Ok(signature)
    }

    fn faucet_hint(&self) -> &'static str {
        SOLANA_FAUCET_URL
    }
}

// ============ 交易编码 ============

/// 64 字节 (secret || public) 私钥 → 签名密钥；公钥不匹配时拒绝
fn signing_key_from_keypair(private_key: &[u8]) -> WalletResult<SigningKey> {
    let bytes: &[u8; 64] = private_key.try_into().map_err(|_| {
        WalletError::DerivationFailure(format!(
            "solana private key must be 64 bytes, got {}",
            private_key.len()
        ))
    })?;
    SigningKey::from_keypair_bytes(bytes)
        .map_err(|e| WalletError::DerivationFailure(format!("invalid solana keypair: {}", e)))
}

/// compact-u16（shortvec）：每字节 7 位，高位为续位标志
pub(crate) fn encode_compact_u16(mut value: u16, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// legacy 消息：header | 账户表 | recent blockhash | 指令表
///
/// 账户顺序：付款方（可写签名者）、收款方（可写）、System Program（只读）。
/// 自转账时付款方和收款方合并为一个账户。
pub(crate) fn build_transfer_message(
    from: &[u8; 32],
    to: &[u8; 32],
    lamports: u64,
    recent_blockhash: &[u8; 32],
) -> Vec<u8> {
    let mut account_keys: Vec<&[u8; 32]> = vec![from];
    if to != from {
        account_keys.push(to);
    }
    account_keys.push(&SYSTEM_PROGRAM_ID);

    let program_index = (account_keys.len() - 1) as u8;
    let to_index = if to == from { 0u8 } else { 1u8 };

    let mut message = Vec::with_capacity(160);

    // header: 签名数、只读签名者数、只读非签名者数
    message.extend_from_slice(&[1, 0, 1]);

    encode_compact_u16(account_keys.len() as u16, &mut message);
    for key in &account_keys {
        message.extend_from_slice(&key[..]);
    }

    message.extend_from_slice(recent_blockhash);

    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_INSTRUCTION.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    encode_compact_u16(1, &mut message);
    message.push(program_index);
    encode_compact_u16(2, &mut message);
    message.extend_from_slice(&[0, to_index]);
    encode_compact_u16(data.len() as u16, &mut message);
    message.extend_from_slice(&data);

    message
}

/// 序列化交易：签名数 | 签名 | 消息
pub(crate) fn sign_transaction(signing_key: &SigningKey, message: &[u8]) -> Vec<u8> {
    let signature = signing_key.sign(message);

    let mut wire = Vec::with_capacity(1 + 64 + message.len());
    encode_compact_u16(1, &mut wire);
    wire.extend_from_slice(&signature.to_bytes());
    wire.extend_from_slice(message);
    wire
}

#[derive(Debug, PartialEq, Eq)]
enum SignatureStatus {
    Pending,
    Confirmed,
    Failed(String),
}

fn parse_signature_status(result: &serde_json::Value) -> anyhow::Result<SignatureStatus> {
    let entry = result
        .get("value")
        .and_then(|v| v.as_array())
        .and_then(|v| v.first())
        .context("Missing value in getSignatureStatuses result")?;

    if entry.is_null() {
        return Ok(SignatureStatus::Pending);
    }

    if let Some(err) = entry.get("err").filter(|e| !e.is_null()) {
        return Ok(SignatureStatus::Failed(err.to_string()));
    }

    match entry.get("confirmationStatus").and_then(|s| s.as_str()) {
        Some("confirmed") | Some("finalized") => Ok(SignatureStatus::Confirmed),
        _ => Ok(SignatureStatus::Pending),
    }
}
