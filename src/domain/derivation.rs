//! 钱包派生策略
//!
//! 为两种加密曲线提供统一的派生接口：
//! - ed25519 (Solana)：SLIP-0010，全硬化路径，叶子私钥直接作为 EdDSA 种子
//! - secp256k1 (Ethereum)：BIP-32，叶子标量即 ECDSA 私钥
//!
//! 相同的 (seed, profile, index) 总是得到相同的密钥对。

use coins_bip32::path::DerivationPath;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::domain::chain_profile::{ChainFamily, ChainProfile, CurveType};
use crate::error::{WalletError, WalletResult};
use crate::utils::address_validator::{encode_ethereum_address, encode_solana_address};

type HmacSha512 = Hmac<Sha512>;

const ED25519_CURVE: &[u8] = b"ed25519 seed";
const HARDENED_OFFSET: u32 = 0x8000_0000;

/// 派生结果
#[derive(Clone)]
pub struct KeyPair {
    pub family: ChainFamily,
    pub account_index: u32,
    /// 原始公钥：ed25519 为 32 字节，secp256k1 为 65 字节未压缩 SEC1
    pub public_key: Vec<u8>,
    /// 原始私钥：ed25519 为 64 字节 (secret || public)，secp256k1 为 32 字节标量
    pub private_key: Zeroizing<Vec<u8>>,
    /// 链原生地址
    pub address: String,
    pub derivation_path: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("family", &self.family)
            .field("account_index", &self.account_index)
            .field("address", &self.address)
            .field("derivation_path", &self.derivation_path)
            .finish_non_exhaustive()
    }
}

/// 钱包派生策略 trait
pub trait DerivationStrategy: Send + Sync {
    fn derive(&self, seed: &[u8; 64], profile: &ChainProfile, index: u32)
        -> WalletResult<KeyPair>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Secp256k1 策略 (Ethereum)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Secp256k1Strategy;

impl DerivationStrategy for Secp256k1Strategy {
    fn derive(
        &self,
        seed: &[u8; 64],
        profile: &ChainProfile,
        index: u32,
    ) -> WalletResult<KeyPair> {
        use coins_bip32::prelude::*;
        use k256::ecdsa::SigningKey;

        let path = profile.derivation_path(index);
        let derivation_path = path
            .parse::<DerivationPath>()
            .map_err(|e| WalletError::DerivationFailure(format!("invalid path {}: {}", path, e)))?;

        // 从种子派生密钥
        let master_key = XPriv::root_from_seed(seed, None)
            .map_err(|e| WalletError::DerivationFailure(format!("master key: {}", e)))?;

        let derived_key = master_key
            .derive_path(&derivation_path)
            .map_err(|e| WalletError::DerivationFailure(format!("derive {}: {}", path, e)))?;

        // XPriv 实现 AsRef<SigningKey>
        let signing_key: &SigningKey = derived_key.as_ref();
        let private_key = Zeroizing::new(signing_key.to_bytes().to_vec());

        let public_point = signing_key.verifying_key().to_encoded_point(false); // 未压缩格式
        let public_key = public_point.as_bytes().to_vec();
        let address = encode_ethereum_address(&public_key)?;

        Ok(KeyPair {
            family: profile.family,
            account_index: index,
            public_key,
            private_key,
            address,
            derivation_path: path,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Ed25519 策略 (Solana)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Ed25519Strategy;

impl DerivationStrategy for Ed25519Strategy {
    fn derive(
        &self,
        seed: &[u8; 64],
        profile: &ChainProfile,
        index: u32,
    ) -> WalletResult<KeyPair> {
        use ed25519_dalek::SigningKey;

        let path = profile.derivation_path(index);
        let segments = parse_hardened_path(&path)?;

        let mut node = Slip10Node::master(seed)?;
        for segment in segments {
            node = node.derive_hardened(segment)?;
        }

        let signing_key = SigningKey::from_bytes(&node.private_key);
        let public_key = signing_key.verifying_key().to_bytes().to_vec();
        let address = encode_solana_address(&public_key)?;

        Ok(KeyPair {
            family: profile.family,
            account_index: index,
            public_key,
            private_key: Zeroizing::new(signing_key.to_keypair_bytes().to_vec()),
            address,
            derivation_path: path,
        })
    }
}

/// SLIP-0010 ed25519 节点
struct Slip10Node {
    private_key: Zeroizing<[u8; 32]>,
    chain_code: Zeroizing<[u8; 32]>,
}

impl Slip10Node {
    fn master(seed: &[u8]) -> WalletResult<Self> {
        Self::from_hmac(ED25519_CURVE, &[seed])
    }

    /// ed25519 只支持硬化派生：HMAC(chain_code, 0x00 || key || index)
    fn derive_hardened(&self, index: u32) -> WalletResult<Self> {
        let hardened_index = index | HARDENED_OFFSET;
        Self::from_hmac(
            &*self.chain_code,
            &[
                &[0x00u8][..],
                &self.private_key[..],
                &hardened_index.to_be_bytes()[..],
            ],
        )
    }

    fn from_hmac(key: &[u8], parts: &[&[u8]]) -> WalletResult<Self> {
        let mut mac = HmacSha512::new_from_slice(key)
            .map_err(|e| WalletError::DerivationFailure(format!("hmac key: {}", e)))?;
        for part in parts {
            mac.update(part);
        }
        let result = mac.finalize().into_bytes();

        let mut private_key = Zeroizing::new([0u8; 32]);
        let mut chain_code = Zeroizing::new([0u8; 32]);
        private_key.copy_from_slice(&result[..32]);
        chain_code.copy_from_slice(&result[32..]);

        Ok(Self {
            private_key,
            chain_code,
        })
    }
}

/// 解析全硬化路径 m/a'/b'/...，返回未加偏移的索引
fn parse_hardened_path(path: &str) -> WalletResult<Vec<u32>> {
    let malformed = |reason: &str| WalletError::DerivationFailure(format!("{}: {}", reason, path));

    let mut parts = path.split('/');
    if parts.next() != Some("m") {
        return Err(malformed("path must start with m"));
    }

    parts
        .map(|part| {
            let digits = part
                .strip_suffix('\'')
                .ok_or_else(|| malformed("ed25519 path segments must be hardened"))?;
            let index = digits
                .parse::<u32>()
                .map_err(|_| malformed("invalid path segment"))?;
            if index >= HARDENED_OFFSET {
                return Err(malformed("path segment out of range"));
            }
            Ok(index)
        })
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 策略工厂
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct DerivationStrategyFactory;

impl DerivationStrategyFactory {
    pub fn create_strategy(curve_type: CurveType) -> Box<dyn DerivationStrategy> {
        match curve_type {
            CurveType::Secp256k1 => Box::new(Secp256k1Strategy),
            CurveType::Ed25519 => Box::new(Ed25519Strategy),
        }
    }
}

/// 派生引擎
pub struct DerivationEngine;

impl DerivationEngine {
    /// 派生指定链族、指定账户索引的密钥对
    ///
    /// 账户索引必须可硬化（< 2^31），否则返回 DerivationFailure
    pub fn derive_account(
        seed: &[u8; 64],
        profile: &ChainProfile,
        index: u32,
    ) -> WalletResult<KeyPair> {
        if index >= HARDENED_OFFSET {
            return Err(WalletError::DerivationFailure(format!(
                "account index {} exceeds hardened range",
                index
            )));
        }

        let strategy = DerivationStrategyFactory::create_strategy(profile.curve_type);
        let key_pair = strategy.derive(seed, profile, index)?;

        tracing::debug!(
            chain = %profile.family,
            account_index = index,
            path = %key_pair.derivation_path,
            address = %key_pair.address,
            "Derived account key pair"
        );

        Ok(key_pair)
    }
}
