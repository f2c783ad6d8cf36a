//! 地址编码与验证模块
//!
//! 两个链族的地址编解码集中在这里：派生引擎用它编码地址，
//! 链适配器和编排层用它校验收款地址。

use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

use crate::domain::chain_profile::ChainFamily;
use crate::error::{WalletError, WalletResult};

/// 地址验证器
pub struct AddressValidator;

impl AddressValidator {
    /// 验证地址格式
    pub fn validate(family: ChainFamily, address: &str) -> bool {
        match family {
            ChainFamily::Ethereum => Self::validate_evm_address(address),
            ChainFamily::Solana => Self::validate_solana_address(address),
        }
    }

    /// 验证收款地址，失败返回 InvalidRecipient
    pub fn ensure_recipient(family: ChainFamily, address: &str) -> WalletResult<()> {
        if Self::validate(family, address) {
            Ok(())
        } else {
            Err(WalletError::InvalidRecipient {
                family,
                address: address.to_string(),
            })
        }
    }

    /// 验证EVM地址（支持EIP-55 Checksum）
    fn validate_evm_address(address: &str) -> bool {
        // 1. 基本格式检查
        if !address.starts_with("0x") || address.len() != 42 {
            return false;
        }

        // 2. 验证hex字符
        let hex_part = &address[2..];
        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }

        // 3. 混合大小写时必须满足 EIP-55；全小写或全大写不带校验
        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower {
            return to_eip55_checksum(hex_part) == address;
        }

        true
    }

    /// 验证Solana地址（Base58编码，32字节）
    fn validate_solana_address(address: &str) -> bool {
        // 典型长度：32-44个字符
        if address.len() < 32 || address.len() > 44 {
            return false;
        }

        decode_solana_address(address).is_ok()
    }
}

/// Solana 地址：公钥的 Base58 编码
pub fn encode_solana_address(public_key: &[u8]) -> WalletResult<String> {
    if public_key.len() != 32 {
        return Err(WalletError::DerivationFailure(format!(
            "ed25519 public key must be 32 bytes, got {}",
            public_key.len()
        )));
    }
    Ok(bs58::encode(public_key).into_string())
}

pub fn decode_solana_address(address: &str) -> WalletResult<[u8; 32]> {
    let invalid = || WalletError::InvalidRecipient {
        family: ChainFamily::Solana,
        address: address.to_string(),
    };

    let decoded = bs58::decode(address).into_vec().map_err(|_| invalid())?;
    decoded.as_slice().try_into().map_err(|_| invalid())
}

/// Ethereum 地址：Keccak256(未压缩公钥去掉 0x04 前缀) 的后 20 字节，EIP-55 大小写
///
/// 接受 SEC1 压缩（33 字节）、未压缩（65 字节）或裸坐标（64 字节）公钥
pub fn encode_ethereum_address(public_key: &[u8]) -> WalletResult<String> {
    let uncompressed = match public_key.len() {
        64 => {
            let mut buf = Vec::with_capacity(65);
            buf.push(0x04);
            buf.extend_from_slice(public_key);
            buf
        }
        33 | 65 => {
            let point = k256::PublicKey::from_sec1_bytes(public_key).map_err(|e| {
                WalletError::DerivationFailure(format!("invalid secp256k1 public key: {}", e))
            })?;
            point.to_encoded_point(false).as_bytes().to_vec()
        }
        n => {
            return Err(WalletError::DerivationFailure(format!(
                "secp256k1 public key has unexpected length {}",
                n
            )))
        }
    };

    let hash = Keccak256::digest(&uncompressed[1..]);
    Ok(to_eip55_checksum(&hex::encode(&hash[12..])))
}

pub fn decode_ethereum_address(address: &str) -> WalletResult<[u8; 20]> {
    if !AddressValidator::validate(ChainFamily::Ethereum, address) {
        return Err(WalletError::InvalidRecipient {
            family: ChainFamily::Ethereum,
            address: address.to_string(),
        });
    }

    let mut out = [0u8; 20];
    hex::decode_to_slice(&address[2..], &mut out).map_err(|_| WalletError::InvalidRecipient {
        family: ChainFamily::Ethereum,
        address: address.to_string(),
    })?;
    Ok(out)
}

/// EIP-55 Checksum
/// https://eips.ethereum.org/EIPS/eip-55
fn to_eip55_checksum(hex_part: &str) -> String {
    let addr_lower = hex_part.to_lowercase();
    let hash = Keccak256::digest(addr_lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, ch) in addr_lower.chars().enumerate() {
        let hash_byte = hash[i / 2];
        let hash_nibble = if i % 2 == 0 {
            hash_byte >> 4
        } else {
            hash_byte & 0x0f
        };

        if ch.is_ascii_alphabetic() && hash_nibble >= 8 {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
    }
    out
}
