//! 链配置模块
//!
//! 两个链族的不可变描述：币种类型、原生单位、最小单位精度和派生路径格式

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// 链族（封闭枚举，取代按字符串 "501" / "60" 分支）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Solana,
    Ethereum,
}

/// 加密曲线类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    /// secp256k1 曲线，BIP-32 派生
    Secp256k1,
    /// ed25519 曲线，SLIP-0010 派生（只支持硬化）
    Ed25519,
}

/// 链配置
#[derive(Debug, PartialEq, Eq)]
pub struct ChainProfile {
    pub family: ChainFamily,
    /// SLIP-44 coin type
    pub coin_type: u32,
    /// 原生代币单位 (SOL, ETH)
    pub native_unit_name: &'static str,
    /// 最小单位名称 (lamport, wei)
    pub smallest_unit_name: &'static str,
    /// 最小单位精度，smallest_unit_per_native = 10^decimals
    pub decimals: u32,
    pub curve_type: CurveType,
}

pub const SOLANA: ChainProfile = ChainProfile {
    family: ChainFamily::Solana,
    coin_type: 501,
    native_unit_name: "SOL",
    smallest_unit_name: "lamport",
    decimals: 9,
    curve_type: CurveType::Ed25519,
};

pub const ETHEREUM: ChainProfile = ChainProfile {
    family: ChainFamily::Ethereum,
    coin_type: 60,
    native_unit_name: "ETH",
    smallest_unit_name: "wei",
    decimals: 18,
    curve_type: CurveType::Secp256k1,
};

impl ChainProfile {
    pub fn of(family: ChainFamily) -> &'static ChainProfile {
        match family {
            ChainFamily::Solana => &SOLANA,
            ChainFamily::Ethereum => &ETHEREUM,
        }
    }

    pub fn from_coin_type(coin_type: u32) -> Option<&'static ChainProfile> {
        ChainFamily::ALL
            .iter()
            .map(|family| ChainProfile::of(*family))
            .find(|profile| profile.coin_type == coin_type)
    }

    pub fn smallest_unit_per_native(&self) -> u128 {
        10u128.pow(self.decimals)
    }

    /// 生成账户级派生路径
    ///
    /// 账户索引位于硬化的 account 层，之后的层级由链族固定：
    /// - Solana (SLIP-0010): m/44'/501'/account'/0'
    /// - Ethereum (BIP-44):   m/44'/60'/account'/0/0
    pub fn derivation_path(&self, account_index: u32) -> String {
        match self.curve_type {
            CurveType::Ed25519 => format!("m/44'/{}'/{}'/0'", self.coin_type, account_index),
            CurveType::Secp256k1 => format!("m/44'/{}'/{}'/0/0", self.coin_type, account_index),
        }
    }
}

impl ChainFamily {
    pub const ALL: [ChainFamily; 2] = [ChainFamily::Solana, ChainFamily::Ethereum];

    pub fn profile(self) -> &'static ChainProfile {
        ChainProfile::of(self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChainFamily::Solana => "solana",
            ChainFamily::Ethereum => "ethereum",
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainFamily {
    type Err = WalletError;

    /// 支持链名、符号和 coin type
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "solana" | "sol" | "501" => Ok(ChainFamily::Solana),
            "ethereum" | "eth" | "60" => Ok(ChainFamily::Ethereum),
            other => Err(WalletError::Config(format!("unsupported chain: {}", other))),
        }
    }
}
