//! 账户模型
//!
//! 公钥、私钥和派生路径在创建时写入一次，之后只有缓存余额会被刷新。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::domain::chain_profile::ChainFamily;
use crate::domain::derivation::KeyPair;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    chain_family: ChainFamily,
    account_index: u32,
    /// 链原生地址（Solana Base58 / Ethereum 0x 十六进制）
    public_key: String,
    /// 持久化为十六进制明文（由调用方决定存储位置的安全性）
    #[serde(with = "hex_secret")]
    private_key: Zeroizing<Vec<u8>>,
    derivation_path: String,
    /// 最小单位余额，以十进制字符串持久化
    #[serde(default, with = "u128_string")]
    cached_balance: u128,
    #[serde(default)]
    last_balance_refresh: Option<DateTime<Utc>>,
}

impl Account {
    pub fn from_key_pair(key_pair: KeyPair) -> Self {
        Self {
            chain_family: key_pair.family,
            account_index: key_pair.account_index,
            public_key: key_pair.address,
            private_key: key_pair.private_key,
            derivation_path: key_pair.derivation_path,
            cached_balance: 0,
            last_balance_refresh: None,
        }
    }

    pub fn chain_family(&self) -> ChainFamily {
        self.chain_family
    }

    pub fn account_index(&self) -> u32 {
        self.account_index
    }

    /// 注册表中的唯一键
    pub fn key(&self) -> (ChainFamily, u32) {
        (self.chain_family, self.account_index)
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn address(&self) -> &str {
        &self.public_key
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&*self.private_key))
    }

    pub fn derivation_path(&self) -> &str {
        &self.derivation_path
    }

    pub fn cached_balance(&self) -> u128 {
        self.cached_balance
    }

    pub fn last_balance_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_balance_refresh
    }

    pub(crate) fn set_balance(&mut self, balance: u128, at: DateTime<Utc>) {
        self.cached_balance = balance;
        self.last_balance_refresh = Some(at);
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("chain_family", &self.chain_family)
            .field("account_index", &self.account_index)
            .field("public_key", &self.public_key)
            .field("derivation_path", &self.derivation_path)
            .field("cached_balance", &self.cached_balance)
            .field("last_balance_refresh", &self.last_balance_refresh)
            .finish_non_exhaustive()
    }
}

mod hex_secret {
    use serde::{Deserialize, Deserializer, Serializer};
    use zeroize::Zeroizing;

    pub fn serialize<S: Serializer>(value: &Zeroizing<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        let encoded = Zeroizing::new(hex::encode(&**value));
        s.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Zeroizing<Vec<u8>>, D::Error> {
        let encoded = Zeroizing::new(String::deserialize(d)?);
        hex::decode(encoded.trim_start_matches("0x"))
            .map(Zeroizing::new)
            .map_err(serde::de::Error::custom)
    }
}

/// u128 超出 JSON 数字的安全范围，按字符串写出；读取时也接受数字
mod u128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Number(n) => Ok(u128::from(n)),
        }
    }
}
