//! 钱包注册表
//!
//! 按派生顺序保存账户，(链族, 索引) 唯一；每个链族维护下一个可用索引。
//! 计数器只增不减，删除账户不会让索引被重新分配。

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::account::Account;
use crate::domain::chain_profile::{ChainFamily, ChainProfile};
use crate::error::{WalletError, WalletResult};
use crate::infrastructure::storage::PersistenceStore;

/// 持久化格式版本
pub const REGISTRY_FORMAT_VERSION: u32 = 1;

/// 存储中的键
pub const REGISTRY_STORE_KEY: &str = "registry";

/// 派生索引上限（硬化索引空间）
const MAX_ACCOUNT_INDEX: u32 = 0x8000_0000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletRegistry {
    accounts: Vec<Account>,
    next_index: BTreeMap<ChainFamily, u32>,
}

/// 持久化文档
///
/// 只有 accounts 是必需字段，其余缺失时取默认值；未知字段忽略
#[derive(Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default = "default_version")]
    version: u32,
    accounts: Vec<Account>,
    #[serde(default)]
    next_index: BTreeMap<ChainFamily, u32>,
}

fn default_version() -> u32 {
    REGISTRY_FORMAT_VERSION
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加账户
    ///
    /// 同一 (链族, 索引) 已存在时返回 DuplicateAccount，注册表不变。
    /// 成功时该链族的计数器至少推进到 index + 1。
    pub fn append(&mut self, account: Account) -> WalletResult<()> {
        let (family, index) = account.key();
        if self.find(family, index).is_some() {
            return Err(WalletError::DuplicateAccount { family, index });
        }

        let counter = self.next_index.entry(family).or_insert(0);
        *counter = (*counter).max(index.saturating_add(1));
        self.accounts.push(account);
        Ok(())
    }

    /// 删除账户；不存在时为空操作
    pub fn remove(&mut self, family: ChainFamily, index: u32) -> Option<Account> {
        let position = self
            .accounts
            .iter()
            .position(|a| a.key() == (family, index))?;
        Some(self.accounts.remove(position))
    }

    pub fn find(&self, family: ChainFamily, index: u32) -> Option<&Account> {
        self.accounts.iter().find(|a| a.key() == (family, index))
    }

    /// 全部账户（派生顺序）
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn accounts_for(&self, family: ChainFamily) -> impl Iterator<Item = &Account> + '_ {
        self.accounts
            .iter()
            .filter(move |a| a.chain_family() == family)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// 下一个尚未分配的索引（不推进计数器）
    pub fn next_index(&self, family: ChainFamily) -> u32 {
        self.next_index.get(&family).copied().unwrap_or(0)
    }

    /// 分配一个索引并推进计数器
    pub fn reserve_index(&mut self, family: ChainFamily) -> WalletResult<u32> {
        let index = self.next_index(family);
        if index >= MAX_ACCOUNT_INDEX {
            return Err(WalletError::DerivationFailure(format!(
                "{} account index space exhausted",
                family
            )));
        }
        self.next_index.insert(family, index + 1);
        Ok(index)
    }

    /// 更新缓存余额（后写者胜）
    ///
    /// 账户已被删除时返回 false
    pub fn update_balance(
        &mut self,
        family: ChainFamily,
        index: u32,
        balance: u128,
        at: DateTime<Utc>,
    ) -> bool {
        match self.accounts.iter_mut().find(|a| a.key() == (family, index)) {
            Some(account) => {
                account.set_balance(balance, at);
                true
            }
            None => false,
        }
    }

    // ============ 序列化 ============

    pub fn serialize(&self) -> WalletResult<String> {
        let document = RegistryDocument {
            version: REGISTRY_FORMAT_VERSION,
            accounts: self.accounts.clone(),
            next_index: self.next_index.clone(),
        };
        serde_json::to_string_pretty(&document)
            .map_err(|e| WalletError::Storage(anyhow::anyhow!("failed to encode registry: {}", e)))
    }

    pub fn deserialize(raw: &str) -> WalletResult<Self> {
        let document: RegistryDocument = serde_json::from_str(raw)?;

        if document.version > REGISTRY_FORMAT_VERSION {
            tracing::warn!(
                version = document.version,
                supported = REGISTRY_FORMAT_VERSION,
                "registry written by a newer version, reading known fields only"
            );
        }

        let mut seen = HashSet::new();
        for account in &document.accounts {
            let (family, index) = account.key();
            if !seen.insert((family, index)) {
                return Err(WalletError::CorruptState(format!(
                    "duplicate account {}/{}",
                    family, index
                )));
            }
            validate_account(account)?;
        }

        let mut next_index = document.next_index;
        for family in ChainFamily::ALL {
            let Some(max_index) = document
                .accounts
                .iter()
                .filter(|a| a.chain_family() == family)
                .map(Account::account_index)
                .max()
            else {
                continue;
            };

            match next_index.get(&family) {
                Some(&counter) if counter <= max_index => {
                    return Err(WalletError::CorruptState(format!(
                        "{} next index {} is not above existing index {}",
                        family, counter, max_index
                    )));
                }
                Some(_) => {}
                None => {
                    next_index.insert(family, max_index.saturating_add(1));
                }
            }
        }

        Ok(Self {
            accounts: document.accounts,
            next_index,
        })
    }

    // ============ 持久化 ============

    /// 从存储加载；尚未保存过时返回空注册表
    pub async fn load(store: &dyn PersistenceStore) -> WalletResult<Self> {
        match store.get(REGISTRY_STORE_KEY).await? {
            Some(raw) => Self::deserialize(&raw),
            None => Ok(Self::new()),
        }
    }

    pub async fn save(&self, store: &dyn PersistenceStore) -> WalletResult<()> {
        let raw = self.serialize()?;
        store.put(REGISTRY_STORE_KEY, &raw).await
    }
}

/// 单个账户的结构校验：私钥长度与路径必须和链族一致
fn validate_account(account: &Account) -> WalletResult<()> {
    let family = account.chain_family();
    let index = account.account_index();

    let expected_key_len = match family {
        ChainFamily::Solana => 64,
        ChainFamily::Ethereum => 32,
    };
    if account.private_key().len() != expected_key_len {
        return Err(WalletError::CorruptState(format!(
            "{}/{} private key has {} bytes, expected {}",
            family,
            index,
            account.private_key().len(),
            expected_key_len
        )));
    }

    if account.public_key().is_empty() {
        return Err(WalletError::CorruptState(format!(
            "{}/{} has an empty public key",
            family, index
        )));
    }

    let expected_path = ChainProfile::of(family).derivation_path(index);
    if account.derivation_path() != expected_path {
        return Err(WalletError::CorruptState(format!(
            "{}/{} derivation path {} does not match {}",
            family,
            index,
            account.derivation_path(),
            expected_path
        )));
    }

    Ok(())
}
