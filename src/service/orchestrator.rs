//! 钱包编排服务
//!
//! 串起 助记词 → 派生 → 注册表 → 链适配器。
//!
//! 状态（按当前选择的链族计算）：
//! - Unselected：未选链
//! - ProfileSelected：已选链，没有助记词
//! - SecretReady：已有助记词，该链族下还没有账户
//! - AccountsActive：已有助记词，且该链族下至少一个账户
//!
//! 注册表是唯一的共享可变状态，放在 RwLock 后面；锁只覆盖同步的增删改和落盘，
//! 网络调用期间不持有锁，余额更新按后写者胜处理。

use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;
use zeroize::Zeroizing;

use crate::domain::account::Account;
use crate::domain::amount;
use crate::domain::chain_profile::{ChainFamily, ChainProfile};
use crate::domain::derivation::DerivationEngine;
use crate::domain::registry::WalletRegistry;
use crate::domain::secret::SecretMaterial;
use crate::error::{WalletError, WalletResult};
use crate::infrastructure::storage::PersistenceStore;
use crate::service::chain_adapter::AdapterSet;
use crate::service::notification::{Notification, NotificationSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unselected,
    ProfileSelected,
    SecretReady,
    AccountsActive,
}

#[derive(Default)]
struct Session {
    family: Option<ChainFamily>,
    secret: Option<SecretMaterial>,
}

/// 编排服务选项
#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorOptions {
    /// 明文保存助记词，重新选链时自动恢复
    pub persist_secret: bool,
}

pub struct WalletOrchestrator {
    session: RwLock<Session>,
    registry: RwLock<WalletRegistry>,
    adapters: AdapterSet,
    store: Arc<dyn PersistenceStore>,
    sink: Arc<dyn NotificationSink>,
    options: OrchestratorOptions,
}

fn secret_store_key(family: ChainFamily) -> String {
    format!("secret-{}", family)
}

impl WalletOrchestrator {
    /// 打开编排服务并加载已保存的注册表
    ///
    /// 注册表损坏时丢弃并从空注册表开始；存储本身不可读时返回错误
    pub async fn open(
        adapters: AdapterSet,
        store: Arc<dyn PersistenceStore>,
        sink: Arc<dyn NotificationSink>,
        options: OrchestratorOptions,
    ) -> WalletResult<Self> {
        let registry = match WalletRegistry::load(&*store).await {
            Ok(registry) => registry,
            Err(WalletError::CorruptState(reason)) => {
                tracing::warn!(reason = %reason, "persisted registry is corrupt, starting empty");
                WalletRegistry::new()
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            accounts = registry.len(),
            persist_secret = options.persist_secret,
            "wallet orchestrator opened"
        );

        Ok(Self {
            session: RwLock::new(Session::default()),
            registry: RwLock::new(registry),
            adapters,
            store,
            sink,
            options,
        })
    }

    // ============ 状态与查询 ============

    pub async fn state(&self) -> SessionState {
        let session = self.session.read().await;
        let Some(family) = session.family else {
            return SessionState::Unselected;
        };
        if session.secret.is_none() {
            return SessionState::ProfileSelected;
        }

        let registry = self.registry.read().await;
        if registry.accounts_for(family).next().is_some() {
            SessionState::AccountsActive
        } else {
            SessionState::SecretReady
        }
    }

    pub async fn selected_family(&self) -> Option<ChainFamily> {
        self.session.read().await.family
    }

    pub async fn accounts(&self) -> Vec<Account> {
        self.registry.read().await.accounts().to_vec()
    }

    pub async fn accounts_for(&self, family: ChainFamily) -> Vec<Account> {
        self.registry
            .read()
            .await
            .accounts_for(family)
            .cloned()
            .collect()
    }

    pub async fn find(&self, family: ChainFamily, index: u32) -> Option<Account> {
        self.registry.read().await.find(family, index).cloned()
    }

    pub async fn next_index(&self, family: ChainFamily) -> u32 {
        self.registry.read().await.next_index(family)
    }

    // ============ 链选择 ============

    /// 选择链族；丢弃内存中的助记词，已保存的账户不受影响
    pub async fn select_profile(&self, family: ChainFamily) -> SessionState {
        let restored = if self.options.persist_secret {
            self.restore_secret(family).await
        } else {
            None
        };

        {
            let mut session = self.session.write().await;
            session.family = Some(family);
            session.secret = restored;
        }

        let state = self.state().await;
        tracing::info!(family = %family, state = ?state, "chain profile selected");
        state
    }

    /// 回到未选链状态
    pub async fn reset_selection(&self) {
        *self.session.write().await = Session::default();
        tracing::info!("chain selection reset");
    }

    // ============ 助记词 ============

    /// 为当前链族生成新的助记词，返回给调用方展示
    pub async fn generate_secret(&self) -> WalletResult<SecretMaterial> {
        let result = self.install_secret(SecretMaterial::generate()).await;
        self.report("generate_secret", result, |(family, _)| {
            format!("Generated a new secret phrase for {}", family)
        })
        .map(|(_, secret)| secret)
    }

    /// 导入助记词；校验失败时状态不变
    pub async fn import_secret(&self, phrase: &str) -> WalletResult<()> {
        let result = match SecretMaterial::import(phrase) {
            Ok(secret) => self.install_secret(secret).await,
            Err(e) => Err(e),
        };
        self.report("import_secret", result, |(family, secret)| {
            format!("Imported a {}-word secret phrase for {}", secret.word_count(), family)
        })
        .map(|_| ())
    }

    async fn install_secret(
        &self,
        secret: SecretMaterial,
    ) -> WalletResult<(ChainFamily, SecretMaterial)> {
        let family = self.require_family().await?;

        if self.options.persist_secret {
            let phrase = Zeroizing::new(secret.phrase());
            self.store.put(&secret_store_key(family), &phrase).await?;
        }

        let mut session = self.session.write().await;
        // 选链在等待存储期间被改变时，不把助记词装到别的链上
        if session.family != Some(family) {
            return Err(WalletError::NoProfileSelected);
        }
        session.secret = Some(secret.clone());
        Ok((family, secret))
    }

    async fn restore_secret(&self, family: ChainFamily) -> Option<SecretMaterial> {
        let raw = match self.store.get(&secret_store_key(family)).await {
            Ok(Some(raw)) => Zeroizing::new(raw),
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(family = %family, error = %e, "failed to read persisted secret");
                return None;
            }
        };

        match SecretMaterial::import(&raw) {
            Ok(secret) => {
                tracing::info!(family = %family, "restored persisted secret phrase");
                Some(secret)
            }
            Err(e) => {
                tracing::warn!(family = %family, code = e.code(), "persisted secret is invalid, ignoring");
                None
            }
        }
    }

    async fn require_family(&self) -> WalletResult<ChainFamily> {
        self.session
            .read()
            .await
            .family
            .ok_or(WalletError::NoProfileSelected)
    }

    // ============ 账户 ============

    /// 派生下一个账户并追加到注册表
    ///
    /// 取索引、派生、追加、落盘作为一个整体：在副本上完成追加并保存成功后才替换，
    /// 任何一步失败时注册表和计数器都保持原样
    pub async fn request_account(&self) -> WalletResult<Account> {
        let result = self.derive_and_append().await;
        self.report("request_account", result, |account| {
            format!(
                "Created {} account #{}: {}",
                account.chain_family(),
                account.account_index(),
                account.address()
            )
        })
    }

    async fn derive_and_append(&self) -> WalletResult<Account> {
        let (family, seed) = {
            let session = self.session.read().await;
            let family = session.family.ok_or(WalletError::NoProfileSelected)?;
            let secret = session.secret.as_ref().ok_or(WalletError::NoSecret)?;
            (family, Zeroizing::new(secret.derive_seed()))
        };

        let mut registry = self.registry.write().await;
        let index = registry.next_index(family);
        let key_pair = DerivationEngine::derive_account(&seed, ChainProfile::of(family), index)?;
        let account = Account::from_key_pair(key_pair);

        let mut scratch = registry.clone();
        scratch.append(account.clone())?;
        scratch.save(&*self.store).await?;
        *registry = scratch;

        tracing::info!(
            family = %family,
            index,
            address = %account.address(),
            path = %account.derivation_path(),
            "account derived"
        );
        Ok(account)
    }

    /// 删除账户；索引不会被重新分配
    pub async fn remove_account(&self, family: ChainFamily, index: u32) -> WalletResult<Account> {
        let result = async {
            let mut registry = self.registry.write().await;
            let mut scratch = registry.clone();
            let removed = scratch
                .remove(family, index)
                .ok_or(WalletError::AccountNotFound { family, index })?;
            scratch.save(&*self.store).await?;
            *registry = scratch;
            Ok::<_, WalletError>(removed)
        }
        .await;

        self.report_for(family, "remove_account", result, |account| {
            format!("Removed {} account #{}", family, account.account_index())
        })
    }

    // ============ 链上操作 ============

    /// 刷新单个账户的余额
    pub async fn refresh_balance(&self, family: ChainFamily, index: u32) -> WalletResult<u128> {
        let result = self.fetch_and_store_balance(family, index).await;
        self.report_for(family, "refresh_balance", result, |balance| {
            format!(
                "{} account #{} balance: {}",
                family,
                index,
                amount::format_native(*balance, ChainProfile::of(family))
            )
        })
    }

    async fn fetch_and_store_balance(&self, family: ChainFamily, index: u32) -> WalletResult<u128> {
        let address = self.account_address(family, index).await?;
        let adapter = self.adapters.get(family)?;

        // 网络调用期间不持有注册表锁
        let balance = adapter.fetch_balance(&address).await?;

        let mut registry = self.registry.write().await;
        if registry.update_balance(family, index, balance, chrono::Utc::now()) {
            // 余额只是缓存，落盘失败不影响本次结果
            if let Err(e) = registry.save(&*self.store).await {
                tracing::warn!(family = %family, index, error = %e, "failed to persist balance");
            }
        } else {
            tracing::debug!(family = %family, index, "account removed while balance was in flight");
        }

        Ok(balance)
    }

    /// 并发刷新某链族的全部账户，每个账户独立分类
    pub async fn refresh_all(&self, family: ChainFamily) -> Vec<(u32, WalletResult<u128>)> {
        let indices: Vec<u32> = self
            .registry
            .read()
            .await
            .accounts_for(family)
            .map(Account::account_index)
            .collect();

        let results = join_all(
            indices
                .iter()
                .map(|&index| self.refresh_balance(family, index)),
        )
        .await;

        indices.into_iter().zip(results).collect()
    }

    /// 原生币转账，成功后刷新发送方余额
    pub async fn transfer(
        &self,
        family: ChainFamily,
        index: u32,
        to: &str,
        amount_native: Decimal,
    ) -> WalletResult<String> {
        let result = self.submit_transfer(family, index, to, amount_native).await;
        let result = self.report_for(family, "transfer", result, |tx_id| {
            format!("Sent {} {} to {}: {}", amount_native, family.profile().native_unit_name, to, tx_id)
        });

        if result.is_ok() {
            // 通知已经在 refresh_balance 内完成
            let _ = self.refresh_balance(family, index).await;
        }
        result
    }

    async fn submit_transfer(
        &self,
        family: ChainFamily,
        index: u32,
        to: &str,
        amount_native: Decimal,
    ) -> WalletResult<String> {
        let adapter = self.adapters.get(family)?;

        // 输入校验在编排边界完成，不进入适配器的网络路径
        adapter.validate_address(to)?;
        amount::to_smallest_units(amount_native, ChainProfile::of(family))?;

        let private_key = {
            let registry = self.registry.read().await;
            let account = registry
                .find(family, index)
                .ok_or(WalletError::AccountNotFound { family, index })?;
            Zeroizing::new(account.private_key().to_vec())
        };

        let tx_id = adapter.transfer(&private_key, to, amount_native).await?;
        tracing::info!(family = %family, index, to = %to, tx_id = %tx_id, "transfer confirmed");
        Ok(tx_id)
    }

    /// 测试币入口；领取后是否刷新余额由调用方决定
    pub async fn faucet(&self, family: ChainFamily, index: u32) -> WalletResult<&'static str> {
        let result = async {
            let address = self.account_address(family, index).await?;
            let hint = self.adapters.get(family)?.faucet_hint();
            Ok::<_, WalletError>((address, hint))
        }
        .await;

        self.report_for(family, "faucet", result, |(address, hint)| {
            format!("Request test funds for {} at {}", address, hint)
        })
        .map(|(_, hint)| hint)
    }

    async fn account_address(&self, family: ChainFamily, index: u32) -> WalletResult<String> {
        self.registry
            .read()
            .await
            .find(family, index)
            .map(|a| a.address().to_string())
            .ok_or(WalletError::AccountNotFound { family, index })
    }

    // ============ 结果分类 ============

    fn report<T>(
        &self,
        operation: &'static str,
        result: WalletResult<T>,
        describe: impl FnOnce(&T) -> String,
    ) -> WalletResult<T> {
        self.emit(operation, None, &result, describe);
        result
    }

    fn report_for<T>(
        &self,
        family: ChainFamily,
        operation: &'static str,
        result: WalletResult<T>,
        describe: impl FnOnce(&T) -> String,
    ) -> WalletResult<T> {
        self.emit(operation, Some(family), &result, describe);
        result
    }

    fn emit<T>(
        &self,
        operation: &'static str,
        family: Option<ChainFamily>,
        result: &WalletResult<T>,
        describe: impl FnOnce(&T) -> String,
    ) {
        let notification = match result {
            Ok(value) => Notification::success(operation, family, describe(value)),
            Err(err) => {
                tracing::debug!(operation, code = err.code(), error = %err, "operation failed");
                Notification::failure(operation, family, err)
            }
        };
        self.sink.notify(notification);
    }
}
