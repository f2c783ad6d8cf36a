// 持久化存储
// 键值形式的不透明字符串存储；注册表和（可选的）助记词各占一个键

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;

use crate::error::{WalletError, WalletResult};

// ============ Store Trait ============

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// 读取键；不存在返回 None
    async fn get(&self, key: &str) -> WalletResult<Option<String>>;

    /// 写入键（整体替换）
    async fn put(&self, key: &str, value: &str) -> WalletResult<()>;

    /// 删除键；不存在时为空操作
    async fn delete(&self, key: &str) -> WalletResult<()>;
}

// ============ 文件实现 ============

/// 目录下每个键一个 `<key>.json` 文件
///
/// 写入先落到临时文件再 rename，进程中途退出不会留下半个文件
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> WalletResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(WalletError::Storage(anyhow::anyhow!(
                "invalid storage key: {:?}",
                key
            )));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl PersistenceStore for FileStore {
    async fn get(&self, key: &str) -> WalletResult<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WalletError::Storage(
                anyhow::Error::new(e).context(format!("failed to read {}", path.display())),
            )),
        }
    }

    async fn put(&self, key: &str, value: &str) -> WalletResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to create {}", self.root.display()))
            .map_err(WalletError::Storage)?;

        let written = async {
            tokio::fs::write(&tmp, value)
                .await
                .with_context(|| format!("failed to write {}", tmp.display()))?;
            tokio::fs::rename(&tmp, &path)
                .await
                .with_context(|| format!("failed to replace {}", path.display()))?;
            anyhow::Ok(())
        }
        .await;

        if let Err(e) = written {
            // 失败时不留下临时文件
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp file");
                }
            }
            return Err(WalletError::Storage(e));
        }

        tracing::debug!(key = %key, path = %path.display(), bytes = value.len(), "store write");
        Ok(())
    }

    async fn delete(&self, key: &str) -> WalletResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WalletError::Storage(
                anyhow::Error::new(e).context(format!("failed to delete {}", path.display())),
            )),
        }
    }
}

// ============ 内存实现 ============

/// 进程内存储（测试和一次性会话）
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> WalletResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| WalletError::Storage(anyhow::anyhow!("memory store lock poisoned")))
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn get(&self, key: &str) -> WalletResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> WalletResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> WalletResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
