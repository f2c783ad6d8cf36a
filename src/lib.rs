//! seedwallet - 确定性多链钱包派生与账户注册引擎
//!
//! 一组 BIP-39 助记词派生 Solana / Ethereum 账户，统一提供余额查询、转账和测试币入口

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use error::{OutcomeKind, WalletError, WalletResult};

pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{Account, ChainFamily, ChainProfile, SecretMaterial, WalletRegistry},
        error::{OutcomeKind, WalletError, WalletResult},
        infrastructure::storage::{FileStore, MemoryStore, PersistenceStore},
        service::{
            AdapterSet, ChainAdapter, NotificationSink, OrchestratorOptions, SessionState,
            WalletOrchestrator,
        },
    };
}
