//! Domain 模块
//!
//! 助记词、派生、账户与注册表；不依赖网络

pub mod account;
pub mod amount;
pub mod chain_profile;
pub mod derivation;
pub mod registry;
pub mod secret;

// 重新导出常用类型
pub use account::Account;
pub use chain_profile::{ChainFamily, ChainProfile, CurveType, ETHEREUM, SOLANA};
pub use derivation::{DerivationEngine, DerivationStrategy, DerivationStrategyFactory, KeyPair};
pub use registry::WalletRegistry;
pub use secret::SecretMaterial;
