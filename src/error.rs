//! 错误类型
//!
//! 统一的钱包错误分类：每个错误都对应一个稳定的错误码和一个结果分类，
//! 编排层据此决定通知内容，而不是解析错误消息。

use crate::domain::chain_profile::ChainFamily;

/// 结果分类（用于通知层）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    /// 用户可纠正（无效助记词、无效收款地址、无效金额）
    UserError,
    /// 远程账本或网络失败，用户可手动重试
    NetworkError,
    /// 内部缺陷，不应发生
    InternalError,
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("invalid secret phrase: {0}")]
    InvalidSecret(String),

    #[error("key derivation failed: {0}")]
    DerivationFailure(String),

    #[error("account {family}/{index} already exists")]
    DuplicateAccount { family: ChainFamily, index: u32 },

    #[error("invalid recipient address for {family}: {address}")]
    InvalidRecipient { family: ChainFamily, address: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("{family} ledger rejected the transfer: {source:#}")]
    TransferRejected {
        family: ChainFamily,
        #[source]
        source: anyhow::Error,
    },

    #[error("{family} balance query failed: {source:#}")]
    BalanceQuery {
        family: ChainFamily,
        #[source]
        source: anyhow::Error,
    },

    #[error("persisted wallet state is corrupt: {0}")]
    CorruptState(String),

    #[error("storage error: {0:#}")]
    Storage(#[source] anyhow::Error),

    #[error("no chain profile selected")]
    NoProfileSelected,

    #[error("no secret phrase loaded for the selected profile")]
    NoSecret,

    #[error("account {family}/{index} not found")]
    AccountNotFound { family: ChainFamily, index: u32 },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type WalletResult<T> = std::result::Result<T, WalletError>;

impl WalletError {
    /// 稳定的错误码（日志和通知使用）
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::InvalidSecret(_) => "invalid_secret",
            WalletError::DerivationFailure(_) => "derivation_failure",
            WalletError::DuplicateAccount { .. } => "duplicate_account",
            WalletError::InvalidRecipient { .. } => "invalid_recipient",
            WalletError::InvalidAmount(_) => "invalid_amount",
            WalletError::TransferRejected { .. } => "transfer_rejected",
            WalletError::BalanceQuery { .. } => "balance_query_failed",
            WalletError::CorruptState(_) => "corrupt_state",
            WalletError::Storage(_) => "storage_error",
            WalletError::NoProfileSelected => "no_profile_selected",
            WalletError::NoSecret => "no_secret",
            WalletError::AccountNotFound { .. } => "account_not_found",
            WalletError::Config(_) => "config_error",
        }
    }

    /// 错误分类
    pub fn outcome(&self) -> OutcomeKind {
        match self {
            WalletError::InvalidSecret(_)
            | WalletError::InvalidRecipient { .. }
            | WalletError::InvalidAmount(_)
            | WalletError::NoProfileSelected
            | WalletError::NoSecret
            | WalletError::AccountNotFound { .. } => OutcomeKind::UserError,
            WalletError::TransferRejected { .. } | WalletError::BalanceQuery { .. } => {
                OutcomeKind::NetworkError
            }
            WalletError::DerivationFailure(_)
            | WalletError::DuplicateAccount { .. }
            | WalletError::CorruptState(_)
            | WalletError::Storage(_)
            | WalletError::Config(_) => OutcomeKind::InternalError,
        }
    }

    /// 用户提示消息
    ///
    /// 网络类错误保留底层原因，内部错误只给出概述
    pub fn user_message(&self) -> String {
        match self.outcome() {
            OutcomeKind::InternalError => match self {
                WalletError::DerivationFailure(_) => {
                    "Failed to generate wallet. Please try again.".to_string()
                }
                _ => format!("Internal error ({})", self.code()),
            },
            _ => self.to_string(),
        }
    }

    pub fn transfer_rejected(family: ChainFamily, source: impl Into<anyhow::Error>) -> Self {
        WalletError::TransferRejected {
            family,
            source: source.into(),
        }
    }

    pub fn balance_query(family: ChainFamily, source: impl Into<anyhow::Error>) -> Self {
        WalletError::BalanceQuery {
            family,
            source: source.into(),
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::CorruptState(err.to_string())
    }
}

impl From<bip39::Error> for WalletError {
    fn from(err: bip39::Error) -> Self {
        WalletError::InvalidSecret(err.to_string())
    }
}
