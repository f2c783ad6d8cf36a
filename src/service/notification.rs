//! 操作结果通知
//!
//! 编排层把每个操作的分类结果交给 NotificationSink，展示层自行决定如何呈现。

use std::sync::Mutex;

use serde::Serialize;

use crate::domain::chain_profile::ChainFamily;
use crate::error::{OutcomeKind, WalletError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// 操作名（"request_account"、"transfer" ...）
    pub operation: &'static str,
    pub outcome: OutcomeKind,
    pub family: Option<ChainFamily>,
    /// 稳定错误码，成功时为 None
    pub code: Option<&'static str>,
    pub message: String,
}

impl Notification {
    pub fn success(
        operation: &'static str,
        family: Option<ChainFamily>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            outcome: OutcomeKind::Success,
            family,
            code: None,
            message: message.into(),
        }
    }

    pub fn failure(operation: &'static str, family: Option<ChainFamily>, err: &WalletError) -> Self {
        Self {
            operation,
            outcome: err.outcome(),
            family,
            code: Some(err.code()),
            message: err.user_message(),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// 以日志事件输出通知
#[derive(Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, n: Notification) {
        let family = n.family.map(|f| f.as_str()).unwrap_or("-");
        match n.outcome {
            OutcomeKind::Success => {
                tracing::info!(operation = n.operation, family, "{}", n.message)
            }
            OutcomeKind::UserError => tracing::warn!(
                operation = n.operation,
                family,
                code = n.code.unwrap_or_default(),
                "{}",
                n.message
            ),
            OutcomeKind::NetworkError | OutcomeKind::InternalError => tracing::error!(
                operation = n.operation,
                family,
                outcome = ?n.outcome,
                code = n.code.unwrap_or_default(),
                "{}",
                n.message
            ),
        }
    }
}

/// 记录所有通知（测试用）
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Notification> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Notification> {
        self.records.lock().ok().and_then(|r| r.last().cloned())
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        if let Ok(mut records) = self.records.lock() {
            records.push(notification);
        }
    }
}
