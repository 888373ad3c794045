//! Errors - エラー型と分類
//!
//! - `QueueError`: ストレージ層のエラー（enqueue の呼び出し元に伝播）
//! - `SyncError`: 手動同期のエラー（offline は情報扱い）
//! - `DeliveryError`: 1 レコードの配送失敗（drain 内で吸収される）
//! - `ConfigError`: 設定値の検証エラー

use std::error::Error;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for store operations.
pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    /// The medium rejected a write (quota exceeded, disk full, unavailable).
    #[error("storage failure: {message}")]
    StorageFailure {
        message: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },

    /// The persisted queue could not be decoded on open.
    #[error("queue file {} is corrupt", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl QueueError {
    pub fn storage(message: impl Into<String>) -> Self {
        QueueError::StorageFailure {
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        QueueError::StorageFailure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot sync while offline")]
    Offline,

    #[error(transparent)]
    Storage(#[from] QueueError),
}

/// Unexpected failure inside a transport. Expected failures (network down,
/// 4xx/5xx) are reported as `Ok(false)` instead.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid namespace {0:?}: use letters, digits, '.', '_' or '-'")]
    InvalidNamespace(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}
