//! QueueStore port - 永続キュー（正本）
//!
//! QueueStore は未配送レコードの唯一の所有者です。
//!
//! # 実装
//! - **InMemoryQueueStore**: テスト用（容量制限で quota 超過を再現できる）
//! - **JsonFileQueueStore**: 本番用（プロセス再起動後も残る）

use async_trait::async_trait;

use crate::domain::errors::QueueResult;
use crate::domain::{QueueRecord, RecordId, RecordKind};

/// Durable CRUD over queue records.
///
/// # 設計原則
/// - `enqueue` が返った時点でレコードは保存済み（失敗なら `StorageFailure`）
/// - `list` は enqueue 順（これが配送順になる）
/// - `remove` / `update_retry_count` は冪等（存在しない ID は no-op）
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Persist a new record and return its id. Never drops the record silently.
    async fn enqueue(&self, kind: RecordKind, payload: serde_json::Value)
    -> QueueResult<RecordId>;

    /// Number of stored records, consistent with `list()`.
    async fn count(&self) -> QueueResult<usize>;

    /// All stored records in enqueue order.
    async fn list(&self) -> QueueResult<Vec<QueueRecord>>;

    async fn get(&self, id: RecordId) -> QueueResult<Option<QueueRecord>>;

    /// Delete a record. Unknown ids are a no-op.
    async fn remove(&self, id: RecordId) -> QueueResult<()>;

    /// Overwrite the retry count. Unknown ids are a no-op.
    async fn update_retry_count(&self, id: RecordId, retry_count: u32) -> QueueResult<()>;
}
