//! InMemoryQueueStore - テスト用のキュー
//!
//! プロセスが終われば消えます。`with_capacity` で quota 超過を再現できます。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::ledger::Ledger;
use crate::domain::errors::QueueResult;
use crate::domain::{QueueError, QueueRecord, RecordId, RecordKind};
use crate::ports::{Clock, IdGenerator, QueueStore, SystemClock, UlidGenerator};

pub struct InMemoryQueueStore {
    ledger: Mutex<Ledger>,
    capacity: Option<usize>,
    clock: Arc<dyn Clock>,
    ids: UlidGenerator<Arc<dyn Clock>>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            capacity: None,
            ids: UlidGenerator::new(Arc::clone(&clock)),
            clock,
        }
    }

    /// Reject enqueues once `capacity` records are stored.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

impl Default for InMemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn enqueue(
        &self,
        kind: RecordKind,
        payload: serde_json::Value,
    ) -> QueueResult<RecordId> {
        let mut ledger = self.ledger.lock().await;
        if let Some(capacity) = self.capacity
            && ledger.len() >= capacity
        {
            return Err(QueueError::storage(format!(
                "queue is full ({capacity} records)"
            )));
        }

        let id = self.ids.generate_record_id();
        ledger.push(QueueRecord::new(id, kind, payload, self.clock.now()));
        debug!(record_id = %id, depth = ledger.len(), "record enqueued");
        Ok(id)
    }

    async fn count(&self) -> QueueResult<usize> {
        Ok(self.ledger.lock().await.len())
    }

    async fn list(&self) -> QueueResult<Vec<QueueRecord>> {
        Ok(self.ledger.lock().await.records().to_vec())
    }

    async fn get(&self, id: RecordId) -> QueueResult<Option<QueueRecord>> {
        Ok(self.ledger.lock().await.get(id).cloned())
    }

    async fn remove(&self, id: RecordId) -> QueueResult<()> {
        self.ledger.lock().await.remove(id);
        Ok(())
    }

    async fn update_retry_count(&self, id: RecordId, retry_count: u32) -> QueueResult<()> {
        self.ledger.lock().await.set_retry_count(id, retry_count);
        Ok(())
    }
}
