//! Ordered record list shared by the store implementations.

use serde::{Deserialize, Serialize};

use crate::domain::{QueueRecord, RecordId};

/// Records in enqueue order. Queues stay small, so lookups are linear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Ledger {
    records: Vec<QueueRecord>,
}

impl Ledger {
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn records(&self) -> &[QueueRecord] {
        &self.records
    }

    pub(crate) fn push(&mut self, record: QueueRecord) {
        self.records.push(record);
    }

    pub(crate) fn get(&self, id: RecordId) -> Option<&QueueRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Returns whether anything was removed.
    pub(crate) fn remove(&mut self, id: RecordId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id() != id);
        self.records.len() != before
    }

    /// Returns whether the stored value changed.
    pub(crate) fn set_retry_count(&mut self, id: RecordId, retry_count: u32) -> bool {
        match self.records.iter_mut().find(|r| r.id() == id) {
            Some(record) if record.retry_count() != retry_count => {
                record.with_retry_count(retry_count);
                true
            }
            _ => false,
        }
    }
}
