//! Queue record: id + kind + payload + bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::RecordId;

/// Tag distinguishing what a record is for (e.g. `"penalty"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKind(String);

impl RecordKind {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn penalty() -> Self {
        Self::new("penalty")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RecordKind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A pending write waiting to be delivered.
///
/// Design:
/// - The store owns records; the drainer only reads snapshots of them.
/// - Nothing but `retry_count` ever changes after creation, so there is no
///   public setter. Stores go through [`QueueRecord::with_retry_count`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    id: RecordId,
    kind: RecordKind,
    payload: serde_json::Value,
    enqueued_at: DateTime<Utc>,
    #[serde(default)]
    retry_count: u32,
}

impl QueueRecord {
    pub fn new(
        id: RecordId,
        kind: RecordKind,
        payload: serde_json::Value,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            payload,
            enqueued_at,
            retry_count: 0,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn kind(&self) -> &RecordKind {
        &self.kind
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    /// Number of failed delivery attempts so far.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub(crate) fn with_retry_count(&mut self, retry_count: u32) {
        self.retry_count = retry_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use ulid::Ulid;

    #[test]
    fn new_record_starts_without_retries() {
        let at = Utc.with_ymd_and_hms(2024, 9, 7, 18, 30, 0).unwrap();
        let record = QueueRecord::new(
            RecordId::from_ulid(Ulid::new()),
            RecordKind::penalty(),
            json!({"code": "FST", "player": "12"}),
            at,
        );

        assert_eq!(record.retry_count(), 0);
        assert_eq!(record.kind().as_str(), "penalty");
        assert_eq!(record.enqueued_at(), at);
        assert_eq!(record.payload()["code"], "FST");
    }

    #[test]
    fn missing_retry_count_defaults_to_zero() {
        let id = Ulid::new();
        let raw = json!({
            "id": id.to_string(),
            "kind": "penalty",
            "payload": {"code": "HLD"},
            "enqueued_at": "2024-09-07T18:30:00Z",
        });

        let record: QueueRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.id().as_ulid(), id);
        assert_eq!(record.retry_count(), 0);
    }
}
