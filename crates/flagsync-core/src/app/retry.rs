//! Retry policy: decides which records a drain pass still attempts.

use crate::config::SyncConfig;
use crate::domain::QueueRecord;

/// Retry policy layered on top of the drainer.
///
/// The core never discards records. With a cap set, a record that already
/// failed `max_attempts` times is *parked*: it stays in the store but is not
/// attempted again until the cap is raised or the record is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever (the default).
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    pub fn capped(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
        }
    }

    /// Should this record be handed to the transport in this pass?
    pub fn should_attempt(&self, record: &QueueRecord) -> bool {
        match self.max_attempts {
            Some(max) => record.retry_count() < max,
            None => true,
        }
    }
}
