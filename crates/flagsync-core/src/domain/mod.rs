//! Domain model (ids, queue records, drain results, errors).

pub mod drain;
pub mod errors;
pub mod ids;
pub mod record;

pub use drain::{DrainOutcome, DrainState, DrainSummary, SyncStatus};
pub use errors::{ConfigError, DeliveryError, QueueError, SyncError};
pub use ids::RecordId;
pub use record::{QueueRecord, RecordKind};
