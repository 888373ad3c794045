//! QueueDrainer - キューの配送ループ
//!
//! # フロー（1 パス）
//! 1. QueueStore::list() でスナップショットを取る（パス中に追加されたものは次回）
//! 2. enqueue 順に Transport::deliver() を 1 件ずつ呼ぶ（並列にしない）
//! 3. 成功なら remove、失敗なら retry_count + 1（どちらでも次へ進む）
//! 4. DrainSummary を返す
//!
//! 同時に走るパスは 1 つだけ。実行中に呼ばれたら何もせず `AlreadyRunning` を返す。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use tracing::{debug, info, warn};

use super::RetryPolicy;
use crate::domain::errors::QueueResult;
use crate::domain::{DeliveryError, DrainOutcome, DrainState, DrainSummary, QueueRecord};
use crate::ports::{QueueStore, Transport};

pub struct QueueDrainer {
    store: Arc<dyn QueueStore>,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    draining: AtomicBool,
}

/// Holds the single-drain flag; released on drop, including unwinds.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl QueueDrainer {
    pub fn new(store: Arc<dyn QueueStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            store,
            transport,
            policy: RetryPolicy::default(),
            draining: AtomicBool::new(false),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn state(&self) -> DrainState {
        if self.draining.load(Ordering::Acquire) {
            DrainState::Draining
        } else {
            DrainState::Idle
        }
    }

    /// Run one drain pass. Never fails: delivery and bookkeeping errors are
    /// logged and reflected in the summary, an unreadable queue is an empty pass.
    pub async fn drain(&self) -> DrainOutcome {
        match self.try_drain().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "could not read queue; skipping drain pass");
                DrainOutcome::Completed(DrainSummary::default())
            }
        }
    }

    /// Like [`Self::drain`], but a failure to read the queue snapshot is returned.
    pub async fn try_drain(&self) -> QueueResult<DrainOutcome> {
        let Some(_guard) = DrainGuard::acquire(&self.draining) else {
            debug!("drain already in progress; trigger absorbed");
            return Ok(DrainOutcome::AlreadyRunning);
        };

        let snapshot = self.store.list().await?;
        if snapshot.is_empty() {
            return Ok(DrainOutcome::Completed(DrainSummary::default()));
        }

        info!(pending = snapshot.len(), "drain pass started");
        let mut summary = DrainSummary::default();
        for record in &snapshot {
            if !self.policy.should_attempt(record) {
                summary.parked += 1;
                continue;
            }

            summary.attempted += 1;
            if self.attempt(record).await {
                summary.delivered += 1;
                if let Err(e) = self.store.remove(record.id()).await {
                    // 配送済みなので次回もう一度送られる（at-least-once）
                    warn!(record_id = %record.id(), error = %e, "delivered record could not be removed");
                }
            } else {
                summary.failed += 1;
                let retry_count = record.retry_count().saturating_add(1);
                if let Err(e) = self.store.update_retry_count(record.id(), retry_count).await {
                    warn!(record_id = %record.id(), error = %e, "could not record retry count");
                }
            }
        }

        info!(
            attempted = summary.attempted,
            delivered = summary.delivered,
            failed = summary.failed,
            parked = summary.parked,
            "drain pass finished"
        );
        Ok(DrainOutcome::Completed(summary))
    }

    /// One delivery attempt. `Ok(false)`, `Err` and panics all count as failure.
    async fn attempt(&self, record: &QueueRecord) -> bool {
        let result = AssertUnwindSafe(self.transport.deliver(record))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(DeliveryError::Panicked(panic_message(&*panic))));

        match result {
            Ok(true) => true,
            Ok(false) => {
                debug!(record_id = %record.id(), retry_count = record.retry_count(), "delivery refused");
                false
            }
            Err(e) => {
                warn!(record_id = %record.id(), error = %e, "delivery errored");
                false
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
