//! SyncOrchestrator - 接続イベントと drain パスの接着剤
//!
//! # UI から見える契約
//! - `queue_depth()`: 未配送バッジ用
//! - `trigger_manual_sync()`: 「今すぐ同期」ボタン
//! - `is_online()` / `subscribe()`: 接続状態の表示
//!
//! offline → online の遷移ごとに drain パスを 1 回バックグラウンドで起動します。

use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::QueueDrainer;
use crate::domain::errors::QueueResult;
use crate::domain::{DrainOutcome, DrainSummary, RecordId, RecordKind, SyncError, SyncStatus};
use crate::ports::{Clock, ConnectivityCallback, ConnectivityMonitor, QueueStore, Subscription};

#[derive(Debug, Default, Clone, Copy)]
struct LastSync {
    synced_at: Option<DateTime<Utc>>,
    summary: Option<DrainSummary>,
}

struct Inner {
    store: Arc<dyn QueueStore>,
    monitor: Arc<dyn ConnectivityMonitor>,
    drainer: Arc<QueueDrainer>,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    last: Mutex<LastSync>,
}

impl Inner {
    async fn run_pass(&self) -> QueueResult<DrainOutcome> {
        let outcome = self.drainer.try_drain().await?;
        if let DrainOutcome::Completed(summary) = outcome {
            let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
            last.summary = Some(summary);
            // parked が残っていれば同期済みとは言えない
            if summary.is_clean() {
                last.synced_at = Some(self.clock.now());
            }
        }
        Ok(outcome)
    }

    fn spawn_pass(self: &Arc<Self>, reason: &'static str) {
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            debug!(reason, "background drain triggered");
            if let Err(e) = inner.run_pass().await {
                warn!(reason, error = %e, "could not read queue; background drain skipped");
            }
        });
    }
}

/// Wires a monitor, a store and a drainer together.
///
/// Built with [`super::SyncAppBuilder`]. Dropping it unsubscribes from the monitor.
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
    subscription: Subscription,
}

impl SyncOrchestrator {
    /// Must be called inside a tokio runtime (see `SyncAppBuilder::build`).
    pub(crate) fn start(
        store: Arc<dyn QueueStore>,
        monitor: Arc<dyn ConnectivityMonitor>,
        drainer: Arc<QueueDrainer>,
        clock: Arc<dyn Clock>,
        runtime: Handle,
    ) -> Self {
        let inner = Arc::new(Inner {
            store,
            monitor: Arc::clone(&monitor),
            drainer,
            clock,
            runtime,
            last: Mutex::new(LastSync::default()),
        });

        // monitor -> callback -> inner の循環を避けるため Weak で持つ
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let on_change: ConnectivityCallback = Arc::new(move |online: bool| {
            if !online {
                info!("went offline; records will queue locally");
                return;
            }
            if let Some(inner) = weak.upgrade() {
                info!("back online; draining queue");
                inner.spawn_pass("reconnect");
            }
        });
        let subscription = monitor.subscribe(on_change);

        Self {
            inner,
            subscription,
        }
    }

    pub fn is_online(&self) -> bool {
        self.inner.monitor.is_online()
    }

    /// Subscribe to online/offline transitions (for a connection indicator).
    pub fn subscribe(&self, callback: ConnectivityCallback) -> Subscription {
        self.inner.monitor.subscribe(callback)
    }

    /// Current number of undelivered records, read straight from the store.
    pub async fn queue_depth(&self) -> QueueResult<usize> {
        self.inner.store.count().await
    }

    /// Write-through producer path: persist first, then drain in the
    /// background if we believe we are online.
    pub async fn record(
        &self,
        kind: RecordKind,
        payload: serde_json::Value,
    ) -> QueueResult<RecordId> {
        let id = self.inner.store.enqueue(kind, payload).await?;
        if self.is_online() {
            self.inner.spawn_pass("write-through");
        }
        Ok(id)
    }

    /// "Sync now". Refuses while offline without touching the transport;
    /// an unreadable queue surfaces as [`SyncError::Storage`].
    pub async fn trigger_manual_sync(&self) -> Result<DrainOutcome, SyncError> {
        if !self.is_online() {
            return Err(SyncError::Offline);
        }
        Ok(self.inner.run_pass().await?)
    }

    pub async fn status(&self) -> QueueResult<SyncStatus> {
        let queue_depth = self.inner.store.count().await?;
        let last = *self.inner.last.lock().unwrap_or_else(|e| e.into_inner());
        Ok(SyncStatus {
            online: self.is_online(),
            queue_depth,
            state: self.inner.drainer.state(),
            last_synced_at: last.synced_at,
            last_summary: last.summary,
        })
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.inner.store
    }

    pub fn drainer(&self) -> &Arc<QueueDrainer> {
        &self.inner.drainer
    }

    /// Stop reacting to connectivity changes. Idempotent.
    pub fn shutdown(&self) {
        self.subscription.unsubscribe();
    }
}

impl Drop for SyncOrchestrator {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::SyncAppBuilder;
    use crate::app::testing::ScriptedTransport;
    use crate::app::RetryPolicy;
    use crate::domain::{DrainState, QueueError, QueueRecord};
    use crate::impls::{InMemoryQueueStore, NetworkState};
    use crate::ports::FixedClock;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn penalty(id: &str) -> Value {
        json!({"id": id, "code": "FST", "player": "12"})
    }

    fn build(
        store: Arc<InMemoryQueueStore>,
        network: &NetworkState,
        transport: Arc<ScriptedTransport>,
    ) -> SyncOrchestrator {
        SyncAppBuilder::new()
            .store(store)
            .monitor(Arc::new(network.clone()))
            .transport(transport)
            .build()
            .unwrap()
    }

    async fn wait_for_depth(orchestrator: &SyncOrchestrator, depth: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while orchestrator.queue_depth().await.unwrap() != depth {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("queue depth did not converge");
    }

    #[tokio::test]
    async fn reconnect_drains_queue() {
        let store = Arc::new(InMemoryQueueStore::new());
        let network = NetworkState::new(false);
        let transport = Arc::new(ScriptedTransport::new(|_| Ok(true)));
        let orchestrator = build(store, &network, transport.clone());

        orchestrator
            .record(RecordKind::penalty(), penalty("p1"))
            .await
            .unwrap();
        assert_eq!(orchestrator.queue_depth().await.unwrap(), 1);
        assert_eq!(transport.call_count(), 0);

        network.set_online(true);
        wait_for_depth(&orchestrator, 0).await;

        assert_eq!(transport.successful_payloads(), vec![penalty("p1")]);
    }

    #[tokio::test]
    async fn manual_sync_while_offline_is_refused() {
        let store = Arc::new(InMemoryQueueStore::new());
        let network = NetworkState::new(false);
        let transport = Arc::new(ScriptedTransport::new(|_| Ok(true)));
        let orchestrator = build(store, &network, transport.clone());
        orchestrator
            .record(RecordKind::penalty(), penalty("p1"))
            .await
            .unwrap();

        let err = orchestrator.trigger_manual_sync().await.unwrap_err();

        assert!(matches!(err, SyncError::Offline));
        assert_eq!(transport.call_count(), 0);
        assert_eq!(orchestrator.queue_depth().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn manual_sync_reports_partial_failure() {
        let store = Arc::new(InMemoryQueueStore::new());
        store
            .enqueue(RecordKind::penalty(), penalty("p1"))
            .await
            .unwrap();
        store
            .enqueue(RecordKind::penalty(), penalty("p2"))
            .await
            .unwrap();
        let network = NetworkState::new(true);
        let transport = Arc::new(ScriptedTransport::new(|p| Ok(p["id"] == "p2")));
        let orchestrator = build(store.clone(), &network, transport);

        let outcome = orchestrator.trigger_manual_sync().await.unwrap();

        let summary = outcome.summary().unwrap();
        assert_eq!((summary.delivered, summary.failed), (1, 1));
        assert_eq!(orchestrator.queue_depth().await.unwrap(), 1);
        let left = store.list().await.unwrap();
        assert_eq!(left[0].payload(), &penalty("p1"));
        assert_eq!(left[0].retry_count(), 1);

        let status = orchestrator.status().await.unwrap();
        assert!(status.last_synced_at.is_none());
        assert_eq!(status.last_summary, Some(*summary));
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_manual_syncs_deliver_each_record_once() {
        let store = Arc::new(InMemoryQueueStore::new());
        for id in ["p1", "p2", "p3"] {
            store.enqueue(RecordKind::penalty(), penalty(id)).await.unwrap();
        }
        let network = NetworkState::new(true);
        let transport = Arc::new(
            ScriptedTransport::new(|_| Ok(true)).with_delay(Duration::from_millis(500)),
        );
        let orchestrator = build(store, &network, transport.clone());

        let (first, second) = tokio::join!(
            orchestrator.trigger_manual_sync(),
            orchestrator.trigger_manual_sync()
        );

        assert_eq!(transport.call_count(), 3);
        assert!(matches!(first.unwrap(), DrainOutcome::Completed(s) if s.delivered == 3));
        assert_eq!(second.unwrap(), DrainOutcome::AlreadyRunning);
        assert_eq!(orchestrator.queue_depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn status_tracks_last_clean_sync() {
        let at = Utc.with_ymd_and_hms(2024, 10, 12, 19, 5, 0).unwrap();
        let store = Arc::new(InMemoryQueueStore::new());
        let network = NetworkState::new(true);
        let transport = Arc::new(ScriptedTransport::new(|_| Ok(true)));
        let orchestrator = SyncAppBuilder::new()
            .store(store.clone())
            .monitor(Arc::new(network.clone()))
            .transport(transport)
            .clock(Arc::new(FixedClock::new(at)))
            .build()
            .unwrap();
        store
            .enqueue(RecordKind::penalty(), penalty("p1"))
            .await
            .unwrap();

        orchestrator.trigger_manual_sync().await.unwrap();
        let status = orchestrator.status().await.unwrap();

        assert!(status.online);
        assert_eq!(status.queue_depth, 0);
        assert_eq!(status.state, DrainState::Idle);
        assert_eq!(status.last_synced_at, Some(at));
    }

    #[tokio::test]
    async fn record_propagates_storage_failure() {
        let store = Arc::new(InMemoryQueueStore::new().with_capacity(0));
        let network = NetworkState::new(false);
        let transport = Arc::new(ScriptedTransport::new(|_| Ok(true)));
        let orchestrator = build(store, &network, transport);

        let err = orchestrator
            .record(RecordKind::penalty(), penalty("p1"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::StorageFailure { .. }));
    }

    #[tokio::test]
    async fn shutdown_stops_reconnect_drains() {
        let store = Arc::new(InMemoryQueueStore::new());
        let network = NetworkState::new(false);
        let transport = Arc::new(ScriptedTransport::new(|_| Ok(true)));
        let orchestrator = build(store, &network, transport.clone());
        orchestrator
            .record(RecordKind::penalty(), penalty("p1"))
            .await
            .unwrap();

        orchestrator.shutdown();
        orchestrator.shutdown();
        network.set_online(true);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(transport.call_count(), 0);
        assert_eq!(network.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn ui_subscribers_see_transitions() {
        let store = Arc::new(InMemoryQueueStore::new());
        let network = NetworkState::new(true);
        let transport = Arc::new(ScriptedTransport::new(|_| Ok(true)));
        let orchestrator = build(store, &network, transport);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = orchestrator.subscribe(Arc::new({
            let seen = Arc::clone(&seen);
            move |online: bool| seen.lock().unwrap().push(online)
        }));

        network.set_online(false);
        network.set_online(false);
        network.set_online(true);

        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
        assert!(orchestrator.is_online());
    }

    #[tokio::test]
    async fn parked_records_do_not_count_as_synced() {
        let at = Utc.with_ymd_and_hms(2024, 10, 12, 19, 5, 0).unwrap();
        let store = Arc::new(InMemoryQueueStore::new());
        let network = NetworkState::new(true);
        let transport = Arc::new(ScriptedTransport::new(|_| Ok(false)));
        let orchestrator = SyncAppBuilder::new()
            .store(store.clone())
            .monitor(Arc::new(network.clone()))
            .transport(transport.clone())
            .retry_policy(RetryPolicy::capped(1))
            .clock(Arc::new(FixedClock::new(at)))
            .build()
            .unwrap();
        store
            .enqueue(RecordKind::penalty(), penalty("p1"))
            .await
            .unwrap();

        orchestrator.trigger_manual_sync().await.unwrap();
        let second = orchestrator.trigger_manual_sync().await.unwrap();

        let summary = *second.summary().unwrap();
        assert_eq!(summary.parked, 1);
        assert_eq!(summary.failed, 0);
        let status = orchestrator.status().await.unwrap();
        assert_eq!(status.queue_depth, 1);
        assert!(status.last_synced_at.is_none());
        assert_eq!(transport.call_count(), 1);
    }

    /// Store whose snapshot can never be read.
    struct UnreadableStore;

    #[async_trait]
    impl QueueStore for UnreadableStore {
        async fn enqueue(&self, _kind: RecordKind, _payload: Value) -> QueueResult<RecordId> {
            Err(QueueError::storage("read-only"))
        }

        async fn count(&self) -> QueueResult<usize> {
            Ok(0)
        }

        async fn list(&self) -> QueueResult<Vec<QueueRecord>> {
            Err(QueueError::storage("queue file unreadable"))
        }

        async fn get(&self, _id: RecordId) -> QueueResult<Option<QueueRecord>> {
            Ok(None)
        }

        async fn remove(&self, _id: RecordId) -> QueueResult<()> {
            Ok(())
        }

        async fn update_retry_count(&self, _id: RecordId, _retry_count: u32) -> QueueResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn manual_sync_surfaces_unreadable_queue() {
        let network = NetworkState::new(true);
        let transport = Arc::new(ScriptedTransport::new(|_| Ok(true)));
        let orchestrator = SyncAppBuilder::new()
            .store(Arc::new(UnreadableStore))
            .monitor(Arc::new(network.clone()))
            .transport(transport.clone())
            .build()
            .unwrap();

        let err = orchestrator.trigger_manual_sync().await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::Storage(QueueError::StorageFailure { .. })
        ));
        assert_eq!(transport.call_count(), 0);
        assert_eq!(orchestrator.drainer().state(), DrainState::Idle);
    }
}
