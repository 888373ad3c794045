//! SyncAppBuilder - コンポーネントの構築とワイヤリング
//!
//! グローバルなシングルトンは使わず、store / monitor / transport を明示的に渡します。
//! テストでは InMemoryQueueStore と NetworkState に差し替えられます。

use std::sync::Arc;

use tokio::runtime::Handle;

use super::{QueueDrainer, RetryPolicy, SyncOrchestrator};
use crate::config::SyncConfig;
use crate::ports::{Clock, ConnectivityMonitor, QueueStore, SystemClock, Transport};

/// # 使用例
/// ```ignore
/// let orchestrator = SyncAppBuilder::new()
///     .store(Arc::new(JsonFileQueueStore::open(".flagsync", "rmac.penalties").await?))
///     .monitor(Arc::new(NetworkState::new(false)))
///     .transport(Arc::new(HttpTransport::new(endpoint, timeout)?))
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - 必須コンポーネントが欠けていれば build() が BuildError を返す
/// - tokio runtime の外で build() しても BuildError（reconnect 時の spawn 先がない）
pub struct SyncAppBuilder {
    store: Option<Arc<dyn QueueStore>>,
    monitor: Option<Arc<dyn ConnectivityMonitor>>,
    transport: Option<Arc<dyn Transport>>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

/// BuildError はワイヤリング時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing component: {0}")]
    MissingComponent(&'static str),

    #[error("the sync orchestrator must be built inside a tokio runtime")]
    NoRuntime,
}

impl SyncAppBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            monitor: None,
            transport: None,
            policy: RetryPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Take the retry cap from config.
    pub fn config(mut self, config: &SyncConfig) -> Self {
        self.policy = RetryPolicy::from_config(config);
        self
    }

    pub fn store(mut self, store: Arc<dyn QueueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn monitor(mut self, monitor: Arc<dyn ConnectivityMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<SyncOrchestrator, BuildError> {
        let store = self.store.ok_or(BuildError::MissingComponent("store"))?;
        let monitor = self.monitor.ok_or(BuildError::MissingComponent("monitor"))?;
        let transport = self
            .transport
            .ok_or(BuildError::MissingComponent("transport"))?;
        let runtime = Handle::try_current().map_err(|_| BuildError::NoRuntime)?;

        let drainer =
            Arc::new(QueueDrainer::new(Arc::clone(&store), transport).with_policy(self.policy));
        Ok(SyncOrchestrator::start(
            store, monitor, drainer, self.clock, runtime,
        ))
    }
}

impl Default for SyncAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}
