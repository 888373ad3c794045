//! NetworkState - 手動で切り替えるネットワーク状態
//!
//! プラットフォームのアダプタ（TcpProbe など）やテストが `set_online` を呼び、
//! 状態が実際に変わったときだけ購読者に通知します。
//!
//! 遷移（フラグの更新 + 通知）は 1 つずつ直列に処理されるので、購読者が最後に
//! 受け取った値は常に `is_online()` と一致します。callback の中から
//! `subscribe` / `unsubscribe` は呼べますが、`set_online` は呼べません。

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::ports::{ConnectivityCallback, ConnectivityMonitor, Subscription};

struct Inner {
    online: bool,
    next_subscriber: u64,
    subscribers: Vec<(u64, ConnectivityCallback)>,
}

/// Shared online/offline flag. Clones observe and drive the same state.
#[derive(Clone)]
pub struct NetworkState {
    inner: Arc<Mutex<Inner>>,
    /// Held for a whole flip-and-notify sequence.
    transitions: Arc<Mutex<()>>,
}

impl NetworkState {
    pub fn new(online: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                online,
                next_subscriber: 0,
                subscribers: Vec::new(),
            })),
            transitions: Arc::new(Mutex::new(())),
        }
    }

    /// Record the platform signal. Returns `true` when this was a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let _serial = self.transitions.lock().unwrap_or_else(|e| e.into_inner());

        let subscribers = {
            let mut inner = self.lock();
            if inner.online == online {
                return false;
            }
            inner.online = online;
            inner.subscribers.clone()
        };

        debug!(online, subscribers = subscribers.len(), "connectivity changed");
        // 状態ロックの外で呼ぶ（callback から subscribe / unsubscribe できるように）
        for (id, callback) in &subscribers {
            // 通知中に外れた購読者には送らない
            if !self.is_subscribed(*id) {
                continue;
            }
            if catch_unwind(AssertUnwindSafe(|| callback(online))).is_err() {
                warn!(subscriber = *id, online, "connectivity subscriber panicked");
            }
        }
        true
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.lock().subscribers.iter().any(|(sub_id, _)| *sub_id == id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for NetworkState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityMonitor for NetworkState {
    fn is_online(&self) -> bool {
        self.lock().online
    }

    fn subscribe(&self, callback: ConnectivityCallback) -> Subscription {
        let id = {
            let mut inner = self.lock();
            let id = inner.next_subscriber;
            inner.next_subscriber += 1;
            inner.subscribers.push((id, callback));
            id
        };

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
                inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
            }
        })
    }
}
