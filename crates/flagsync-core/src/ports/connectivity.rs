//! ConnectivityMonitor port - ネットワーク状態の抽象化
//!
//! ブラウザの `navigator.onLine` / `online` イベントに相当するものを trait にして、
//! コアロジックを実ネットワークなしでテストできるようにします。
//!
//! # 実装
//! - **NetworkState**: 手動で切り替える状態（テスト・シミュレータ用）
//! - **TcpProbe**: TCP 接続で到達性を定期確認して NetworkState に反映

use std::sync::{Arc, Mutex};

/// Called with the new state on every online/offline transition.
pub type ConnectivityCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Current reachability plus transition notifications.
///
/// # 契約
/// - callback は遷移 1 回につき 1 回だけ呼ばれる（同じ状態の重複通知なし）
/// - 複数の購読者は購読順に呼ばれる
/// - panic した callback があっても後続の callback は呼ばれる
pub trait ConnectivityMonitor: Send + Sync {
    /// Best-effort local network signal, not a guarantee of end-to-end reachability.
    fn is_online(&self) -> bool;

    fn subscribe(&self, callback: ConnectivityCallback) -> Subscription;
}

/// Handle returned by [`ConnectivityMonitor::subscribe`].
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Deregister the callback. Repeat calls do nothing.
    pub fn unsubscribe(&self) {
        let cancel = self.cancel.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
