//! TcpProbe - TCP 接続による到達性チェック
//!
//! ブラウザの `online` / `offline` イベントの代わりに、一定間隔で
//! 配送先ホストへ TCP 接続を試み、その結果を NetworkState に反映します。

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::NetworkState;

#[derive(Debug, Clone)]
pub struct TcpProbe {
    target: String,
    interval: Duration,
    timeout: Duration,
}

impl TcpProbe {
    /// `target` is a `host:port` string.
    pub fn new(target: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            interval,
            timeout,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// One reachability check.
    pub async fn check(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.target)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!(probe_target = %self.target, error = %e, "probe connect failed");
                false
            }
            Err(_) => {
                debug!(probe_target = %self.target, "probe timed out");
                false
            }
        }
    }

    /// Run the probe in the background, feeding results into `network`.
    pub fn spawn(self, network: NetworkState) -> ProbeHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            info!(
                probe_target = %self.target,
                interval_ms = self.interval.as_millis() as u64,
                "connectivity probe started"
            );
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }

                let online = self.check().await;
                network.set_online(online);

                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
            debug!(probe_target = %self.target, "connectivity probe stopped");
        });

        ProbeHandle { shutdown_tx, join }
    }
}

/// Handle to a running probe.
/// - `shutdown_tx` を drop するとループも止まる
pub struct ProbeHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ProbeHandle {
    pub fn request_shutdown(&self) {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}
