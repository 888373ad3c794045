//! App - アプリケーション層
//!
//! ports を組み合わせてオフライン同期を実装します。
//!
//! # 主要コンポーネント
//! - **SyncAppBuilder**: コンポーネントの構築とワイヤリング
//! - **QueueDrainer**: 1 パスの配送ループ（snapshot → deliver → remove / retry）
//! - **SyncOrchestrator**: 接続イベントと drain の接着、UI 向け操作
//! - **RetryPolicy**: 任意の retry 上限（上限到達は park、削除しない）

pub mod builder;
pub mod drainer;
pub mod orchestrator;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, SyncAppBuilder};
pub use self::drainer::QueueDrainer;
pub use self::orchestrator::SyncOrchestrator;
pub use self::retry::RetryPolicy;
