//! flagsync-core
//!
//! Offline-durable write queue for penalty reports recorded at the field.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, record, drain, errors）
//! - **ports**: 抽象化レイヤー（QueueStore, ConnectivityMonitor, Transport, Clock, IdGenerator）
//! - **impls**: ports の実装（InMemoryQueueStore, JsonFileQueueStore, NetworkState, TcpProbe, HttpTransport）
//! - **app**: アプリケーションロジック（QueueDrainer, SyncOrchestrator, SyncAppBuilder）
//! - **config**: 設定ファイルの読み込み

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{QueueDrainer, RetryPolicy, SyncAppBuilder, SyncOrchestrator};
pub use config::SyncConfig;
pub use domain::{
    DrainOutcome, DrainState, DrainSummary, QueueError, QueueRecord, RecordId, RecordKind,
    SyncError, SyncStatus,
};
