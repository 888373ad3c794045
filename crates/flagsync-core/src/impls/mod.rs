//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryQueueStore**: テスト用のキュー
//! - **JsonFileQueueStore**: ファイルに永続化するキュー
//! - **NetworkState**: 手動で切り替えるネットワーク状態
//! - **TcpProbe**: TCP 接続で到達性を確認して NetworkState を更新
//! - **HttpTransport**: HTTP POST による配送（feature = "http"）

mod ledger;

pub mod file_store;
pub mod memory_store;
pub mod network_state;
pub mod tcp_probe;

#[cfg(feature = "http")]
pub mod http_transport;

// 主要な型を再エクスポート
pub use self::file_store::JsonFileQueueStore;
pub use self::memory_store::InMemoryQueueStore;
pub use self::network_state::NetworkState;
pub use self::tcp_probe::{ProbeHandle, TcpProbe};

#[cfg(feature = "http")]
pub use self::http_transport::HttpTransport;
