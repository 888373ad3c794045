//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部環境（ストレージ、ネットワーク状態、配送先）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - QueueStore が source of truth（正本）
//! - ConnectivityMonitor はプラットフォームのネットワーク信号を抽象化
//! - Transport は呼び出し側が用意する配送手段（HTTP POST など）

pub mod clock;
pub mod connectivity;
pub mod id_generator;
pub mod queue_store;
pub mod transport;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::connectivity::{ConnectivityCallback, ConnectivityMonitor, Subscription};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::queue_store::QueueStore;
pub use self::transport::{FnTransport, Transport};
