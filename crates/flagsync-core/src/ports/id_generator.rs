//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: 単調増加 ULID（本番用・テスト用共通）

use std::sync::Mutex;
use std::time::SystemTime;

use ulid::{Generator, Ulid};

use crate::domain::RecordId;
use crate::ports::Clock;

/// IdGenerator はレコード ID を生成
///
/// # 要件
/// - 二度と同じ ID を返さない
/// - 生成順 = ソート順（enqueue 順と一致）
pub trait IdGenerator: Send + Sync {
    fn generate_record_id(&self) -> RecordId;
}

/// UlidGenerator は Clock の時刻を使う単調 ULID 生成器
///
/// 同一ミリ秒内や時計が戻った場合は、前回の ULID をインクリメントします。
/// これにより FixedClock でも ID は一意かつ昇順になります。
pub struct UlidGenerator<C> {
    clock: C,
    generator: Mutex<Generator>,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            generator: Mutex::new(Generator::new()),
        }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_record_id(&self) -> RecordId {
        let now = SystemTime::from(self.clock.now());
        let mut generator = self.generator.lock().unwrap_or_else(|e| e.into_inner());
        match generator.generate_from_datetime(now) {
            Ok(ulid) => RecordId::from_ulid(ulid),
            // 80-bit のランダム部分を使い切った場合のみ（実質起きない）
            Err(_) => {
                let next_ms = self.clock.now().timestamp_millis() as u64 + 1;
                RecordId::from_ulid(Ulid::from_parts(next_ms, rand::random()))
            }
        }
    }
}
