//! Transport port - 配送手段
//!
//! Drainer が 1 レコードずつ呼び出す配送関数です。
//!
//! # 契約
//! - 想定内の失敗（ネットワーク断、4xx/5xx）は `Ok(false)` を返す
//! - `Err` や panic は想定外の失敗として扱われ、drain は継続する

use std::future::Future;

use async_trait::async_trait;

use crate::domain::{DeliveryError, QueueRecord};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `record.payload()` verbatim. `Ok(true)` means the far side has it.
    async fn deliver(&self, record: &QueueRecord) -> Result<bool, DeliveryError>;
}

/// Adapts an async closure into a [`Transport`].
///
/// ```ignore
/// let transport = FnTransport::new(|record: QueueRecord| async move {
///     Ok(post(record.payload()).await.is_ok())
/// });
/// ```
pub struct FnTransport<F> {
    f: F,
}

impl<F> FnTransport<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(QueueRecord) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, DeliveryError>> + Send,
{
    async fn deliver(&self, record: &QueueRecord) -> Result<bool, DeliveryError> {
        (self.f)(record.clone()).await
    }
}
