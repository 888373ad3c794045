//! HttpTransport - HTTP POST による配送（feature = "http"）
//!
//! payload をそのまま JSON で POST します。レコード ID を `Idempotency-Key`
//! ヘッダーに載せるので、受信側は at-least-once の重複を弾けます。

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::{DeliveryError, QueueRecord};
use crate::ports::Transport;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
pub const KIND_HEADER: &str = "X-Record-Kind";

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Other(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, record: &QueueRecord) -> Result<bool, DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(IDEMPOTENCY_HEADER, record.id().to_string())
            .header(KIND_HEADER, record.kind().as_str())
            .json(record.payload())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                debug!(record_id = %record.id(), status = %resp.status(), "record delivered");
                Ok(true)
            }
            Ok(resp) => {
                warn!(
                    record_id = %record.id(),
                    status = %resp.status(),
                    endpoint = %self.endpoint,
                    "endpoint rejected record"
                );
                Ok(false)
            }
            Err(e) => {
                warn!(
                    record_id = %record.id(),
                    endpoint = %self.endpoint,
                    error = %e,
                    "record delivery failed"
                );
                Ok(false)
            }
        }
    }
}
