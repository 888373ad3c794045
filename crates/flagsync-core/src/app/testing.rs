//! Test doubles shared by the app tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{DeliveryError, QueueRecord};
use crate::ports::Transport;

type Respond = Box<dyn Fn(&Value) -> Result<bool, DeliveryError> + Send + Sync>;

/// Transport whose answer is decided per payload, with an optional delay.
/// Records `start:<id>` / `end:<id>` events using the payload's `id` field.
pub(crate) struct ScriptedTransport {
    respond: Respond,
    delay: Duration,
    calls: AtomicUsize,
    events: Mutex<Vec<String>>,
    successes: Mutex<Vec<Value>>,
}

impl ScriptedTransport {
    pub(crate) fn new<F>(respond: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, DeliveryError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
            successes: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn successful_payloads(&self) -> Vec<Value> {
        self.successes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn deliver(&self, record: &QueueRecord) -> Result<bool, DeliveryError> {
        let payload = record.payload();
        let id = payload["id"].as_str().unwrap_or("?").to_string();

        self.calls.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("start:{id}"));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = (self.respond)(payload);

        self.events.lock().unwrap().push(format!("end:{id}"));
        if matches!(result, Ok(true)) {
            self.successes.lock().unwrap().push(payload.clone());
        }
        result
    }
}
