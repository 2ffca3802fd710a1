//! Outbound messaging plugins.
//!
//! Every configured messaging adapter receives each message. Delivery is
//! best effort: a failing adapter is logged and the rest still run.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::registry::{Adapter, AdapterRegistry};
use crate::{EngineError, Result};

pub const LOG_MESSAGING_KEY: &str = "opensase.messaging.log";
pub const NATS_MESSAGING_KEY: &str = "opensase.messaging.nats";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    pub subject: String,
    pub payload: Value,
}

impl Message {
    pub fn new(subject: impl Into<String>, payload: impl Serialize) -> Result<Self> {
        Ok(Self { subject: subject.into(), payload: serde_json::to_value(payload)? })
    }
}

#[async_trait]
pub trait MessagingAdapter: Adapter {
    fn configuration_error(&self) -> Option<EngineError> {
        None
    }

    async fn send(&self, message: &Message) -> Result<()>;
}

/// Writes messages to the log. Always available.
pub struct LogMessaging;

impl Adapter for LogMessaging {
    fn key(&self) -> &str { LOG_MESSAGING_KEY }
    fn label(&self) -> &str { "Log" }
    fn version(&self) -> &str { "1.0.0" }
}

#[async_trait]
impl MessagingAdapter for LogMessaging {
    async fn send(&self, message: &Message) -> Result<()> {
        info!(subject = %message.subject, payload = %message.payload, "message");
        Ok(())
    }
}

/// Publishes JSON messages to NATS. Connects on first use.
pub struct NatsMessaging {
    url: Option<String>,
    client: OnceCell<async_nats::Client>,
}

impl NatsMessaging {
    pub fn new(url: Option<String>) -> Self {
        Self { url, client: OnceCell::new() }
    }

    async fn client(&self) -> Result<&async_nats::Client> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| EngineError::configuration(NATS_MESSAGING_KEY, "NATS_URL is not set"))?;
        self.client
            .get_or_try_init(|| async {
                async_nats::connect(url)
                    .await
                    .map_err(|e| EngineError::execution(NATS_MESSAGING_KEY, format!("connect to {url}: {e}")))
            })
            .await
    }
}

impl Adapter for NatsMessaging {
    fn key(&self) -> &str { NATS_MESSAGING_KEY }
    fn label(&self) -> &str { "NATS" }
    fn version(&self) -> &str { "1.0.0" }
    fn order_index(&self) -> i32 { 10 }
}

#[async_trait]
impl MessagingAdapter for NatsMessaging {
    fn configuration_error(&self) -> Option<EngineError> {
        self.url.is_none().then(|| EngineError::configuration(self.key(), "NATS_URL is not set"))
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let payload = serde_json::to_vec(&message.payload)?;
        self.client()
            .await?
            .publish(message.subject.clone(), payload.into())
            .await
            .map_err(|e| EngineError::execution(self.key(), e.to_string()))
    }
}

/// Sends `message` through every configured adapter; returns how many accepted it.
pub async fn dispatch(registry: &AdapterRegistry<dyn MessagingAdapter>, message: &Message) -> usize {
    let mut delivered = 0;
    for adapter in registry.list() {
        if let Some(e) = adapter.configuration_error() {
            warn!(adapter = adapter.key(), error = %e, "messaging adapter not configured, skipping");
            continue;
        }
        match adapter.send(message).await {
            Ok(()) => delivered += 1,
            Err(e) => error!(adapter = adapter.key(), subject = %message.subject, error = %e, "message not sent"),
        }
    }
    delivered
}
