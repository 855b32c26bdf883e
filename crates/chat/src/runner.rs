use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{ChatEnvelope, EventContext, EventDispatcher};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("update source failed to connect: {0}")]
    Connect(String),
    #[error("update read failed: {0}")]
    Receive(String),
    #[error("update acknowledge failed: {0}")]
    Acknowledge(String),
    #[error("update source disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Long-polling feed of chat updates. `Ok(None)` from `next_update` ends the stream.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_update(&self) -> Result<Option<ChatEnvelope>, TransportError>;
    /// Confirms receipt so the update is not redelivered.
    async fn acknowledge(&self, update_id: i64) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopUpdateSource;

#[async_trait]
impl UpdateSource for NoopUpdateSource {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_update(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _update_id: i64) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct PollingRunner {
    source: Arc<dyn UpdateSource>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
}

impl Default for PollingRunner {
    fn default() -> Self {
        Self {
            source: Arc::new(NoopUpdateSource),
            dispatcher: EventDispatcher::default(),
            reconnect_policy: ReconnectPolicy::default(),
        }
    }
}

impl PollingRunner {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { source, dispatcher, reconnect_policy }
    }

    /// Pumps updates until the source closes. Exhausted retries end the loop quietly.
    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        event_name = "ingress.chat.transport_failed",
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "update source failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "update source retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "connecting to chat update source");
        self.source.connect().await?;
        info!(attempt, "chat update source connected");

        loop {
            let Some(envelope) = self.source.next_update().await? else {
                info!(attempt, "chat update stream closed");
                self.source.disconnect().await?;
                return Ok(());
            };
            let context = EventContext::for_update(envelope.update_id);
            let user_id = envelope.event.user_id().map(|user| user.to_string());

            info!(
                event_name = "ingress.chat.update_received",
                update_id = envelope.update_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %context.correlation_id,
                user_id = user_id.as_deref().unwrap_or("unknown"),
                "received chat update"
            );

            if let Err(error) = self.source.acknowledge(envelope.update_id).await {
                warn!(
                    event_name = "ingress.chat.ack_sent",
                    update_id = envelope.update_id,
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "failed to acknowledge chat update"
                );
            } else {
                debug!(
                    event_name = "ingress.chat.ack_sent",
                    update_id = envelope.update_id,
                    correlation_id = %context.correlation_id,
                    "acknowledged chat update"
                );
            }

            if let Err(error) = self.dispatcher.dispatch(&envelope, &context).await {
                warn!(
                    update_id = envelope.update_id,
                    correlation_id = %context.correlation_id,
                    user_id = user_id.as_deref().unwrap_or("unknown"),
                    error = %error,
                    "event dispatch failed; continuing polling loop"
                );
            }
        }
    }
}
