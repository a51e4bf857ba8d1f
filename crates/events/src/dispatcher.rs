//! Background task forwarding bus events to delivery channels.
//!
//! [`EventDispatcher`] subscribes to the [`EventBus`](crate::EventBus) and
//! hands every event to each channel that accepts it. Retryable failures are
//! retried with exponential backoff; the loop exits when the bus is dropped.

use std::sync::Arc;
use std::time::Duration;

use assetflow_core::events::WorkflowEvent;
use tokio::sync::broadcast;

use crate::delivery::{DeliveryChannel, DeliveryError};

/// Default retry delays (exponential backoff: 1s, 2s, 4s).
const DEFAULT_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

pub struct EventDispatcher {
    channels: Vec<Arc<dyn DeliveryChannel>>,
    retry_delays: Vec<Duration>,
}

impl EventDispatcher {
    pub fn new(channels: Vec<Arc<dyn DeliveryChannel>>) -> Self {
        Self {
            channels,
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
        }
    }

    /// Override the backoff schedule. An empty schedule disables retries.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Run the dispatch loop until the channel closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<WorkflowEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.dispatch(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event dispatcher lagged, some events were not delivered"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, dispatcher shutting down");
                    break;
                }
            }
        }
    }

    async fn dispatch(&self, event: &WorkflowEvent) {
        for channel in self.channels.iter().filter(|c| c.accepts(event)) {
            if let Err(e) = self.deliver_with_retry(channel.as_ref(), event).await {
                tracing::error!(
                    channel = channel.name(),
                    event_type = %event.event_type,
                    error = %e,
                    "Event delivery failed",
                );
            }
        }
    }

    async fn deliver_with_retry(
        &self,
        channel: &dyn DeliveryChannel,
        event: &WorkflowEvent,
    ) -> Result<(), DeliveryError> {
        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match channel.deliver(event).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        channel = channel.name(),
                        error = %e,
                        "Delivery attempt failed, retrying",
                    );
                    tokio::time::sleep(*delay).await;
                }
                Err(e) => return Err(e),
            }
        }
        // Final attempt after the last backoff.
        channel.deliver(event).await
    }
}
