//! Delivery channels for workflow events.
//!
//! A channel receives every event the [`EventDispatcher`](crate::EventDispatcher)
//! forwards and decides whether it cares via [`DeliveryChannel::accepts`].
//! Outbound email and other external transports plug in here.

mod tracing_log;

use assetflow_core::events::WorkflowEvent;
use async_trait::async_trait;

pub use tracing_log::TracingDelivery;

/// Failure reported by a delivery channel.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The channel could not reach its destination; worth retrying.
    #[error("Delivery unavailable: {0}")]
    Unavailable(String),

    /// The event cannot be delivered by this channel at all.
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

impl DeliveryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::Unavailable(_))
    }
}

#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether this channel wants `event`. Defaults to everything.
    fn accepts(&self, _event: &WorkflowEvent) -> bool {
        true
    }

    async fn deliver(&self, event: &WorkflowEvent) -> Result<(), DeliveryError>;
}
