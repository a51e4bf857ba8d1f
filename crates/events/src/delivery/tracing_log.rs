//! Structured-log delivery: writes each event as a `tracing` record.

use assetflow_core::events::{EventKind, WorkflowEvent};
use async_trait::async_trait;

use super::{DeliveryChannel, DeliveryError};

/// Writes audit and notification events to the log under the
/// `assetflow::audit` and `assetflow::notify` targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDelivery;

#[async_trait]
impl DeliveryChannel for TracingDelivery {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn deliver(&self, event: &WorkflowEvent) -> Result<(), DeliveryError> {
        let payload = serde_json::to_string(&event.payload)
            .map_err(|e| DeliveryError::Rejected(e.to_string()))?;
        match event.kind {
            EventKind::Audit => tracing::info!(
                target: "assetflow::audit",
                event_type = %event.event_type,
                actor_id = ?event.actor_id,
                subject_type = ?event.subject_type,
                subject_id = ?event.subject_id,
                %payload,
                "Audit event"
            ),
            EventKind::Notification => tracing::info!(
                target: "assetflow::notify",
                event_type = %event.event_type,
                actor_id = ?event.actor_id,
                subject_id = ?event.subject_id,
                %payload,
                "Notification event"
            ),
        }
        Ok(())
    }
}
