//! Event bus and delivery infrastructure for assetflow.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`; it is the workflow's [`EventSink`](assetflow_core::events::EventSink).
//! - [`EventDispatcher`]: background task that forwards every event to the
//!   configured [`DeliveryChannel`]s.
//! - [`delivery`]: the channels themselves.

pub mod bus;
pub mod delivery;
pub mod dispatcher;

pub use bus::EventBus;
pub use delivery::{DeliveryChannel, DeliveryError, TracingDelivery};
pub use dispatcher::EventDispatcher;
