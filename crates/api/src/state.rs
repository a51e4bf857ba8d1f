use std::sync::Arc;

use assetflow_core::movement::MovementWorkflow;
use assetflow_core::store::InventoryStore;
use assetflow_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for every domain operation.
    pub store: Arc<dyn InventoryStore>,
    pub workflow: Arc<MovementWorkflow>,
    /// Receives every workflow event; handlers pass it to core calls as the sink.
    pub event_bus: Arc<EventBus>,
    pub config: Arc<ServerConfig>,
    /// Database pool when running on PostgreSQL; `None` for the in-memory store.
    pub pool: Option<assetflow_db::DbPool>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        event_bus: Arc<EventBus>,
        config: ServerConfig,
    ) -> Self {
        let workflow = Arc::new(MovementWorkflow::new(store.clone(), event_bus.clone()));
        Self {
            store,
            workflow,
            event_bus,
            config: Arc::new(config),
            pool: None,
        }
    }

    pub fn with_pool(mut self, pool: assetflow_db::DbPool) -> Self {
        self.pool = Some(pool);
        self
    }
}
