//! Domain core for the asset custody and movement service.
//!
//! Pure business logic: location and asset code allocation, access scope
//! resolution, and the movement workflow engine. Persistence is reached only
//! through the traits in [`store`]; events leave through [`events::EventSink`].

pub mod assets;
pub mod audit;
pub mod context;
pub mod error;
pub mod events;
pub mod location;
pub mod movement;
pub mod notification;
pub mod roles;
pub mod scope;
pub mod store;
pub mod types;
