pub mod assets;
pub mod locations;
pub mod movements;
pub mod notifications;
pub mod scope;
