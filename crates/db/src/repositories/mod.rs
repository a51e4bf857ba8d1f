//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Writes that must be atomic open
//! their own transaction; `*_in` helpers join a caller's transaction.

pub mod asset_repo;
pub mod audit_repo;
pub mod directory_repo;
pub mod location_repo;
pub mod movement_repo;
pub mod notification_repo;
pub mod sequence_repo;

pub use asset_repo::AssetRepo;
pub use audit_repo::AuditRepo;
pub use directory_repo::DirectoryRepo;
pub use location_repo::LocationRepo;
pub use movement_repo::MovementRepo;
pub use notification_repo::NotificationRepo;
pub use sequence_repo::SequenceRepo;

/// Transaction handle passed to `*_in` helpers.
pub type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;
