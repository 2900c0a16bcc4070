//! Persistence core for a rental-listing application.
//!
//! Two subsystems: `models` supplies the entity base (identity, timestamps,
//! document serialization) and the concrete rental-domain schemas; `storage`
//! supplies the database-backed engine that stages entity changes in a
//! session and commits them transactionally. Application code constructs an
//! entity, then saves or deletes it through an explicitly passed
//! [`DbStorage`] handle.

pub mod configuration;
pub mod error_handling;
pub mod models;
pub mod storage;

pub use configuration::config::DbConfig;
pub use models::base::{Base, Entity};
pub use models::registry::{AnyEntity, EntityKind};
pub use storage::db_storage::DbStorage;
