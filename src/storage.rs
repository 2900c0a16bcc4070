//! Storage subsystem
//!
//! Components:
//! - `db_storage`: the database-backed storage engine and its session.
//! - `db_entities`: SeaORM entity models and row conversions.

pub mod db_entities;
pub mod db_storage;
