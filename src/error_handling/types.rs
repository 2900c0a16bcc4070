use std::fmt;

use sea_orm::DbErr;

#[derive(Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar(name) => write!(f, "Missing environment variable: {}", name),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug)]
pub enum StorageError {
    ConnectionFailed(DbErr),
    SchemaFailed(DbErr),
    QueryFailed(DbErr),
    CommitFailed(DbErr),
    CorruptRecord(String),
    NotPersisted(String),
    SessionClosed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed(e) => write!(f, "Storage connection failed: {}", e),
            StorageError::SchemaFailed(e) => write!(f, "Schema statement failed: {}", e),
            StorageError::QueryFailed(e) => write!(f, "Storage query failed: {}", e),
            StorageError::CommitFailed(e) => write!(f, "Commit failed, batch rolled back: {}", e),
            StorageError::CorruptRecord(e) => write!(f, "Corrupt stored record: {}", e),
            StorageError::NotPersisted(key) => write!(f, "Cannot delete {}: not persisted", key),
            StorageError::SessionClosed => write!(f, "No active session, call reload first"),
        }
    }
}

impl std::error::Error for StorageError {}
