//! Error type shared by the audit model, schema, config and store

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// SQLite audit store
    #[error("Audit store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Config file or database folder access
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audit or history snapshot that does not (de)serialize
    #[error("Snapshot encoding error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown competitor id or history index
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected manual edit (e.g. a rating off its qualitative scale)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Cluster schema or provider field map out of step with the metric keys
    #[error("Schema inconsistency: {0}")]
    Schema(String),
}
