//! Error types for capability registry and engine operations.
//!
//! Searching never fails; these errors only surface at the edges (loading a
//! registry, reading settings, refreshing a snapshot).

use thiserror::Error;
use tokio::task::JoinError;

/// Errors for capability registry and engine operations
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// IO error while reading a registry or settings file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tokio task join error
    #[error("Tokio task join error: {0}")]
    JoinError(#[from] JoinError),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML settings parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Two registry entries share the same id
    #[error("Duplicate capability id: {0}")]
    DuplicateId(String),

    /// A registry entry has an empty id
    #[error("Capability entry with empty id (name: {0})")]
    EmptyId(String),

    /// General error with message
    #[error("{0}")]
    General(String),
}
