//! Error types for the lookup core
//!
//! Every fallible core operation returns one of these typed errors. None of
//! them is retried internally; the presentation layer decides how to show them.

use std::path::PathBuf;

use thiserror::Error;

/// Credential did not match either configured secret
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Incorrect password")]
    Incorrect,
}

/// Rejected admin upload. The previously authoritative table is untouched.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Only admin sessions may replace the dataset")]
    Forbidden,

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Expected at least 3 columns, found {found}")]
    TooFewColumns { found: usize },

    #[error("Could not parse uploaded file: {0}")]
    ParseFailure(String),

    #[error("Shared store is not enabled in this deployment")]
    NotPersisted,

    #[error("Failed to write shared store: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Failure to produce a table from durable storage.
///
/// Cloneable so it can be carried inside a resolution outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Bundled default file not found: {}", path.display())]
    MissingBundledDefault { path: PathBuf },

    #[error("Unreadable table at {location}: {reason}")]
    Unreadable { location: String, reason: String },
}

/// Write-side failures of the persisted store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Invalid deployment configuration, detected at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must not be empty")]
    EmptySecret { name: &'static str },

    #[error("Persisted ingest mode requires a persisted store path")]
    MissingPersistedPath,

    #[error("Preview row count must be at least 1")]
    ZeroPreviewRows,

    #[error("Unknown ingest mode '{0}' (expected 'session' or 'shared')")]
    UnknownIngestMode(String),
}

/// Umbrella error for callers that handle every core failure in one place
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, LookupError>;
