//! Error types for the finscan-core library.
//!
//! Field extraction never fails: a field that cannot be recovered is an
//! absent [`FieldResult`](crate::models::record::FieldResult). The errors
//! below are raised only by the alias store, the rename applier and
//! configuration handling.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the finscan library.
#[derive(Error, Debug)]
pub enum FinscanError {
    /// Alias store error.
    #[error("alias store error: {0}")]
    Store(#[from] StoreError),

    /// Rename error.
    #[error("rename error: {0}")]
    Rename(#[from] RenameError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by alias store loading, persistence and mutation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The persisted store exists but cannot be parsed or violates invariants.
    #[error("alias store {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The alias is already registered under a different canonical name.
    #[error("alias '{alias}' already maps to '{existing}'")]
    DuplicateAlias { alias: String, existing: String },

    /// The canonical name is not present in the store.
    #[error("unknown canonical name: {0}")]
    UnknownCanonical(String),

    /// Blank canonical or alias name.
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// Failed to read or write the backing file.
    #[error("alias store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize the store.
    #[error("failed to serialize alias store: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A shared store lock was poisoned by a panicking writer.
    #[error("alias store lock poisoned")]
    Poisoned,
}

/// Errors raised when applying a rename plan to the filesystem.
#[derive(Error, Debug)]
pub enum RenameError {
    /// The plan has no proposed name (missing data).
    #[error("nothing to apply for {0}: required fields are missing")]
    NothingToApply(PathBuf),

    /// The target already exists on disk.
    #[error("refusing to overwrite existing file {0}")]
    TargetExists(PathBuf),

    /// Underlying filesystem error.
    #[error("failed to rename {from} -> {to}: {source}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for the finscan library.
pub type Result<T> = std::result::Result<T, FinscanError>;
