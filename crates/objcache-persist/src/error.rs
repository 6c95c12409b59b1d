//! Error types for codec and persistence operations.

use thiserror::Error;

/// Why a record's text could not be decoded into a table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The text is not well-formed JSON.
    #[error("malformed record: {0}")]
    Syntax(String),

    /// The top-level value is not a JSON object.
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// A key is not a valid object identifier.
    #[error("invalid object id {key:?}: {reason}")]
    InvalidObjectId { key: String, reason: String },

    /// A value is not an integer in `0..=u32::MAX`.
    #[error("invalid checksum for {key}: {value}")]
    InvalidChecksum { key: String, value: String },

    /// The stored bytes are not UTF-8 text.
    #[error("record is not valid UTF-8")]
    NotUtf8,
}

/// Errors that can occur while reading or writing durable records.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The region name cannot be used to build a record key.
    #[error("invalid region name {region:?}: {reason}")]
    InvalidRegion { region: String, reason: String },

    /// The record exists but does not decode.
    #[error("corrupt record {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: CodecError,
    },

    /// The record could not be written.
    #[error("failed to write record {key}: {reason}")]
    WriteFailure { key: String, reason: String },

    /// The storage backend is unusable (e.g. a poisoned lock).
    #[error("record store unavailable: {0}")]
    Backend(String),

    /// I/O error from the filesystem backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for persistence operations.
pub type PersistResult<T> = std::result::Result<T, PersistError>;
