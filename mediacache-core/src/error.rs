//! Error types for media resolution

use thiserror::Error;

/// Search index errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    /// An index file vanished, typically on a load-balanced file store while
    /// the index is being rebuilt.
    #[error("Index file not found: {reason}")]
    IndexFileNotFound { reason: String },

    /// The index reader was closed, typically while the process shuts down.
    #[error("Index already closed: {reason}")]
    IndexClosed { reason: String },

    #[error("Search query failed: {reason}")]
    QueryFailed { reason: String },
}

impl SearchError {
    /// Whether the error is expected under normal operation and should be
    /// answered by falling back to another backend.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::IndexFileNotFound { .. } | Self::IndexClosed { .. }
        )
    }
}

/// Media repository errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Errors raised while building a canonical value map.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("{source_kind} has no usable identity")]
    MissingIdentity { source_kind: &'static str },

    /// A search row without any recognizable node id field. This points at
    /// an index schema mismatch, not at missing data.
    #[error("Failed to extract node id from search result")]
    MissingNodeId,

    #[error("Malformed legacy media xml: {reason}")]
    MalformedXml { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for media resolution.
#[derive(Debug, Clone, Error)]
pub enum MediaCacheError {
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Operation not supported by the media cache: {operation}")]
    Unsupported { operation: &'static str },
}

/// Result type alias for media resolution.
pub type MediaResult<T> = Result<T, MediaCacheError>;

// =============================================================================
// TESTS
// =============================================================================
