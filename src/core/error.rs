//! Error types for core module
//!
//! Provides custom error types for client configuration and for the
//! persisted identity store.

use thiserror::Error;

/// Errors that can occur in the core module
#[derive(Error, Debug)]
pub enum CoreError {
    /// Config or identity file I/O error
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config or identity serialization/deserialization error
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Server endpoint could not be parsed as a URL
    #[error("Invalid server endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        source: url::ParseError,
    },

    /// Server endpoint uses a scheme other than ws/wss
    #[error("Unsupported endpoint scheme '{scheme}' (expected ws or wss)")]
    UnsupportedScheme { scheme: String },
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
