//! Bundle error types.

/// Errors produced while locating, describing or packaging bundles.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid bundle name: {0}")]
    InvalidName(String),

    #[error("bundle not found: {0}")]
    NotFound(String),

    #[error("effect not found in bundle: {0}")]
    UnknownEffect(String),

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error("packaging failed: {0}")]
    Packager(String),

    #[error("{0} timed out")]
    Timeout(&'static str),
}
