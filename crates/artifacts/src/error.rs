//! Artifact error types.

/// Errors produced while reading or deriving image artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("empty image file: {0}")]
    Empty(String),

    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image encode failed: {0}")]
    Encode(String),
}
