//! Capture error types.

use modsdk_artifacts::PublishError;
use modsdk_bundles::BundleError;
use modsdk_protocol::RequestError;

use crate::pipeline::CapturedIcon;

/// Errors produced by a screenshot capture.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),

    #[error("render failed: {0}")]
    Render(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    /// Images were produced but publishing them failed, possibly after
    /// some files were written.
    #[error("publish failed: {source}")]
    Publish {
        source: PublishError,
        captured: Box<CapturedIcon>,
    },
}
