//! Install error types.

use modsdk_bundles::BundleError;

/// Errors produced while relaying a bundle to a device.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// The device could not be reached or did not answer in time.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The device answered with a non-200 status or an undecodable body.
    #[error("device rejected install ({status}): {body}")]
    RemoteRejection { status: u16, body: String },
}
