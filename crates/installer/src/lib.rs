//! Bundle installation on a remote device.
//!
//! # Flow
//!
//! 1. **Package**: the [`BundlePackager`](modsdk_bundles::BundlePackager)
//!    produces archive bytes and an identifier
//! 2. **Frame**: a single `package` file part is wrapped in a
//!    `multipart/form-data` body
//! 3. **Relay**: the body is POSTed to `{device}/sdk/install`
//! 4. **Normalize**: the device answer becomes an
//!    [`UploadEnvelope`](modsdk_protocol::UploadEnvelope)

mod error;
mod multipart;
mod uploader;

pub use error::InstallError;
pub use multipart::{MultipartBody, generate_boundary};
pub use uploader::{ArchiveUploader, DEFAULT_DEVICE, INSTALL_PATH, install_url};
