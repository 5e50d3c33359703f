//! Request and result envelope types shared by the development server,
//! the screenshot pipeline and the bundle installer.
//!
//! Envelopes are the uniform JSON shapes returned to the browser UI:
//! every request resolves to exactly one envelope, success or failure.

pub mod envelope;
pub mod types;

pub use envelope::{CaptureEnvelope, UploadEnvelope};
pub use types::{RenderRequest, RequestError};
