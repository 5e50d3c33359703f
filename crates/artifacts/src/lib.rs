//! Binary artifacts produced by the screenshot pipeline.
//!
//! - **Scratch**: short-lived `.png` paths handed to the renderer,
//!   released when the guard drops
//! - **Thumbnail**: bounded-size derivative of a rendered image
//! - **Publish**: slug naming and the icon/thumbnail file pair

mod error;
mod publish;
mod scratch;
mod thumbnail;

pub use error::ArtifactError;
pub use publish::{IconAsset, PublishError, publish_icons, slugify};
pub use scratch::{ScratchFile, TempArtifactStore};
pub use thumbnail::{ImageArtifact, ScaleDivisor, ThumbnailPolicy};

/// Default thumbnail bound on both axes.
pub const MAX_THUMB_SIZE: u32 = 64;
