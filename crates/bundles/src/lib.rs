//! Plugin bundles on disk.
//!
//! A bundle is a directory under the workspace that contains a
//! `manifest.ttl`. This crate enumerates bundles and defines the two
//! collaborators the pipelines consume:
//!
//! - [`MetadataSource`]: opaque JSON description of a bundle's plugins
//! - [`BundlePackager`]: archive bytes plus a package identifier

mod error;
mod metadata;
mod package;
mod workspace;

pub use error::BundleError;
pub use metadata::{CommandMetadataSource, DescribeFuture, EffectInfo, MetadataSource};
pub use package::{BundlePackager, PackageFuture, PackagedBundle, TarPackager};
pub use workspace::{MANIFEST_FILE, Workspace};
