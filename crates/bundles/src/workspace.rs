//! Bundle enumeration under the workspace root.

use std::path::{Path, PathBuf};

use crate::error::BundleError;

/// File that marks a directory as a bundle.
pub const MANIFEST_FILE: &str = "manifest.ttl";

/// The directory holding the bundles under development.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists bundle directory names, sorted.
    ///
    /// Entries without a manifest are skipped.
    pub async fn list_bundles(&self) -> Result<Vec<String>, BundleError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut bundles = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.join(MANIFEST_FILE).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                bundles.push(name.to_string());
            }
        }

        bundles.sort();
        Ok(bundles)
    }

    /// Resolves a bundle name to its directory.
    ///
    /// Rejects names that could escape the workspace and directories
    /// without a manifest.
    pub fn bundle_path(&self, name: &str) -> Result<PathBuf, BundleError> {
        validate_name(name)?;
        let path = self.root.join(name);
        if !path.join(MANIFEST_FILE).is_file() {
            return Err(BundleError::NotFound(name.to_string()));
        }
        Ok(path)
    }
}

fn validate_name(name: &str) -> Result<(), BundleError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(BundleError::InvalidName(name.to_string()));
    }
    Ok(())
}
