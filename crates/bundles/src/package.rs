//! Bundle packaging collaborator.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use crate::error::BundleError;

/// Archive bytes ready for upload, plus the identifier the device files
/// them under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedBundle {
    pub uid: String,
    pub bytes: Vec<u8>,
}

/// Future returned by [`BundlePackager::package`].
pub type PackageFuture<'a> =
    Pin<Box<dyn Future<Output = Result<PackagedBundle, BundleError>> + Send + 'a>>;

/// Produces an installable archive for a bundle.
pub trait BundlePackager: Send + Sync {
    fn package(&self, bundle_path: &Path) -> PackageFuture<'_>;
}

/// Packages a bundle as a gzip tarball with the system `tar`.
///
/// The archive holds the bundle directory itself at its root; the
/// identifier is the bundle's directory name.
#[derive(Debug, Clone)]
pub struct TarPackager {
    program: PathBuf,
}

impl Default for TarPackager {
    fn default() -> Self {
        Self::new("tar")
    }
}

impl TarPackager {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, bundle_path: PathBuf) -> Result<PackagedBundle, BundleError> {
        let name = bundle_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BundleError::InvalidName(bundle_path.display().to_string()))?
            .to_string();
        let parent = bundle_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let output = tokio::process::Command::new(&self.program)
            .arg("-czf")
            .arg("-")
            .arg("-C")
            .arg(parent)
            .arg(&name)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BundleError::Packager(format!(
                "tar exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(BundleError::Packager("empty archive".into()));
        }

        tracing::debug!(bundle = %name, bytes = output.stdout.len(), "bundle packaged");
        Ok(PackagedBundle {
            uid: name,
            bytes: output.stdout,
        })
    }
}

impl BundlePackager for TarPackager {
    fn package(&self, bundle_path: &Path) -> PackageFuture<'_> {
        let bundle_path = bundle_path.to_path_buf();
        Box::pin(self.run(bundle_path))
    }
}
