//! Plugin metadata collaborator.
//!
//! The description of a bundle is produced by an external extractor and
//! treated as opaque JSON; only the fields the screenshot pipeline needs
//! are read from it (see [`EffectInfo`]).

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;

use crate::error::BundleError;

/// Future returned by [`MetadataSource::describe`].
pub type DescribeFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, BundleError>> + Send + 'a>>;

/// Produces the JSON description of a bundle.
pub trait MetadataSource: Send + Sync {
    fn describe(&self, bundle_path: &Path) -> DescribeFuture<'_>;
}

/// The parts of an effect's description used for icon publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectInfo {
    /// Human-readable plugin name.
    pub name: String,
    /// Icon directory override (`icon.basedir`), if the plugin sets one.
    pub icon_basedir: Option<PathBuf>,
}

impl EffectInfo {
    /// Looks up `plugins[effect]` in a bundle description.
    pub fn from_description(description: &Value, effect: &str) -> Result<Self, BundleError> {
        let plugin = description
            .get("plugins")
            .and_then(|p| p.get(effect))
            .ok_or_else(|| BundleError::UnknownEffect(effect.to_string()))?;

        let name = plugin
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| BundleError::Metadata(format!("plugin {effect} has no name")))?
            .to_string();

        let icon_basedir = plugin
            .get("icon")
            .and_then(|icon| icon.get("basedir"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(Self { name, icon_basedir })
    }
}

/// Runs an external extractor that prints the description on stdout.
///
/// The bundle path is appended as the last argument.
#[derive(Debug, Clone)]
pub struct CommandMetadataSource {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandMetadataSource {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, bundle_path: PathBuf) -> Result<Value, BundleError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(&bundle_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| BundleError::Timeout("metadata extractor"))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BundleError::Metadata(format!(
                "extractor exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let description = serde_json::from_slice(&output.stdout)?;
        tracing::debug!(bundle = %bundle_path.display(), "bundle described");
        Ok(description)
    }
}

impl MetadataSource for CommandMetadataSource {
    fn describe(&self, bundle_path: &Path) -> DescribeFuture<'_> {
        let bundle_path = bundle_path.to_path_buf();
        Box::pin(self.run(bundle_path))
    }
}
