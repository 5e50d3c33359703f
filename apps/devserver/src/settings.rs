//! Front-end settings blob.
//!
//! The editor stores arbitrary JSON here; the server itself only reads the
//! `device` key when relaying installs.

use std::path::{Path, PathBuf};

use serde_json::Value;

/// Key holding the device address.
pub const DEVICE_KEY: &str = "device";

/// JSON document persisted at a fixed path.
#[derive(Debug, Clone)]
pub struct Settings {
    path: PathBuf,
}

impl Settings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current blob; `{}` when the file is missing or not valid JSON.
    pub async fn read(&self) -> Value {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "failed to read settings");
                }
                return empty();
            }
        };
        serde_json::from_slice(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "settings are not valid JSON");
            empty()
        })
    }

    /// Replaces the blob.
    pub async fn write(&self, value: &Value) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec(value)?;
        tokio::fs::write(&self.path, content).await?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    /// Configured device address, if it is set to a string.
    pub async fn device(&self) -> Option<String> {
        match self.read().await.get(DEVICE_KEY) {
            Some(Value::String(addr)) => Some(addr.clone()),
            _ => None,
        }
    }
}

fn empty() -> Value {
    Value::Object(serde_json::Map::new())
}
