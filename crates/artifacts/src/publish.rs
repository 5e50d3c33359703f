//! Icon asset naming and publication.
//!
//! A plugin's icon pair lives at `{basedir}/icon-{slug}.png` and
//! `{basedir}/thumb-{slug}.png`. Publishing overwrites existing files, so
//! re-capturing the same plugin never accumulates extra assets.

use std::path::{Path, PathBuf};

/// Errors produced while writing the icon pair.
///
/// Files are written icon first; a thumbnail failure leaves the icon in
/// place and is reported as partial publication.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to create icon directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write icon {path}: {source}")]
    Icon {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("icon written to {written} but thumbnail {path} failed: {source}")]
    Thumbnail {
        path: PathBuf,
        written: PathBuf,
        source: std::io::Error,
    },
}

impl PublishError {
    /// Returns `true` when some files were written before the failure.
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Thumbnail { .. })
    }
}

/// Where a plugin's icon pair is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconAsset {
    pub slug: String,
    pub basedir: PathBuf,
}

impl IconAsset {
    /// Names the asset pair for a plugin display name.
    pub fn new(display_name: &str, basedir: impl Into<PathBuf>) -> Self {
        Self {
            slug: slugify(display_name),
            basedir: basedir.into(),
        }
    }

    pub fn icon_path(&self) -> PathBuf {
        self.basedir.join(format!("icon-{}.png", self.slug))
    }

    pub fn thumb_path(&self) -> PathBuf {
        self.basedir.join(format!("thumb-{}.png", self.slug))
    }
}

/// Derives a filesystem-safe slug from a plugin display name.
///
/// Lower-cases, collapses each whitespace run into a single `-` and drops
/// every character outside `[a-z0-9-]`. Surrounding whitespace is ignored.
/// Names that differ only in dropped characters share a slug.
pub fn slugify(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let mut slug = String::with_capacity(lower.len());
    let mut in_space = false;

    for c in lower.chars() {
        if c.is_whitespace() {
            if !in_space {
                slug.push('-');
                in_space = true;
            }
            continue;
        }
        in_space = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            slug.push(c);
        }
    }

    slug
}

/// Writes the icon and thumbnail, creating the base directory if needed.
pub async fn publish_icons(
    asset: &IconAsset,
    icon: &[u8],
    thumbnail: &[u8],
) -> Result<(), PublishError> {
    ensure_dir(&asset.basedir).await?;

    let icon_path = asset.icon_path();
    tokio::fs::write(&icon_path, icon)
        .await
        .map_err(|source| PublishError::Icon {
            path: icon_path.clone(),
            source,
        })?;

    let thumb_path = asset.thumb_path();
    tokio::fs::write(&thumb_path, thumbnail)
        .await
        .map_err(|source| PublishError::Thumbnail {
            path: thumb_path.clone(),
            written: icon_path.clone(),
            source,
        })?;

    tracing::info!(
        icon = %icon_path.display(),
        thumbnail = %thumb_path.display(),
        "icon assets published"
    );
    Ok(())
}

async fn ensure_dir(path: &Path) -> Result<(), PublishError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| PublishError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_whitespace() {
        assert_eq!(slugify("My Reverb"), "my-reverb");
        assert_eq!(slugify("  My   Reverb  "), "my-reverb");
        assert_eq!(slugify("My\tReverb"), "my-reverb");
    }

    #[test]
    fn slug_strips_disallowed_characters() {
        assert_eq!(slugify("Delay (Stereo) v2!"), "delay-stereo-v2");
        assert_eq!(slugify("Über-Fuzz"), "ber-fuzz");
    }

    #[test]
    fn slug_collision_is_accepted() {
        assert_eq!(slugify("Drive+"), slugify("Drive"));
        assert_eq!(slugify("A.B"), slugify("AB"));
    }

    #[test]
    fn asset_paths() {
        let asset = IconAsset::new("Big Muff", "/bundles/muff.lv2/modgui");
        assert_eq!(
            asset.icon_path(),
            PathBuf::from("/bundles/muff.lv2/modgui/icon-big-muff.png")
        );
        assert_eq!(
            asset.thumb_path(),
            PathBuf::from("/bundles/muff.lv2/modgui/thumb-big-muff.png")
        );
    }

    #[tokio::test]
    async fn publish_creates_dir_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let asset = IconAsset::new("Chorus", tmp.path().join("modgui"));

        publish_icons(&asset, b"first-icon", b"first-thumb").await.unwrap();
        publish_icons(&asset, b"second-icon", b"second-thumb").await.unwrap();

        assert_eq!(std::fs::read(asset.icon_path()).unwrap(), b"second-icon");
        assert_eq!(std::fs::read(asset.thumb_path()).unwrap(), b"second-thumb");
        let count = std::fs::read_dir(&asset.basedir).unwrap().count();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn publish_reports_partial_write() {
        let tmp = tempfile::tempdir().unwrap();
        let asset = IconAsset::new("Phaser", tmp.path());
        // A directory squatting on the thumbnail path makes the second write fail.
        std::fs::create_dir(asset.thumb_path()).unwrap();

        let err = publish_icons(&asset, b"icon", b"thumb").await.unwrap_err();
        assert!(err.is_partial());
        assert_eq!(std::fs::read(asset.icon_path()).unwrap(), b"icon");
    }

    #[tokio::test]
    async fn publish_fails_when_basedir_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("modgui");
        std::fs::write(&file, b"").unwrap();
        let asset = IconAsset::new("Flanger", &file);

        let err = publish_icons(&asset, b"icon", b"thumb").await.unwrap_err();
        assert!(matches!(err, PublishError::CreateDir { .. }));
        assert!(!err.is_partial());
    }
}
