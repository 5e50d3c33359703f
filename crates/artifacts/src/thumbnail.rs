//! Rendered images and their bounded-size thumbnails.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, ImageReader};

use crate::MAX_THUMB_SIZE;
use crate::error::ArtifactError;

/// An encoded raster image with its pixel dimensions.
///
/// Never mutated; derivations produce new artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl ImageArtifact {
    /// Wraps encoded image bytes, reading dimensions from the header.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ArtifactError> {
        if bytes.is_empty() {
            return Err(ArtifactError::Empty("<memory>".into()));
        }
        let (width, height) = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(Self {
            bytes,
            width,
            height,
        })
    }

    /// Reads and validates an image file.
    pub async fn read(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = tokio::fs::read(path).await?;
        if bytes.is_empty() {
            return Err(ArtifactError::Empty(path.display().to_string()));
        }
        Self::from_bytes(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Which value divides the rescaled side when the other side is clamped.
///
/// `Original` uses the side's length before clamping, which preserves the
/// aspect ratio of the bounding box. `Updated` reproduces the legacy tool,
/// which divided by the already-clamped length and so left the other side
/// unchanged; the image is still fitted inside that box with its aspect
/// ratio intact, only the box differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleDivisor {
    #[default]
    Original,
    Updated,
}

/// Bounded-size thumbnail derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailPolicy {
    pub max_width: u32,
    pub max_height: u32,
    pub divisor: ScaleDivisor,
}

impl Default for ThumbnailPolicy {
    fn default() -> Self {
        Self {
            max_width: MAX_THUMB_SIZE,
            max_height: MAX_THUMB_SIZE,
            divisor: ScaleDivisor::default(),
        }
    }
}

impl ThumbnailPolicy {
    /// Computes the bounding box for an image of the given size.
    ///
    /// Width is clamped first, then height; divisions truncate and every
    /// side is at least one pixel.
    pub fn bounds(&self, width: u32, height: u32) -> (u32, u32) {
        let (mut w, mut h) = (u64::from(width), u64::from(height));
        let (max_w, max_h) = (u64::from(self.max_width), u64::from(self.max_height));

        if w > max_w {
            let before = w;
            w = max_w;
            h = h * max_w / self.divisor_for(before, w);
        }
        if h > max_h {
            let before = h;
            h = max_h;
            w = w * max_h / self.divisor_for(before, h);
        }

        (clamp_side(w), clamp_side(h))
    }

    fn divisor_for(&self, before: u64, after: u64) -> u64 {
        let d = match self.divisor {
            ScaleDivisor::Original => before,
            ScaleDivisor::Updated => after,
        };
        d.max(1)
    }

    /// Derives a PNG thumbnail that fits inside [`bounds`](Self::bounds).
    ///
    /// Images already inside the box are re-encoded without scaling.
    pub fn derive(&self, source: &ImageArtifact) -> Result<ImageArtifact, ArtifactError> {
        let img = image::load_from_memory(source.bytes())?;
        let (box_w, box_h) = self.bounds(img.width(), img.height());

        let thumb = if img.width() <= box_w && img.height() <= box_h {
            img
        } else {
            img.thumbnail(box_w, box_h)
        };

        let bytes = encode_png(&thumb)?;
        Ok(ImageArtifact {
            bytes,
            width: thumb.width(),
            height: thumb.height(),
        })
    }
}

fn clamp_side(v: u64) -> u32 {
    u32::try_from(v.max(1)).unwrap_or(u32::MAX)
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ArtifactError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| ArtifactError::Encode(e.to_string()))?;
    Ok(buf)
}
