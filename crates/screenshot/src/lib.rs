//! Plugin GUI screenshot pipeline.
//!
//! # Pipeline
//!
//! 1. **Render**: spawn the headless renderer against the icon page,
//!    writing into a scratch file
//! 2. **Wait**: completion is detected by the shared process watcher
//! 3. **Read**: load the scratch image, then delete the scratch file
//! 4. **Thumbnail**: derive the bounded-size thumbnail
//! 5. **Publish**: write `icon-{slug}.png` and `thumb-{slug}.png`

mod error;
mod pipeline;
mod renderer;

pub use error::CaptureError;
pub use pipeline::{CapturedIcon, DEFAULT_ICON_DIR, PipelineConfig, ScreenshotPipeline};
pub use renderer::{Renderer, RendererConfig};
