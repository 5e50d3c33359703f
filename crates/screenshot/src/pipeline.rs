//! Capture orchestration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use modsdk_artifacts::{
    ArtifactError, IconAsset, ImageArtifact, TempArtifactStore, ThumbnailPolicy, publish_icons,
};
use modsdk_bundles::{EffectInfo, MetadataSource, Workspace};
use modsdk_process_watch::{ProcessCompletionWatcher, ProcessOutcome};
use modsdk_protocol::{CaptureEnvelope, RenderRequest};

use crate::error::CaptureError;
use crate::renderer::{Renderer, RendererConfig};

/// Icon directory inside a bundle when metadata has no override.
pub const DEFAULT_ICON_DIR: &str = "modgui";

/// Everything a capture produced.
#[derive(Debug, Clone)]
pub struct CapturedIcon {
    pub asset: IconAsset,
    pub icon: ImageArtifact,
    pub thumbnail: ImageArtifact,
}

/// Pipeline wiring.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub renderer: RendererConfig,
    pub workspace: Workspace,
    pub scratch: TempArtifactStore,
    pub thumbnails: ThumbnailPolicy,
    /// Upper bound on a single renderer run.
    pub render_timeout: Duration,
}

/// Captures plugin GUI screenshots and publishes them as icon assets.
pub struct ScreenshotPipeline {
    renderer: Renderer,
    workspace: Workspace,
    scratch: TempArtifactStore,
    thumbnails: ThumbnailPolicy,
    render_timeout: Duration,
    watcher: Arc<ProcessCompletionWatcher>,
    metadata: Arc<dyn MetadataSource>,
}

impl ScreenshotPipeline {
    pub fn new(
        config: PipelineConfig,
        watcher: Arc<ProcessCompletionWatcher>,
        metadata: Arc<dyn MetadataSource>,
    ) -> Self {
        Self {
            renderer: Renderer::new(config.renderer),
            workspace: config.workspace,
            scratch: config.scratch,
            thumbnails: config.thumbnails,
            render_timeout: config.render_timeout,
            watcher,
            metadata,
        }
    }

    /// Runs a capture and folds every outcome into an envelope.
    pub async fn capture(&self, req: &RenderRequest) -> CaptureEnvelope {
        tracing::info!(bundle = %req.bundle, effect = %req.effect, "capturing screenshot");

        match self.try_capture(req).await {
            Ok(captured) => {
                tracing::info!(
                    bundle = %req.bundle,
                    slug = %captured.asset.slug,
                    "screenshot captured"
                );
                CaptureEnvelope::success(captured.icon.bytes(), captured.thumbnail.bytes())
            }
            Err(CaptureError::Publish { source, captured }) => {
                tracing::warn!(
                    bundle = %req.bundle,
                    partial = source.is_partial(),
                    error = %source,
                    "icon publication failed"
                );
                CaptureEnvelope::partial(
                    captured.icon.bytes(),
                    captured.thumbnail.bytes(),
                    format!("publish failed: {source}"),
                )
            }
            Err(e) => {
                tracing::warn!(bundle = %req.bundle, effect = %req.effect, error = %e, "capture failed");
                CaptureEnvelope::failure(e.to_string())
            }
        }
    }

    /// Runs a capture, returning the typed failure.
    pub async fn try_capture(&self, req: &RenderRequest) -> Result<CapturedIcon, CaptureError> {
        req.validate()?;
        let bundle_path = self.workspace.bundle_path(&req.bundle)?;

        let icon = self.render(req).await?;
        let thumbnail = self.derive_thumbnail(&icon).await?;

        let description = self.metadata.describe(&bundle_path).await?;
        let effect = EffectInfo::from_description(&description, &req.effect)?;
        let basedir = icon_basedir(&bundle_path, effect.icon_basedir);
        let asset = IconAsset::new(&effect.name, basedir);

        let captured = CapturedIcon {
            asset,
            icon,
            thumbnail,
        };
        match publish_icons(
            &captured.asset,
            captured.icon.bytes(),
            captured.thumbnail.bytes(),
        )
        .await
        {
            Ok(()) => Ok(captured),
            Err(source) => Err(CaptureError::Publish {
                source,
                captured: Box::new(captured),
            }),
        }
    }

    /// Spawns the renderer, waits for it and reads its output.
    ///
    /// The scratch file is removed on every path out of this function. The
    /// guard rides with the watcher registration, so a capture abandoned
    /// mid-render still removes the file once the renderer has ended.
    async fn render(&self, req: &RenderRequest) -> Result<ImageArtifact, CaptureError> {
        let scratch = self.scratch.allocate();
        let output = scratch.path().to_path_buf();

        let child = self
            .renderer
            .spawn(req, &output)
            .map_err(|e| CaptureError::Render(format!("failed to spawn renderer: {e}")))?;

        let (completion, scratch) = self
            .watcher
            .wait_with(child, &output, self.render_timeout, scratch)
            .await
            .map_err(|e| CaptureError::Render(e.to_string()))?;

        match completion.outcome {
            ProcessOutcome::Exited(status) if status.success() => {}
            ProcessOutcome::Exited(status) => {
                return Err(CaptureError::Render(format!("renderer exited with {status}")));
            }
            ProcessOutcome::TimedOut => {
                return Err(CaptureError::Render(format!(
                    "renderer timed out after {}s",
                    self.render_timeout.as_secs_f32()
                )));
            }
            ProcessOutcome::Cancelled => {
                return Err(CaptureError::Render("renderer cancelled by shutdown".into()));
            }
            ProcessOutcome::WaitFailed(e) => {
                return Err(CaptureError::Render(format!("failed to wait for renderer: {e}")));
            }
        }

        let read = ImageArtifact::read(scratch.path()).await;
        if let Err(e) = scratch.release() {
            tracing::warn!(error = %e, "failed to release scratch file");
        }

        read.map_err(|e| match e {
            ArtifactError::Decode(e) => CaptureError::Decode(e.to_string()),
            other => CaptureError::Render(format!("renderer output unreadable: {other}")),
        })
    }

    /// Decoding and scaling run on the blocking pool.
    async fn derive_thumbnail(&self, icon: &ImageArtifact) -> Result<ImageArtifact, CaptureError> {
        let policy = self.thumbnails;
        let source = icon.clone();
        tokio::task::spawn_blocking(move || policy.derive(&source))
            .await
            .map_err(|e| CaptureError::Decode(format!("thumbnail task failed: {e}")))?
            .map_err(|e| CaptureError::Decode(e.to_string()))
    }
}

/// Resolves the icon directory: the metadata override (relative paths are
/// taken from the bundle) or `{bundle}/modgui`.
fn icon_basedir(bundle_path: &Path, override_dir: Option<PathBuf>) -> PathBuf {
    match override_dir {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => bundle_path.join(dir),
        None => bundle_path.join(DEFAULT_ICON_DIR),
    }
}
