//! HTTP surface and service wiring.
//!
//! | Path | Description |
//! |------|-------------|
//! | `GET /bundles` | Bundle names in the workspace |
//! | `GET /effects/{bundle}` | Bundle description (404 if not a bundle) |
//! | `GET /config/get` | Settings blob |
//! | `POST /config/set` | Replace the settings blob |
//! | `GET /screenshot` | Capture a plugin GUI, publish its icons |
//! | `GET /install/{bundle}` | Relay a packaged bundle to the device |
//! | `GET /`, `GET /icon.html` | `index.html` / `icon.html` with the default template filled in |
//! | anything else | Static files from `html_dir` |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use modsdk_artifacts::TempArtifactStore;
use modsdk_bundles::{
    BundleError, CommandMetadataSource, MetadataSource, TarPackager, Workspace,
};
use modsdk_installer::ArchiveUploader;
use modsdk_process_watch::{ProcessCompletionWatcher, WatcherConfig};
use modsdk_protocol::{CaptureEnvelope, RenderRequest, UploadEnvelope};
use modsdk_screenshot::{PipelineConfig, RendererConfig, ScreenshotPipeline};
use serde_json::Value;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::pages::{PageError, Pages};
use crate::settings::Settings;

/// Shared state passed to all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub workspace: Workspace,
    pub settings: Settings,
    pub pages: Pages,
    pub metadata: Arc<dyn MetadataSource>,
    pub pipeline: Arc<ScreenshotPipeline>,
    pub uploader: Arc<ArchiveUploader>,
}

impl AppState {
    /// Builds the services described by `config`.
    pub fn from_config(
        config: &Config,
        watcher: Arc<ProcessCompletionWatcher>,
    ) -> anyhow::Result<Self> {
        let workspace = Workspace::new(&config.workspace);
        let metadata: Arc<dyn MetadataSource> = Arc::new(
            CommandMetadataSource::new(&config.metadata_command, config.metadata_args.clone())
                .with_timeout(config.render_timeout()),
        );
        let scratch = match &config.scratch_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                TempArtifactStore::new(dir)
            }
            None => TempArtifactStore::system(),
        };

        let pipeline = ScreenshotPipeline::new(
            PipelineConfig {
                renderer: RendererConfig {
                    program: config.renderer.clone(),
                    script: config.screenshot_script.clone(),
                    page_url: config.icon_page_url(),
                },
                workspace: workspace.clone(),
                scratch,
                thumbnails: config.thumbnail_policy(),
                render_timeout: config.render_timeout(),
            },
            watcher,
            Arc::clone(&metadata),
        );
        let uploader = ArchiveUploader::new(
            workspace.clone(),
            Arc::new(TarPackager::default()),
            config.upload_timeout(),
        )?;

        Ok(Self {
            workspace,
            settings: Settings::new(&config.settings_file),
            pages: Pages::new(&config.html_dir, config.default_template_path()),
            metadata,
            pipeline: Arc::new(pipeline),
            uploader: Arc::new(uploader),
        })
    }
}

/// Builds the router; static files are served from `html_dir`.
pub fn router(state: AppState, html_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/bundles", get(list_bundles))
        .route("/effects/{bundle}", get(describe_bundle))
        .route("/config/get", get(get_settings))
        .route("/config/set", post(set_settings))
        .route("/screenshot", get(screenshot))
        .route("/install/{bundle}", get(install))
        .route("/install/{bundle}/", get(install))
        .route("/", get(index_page))
        .route("/icon.html", get(icon_page))
        .fallback_service(ServeDir::new(html_dir))
        .with_state(state)
}

/// Runs the server until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let watcher = ProcessCompletionWatcher::spawn(
        &tokio::runtime::Handle::current(),
        WatcherConfig {
            default_timeout: config.render_timeout(),
        },
    );
    let state = AppState::from_config(&config, Arc::clone(&watcher))?;
    let app = router(state, &config.html_dir);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        workspace = %config.workspace.display(),
        "development server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                return;
            }
            tracing::info!("SIGINT received, shutting down");
        })
        .await?;

    tracing::info!(in_flight = watcher.in_flight(), "stopping renderer watcher");
    watcher.shutdown();
    Ok(())
}

/// Handler failure rendered as a plain-text status response.
#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn internal(e: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl From<BundleError> for HttpError {
    fn from(e: BundleError) -> Self {
        let status = match &e {
            BundleError::NotFound(_) | BundleError::InvalidName(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<PageError> for HttpError {
    fn from(e: PageError) -> Self {
        let status = match &e {
            PageError::NotFound(_) => StatusCode::NOT_FOUND,
            PageError::Read { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        }
        (self.status, self.message).into_response()
    }
}

async fn index_page(State(state): State<AppState>) -> Result<Html<String>, HttpError> {
    Ok(Html(state.pages.render("index.html").await?))
}

async fn icon_page(State(state): State<AppState>) -> Result<Html<String>, HttpError> {
    Ok(Html(state.pages.render("icon.html").await?))
}

async fn list_bundles(State(state): State<AppState>) -> Result<Json<Vec<String>>, HttpError> {
    Ok(Json(state.workspace.list_bundles().await?))
}

async fn describe_bundle(
    State(state): State<AppState>,
    Path(bundle): Path<String>,
) -> Result<Json<Value>, HttpError> {
    let path = state.workspace.bundle_path(&bundle)?;
    Ok(Json(state.metadata.describe(&path).await?))
}

async fn get_settings(State(state): State<AppState>) -> Json<Value> {
    Json(state.settings.read().await)
}

async fn set_settings(
    State(state): State<AppState>,
    Json(value): Json<Value>,
) -> Result<Json<bool>, HttpError> {
    state.settings.write(&value).await.map_err(HttpError::internal)?;
    Ok(Json(true))
}

async fn screenshot(
    State(state): State<AppState>,
    Query(req): Query<RenderRequest>,
) -> Json<CaptureEnvelope> {
    Json(state.pipeline.capture(&req).await)
}

async fn install(
    State(state): State<AppState>,
    Path(bundle): Path<String>,
) -> Json<UploadEnvelope> {
    let device = state.settings.device().await;
    tracing::info!(bundle = %bundle, device = ?device, "installing bundle");
    Json(state.uploader.install(&bundle, device.as_deref()).await)
}
