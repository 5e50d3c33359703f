//! Device upload client.

use std::sync::Arc;
use std::time::Duration;

use modsdk_bundles::{BundlePackager, PackagedBundle, Workspace};
use modsdk_protocol::UploadEnvelope;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::error::InstallError;
use crate::multipart::MultipartBody;

/// Device address used when none is configured.
pub const DEFAULT_DEVICE: &str = "http://localhost:8888";

/// Install endpoint relative to the device address.
pub const INSTALL_PATH: &str = "/sdk/install";

/// Multipart field carrying the archive.
const PACKAGE_FIELD: &str = "package";

/// Builds the install endpoint for a configured device address.
///
/// Missing or blank addresses fall back to [`DEFAULT_DEVICE`]; a bare host
/// gets `http://` prepended and trailing slashes are dropped.
pub fn install_url(device: Option<&str>) -> String {
    let device = device
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DEVICE);

    let mut url = if device.starts_with("http://") || device.starts_with("https://") {
        device.to_string()
    } else {
        format!("http://{device}")
    };
    while url.ends_with('/') {
        url.pop();
    }
    url.push_str(INSTALL_PATH);
    url
}

/// Packages bundles and relays them to a device's install endpoint.
pub struct ArchiveUploader {
    http: reqwest::Client,
    workspace: Workspace,
    packager: Arc<dyn BundlePackager>,
}

impl ArchiveUploader {
    /// Creates an uploader whose requests are bounded by `timeout`.
    pub fn new(
        workspace: Workspace,
        packager: Arc<dyn BundlePackager>,
        timeout: Duration,
    ) -> Result<Self, InstallError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            workspace,
            packager,
        })
    }

    /// Installs `bundle` on `device`, folding every outcome into an envelope.
    pub async fn install(&self, bundle: &str, device: Option<&str>) -> UploadEnvelope {
        match self.try_install(bundle, device).await {
            Ok(result) => UploadEnvelope::success(result),
            Err(InstallError::RemoteRejection { status, body }) => {
                tracing::warn!(bundle, status, "device rejected install");
                UploadEnvelope::failure(body)
            }
            Err(e) => {
                tracing::warn!(bundle, error = %e, "install failed");
                UploadEnvelope::failure(e.to_string())
            }
        }
    }

    /// Installs `bundle` on `device`, returning the device's decoded answer.
    pub async fn try_install(
        &self,
        bundle: &str,
        device: Option<&str>,
    ) -> Result<Value, InstallError> {
        let bundle_path = self.workspace.bundle_path(bundle)?;
        let package = self.packager.package(&bundle_path).await?;
        tracing::info!(
            bundle,
            uid = %package.uid,
            size = package.bytes.len(),
            "bundle packaged"
        );
        self.upload(&package, device).await
    }

    /// POSTs an already packaged bundle.
    pub async fn upload(
        &self,
        package: &PackagedBundle,
        device: Option<&str>,
    ) -> Result<Value, InstallError> {
        let url = install_url(device);
        let filename = format!("{}.tgz", package.uid);
        let body = MultipartBody::single_file(PACKAGE_FIELD, &filename, &package.bytes);

        tracing::debug!(url = %url, len = body.len(), "uploading package");

        let resp = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, body.content_type())
            .body(body.into_bytes())
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status != StatusCode::OK {
            return Err(InstallError::RemoteRejection {
                status: status.as_u16(),
                body: text,
            });
        }

        match serde_json::from_str(&text) {
            Ok(value) => {
                tracing::info!(url = %url, uid = %package.uid, "device accepted package");
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(error = %e, "device answer is not JSON");
                Err(InstallError::RemoteRejection {
                    status: status.as_u16(),
                    body: text,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use axum::Router;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode as HttpStatus};
    use axum::routing::post;
    use modsdk_bundles::{BundleError, MANIFEST_FILE, PackageFuture};

    use super::*;

    #[test]
    fn url_default_device() {
        assert_eq!(install_url(None), "http://localhost:8888/sdk/install");
        assert_eq!(install_url(Some("")), "http://localhost:8888/sdk/install");
        assert_eq!(install_url(Some("   ")), "http://localhost:8888/sdk/install");
    }

    #[test]
    fn url_bare_host_gets_scheme() {
        assert_eq!(
            install_url(Some("device.local")),
            "http://device.local/sdk/install"
        );
        assert_eq!(
            install_url(Some("192.168.51.1:8080")),
            "http://192.168.51.1:8080/sdk/install"
        );
    }

    #[test]
    fn url_keeps_existing_scheme() {
        assert_eq!(
            install_url(Some("https://device.local")),
            "https://device.local/sdk/install"
        );
        assert_eq!(
            install_url(Some("http://device.local:8888")),
            "http://device.local:8888/sdk/install"
        );
    }

    #[test]
    fn url_strips_trailing_slashes() {
        assert_eq!(
            install_url(Some("http://device.local//")),
            "http://device.local/sdk/install"
        );
        assert_eq!(install_url(Some("device.local/")), "http://device.local/sdk/install");
    }

    /// Packager double returning fixed bytes and recording its input.
    struct StaticPackager {
        seen: Mutex<Vec<PathBuf>>,
    }

    impl StaticPackager {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl BundlePackager for StaticPackager {
        fn package(&self, bundle_path: &Path) -> PackageFuture<'_> {
            self.seen.lock().unwrap().push(bundle_path.to_path_buf());
            Box::pin(async {
                Ok::<_, BundleError>(PackagedBundle {
                    uid: "reverb".into(),
                    bytes: b"\x1f\x8barchive".to_vec(),
                })
            })
        }
    }

    #[derive(Debug, Default)]
    struct Received {
        content_type: String,
        content_length: String,
        body: Vec<u8>,
    }

    type DeviceState = (Arc<Mutex<Option<Received>>>, HttpStatus, &'static str, Duration);

    async fn install_handler(
        State((seen, status, reply, delay)): State<DeviceState>,
        headers: HeaderMap,
        body: Bytes,
    ) -> (HttpStatus, &'static str) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        *seen.lock().unwrap() = Some(Received {
            content_type: header("content-type"),
            content_length: header("content-length"),
            body: body.to_vec(),
        });
        tokio::time::sleep(delay).await;
        (status, reply)
    }

    /// Starts a fake device; returns its bare `host:port` address.
    async fn mock_device(
        status: HttpStatus,
        reply: &'static str,
        delay: Duration,
    ) -> (String, Arc<Mutex<Option<Received>>>) {
        let seen = Arc::new(Mutex::new(None));
        let app = Router::new()
            .route("/sdk/install", post(install_handler))
            .with_state((seen.clone(), status, reply, delay));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr.to_string(), seen)
    }

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("reverb.lv2");
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(bundle.join(MANIFEST_FILE), b"").unwrap();
        let ws = Workspace::new(tmp.path());
        (tmp, ws)
    }

    fn uploader(ws: Workspace, timeout: Duration) -> (ArchiveUploader, Arc<StaticPackager>) {
        let packager = Arc::new(StaticPackager::new());
        let up = ArchiveUploader::new(ws, packager.clone(), timeout).unwrap();
        (up, packager)
    }

    #[tokio::test]
    async fn accepted_install_returns_decoded_answer() {
        let (_tmp, ws) = workspace();
        let (up, packager) = uploader(ws, Duration::from_secs(5));
        let (addr, _) = mock_device(HttpStatus::OK, "42", Duration::ZERO).await;

        let env = up.install("reverb.lv2", Some(&addr)).await;
        assert_eq!(env, UploadEnvelope::success(serde_json::json!(42)));

        let seen = packager.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].ends_with("reverb.lv2"));
    }

    #[tokio::test]
    async fn request_is_single_file_multipart() {
        let (_tmp, ws) = workspace();
        let (up, _) = uploader(ws, Duration::from_secs(5));
        let (addr, seen) = mock_device(HttpStatus::OK, "true", Duration::ZERO).await;

        up.try_install("reverb.lv2", Some(&addr)).await.unwrap();

        let received = seen.lock().unwrap().take().unwrap();
        let boundary = received
            .content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap()
            .to_string();
        assert_eq!(boundary.len(), 32);
        assert_eq!(received.content_length, received.body.len().to_string());

        let expected = MultipartBody::with_boundary(
            boundary,
            "package",
            "reverb.tgz",
            b"\x1f\x8barchive",
        );
        assert_eq!(received.body, expected.into_bytes());
    }

    #[tokio::test]
    async fn error_status_is_rejection_with_raw_body() {
        let (_tmp, ws) = workspace();
        let (up, _) = uploader(ws, Duration::from_secs(5));
        let (addr, _) = mock_device(HttpStatus::INTERNAL_SERVER_ERROR, "boom", Duration::ZERO).await;

        let env = up.install("reverb.lv2", Some(&addr)).await;
        assert_eq!(env.ok, Value::Bool(false));
        assert_eq!(env.error.as_deref(), Some("boom"));

        let err = up.try_install("reverb.lv2", Some(&addr)).await.unwrap_err();
        assert!(matches!(
            err,
            InstallError::RemoteRejection { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn undecodable_ok_body_is_rejection() {
        let (_tmp, ws) = workspace();
        let (up, _) = uploader(ws, Duration::from_secs(5));
        let (addr, _) = mock_device(HttpStatus::OK, "installed!", Duration::ZERO).await;

        let env = up.install("reverb.lv2", Some(&addr)).await;
        assert!(!env.succeeded());
        assert_eq!(env.error.as_deref(), Some("installed!"));
    }

    #[tokio::test]
    async fn unreachable_device_is_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let (_tmp, ws) = workspace();
        let (up, _) = uploader(ws, Duration::from_secs(5));

        let err = up.try_install("reverb.lv2", Some(&addr)).await.unwrap_err();
        assert!(matches!(err, InstallError::Transport(_)));

        let env = up.install("reverb.lv2", Some(&addr)).await;
        assert_eq!(env.ok, Value::Bool(false));
        assert!(env.error.unwrap().starts_with("transport failure"));
    }

    #[tokio::test]
    async fn slow_device_times_out() {
        let (_tmp, ws) = workspace();
        let (up, _) = uploader(ws, Duration::from_millis(200));
        let (addr, _) = mock_device(HttpStatus::OK, "1", Duration::from_secs(5)).await;

        let err = up.try_install("reverb.lv2", Some(&addr)).await.unwrap_err();
        match err {
            InstallError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_bundle_is_not_packaged() {
        let (_tmp, ws) = workspace();
        let (up, packager) = uploader(ws, Duration::from_secs(5));

        let err = up.try_install("ghost.lv2", None).await.unwrap_err();
        assert!(matches!(err, InstallError::Bundle(BundleError::NotFound(_))));
        assert!(packager.seen.lock().unwrap().is_empty());
    }
}
