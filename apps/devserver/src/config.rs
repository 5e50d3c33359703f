//! Server configuration management.
//!
//! Configuration is stored as TOML at `~/.config/modsdk/devserver.toml`,
//! or wherever `MODSDK_DEVSERVER_CONFIG` points.

use std::path::{Path, PathBuf};
use std::time::Duration;

use modsdk_artifacts::{MAX_THUMB_SIZE, ScaleDivisor, ThumbnailPolicy};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "MODSDK_DEVSERVER_CONFIG";

/// Order in which thumbnail bounds are derived. See [`ScaleDivisor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivisorSetting {
    #[default]
    Original,
    Updated,
}

impl From<DivisorSetting> for ScaleDivisor {
    fn from(setting: DivisorSetting) -> Self {
        match setting {
            DivisorSetting::Original => ScaleDivisor::Original,
            DivisorSetting::Updated => ScaleDivisor::Updated,
        }
    }
}

/// Development server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listen address.
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port; also used to build the renderer's page URL.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the plugin bundles.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Static front-end files.
    #[serde(default = "default_html_dir")]
    pub html_dir: PathBuf,

    /// Default GUI template embedded into `index.html` and `icon.html`
    /// (`resources/templates/default.html` under `html_dir` if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_template: Option<PathBuf>,

    /// JSON settings blob edited through `/config/*`.
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,

    /// Headless browser binary.
    #[serde(default = "default_renderer")]
    pub renderer: PathBuf,

    /// Script the renderer runs to take the screenshot.
    #[serde(default = "default_screenshot_script")]
    pub screenshot_script: PathBuf,

    /// Extractor printing a bundle description as JSON.
    #[serde(default = "default_metadata_command")]
    pub metadata_command: PathBuf,

    /// Extra arguments placed before the bundle path.
    #[serde(default)]
    pub metadata_args: Vec<String>,

    #[serde(default = "default_thumb_size")]
    pub thumb_max_width: u32,

    #[serde(default = "default_thumb_size")]
    pub thumb_max_height: u32,

    #[serde(default)]
    pub scale_divisor: DivisorSetting,

    /// Upper bound on one renderer run, in seconds.
    #[serde(default = "default_render_timeout")]
    pub render_timeout_secs: u64,

    /// Upper bound on one device upload, in seconds.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,

    /// Scratch directory for renderer output (system temp dir if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".local").join("share").join("modsdk")
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    9000
}

fn default_workspace() -> PathBuf {
    data_dir().join("workspace")
}

fn default_html_dir() -> PathBuf {
    data_dir().join("html")
}

fn default_settings_file() -> PathBuf {
    data_dir().join("config.json")
}

fn default_renderer() -> PathBuf {
    "phantomjs".into()
}

fn default_screenshot_script() -> PathBuf {
    data_dir().join("screenshot.js")
}

fn default_metadata_command() -> PathBuf {
    "modsdk-describe".into()
}

fn default_thumb_size() -> u32 {
    MAX_THUMB_SIZE
}

fn default_render_timeout() -> u64 {
    30
}

fn default_upload_timeout() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workspace: default_workspace(),
            html_dir: default_html_dir(),
            default_template: None,
            settings_file: default_settings_file(),
            renderer: default_renderer(),
            screenshot_script: default_screenshot_script(),
            metadata_command: default_metadata_command(),
            metadata_args: Vec::new(),
            thumb_max_width: default_thumb_size(),
            thumb_max_height: default_thumb_size(),
            scale_divisor: DivisorSetting::default(),
            render_timeout_secs: default_render_timeout(),
            upload_timeout_secs: default_upload_timeout(),
            scratch_dir: None,
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Writes the configuration as pretty TOML.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Page the renderer loads; the request fragment is appended to it.
    pub fn icon_page_url(&self) -> String {
        format!("http://localhost:{}/icon.html", self.port)
    }

    pub fn default_template_path(&self) -> PathBuf {
        self.default_template.clone().unwrap_or_else(|| {
            self.html_dir
                .join("resources")
                .join("templates")
                .join("default.html")
        })
    }

    pub fn thumbnail_policy(&self) -> ThumbnailPolicy {
        ThumbnailPolicy {
            max_width: self.thumb_max_width,
            max_height: self.thumb_max_height,
            divisor: self.scale_divisor.into(),
        }
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

/// Returns the configuration file path.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home)
        .join(".config")
        .join("modsdk")
        .join("devserver.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.thumb_max_width, 64);
        assert_eq!(config.thumb_max_height, 64);
        assert_eq!(config.scale_divisor, DivisorSetting::Original);
        assert_eq!(config.render_timeout_secs, 30);
        assert_eq!(config.upload_timeout_secs, 60);
        assert!(config.scratch_dir.is_none());
        assert!(config.settings_file.ends_with("config.json"));
    }

    #[test]
    fn config_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            port = 9100
            scale_divisor = "updated"
            metadata_args = ["--json"]
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.scale_divisor, DivisorSetting::Updated);
        assert_eq!(config.metadata_args, vec!["--json"]);
        assert_eq!(config.render_timeout_secs, 30);
        assert_eq!(config.renderer, PathBuf::from("phantomjs"));
    }

    #[test]
    fn unknown_divisor_rejected() {
        assert!(toml::from_str::<Config>(r#"scale_divisor = "sideways""#).is_err());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = Config {
            port: 9001,
            scratch_dir: Some("/var/tmp/shots".into()),
            thumb_max_width: 48,
            ..Config::default()
        };
        let parsed: Config = toml::from_str(&toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(parsed.port, 9001);
        assert_eq!(parsed.scratch_dir, Some(PathBuf::from("/var/tmp/shots")));
        assert_eq!(parsed.thumb_max_width, 48);
    }

    #[test]
    fn load_creates_default_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("devserver.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert!(path.is_file());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.workspace, config.workspace);
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("devserver.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn derived_values() {
        let config = Config {
            port: 9100,
            scale_divisor: DivisorSetting::Updated,
            render_timeout_secs: 5,
            ..Config::default()
        };
        assert_eq!(config.icon_page_url(), "http://localhost:9100/icon.html");
        assert_eq!(
            config.default_template_path(),
            config.html_dir.join("resources/templates/default.html")
        );
        assert_eq!(config.render_timeout(), Duration::from_secs(5));
        let policy = config.thumbnail_policy();
        assert_eq!(policy.divisor, ScaleDivisor::Updated);
        assert_eq!((policy.max_width, policy.max_height), (64, 64));
    }

    #[test]
    fn default_template_override() {
        let config: Config = toml::from_str(
            r#"
            html_dir = "/srv/editor"
            default_template = "/srv/gui/default.html"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_template_path(), PathBuf::from("/srv/gui/default.html"));

        let config: Config = toml::from_str(r#"html_dir = "/srv/editor""#).unwrap();
        assert_eq!(
            config.default_template_path(),
            PathBuf::from("/srv/editor/resources/templates/default.html")
        );
    }

    #[test]
    fn config_path_not_empty() {
        assert!(config_path().to_string_lossy().ends_with(".toml"));
    }
}
