//! Headless renderer invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use modsdk_protocol::RenderRequest;
use tokio::process::{Child, Command};

/// How to invoke the renderer.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Renderer executable.
    pub program: PathBuf,
    /// Screenshot script passed as the first argument.
    pub script: PathBuf,
    /// Icon page URL; the request fragment is appended after `#`.
    pub page_url: String,
}

/// Spawns renderer processes for capture requests.
#[derive(Debug, Clone)]
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// The page the renderer loads for `req`.
    pub fn target_url(&self, req: &RenderRequest) -> String {
        format!("{}#{}", self.config.page_url, req.fragment())
    }

    /// Starts `{program} {script} {url} {output} {width} {height}`.
    ///
    /// Arguments are passed as a vector; nothing goes through a shell.
    pub fn spawn(&self, req: &RenderRequest, output: &Path) -> std::io::Result<Child> {
        let url = self.target_url(req);
        tracing::debug!(
            program = %self.config.program.display(),
            url = %url,
            output = %output.display(),
            "spawning renderer"
        );

        Command::new(&self.config.program)
            .arg(&self.config.script)
            .arg(&url)
            .arg(output)
            .arg(req.width.to_string())
            .arg(req.height.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
    }
}
