//! Editor pages rendered with the default GUI template.
//!
//! `index.html` and `icon.html` embed the default template inside a
//! JavaScript string literal. Two placeholders are recognised:
//! `{% raw default_template %}` inserts the prepared text as-is and
//! `{{ default_template }}` inserts it HTML-escaped. Any other tag is
//! left untouched.

use std::path::PathBuf;

use thiserror::Error;

/// Context variable holding the default template.
pub const DEFAULT_TEMPLATE_VAR: &str = "default_template";

#[derive(Debug, Error)]
pub enum PageError {
    #[error("page not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Loads pages from the front-end directory.
#[derive(Debug, Clone)]
pub struct Pages {
    html_dir: PathBuf,
    default_template: PathBuf,
}

impl Pages {
    pub fn new(html_dir: impl Into<PathBuf>, default_template: impl Into<PathBuf>) -> Self {
        Self {
            html_dir: html_dir.into(),
            default_template: default_template.into(),
        }
    }

    /// Reads `name` from the front-end directory and fills in the default
    /// template. Both files are re-read on every call.
    pub async fn render(&self, name: &str) -> Result<String, PageError> {
        let path = self.html_dir.join(name);
        let page = match tokio::fs::read_to_string(&path).await {
            Ok(page) => page,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PageError::NotFound(name.to_string()));
            }
            Err(source) => return Err(PageError::Read { path, source }),
        };

        let template = tokio::fs::read_to_string(&self.default_template)
            .await
            .map_err(|source| PageError::Read {
                path: self.default_template.clone(),
                source,
            })?;

        tracing::debug!(page = %path.display(), "rendering page");
        Ok(substitute(&page, &prepare_template(&template)))
    }
}

/// Escapes single quotes, then collapses control and space runs into one
/// space and trims the ends.
pub fn prepare_template(raw: &str) -> String {
    squeeze(&raw.replace('\'', "\\'"))
}

fn squeeze(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_run = false;
    for c in value.chars() {
        if c <= ' ' {
            in_run = true;
            continue;
        }
        if in_run && !out.is_empty() {
            out.push(' ');
        }
        in_run = false;
        out.push(c);
    }
    out
}

fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Replaces the default-template placeholders in `page`.
fn substitute(page: &str, template: &str) -> String {
    let mut out = String::with_capacity(page.len() + template.len());
    let mut rest = page;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some(inner) = tag_body(tail, "{{", "}}") {
            if inner.trim() == DEFAULT_TEMPLATE_VAR {
                out.push_str(&html_escape(template));
                rest = &tail[inner.len() + 4..];
                continue;
            }
        } else if let Some(inner) = tag_body(tail, "{%", "%}") {
            let words: Vec<&str> = inner.split_whitespace().collect();
            if words == ["raw", DEFAULT_TEMPLATE_VAR] {
                out.push_str(template);
                rest = &tail[inner.len() + 4..];
                continue;
            }
        }

        out.push('{');
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

/// Text between `open` and the first following `close`, if `s` starts
/// with `open`.
fn tag_body<'a>(s: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let body = s.strip_prefix(open)?;
    body.find(close).map(|end| &body[..end])
}
