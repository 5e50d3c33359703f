use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

/// Result of a screenshot capture.
///
/// Image payloads are base64-encoded PNG bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureEnvelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaptureEnvelope {
    /// Successful capture carrying both images.
    pub fn success(icon: &[u8], thumbnail: &[u8]) -> Self {
        Self {
            ok: true,
            icon: Some(BASE64.encode(icon)),
            thumbnail: Some(BASE64.encode(thumbnail)),
            error: None,
        }
    }

    /// Failed capture with no images.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            icon: None,
            thumbnail: None,
            error: Some(error.into()),
        }
    }

    /// Images were produced but not fully published.
    pub fn partial(icon: &[u8], thumbnail: &[u8], error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Self::success(icon, thumbnail)
        }
    }

    /// Decodes the icon payload, if any.
    pub fn icon_bytes(&self) -> Option<Vec<u8>> {
        self.icon.as_ref().and_then(|s| BASE64.decode(s).ok())
    }

    /// Decodes the thumbnail payload, if any.
    pub fn thumbnail_bytes(&self) -> Option<Vec<u8>> {
        self.thumbnail.as_ref().and_then(|s| BASE64.decode(s).ok())
    }
}

/// Result of a bundle install on the remote device.
///
/// On success `ok` holds the device's decoded JSON reply verbatim (which
/// may itself be any JSON value); on failure it is `false` and `error`
/// carries the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadEnvelope {
    pub ok: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadEnvelope {
    /// Wraps the device's decoded reply.
    pub fn success(result: serde_json::Value) -> Self {
        Self {
            ok: result,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: serde_json::Value::Bool(false),
            error: Some(error.into()),
        }
    }

    /// Returns `true` when the request reached the device and was accepted.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// The device's reply, if the install succeeded.
    pub fn result(&self) -> Option<&serde_json::Value> {
        self.succeeded().then_some(&self.ok)
    }
}
