use serde::{Deserialize, Serialize};

/// Rejection reasons for a malformed [`RenderRequest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("missing field: {0}")]
    Missing(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroDimension(&'static str),
}

/// A request to capture a plugin GUI screenshot.
///
/// Deserializes directly from the `/screenshot` query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub bundle: String,
    pub effect: String,
    pub width: u32,
    pub height: u32,
}

impl RenderRequest {
    /// Builds a validated request.
    pub fn new(
        bundle: impl Into<String>,
        effect: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Result<Self, RequestError> {
        let req = Self {
            bundle: bundle.into(),
            effect: effect.into(),
            width,
            height,
        };
        req.validate()?;
        Ok(req)
    }

    /// Checks the invariants a deserialized request cannot enforce.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.bundle.is_empty() {
            return Err(RequestError::Missing("bundle"));
        }
        if self.effect.is_empty() {
            return Err(RequestError::Missing("effect"));
        }
        if self.width == 0 {
            return Err(RequestError::ZeroDimension("width"));
        }
        if self.height == 0 {
            return Err(RequestError::ZeroDimension("height"));
        }
        Ok(())
    }

    /// URL fragment the icon page uses to locate the effect: `bundle,effect`.
    pub fn fragment(&self) -> String {
        format!("{},{}", self.bundle, self.effect)
    }
}
