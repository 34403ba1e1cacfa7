//! Resource identifiers: canonical absolute URLs used as store keys.

use std::fmt;

use url::{ParseError, Url};

use crate::Error;

/// Error type for identifier normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Canonical identifier of a cacheable resource.
///
/// Two inputs that normalize to the same absolute URL compare equal and
/// address the same store entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(Url);

impl ResourceId {
    /// Normalize `input` against `origin`.
    ///
    /// Normalization steps:
    /// 1. Trim leading/trailing whitespace
    /// 2. Resolve relative references (`./a`, `/a`, `a`) against `origin`
    /// 3. Accept only http and https
    /// 4. Lowercase the host
    /// 5. Remove fragment (#...)
    /// 6. Keep query string intact (do not reorder)
    pub fn parse(origin: &Url, input: &str) -> Result<Self, UrlError> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Err(UrlError::Empty);
        }

        let mut parsed = match Url::parse(trimmed) {
            Err(ParseError::RelativeUrlWithoutBase) => origin.join(trimmed),
            absolute => absolute,
        }
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
        }

        if let Some(host) = parsed.host_str() {
            let lowered = host.to_lowercase();
            parsed
                .set_host(Some(&lowered))
                .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        }

        parsed.set_fragment(None);

        Ok(Self(parsed))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    /// URL path, used by request classification.
    pub fn path(&self) -> &str {
        self.0.path()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}
