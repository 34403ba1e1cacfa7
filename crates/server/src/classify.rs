//! Request classification: media vs. generic.
//!
//! Classification is a pure function of the request destination and the
//! target path. No content negotiation takes place.

use vidcache_core::{AppConfig, ResourceId};

use crate::response::Destination;

/// Which retrieval strategy handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    Media,
    Generic,
}

/// Rules that mark a request as streaming media.
#[derive(Debug, Clone)]
pub struct MediaClassifier {
    extensions: Vec<String>,
    segments: Vec<String>,
}

impl MediaClassifier {
    /// Extensions are matched against the end of the last path segment,
    /// segments against whole path segments. Both case-insensitive.
    pub fn new<E, S>(extensions: E, segments: S) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        Self {
            extensions: extensions.into_iter().map(|e| e.as_ref().to_ascii_lowercase()).collect(),
            segments: segments.into_iter().map(|s| s.as_ref().to_ascii_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.media_extensions, &config.media_segments)
    }

    /// Whether the identifier's path alone marks it as media.
    pub fn is_media_path(&self, id: &ResourceId) -> bool {
        let path = id.path().to_ascii_lowercase();
        let mut segments = path.split('/').filter(|s| !s.is_empty());

        let last = path.rsplit('/').next().unwrap_or_default();
        if self.extensions.iter().any(|ext| last.ends_with(ext.as_str())) {
            return true;
        }

        segments.any(|segment| self.segments.iter().any(|marker| marker == segment))
    }

    pub fn classify(&self, id: &ResourceId, destination: Destination) -> RequestClass {
        if matches!(destination, Destination::Video | Destination::Audio) || self.is_media_path(id) {
            RequestClass::Media
        } else {
            RequestClass::Generic
        }
    }
}

impl Default for MediaClassifier {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
