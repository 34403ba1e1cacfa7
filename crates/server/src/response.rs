//! Intercepted requests and the responses produced for them.

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vidcache_client::FetchResponse;
use vidcache_core::{ResourceId, StoredEntry};

/// Body of the synthetic response for generic resources that are unavailable offline.
pub const OFFLINE_BODY: &str = "Offline content not available";

/// Message carried by the synthetic media error response.
pub const MEDIA_OFFLINE_ERROR: &str = "Video not available offline. Please download first.";

/// What the foreground intends to do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Top-level navigation.
    Document,
    Video,
    Audio,
    Image,
    Script,
    Style,
    #[default]
    Other,
}

/// An outbound request observed by the interceptor.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: ResourceId,
    pub destination: Destination,
}

impl Request {
    pub fn new(id: ResourceId, destination: Destination) -> Self {
        Self { id, destination }
    }

    pub fn is_navigation(&self) -> bool {
        self.destination == Destination::Document
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    AppShell,
    Media,
    Network,
    /// Designated fallback document served for a failed navigation.
    Fallback,
    /// Synthetic response built by the engine.
    Offline,
}

/// A response returned to the foreground.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl Response {
    /// Replay a stored entry verbatim.
    pub fn from_entry(entry: StoredEntry, source: ResponseSource) -> Self {
        Self { status: entry.status, headers: entry.headers, body: Bytes::from(entry.body), source }
    }

    pub fn from_network(response: &FetchResponse) -> Self {
        Self {
            status: response.status.as_u16(),
            headers: response.header_pairs(),
            body: response.bytes.clone(),
            source: ResponseSource::Network,
        }
    }

    /// Plain-text "offline content not available" response.
    pub fn offline() -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".into(), "text/plain;charset=UTF-8".into())],
            body: Bytes::from_static(OFFLINE_BODY.as_bytes()),
            source: ResponseSource::Offline,
        }
    }

    /// JSON error telling the caller to download the media first.
    pub fn media_offline() -> Self {
        let body = serde_json::json!({ "error": MEDIA_OFFLINE_ERROR }).to_string();
        Self {
            status: 200,
            headers: vec![("content-type".into(), "application/json".into())],
            body: Bytes::from(body),
            source: ResponseSource::Offline,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_offline_is_json() {
        let response = Response::media_offline();
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"], MEDIA_OFFLINE_ERROR);
    }

    #[test]
    fn test_from_entry_is_verbatim() {
        let entry = StoredEntry::new("http://localhost/", 200, b"<html>".to_vec()).with_content_type("text/html");
        let response = Response::from_entry(entry, ResponseSource::AppShell);
        assert_eq!(response.status, 200);
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(&response.body[..], b"<html>");
    }

    #[test]
    fn test_destination_wire_names() {
        let d: Destination = serde_json::from_str("\"document\"").unwrap();
        assert_eq!(d, Destination::Document);
        assert_eq!(serde_json::to_string(&Destination::Video).unwrap(), "\"video\"");
    }
}
