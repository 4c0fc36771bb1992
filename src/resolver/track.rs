//! Resolved track model and the resolution endpoint wire format.

use serde::{Deserialize, Serialize};

use super::error::ResolutionError;

/// Display title used when the server omits one.
pub const UNKNOWN_TITLE: &str = "Unknown Title";
/// Display artist used when the server omits one.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Playable metadata plus a temporary download URL for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    /// Track identifier from the validated link.
    pub id: String,
    /// Track title.
    pub title: String,
    /// Artist name(s) as reported by the server.
    pub artist: String,
    /// Duration in seconds, when known.
    pub duration_secs: Option<f64>,
    /// Size of the audio file in bytes, when known.
    pub size_bytes: Option<f64>,
    /// Cover art URL from the metadata provider.
    pub cover_url: Option<String>,
    /// Signed or temporary URL the audio file can be fetched from.
    pub download_url: String,
}

/// Request body sent to the resolution endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct ResolveRequest<'a> {
    pub(crate) url: &'a str,
    /// Unix milliseconds; defeats intermediary caches.
    pub(crate) timestamp: u64,
}

/// Response body from the resolution endpoint.
///
/// Every field is optional on the wire; [`ResolveResponse::into_track`]
/// decides which ones are required.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResolveResponse {
    #[serde(default)]
    pub(crate) status: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) artist: Option<String>,
    #[serde(default)]
    pub(crate) duration: Option<NumberLike>,
    #[serde(default)]
    pub(crate) size: Option<NumberLike>,
    #[serde(default)]
    pub(crate) cover: Option<String>,
    #[serde(default)]
    pub(crate) download_url: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

/// Numeric field that some backends send as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberLike {
    Number(f64),
    Text(String),
}

impl NumberLike {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ResolveResponse {
    /// Returns true only for a literal boolean `true` discriminator.
    pub(crate) fn is_success(&self) -> bool {
        matches!(self.status, Some(serde_json::Value::Bool(true)))
    }

    /// Server message for a rejection: `message`, then `error`.
    pub(crate) fn rejection_message(&self) -> Option<String> {
        non_empty(self.message.clone()).or_else(|| non_empty(self.error.clone()))
    }

    /// Converts a successful response into a track.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::InvalidResponse`] when `download_url` is
    /// missing or empty.
    pub(crate) fn into_track(self, id: &str) -> Result<ResolvedTrack, ResolutionError> {
        let download_url = non_empty(self.download_url)
            .ok_or_else(|| ResolutionError::invalid_response("missing download_url"))?;

        Ok(ResolvedTrack {
            id: id.to_string(),
            title: non_empty(self.title).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist: non_empty(self.artist).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            duration_secs: self.duration.as_ref().and_then(NumberLike::as_f64),
            size_bytes: self.size.as_ref().and_then(NumberLike::as_f64),
            cover_url: non_empty(self.cover),
            download_url,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(body: &str) -> ResolveResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_success_requires_literal_true() {
        assert!(parse(r#"{"status": true}"#).is_success());
        assert!(!parse(r#"{"status": false}"#).is_success());
        assert!(!parse(r#"{"status": "true"}"#).is_success());
        assert!(!parse("{}").is_success());
    }

    #[test]
    fn test_rejection_message_prefers_message_then_error() {
        assert_eq!(
            parse(r#"{"status": false, "message": "not found", "error": "x"}"#)
                .rejection_message(),
            Some("not found".to_string())
        );
        assert_eq!(
            parse(r#"{"status": false, "message": "", "error": "quota"}"#).rejection_message(),
            Some("quota".to_string())
        );
        assert_eq!(parse(r#"{"status": false}"#).rejection_message(), None);
    }

    #[test]
    fn test_into_track_fills_display_defaults() {
        let track = parse(r#"{"status": true, "download_url": "http://x/y.mp3"}"#)
            .into_track("abc")
            .unwrap();
        assert_eq!(track.id, "abc");
        assert_eq!(track.title, UNKNOWN_TITLE);
        assert_eq!(track.artist, UNKNOWN_ARTIST);
        assert_eq!(track.duration_secs, None);
        assert_eq!(track.cover_url, None);
    }

    #[test]
    fn test_into_track_accepts_numeric_strings() {
        let track = parse(
            r#"{"status": true, "duration": "125", "size": 1536, "download_url": "http://x/y.mp3"}"#,
        )
        .into_track("abc")
        .unwrap();
        assert_eq!(track.duration_secs, Some(125.0));
        assert_eq!(track.size_bytes, Some(1536.0));
    }

    #[test]
    fn test_into_track_requires_download_url() {
        let err = parse(r#"{"status": true, "title": "A", "download_url": ""}"#)
            .into_track("abc")
            .unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidResponse { .. }));
    }
}
