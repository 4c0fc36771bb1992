//! Track link grammar and validation.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use super::error::ValidationError;

/// Domains that may appear in an accepted link.
pub const PRIMARY_DOMAIN: &str = "spotify.com";
/// Short-link domain.
pub const SHORT_LINK_DOMAIN: &str = "spotify.link";

/// Optional scheme, accepted host, content kind, alphanumeric id.
#[allow(clippy::expect_used)]
static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:https?://)?(?:open\.spotify\.com|spotify\.link)/(track|album|playlist|artist)/([a-zA-Z0-9]+)",
    )
    .expect("link regex is valid") // Static pattern, safe to panic
});

/// Content type named in the link path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// A single track (the only kind that can be downloaded).
    Track,
    /// An album.
    Album,
    /// A playlist.
    Playlist,
    /// An artist page.
    Artist,
}

impl LinkKind {
    /// Returns the path segment for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Playlist => "playlist",
            Self::Artist => "artist",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "track" => Ok(Self::Track),
            "album" => Ok(Self::Album),
            "playlist" => Ok(Self::Playlist),
            "artist" => Ok(Self::Artist),
            _ => Err(ValidationError::Malformed),
        }
    }
}

/// A validated track link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReference {
    /// Track identifier taken from the link path. Used as the cache key.
    pub id: String,
    /// The trimmed input the id was taken from.
    pub source_url: String,
}

/// Matches the link grammar without restricting the kind.
///
/// Returns the kind and the identifier when `input` contains an accepted link.
#[must_use]
pub fn parse_link(input: &str) -> Option<(LinkKind, String)> {
    let captures = LINK_PATTERN.captures(input)?;
    let kind = captures.get(1)?.as_str().parse().ok()?;
    let id = captures.get(2)?.as_str().to_string();
    trace!(%kind, %id, "link grammar matched");
    Some((kind, id))
}

/// Extracts the identifier of any accepted link, whatever its kind.
#[must_use]
pub fn extract_track_id(input: &str) -> Option<String> {
    parse_link(input).map(|(_, id)| id)
}

/// Validates raw user input as a downloadable track link.
///
/// # Errors
///
/// - [`ValidationError::Empty`] for empty or whitespace-only input
/// - [`ValidationError::NotRecognized`] when no accepted domain is present
/// - [`ValidationError::Malformed`] when the grammar does not match
/// - [`ValidationError::UnsupportedKind`] for album, playlist and artist links
///
/// # Examples
///
/// ```
/// use trackgrab_core::parser::validate_link;
///
/// let reference = validate_link("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC").unwrap();
/// assert_eq!(reference.id, "4uLU6hMCjMI75M1A2tKUQC");
/// assert!(validate_link("https://open.spotify.com/album/abc").is_err());
/// ```
pub fn validate_link(raw: &str) -> Result<TrackReference, ValidationError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(ValidationError::Empty);
    }

    if !input.contains(PRIMARY_DOMAIN) && !input.contains(SHORT_LINK_DOMAIN) {
        debug!(input_len = input.len(), "no accepted domain in input");
        return Err(ValidationError::NotRecognized);
    }

    let (kind, id) = parse_link(input).ok_or(ValidationError::Malformed)?;
    if kind != LinkKind::Track {
        debug!(%kind, "rejected non-track link");
        return Err(ValidationError::unsupported_kind(kind.as_str()));
    }

    Ok(TrackReference {
        id,
        source_url: input.to_string(),
    })
}

/// Returns the link carried in a page URL fragment, for deep-linking.
///
/// `https://app.example/#https%3A%2F%2Fopen.spotify.com%2Ftrack%2Fabc` yields
/// `https://open.spotify.com/track/abc`. Fragments that do not mention the
/// primary domain are ignored.
#[must_use]
pub fn link_from_fragment(page_url: &str) -> Option<String> {
    let parsed = Url::parse(page_url.trim()).ok()?;
    let fragment = parsed.fragment().filter(|f| !f.is_empty())?;
    let decoded = urlencoding::decode(fragment)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| fragment.to_string());
    decoded.contains(PRIMARY_DOMAIN).then_some(decoded)
}
