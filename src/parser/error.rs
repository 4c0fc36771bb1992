//! Error types for link validation.

use thiserror::Error;

/// Reasons a pasted link is rejected before any network call.
///
/// Every variant is a user input mistake: it is shown inline and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Nothing (or only whitespace) was entered.
    #[error("Please enter a Spotify URL")]
    Empty,

    /// The input does not mention any accepted domain.
    #[error("Please enter a valid Spotify URL")]
    NotRecognized,

    /// An accepted domain is present but the path does not follow the link grammar.
    #[error("Invalid Spotify URL format")]
    Malformed,

    /// The link is well formed but points at something other than a track.
    #[error("Only Spotify track URLs are supported at the moment")]
    UnsupportedKind {
        /// The content type named in the link path (`album`, `playlist`, `artist`).
        kind: String,
    },
}

impl ValidationError {
    /// Creates an `UnsupportedKind` error for the given path kind.
    #[must_use]
    pub fn unsupported_kind(kind: impl Into<String>) -> Self {
        Self::UnsupportedKind { kind: kind.into() }
    }

    /// Returns true when the input was not recognized as a link at all.
    ///
    /// Distinguishes "not a recognized link" from "unsupported content type"
    /// and "empty input".
    #[must_use]
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::NotRecognized | Self::Malformed)
    }
}
