//! Link parsing: validating pasted input and extracting track identifiers.
//!
//! Accepted links follow one grammar: an optional `http(s)://` scheme, a host
//! of `open.spotify.com` or `spotify.link`, a content kind
//! (`track`, `album`, `playlist`, `artist`) and an alphanumeric identifier.
//! Only track links validate; the other kinds are recognized so the rejection
//! can say why.
//!
//! # Example
//!
//! ```
//! use trackgrab_core::parser::{validate_link, ValidationError};
//!
//! let reference = validate_link("open.spotify.com/track/abc123").unwrap();
//! assert_eq!(reference.id, "abc123");
//!
//! let err = validate_link("https://open.spotify.com/playlist/xyz").unwrap_err();
//! assert!(matches!(err, ValidationError::UnsupportedKind { .. }));
//! ```

mod error;
mod link;

pub use error::ValidationError;
pub use link::{
    LinkKind, PRIMARY_DOMAIN, SHORT_LINK_DOMAIN, TrackReference, extract_track_id,
    link_from_fragment, parse_link, validate_link,
};
