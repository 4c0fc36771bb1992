//! Trackgrab Core Library
//!
//! Turns a pasted music-track link into a downloadable file: the link is
//! validated against the accepted grammar, resolved to metadata and a
//! temporary download URL through an external endpoint, and handed to a
//! download host.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Link grammar, validation and deep-link extraction
//! - [`resolver`] - Endpoint client with a bounded FIFO cache and cover preloading
//! - [`download`] - Dispatch to a browser-style surface or a mobile shell bridge
//! - [`session`] - Search, confirm and reset flow tying the above together
//! - [`feedback`] - Notifications and confirm-control state reported to the UI
//! - [`format`] - Duration, size and cover-URL display helpers

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod feedback;
pub mod format;
pub mod http;
pub mod parser;
pub mod resolver;
pub mod session;
mod user_agent;

// Re-export commonly used types
pub use download::{
    Dispatcher, DownloadError, DownloadJob, FetchSurface, Host, HostKind, HttpClient, LocalShell,
    SettleReport, sanitize_filename,
};
pub use feedback::{ConfirmState, Feedback, LogFeedback, Notification, NoticeLevel};
pub use format::{format_duration, format_file_size, optimize_cover_url};
pub use http::HttpTimeouts;
pub use parser::{LinkKind, TrackReference, ValidationError, link_from_fragment, validate_link};
pub use resolver::{DEFAULT_API_ENDPOINT, ResolutionError, ResolvedTrack, Resolver};
pub use session::{Session, SessionError, TrackSummary};
