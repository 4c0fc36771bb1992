//! One user's search, confirm and reset flow over a resolver and a dispatcher.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::download::{Dispatcher, DownloadJob, SettleReport};
use crate::feedback::{Feedback, Notification};
use crate::format::{DEFAULT_COVER_SIZE, format_duration, format_file_size, optimize_cover_url};
use crate::parser::ValidationError;
use crate::resolver::{ResolutionError, ResolvedTrack, Resolver, preload_cover};

const CACHE_MESSAGE: &str = "Loading from cache...";
const READY_MESSAGE: &str = "✓ Track ready for download!";
const RESET_MESSAGE: &str = "Ready for new download!";
const SHORT_NOTICE: Duration = Duration::from_millis(3000);

/// Why a search failed. Already reported to the feedback sink.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Input was not a usable track link.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The link could not be resolved.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// Display-ready view of a resolved track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackSummary {
    /// Track id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Artist.
    pub artist: String,
    /// `M:SS` or `Unknown`.
    pub duration: String,
    /// Human-readable size or `High Quality`.
    pub size: String,
    /// Cover art URL sized for display.
    pub cover_url: String,
    /// Where the audio can be fetched.
    pub download_url: String,
}

#[derive(Debug, Clone)]
struct ProcessedLink {
    url: String,
    id: String,
}

/// Search, confirm and reset over one resolver and one dispatcher.
pub struct Session {
    resolver: Resolver,
    dispatcher: Dispatcher,
    feedback: Arc<dyn Feedback>,
    last_processed: Option<ProcessedLink>,
    current_job: Option<DownloadJob>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("resolver", &self.resolver)
            .field("dispatcher", &self.dispatcher)
            .field("current_job", &self.current_job)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session.
    #[must_use]
    pub fn new(resolver: Resolver, dispatcher: Dispatcher, feedback: Arc<dyn Feedback>) -> Self {
        Self {
            resolver,
            dispatcher,
            feedback,
            last_processed: None,
            current_job: None,
        }
    }

    /// Validates and resolves `raw`, preparing its download job.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for invalid input or a failed resolution.
    /// Both are reported to the feedback sink before returning.
    #[instrument(skip(self))]
    pub async fn search(&mut self, raw: &str) -> Result<ResolvedTrack, SessionError> {
        let reference = match self.resolver.validate(raw) {
            Ok(reference) => reference,
            Err(error) => {
                debug!(error = %error, "input rejected");
                self.feedback.notify(Notification::warning(error.to_string()));
                return Err(error.into());
            }
        };

        let repeat = self
            .last_processed
            .as_ref()
            .is_some_and(|last| last.url == reference.source_url);
        if repeat && self.resolver.cached(&reference.id).is_some() {
            self.feedback
                .notify(Notification::success(CACHE_MESSAGE).lasting(Duration::from_millis(2000)));
        }
        // Recorded before resolving, so a failed link still counts as processed.
        self.last_processed = Some(ProcessedLink {
            url: reference.source_url.clone(),
            id: reference.id.clone(),
        });

        let track = match self
            .resolver
            .resolve(&reference.id, &reference.source_url)
            .await
        {
            Ok(track) => track,
            Err(error) => {
                warn!(error = %error, category = ?error.category(), "resolution failed");
                self.feedback
                    .notify(Notification::error(error.user_message()));
                return Err(error.into());
            }
        };

        self.current_job = Some(DownloadJob::for_track(&track));
        self.feedback
            .notify(Notification::success(READY_MESSAGE).lasting(SHORT_NOTICE));
        info!(id = %track.id, "track ready");
        Ok(track)
    }

    /// Dispatches the current job; with none, fails fast as an empty link.
    pub fn confirm(&self) -> bool {
        let job = self.current_job.clone().unwrap_or_default();
        self.dispatcher.dispatch(&job)
    }

    /// Forgets the last processed link and its cached resolution.
    pub fn reset(&mut self) {
        if let Some(last) = self.last_processed.take() {
            self.resolver.evict(&last.id);
        }
        self.current_job = None;
        self.feedback
            .notify(Notification::success(RESET_MESSAGE).lasting(Duration::from_millis(2000)));
    }

    /// Display fields for `track`, without touching the network.
    #[must_use]
    pub fn render(&self, track: &ResolvedTrack) -> TrackSummary {
        TrackSummary {
            id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            duration: format_duration(track.duration_secs),
            size: format_file_size(track.size_bytes),
            cover_url: optimize_cover_url(track.cover_url.as_deref(), DEFAULT_COVER_SIZE),
            download_url: track.download_url.clone(),
        }
    }

    /// Like [`render`](Self::render), but preloads the cover and falls back
    /// to the default cover if it does not load in time.
    pub async fn render_with_cover(&self, track: &ResolvedTrack) -> TrackSummary {
        let mut summary = self.render(track);
        summary.cover_url = preload_cover(self.resolver.client(), track.cover_url.as_deref()).await;
        summary
    }

    /// Waits for background downloads.
    pub async fn settle(&self) -> SettleReport {
        self.dispatcher.settle().await
    }

    /// The job a confirm would dispatch.
    #[must_use]
    pub fn current_job(&self) -> Option<&DownloadJob> {
        self.current_job.as_ref()
    }

    /// The resolver.
    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }
}
