//! Link resolution: turning a validated track link into metadata and a
//! download URL through the external resolution endpoint.
//!
//! # Architecture
//!
//! - [`Resolver`] - Owns the HTTP client and a [`ResolutionCache`]; one
//!   resolution in flight at a time (`resolve` takes `&mut self`)
//! - [`ResolvedTrack`] - Result of a successful resolution
//! - [`ResolutionError`] - Transport, status, rejection and body failures
//! - [`preload_cover`] - Bounded cover art fetch with default fallback
//!
//! # Example
//!
//! ```no_run
//! use trackgrab_core::resolver::Resolver;
//! use trackgrab_core::HttpTimeouts;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut resolver = Resolver::new("http://127.0.0.1:3000/api", HttpTimeouts::resolver_defaults())?;
//! let reference = resolver.validate("https://open.spotify.com/track/abc123")?;
//! let track = resolver.resolve(&reference.id, &reference.source_url).await?;
//! println!("{} - {}: {}", track.artist, track.title, track.download_url);
//! # Ok(())
//! # }
//! ```

mod cache;
mod cover;
mod error;
mod track;

pub use cache::{CACHE_CAPACITY, ResolutionCache};
pub use cover::{COVER_PRELOAD_TIMEOUT, preload_cover, preload_cover_with_timeout};
pub use error::{FailureCategory, GENERIC_REJECTION, ResolutionError};
pub use track::{ResolvedTrack, UNKNOWN_ARTIST, UNKNOWN_TITLE};

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::{debug, info, instrument};

use crate::http::{HttpTimeouts, build_http_client};
use crate::parser::{TrackReference, ValidationError, validate_link};
use crate::user_agent;
use track::{ResolveRequest, ResolveResponse};

/// Default resolution endpoint used when none is configured.
pub const DEFAULT_API_ENDPOINT: &str = "http://127.0.0.1:3000/api";

/// Resolves track links through the resolution endpoint, caching results by id.
#[derive(Debug)]
pub struct Resolver {
    client: Client,
    endpoint: String,
    cache: ResolutionCache,
}

impl Resolver {
    /// Creates a resolver for `endpoint` with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::ClientBuild`] when the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeouts: HttpTimeouts) -> Result<Self, ResolutionError> {
        let client = build_http_client(&user_agent::default_resolver_user_agent(), timeouts)
            .map_err(|e| ResolutionError::ClientBuild {
                reason: e.to_string(),
            })?;
        Ok(Self::with_client(endpoint, client))
    }

    /// Creates a resolver around an existing client.
    #[must_use]
    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            cache: ResolutionCache::new(),
        }
    }

    /// Validates raw input as a track link.
    ///
    /// # Errors
    ///
    /// See [`validate_link`].
    pub fn validate(&self, raw: &str) -> Result<TrackReference, ValidationError> {
        validate_link(raw)
    }

    /// Resolves a validated track, consulting the cache first.
    ///
    /// A cache hit returns immediately without touching the network. A miss
    /// sends one POST with the raw URL and a cache-busting timestamp, and
    /// caches the result on success.
    ///
    /// # Errors
    ///
    /// - [`ResolutionError::Network`] / [`ResolutionError::Timeout`] for transport failures
    /// - [`ResolutionError::HttpStatus`] for non-2xx responses
    /// - [`ResolutionError::InvalidResponse`] for unparseable bodies or a missing `download_url`
    /// - [`ResolutionError::Rejected`] when the success discriminator is not `true`
    #[instrument(skip(self, raw_url), fields(endpoint = %self.endpoint))]
    pub async fn resolve(
        &mut self,
        id: &str,
        raw_url: &str,
    ) -> Result<ResolvedTrack, ResolutionError> {
        if let Some(cached) = self.cache.get(id) {
            debug!("using cached track data");
            return Ok(cached.clone());
        }

        let response = self.fetch(raw_url).await?;
        if !response.is_success() {
            let message = response.rejection_message();
            debug!(message = ?message, "server rejected link");
            return Err(ResolutionError::rejected(message));
        }

        let track = response.into_track(id)?;
        info!(title = %track.title, artist = %track.artist, "track resolved");
        self.cache.insert(id, track.clone());
        Ok(track)
    }

    async fn fetch(&self, raw_url: &str) -> Result<ResolveResponse, ResolutionError> {
        let body = ResolveRequest {
            url: raw_url,
            timestamp: unix_millis(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ResolutionError::from_transport(&self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::http_status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ResolutionError::from_transport(&self.endpoint, e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ResolutionError::invalid_response(format!("malformed JSON body: {e}")))
    }

    /// Drops the cached entry for `id`, returning whether one existed.
    pub fn evict(&mut self, id: &str) -> bool {
        let removed = self.cache.remove(id).is_some();
        if removed {
            debug!(id, "evicted cached track");
        }
        removed
    }

    /// Returns the cached track for `id` without resolving.
    #[must_use]
    pub fn cached(&self, id: &str) -> Option<&ResolvedTrack> {
        self.cache.get(id)
    }

    /// Number of cached tracks.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// The resolution endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The underlying HTTP client, shared with cover preloading.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
