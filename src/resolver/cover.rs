//! Cover art preloading with a bounded wait.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Client;
use tracing::{debug, instrument};

use crate::format::{DEFAULT_COVER_SIZE, DEFAULT_COVER_URL, optimize_cover_url};
use crate::parser::PRIMARY_DOMAIN;

/// How long a cover may take to load before the default cover is used.
pub const COVER_PRELOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Loads the optimized cover, returning the URL to display.
///
/// Falls back to [`DEFAULT_COVER_URL`] when no cover is given, the fetch
/// fails, or it takes longer than [`COVER_PRELOAD_TIMEOUT`].
pub async fn preload_cover(client: &Client, cover: Option<&str>) -> String {
    preload_cover_with_timeout(client, cover, COVER_PRELOAD_TIMEOUT).await
}

/// [`preload_cover`] with an explicit time bound.
#[instrument(skip(client))]
pub async fn preload_cover_with_timeout(
    client: &Client,
    cover: Option<&str>,
    limit: Duration,
) -> String {
    let Some(cover) = cover.filter(|c| !c.is_empty()) else {
        return DEFAULT_COVER_URL.to_string();
    };

    let optimized = optimize_cover_url(Some(cover), DEFAULT_COVER_SIZE);
    let fetch_url = with_cache_buster(&optimized);

    match tokio::time::timeout(limit, fetch_image(client, &fetch_url)).await {
        Ok(Ok(())) => optimized,
        Ok(Err(error)) => {
            debug!(error = %error, "cover failed to load; using default cover");
            DEFAULT_COVER_URL.to_string()
        }
        Err(_) => {
            debug!(timeout_ms = limit.as_millis(), "cover load timed out; using default cover");
            DEFAULT_COVER_URL.to_string()
        }
    }
}

async fn fetch_image(client: &Client, url: &str) -> Result<(), reqwest::Error> {
    client.get(url).send().await?.error_for_status()?.bytes().await?;
    Ok(())
}

/// Provider covers are aggressively cached upstream; add a timestamp so a
/// repeated preload really hits the network.
fn with_cache_buster(url: &str) -> String {
    if !url.contains(PRIMARY_DOMAIN) {
        return url.to_string();
    }
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}t={millis}")
}
