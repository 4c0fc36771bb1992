//! Shared User-Agent strings for resolver and download HTTP clients.
//!
//! Single source for the project URL and UA format so resolution and
//! transfer traffic stay consistent and easy to update.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/trackgrab";

/// Default User-Agent for download requests.
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("trackgrab/{version} (track-downloader; +{PROJECT_UA_URL})")
}

/// Default User-Agent for resolution endpoint requests.
#[must_use]
pub(crate) fn default_resolver_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("trackgrab/{version} (link-resolver; +{PROJECT_UA_URL})")
}
