//! Shared HTTP client construction policy.
//!
//! The resolver and the download client both build their `reqwest::Client`
//! here so they agree on timeouts, compression and proxy handling.

use std::panic::{AssertUnwindSafe, catch_unwind, set_hook, take_hook};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

/// Default connect timeout for resolution requests.
pub const DEFAULT_RESOLVER_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default total timeout for resolution requests.
pub const DEFAULT_RESOLVER_READ_TIMEOUT_SECS: u64 = 30;
/// Default connect timeout for file transfers.
pub const DEFAULT_DOWNLOAD_CONNECT_TIMEOUT_SECS: u64 = 30;
/// Default total timeout for file transfers (large audio files).
pub const DEFAULT_DOWNLOAD_READ_TIMEOUT_SECS: u64 = 300;

/// Connect and read timeouts applied to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Seconds allowed to establish a connection.
    pub connect_secs: u64,
    /// Seconds allowed for the whole request, body included.
    pub read_secs: u64,
}

impl HttpTimeouts {
    /// Creates explicit timeouts.
    #[must_use]
    pub fn new(connect_secs: u64, read_secs: u64) -> Self {
        Self {
            connect_secs,
            read_secs,
        }
    }

    /// Defaults for the resolution endpoint.
    #[must_use]
    pub fn resolver_defaults() -> Self {
        Self::new(
            DEFAULT_RESOLVER_CONNECT_TIMEOUT_SECS,
            DEFAULT_RESOLVER_READ_TIMEOUT_SECS,
        )
    }

    /// Defaults for file transfers.
    #[must_use]
    pub fn download_defaults() -> Self {
        Self::new(
            DEFAULT_DOWNLOAD_CONNECT_TIMEOUT_SECS,
            DEFAULT_DOWNLOAD_READ_TIMEOUT_SECS,
        )
    }
}

/// Builds an HTTP client with the given User-Agent and timeouts.
///
/// Some sandboxed environments panic while reading system proxy settings; in
/// that case the build is retried with system lookup disabled and only the
/// `*_PROXY` environment variables applied.
///
/// # Errors
///
/// Returns the underlying `reqwest::Error` when the builder rejects the
/// configuration, or a panic-equivalent error when both attempts panic.
pub(crate) fn build_http_client(
    user_agent: &str,
    timeouts: HttpTimeouts,
) -> Result<Client, ClientBuildError> {
    match try_build_client(user_agent, timeouts, false) {
        Ok(client) => Ok(client),
        Err(ClientBuildError::Panicked) => {
            warn!(
                "HTTP client builder panicked while loading system proxy settings; retrying with env-proxy fallback"
            );
            try_build_client(user_agent, timeouts, true)
        }
        Err(error) => Err(error),
    }
}

/// Why a client could not be built.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ClientBuildError {
    #[error("HTTP client builder panicked")]
    Panicked,
    #[error(transparent)]
    Build(#[from] reqwest::Error),
}

// `catch_unwind` does not suppress panic-hook stderr output, so the hook is
// swapped out for the duration of the guarded build.
static CLIENT_BUILD_PANIC_HOOK_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn try_build_client(
    user_agent: &str,
    timeouts: HttpTimeouts,
    disable_system_proxy_lookup: bool,
) -> Result<Client, ClientBuildError> {
    let user_agent = user_agent.to_string();
    catch_unwind_silent(AssertUnwindSafe(move || {
        let mut builder = base_builder(user_agent, timeouts);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(ClientBuildError::Build)
    }))
    .map_err(|_| ClientBuildError::Panicked)?
}

fn catch_unwind_silent<F, T>(operation: F) -> Result<T, Box<dyn std::any::Any + Send + 'static>>
where
    F: FnOnce() -> T + std::panic::UnwindSafe,
{
    let _panic_hook_guard = CLIENT_BUILD_PANIC_HOOK_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let previous_hook = take_hook();
    set_hook(Box::new(|_| {}));
    let outcome = catch_unwind(operation);
    set_hook(previous_hook);
    outcome
}

fn base_builder(user_agent: String, timeouts: HttpTimeouts) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.read_secs))
        .user_agent(user_agent)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
