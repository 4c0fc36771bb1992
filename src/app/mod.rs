//! Run orchestration for the CLI: settings merge, link intake and the
//! per-link search/confirm loop.

pub(crate) mod config;
mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};
use trackgrab_core::download::{DownloadSurface, ShellBridge};
use trackgrab_core::{
    DEFAULT_API_ENDPOINT, Dispatcher, FetchSurface, Feedback, Host, HttpClient, HttpTimeouts,
    LocalShell, Notification, Resolver, Session, TrackSummary, link_from_fragment,
};

use crate::cli::{Args, HostChoice};
use config::FileConfig;
use terminal::TerminalFeedback;

/// Effective settings after CLI flags override the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunSettings {
    pub(crate) endpoint: String,
    pub(crate) output_dir: PathBuf,
    pub(crate) host: HostChoice,
    pub(crate) storage_root: PathBuf,
    pub(crate) resolver_timeouts: HttpTimeouts,
    pub(crate) download_timeouts: HttpTimeouts,
}

impl RunSettings {
    pub(crate) fn merge(args: &Args, file: &FileConfig) -> Self {
        let resolver_defaults = HttpTimeouts::resolver_defaults();
        let download_defaults = HttpTimeouts::download_defaults();
        Self {
            endpoint: args
                .api
                .clone()
                .or_else(|| file.api_endpoint.clone())
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
            output_dir: args
                .output_dir
                .clone()
                .or_else(|| file.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            host: args.host.or(file.host).unwrap_or(HostChoice::Browser),
            storage_root: args
                .storage_root
                .clone()
                .or_else(|| file.storage_root.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            resolver_timeouts: HttpTimeouts::new(
                file.resolver_connect_timeout_secs
                    .unwrap_or(resolver_defaults.connect_secs),
                file.resolver_read_timeout_secs
                    .unwrap_or(resolver_defaults.read_secs),
            ),
            download_timeouts: HttpTimeouts::new(
                file.download_connect_timeout_secs
                    .unwrap_or(download_defaults.connect_secs),
                file.download_read_timeout_secs
                    .unwrap_or(download_defaults.read_secs),
            ),
        }
    }
}

/// One link to process, and whether it came from a page fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkInput {
    pub(crate) link: String,
    pub(crate) deep_linked: bool,
}

/// Splits raw input into trimmed, non-empty links, unwrapping deep links.
pub(crate) fn collect_links<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<LinkInput> {
    lines
        .into_iter()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match link_from_fragment(line) {
            Some(link) => LinkInput {
                link,
                deep_linked: true,
            },
            None => LinkInput {
                link: line.to_string(),
                deep_linked: false,
            },
        })
        .collect()
}

fn build_session(settings: &RunSettings, feedback: Arc<dyn Feedback>) -> Result<Session> {
    let client =
        HttpClient::with_timeouts(settings.download_timeouts).context("Failed to build download client")?;
    let surface: Arc<dyn DownloadSurface> =
        Arc::new(FetchSurface::new(client.clone(), settings.output_dir.clone()));
    let bridge: Option<Arc<dyn ShellBridge>> = match settings.host {
        HostChoice::Browser => None,
        HostChoice::Shell => Some(Arc::new(LocalShell::new(
            settings.storage_root.clone(),
            client,
        ))),
    };
    let dispatcher = Dispatcher::new(Host::probe(surface, bridge), Arc::clone(&feedback));
    let resolver = Resolver::new(settings.endpoint.clone(), settings.resolver_timeouts)
        .context("Failed to build resolver client")?;
    Ok(Session::new(resolver, dispatcher, feedback))
}

fn print_summary(summary: &TrackSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!(
            "{} - {} ({}, {})\n  {}",
            summary.artist, summary.title, summary.duration, summary.size, summary.download_url
        );
    }
    Ok(())
}

/// Processes every link; returns true when all of them succeeded.
pub(crate) async fn run(args: &Args, settings: &RunSettings, links: Vec<LinkInput>) -> Result<bool> {
    let feedback: Arc<dyn Feedback> = Arc::new(TerminalFeedback::new(args.quiet));
    let mut session = build_session(settings, Arc::clone(&feedback))?;
    debug!(?settings, "session ready");

    let total = links.len();
    let mut failed = 0_usize;

    for input in links {
        if input.deep_linked {
            feedback.notify(Notification::success("URL loaded from link!"));
        }

        match session.search(&input.link).await {
            Ok(track) => {
                if args.info || args.json {
                    print_summary(&session.render(&track), args.json)?;
                }
                if !args.info && !session.confirm() {
                    failed += 1;
                }
            }
            Err(_) => failed += 1,
        }

        if args.fresh {
            session.reset();
        }
    }

    let report = session.settle().await;
    failed += report.failed;
    info!(
        links = total,
        downloaded = report.completed,
        failed,
        "run complete"
    );
    Ok(failed == 0)
}
