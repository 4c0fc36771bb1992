//! Download dispatch for resolved tracks.
//!
//! A [`Dispatcher`] hands a [`DownloadJob`] to one of two hosts:
//!
//! - [`Host::Browser`] - attaches and activates a transient trigger on a
//!   [`DownloadSurface`]; success is reported as soon as the trigger fires
//! - [`Host::MobileShell`] - negotiates storage permission through a
//!   [`ShellBridge`] and runs a file transfer into `<root>/Download/`
//!
//! The crate ships one implementation of each seam: [`FetchSurface`] streams
//! triggers into a directory, [`LocalShell`] emulates a shell on the local
//! filesystem. Both are backed by [`HttpClient`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use trackgrab_core::download::{Dispatcher, DownloadJob, FetchSurface, Host, HttpClient};
//! use trackgrab_core::feedback::LogFeedback;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let surface = Arc::new(FetchSurface::new(HttpClient::new()?, "./downloads"));
//! let dispatcher = Dispatcher::new(Host::probe(surface, None), Arc::new(LogFeedback));
//! let job = DownloadJob::new("https://example.com/a.mp3", "Band - Song.mp3");
//! dispatcher.dispatch(&job);
//! let report = dispatcher.settle().await;
//! println!("{} completed, {} failed", report.completed, report.failed);
//! # Ok(())
//! # }
//! ```

mod browser;
mod client;
mod error;
mod filename;
mod local_shell;
mod shell;

pub use browser::{
    BrowserHost, DownloadSurface, DownloadTrigger, FetchSurface, TRIGGER_LINGER, TriggerId,
};
pub use client::{HttpClient, SavedFile, TransferProgress};
pub use error::{DownloadError, TransferErrorCode};
pub use filename::{MAX_FILENAME_UNITS, UNKNOWN_NAME, sanitize_filename, track_filename};
pub use local_shell::{LocalFileTransfer, LocalShell, LocalStoragePermissions};
pub use shell::{
    DOWNLOAD_FOLDER, FileTransfer, MobileShellHost, Permission, PermissionPlugin, ShellBridge,
    target_path,
};

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::feedback::{Feedback, Notification};
use crate::resolver::ResolvedTrack;

/// What to download and what to call it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadJob {
    /// Source URL. Empty means the link is not ready.
    pub url: String,
    /// Target filename.
    pub filename: String,
}

impl DownloadJob {
    /// Creates a job from raw parts.
    #[must_use]
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
        }
    }

    /// Job for a resolved track, named `Artist - Title.mp3`.
    #[must_use]
    pub fn for_track(track: &ResolvedTrack) -> Self {
        Self {
            url: track.download_url.clone(),
            filename: track_filename(Some(&track.title), Some(&track.artist)),
        }
    }
}

/// Outcome counts for background downloads awaited by `settle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleReport {
    /// Downloads that finished.
    pub completed: usize,
    /// Downloads that failed.
    pub failed: usize,
}

impl SettleReport {
    /// Adds another report's counts.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            completed: self.completed + other.completed,
            failed: self.failed + other.failed,
        }
    }
}

/// Which kind of host a [`Host`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    /// Trigger-based host.
    Browser,
    /// Permission plus file-transfer host.
    MobileShell,
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Browser => write!(f, "browser"),
            Self::MobileShell => write!(f, "shell"),
        }
    }
}

/// The environment downloads run in.
#[derive(Debug, Clone)]
pub enum Host {
    /// Trigger-based downloads.
    Browser(BrowserHost),
    /// Shell-mediated downloads.
    MobileShell(MobileShellHost),
}

impl Host {
    /// Picks the mobile shell when a bridge is available, else the browser surface.
    #[must_use]
    pub fn probe(
        surface: Arc<dyn DownloadSurface>,
        bridge: Option<Arc<dyn ShellBridge>>,
    ) -> Self {
        match bridge {
            Some(bridge) => Self::MobileShell(MobileShellHost::new(bridge)),
            None => Self::Browser(BrowserHost::new(surface)),
        }
    }

    /// The host kind.
    #[must_use]
    pub fn kind(&self) -> HostKind {
        match self {
            Self::Browser(_) => HostKind::Browser,
            Self::MobileShell(_) => HostKind::MobileShell,
        }
    }
}

/// Starts downloads on a [`Host`] and tracks the background work.
pub struct Dispatcher {
    host: Host,
    feedback: Arc<dyn Feedback>,
    tasks: Mutex<Vec<JoinHandle<bool>>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher reporting to `feedback`.
    #[must_use]
    pub fn new(host: Host, feedback: Arc<dyn Feedback>) -> Self {
        Self {
            host,
            feedback,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// The host downloads run on.
    #[must_use]
    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Starts a download, returning whether it was started.
    ///
    /// Never blocks on the transfer. Every failure is reported through the
    /// feedback sink rather than returned. Shell transfers run in the
    /// background; await them with [`settle`](Self::settle).
    #[instrument(skip(self, job), fields(host = %self.host.kind(), filename = %job.filename))]
    pub fn dispatch(&self, job: &DownloadJob) -> bool {
        if job.url.trim().is_empty() {
            warn!("download requested before a link was ready");
            self.feedback
                .notify(Notification::error(DownloadError::EmptyUrl.user_message()));
            return false;
        }

        match &self.host {
            Host::Browser(browser) => browser.start(job, self.feedback.as_ref()),
            Host::MobileShell(shell) => match shell.spawn(job.clone(), Arc::clone(&self.feedback)) {
                Ok(task) => {
                    debug!("shell transfer spawned");
                    self.tasks
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(task);
                    true
                }
                Err(error) => {
                    warn!(error = %error, "cannot start shell transfer");
                    self.feedback
                        .notify(Notification::error(error.user_message()));
                    false
                }
            },
        }
    }

    /// Waits for every download started so far.
    pub async fn settle(&self) -> SettleReport {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        let mut report = SettleReport::default();
        for task in tasks {
            match task.await {
                Ok(true) => report.completed += 1,
                Ok(false) => report.failed += 1,
                Err(error) => {
                    warn!(error = %error, "shell transfer task panicked");
                    report.failed += 1;
                }
            }
        }

        if let Host::Browser(browser) = &self.host {
            report = report.merge(browser.surface().settle().await);
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::feedback::RecordingFeedback;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSurface {
        attached: AtomicUsize,
        activated: AtomicUsize,
    }

    impl DownloadSurface for CountingSurface {
        fn attach(&self, _trigger: DownloadTrigger) -> Result<TriggerId, DownloadError> {
            let n = self.attached.fetch_add(1, Ordering::SeqCst);
            Ok(TriggerId(n as u64))
        }

        fn activate(&self, _id: TriggerId) -> Result<(), DownloadError> {
            self.activated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn detach(&self, _id: TriggerId) {}
    }

    fn track() -> ResolvedTrack {
        ResolvedTrack {
            id: "abc".to_string(),
            title: "Song: Live".to_string(),
            artist: "Band".to_string(),
            duration_secs: None,
            size_bytes: None,
            cover_url: None,
            download_url: "http://x/y.mp3".to_string(),
        }
    }

    #[test]
    fn test_job_for_track_sanitizes_name() {
        let job = DownloadJob::for_track(&track());
        assert_eq!(job.url, "http://x/y.mp3");
        assert_eq!(job.filename, "Band - Song_ Live.mp3");
    }

    #[test]
    fn test_probe_prefers_shell_bridge() {
        let surface: Arc<dyn DownloadSurface> = Arc::new(CountingSurface::default());
        assert_eq!(Host::probe(surface.clone(), None).kind(), HostKind::Browser);

        let client = HttpClient::from_client(reqwest::Client::new());
        let bridge: Arc<dyn ShellBridge> = Arc::new(LocalShell::new("/tmp/x", client));
        assert_eq!(
            Host::probe(surface, Some(bridge)).kind(),
            HostKind::MobileShell
        );
    }

    #[test]
    fn test_empty_url_fails_fast() {
        let surface = Arc::new(CountingSurface::default());
        let feedback = Arc::new(RecordingFeedback::new());
        let dispatcher = Dispatcher::new(Host::probe(surface.clone(), None), feedback.clone());

        assert!(!dispatcher.dispatch(&DownloadJob::default()));
        assert_eq!(surface.attached.load(Ordering::SeqCst), 0);
        assert_eq!(feedback.messages(), vec!["Download link is not ready yet."]);
    }

    #[tokio::test]
    async fn test_browser_dispatch_attaches_one_trigger() {
        let surface = Arc::new(CountingSurface::default());
        let feedback = Arc::new(RecordingFeedback::new());
        let dispatcher = Dispatcher::new(Host::probe(surface.clone(), None), feedback.clone());

        assert!(dispatcher.dispatch(&DownloadJob::for_track(&track())));
        assert_eq!(surface.attached.load(Ordering::SeqCst), 1);
        assert_eq!(surface.activated.load(Ordering::SeqCst), 1);
        assert_eq!(
            feedback.messages(),
            vec!["Download started! Check your downloads folder."]
        );
        assert_eq!(dispatcher.settle().await, SettleReport::default());
    }

    #[test]
    fn test_shell_dispatch_without_runtime_reports_failure() {
        let client = HttpClient::from_client(reqwest::Client::new());
        let bridge: Arc<dyn ShellBridge> = Arc::new(LocalShell::new("/tmp/x", client));
        let surface: Arc<dyn DownloadSurface> = Arc::new(CountingSurface::default());
        let feedback = Arc::new(RecordingFeedback::new());
        let dispatcher = Dispatcher::new(Host::probe(surface, Some(bridge)), feedback.clone());

        assert!(!dispatcher.dispatch(&DownloadJob::for_track(&track())));
        assert_eq!(feedback.messages(), vec!["Mobile download failed."]);
    }

    #[test]
    fn test_settle_report_merge() {
        let a = SettleReport {
            completed: 1,
            failed: 2,
        };
        let b = SettleReport {
            completed: 3,
            failed: 0,
        };
        assert_eq!(
            a.merge(b),
            SettleReport {
                completed: 4,
                failed: 2
            }
        );
    }
}
