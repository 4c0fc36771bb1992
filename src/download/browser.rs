//! Browser-style host: downloads start by activating a transient trigger.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use super::error::DownloadError;
use super::filename::reserve_unique_path;
use super::{DownloadJob, SettleReport};
use crate::feedback::{Feedback, Notification};

/// How long a trigger stays attached after activation.
pub const TRIGGER_LINGER: Duration = Duration::from_secs(2);

const STARTED_MESSAGE: &str = "Download started! Check your downloads folder.";
const STARTED_DURATION: Duration = Duration::from_millis(3000);
const START_FAILED_MESSAGE: &str = "Failed to start download.";

/// Identifies an attached trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerId(pub u64);

/// A transient download trigger: the URL to fetch and the suggested name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTrigger {
    /// Source URL.
    pub url: String,
    /// Suggested filename.
    pub filename: String,
    /// Whether the fetch should happen outside the current context.
    pub detached_context: bool,
}

impl DownloadTrigger {
    /// Trigger for a job, opened in a detached context.
    #[must_use]
    pub fn for_job(job: &DownloadJob) -> Self {
        Self {
            url: job.url.clone(),
            filename: job.filename.clone(),
            detached_context: true,
        }
    }
}

/// Where browser-style triggers are attached and activated.
#[async_trait]
pub trait DownloadSurface: Send + Sync {
    /// Attaches a trigger, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::TriggerFailed`] when the surface cannot hold it.
    fn attach(&self, trigger: DownloadTrigger) -> Result<TriggerId, DownloadError>;

    /// Activates a previously attached trigger.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::TriggerFailed`] when activation fails.
    fn activate(&self, id: TriggerId) -> Result<(), DownloadError>;

    /// Removes a trigger. Unknown ids are ignored.
    fn detach(&self, id: TriggerId);

    /// Waits for any work the surface started in the background.
    async fn settle(&self) -> SettleReport {
        SettleReport::default()
    }
}

/// Host that starts downloads through a [`DownloadSurface`].
#[derive(Clone)]
pub struct BrowserHost {
    surface: Arc<dyn DownloadSurface>,
    linger: Duration,
}

impl std::fmt::Debug for BrowserHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserHost")
            .field("linger", &self.linger)
            .finish_non_exhaustive()
    }
}

impl BrowserHost {
    /// Creates a host over `surface` with the default linger.
    #[must_use]
    pub fn new(surface: Arc<dyn DownloadSurface>) -> Self {
        Self::with_linger(surface, TRIGGER_LINGER)
    }

    /// Creates a host with an explicit linger before detaching triggers.
    #[must_use]
    pub fn with_linger(surface: Arc<dyn DownloadSurface>, linger: Duration) -> Self {
        Self { surface, linger }
    }

    /// The underlying surface.
    #[must_use]
    pub fn surface(&self) -> &Arc<dyn DownloadSurface> {
        &self.surface
    }

    /// Fires the trigger and reports the outcome. Never propagates errors.
    pub(crate) fn start(&self, job: &DownloadJob, feedback: &dyn Feedback) -> bool {
        match self.fire(job) {
            Ok(()) => {
                feedback.notify(Notification::success(STARTED_MESSAGE).lasting(STARTED_DURATION));
                true
            }
            Err(error) => {
                warn!(error = %error, "browser download trigger failed");
                feedback.notify(Notification::error(START_FAILED_MESSAGE));
                false
            }
        }
    }

    fn fire(&self, job: &DownloadJob) -> Result<(), DownloadError> {
        let id = self.surface.attach(DownloadTrigger::for_job(job))?;
        if let Err(error) = self.surface.activate(id) {
            self.surface.detach(id);
            return Err(error);
        }
        debug!(trigger = id.0, filename = %job.filename, "download trigger activated");
        self.schedule_detach(id);
        Ok(())
    }

    fn schedule_detach(&self, id: TriggerId) {
        let surface = Arc::clone(&self.surface);
        let linger = self.linger;
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(linger).await;
                    surface.detach(id);
                });
            }
            Err(_) => surface.detach(id),
        }
    }
}

/// Surface that performs each activated trigger as a streaming HTTP download
/// into a directory.
#[derive(Debug)]
pub struct FetchSurface {
    client: HttpClient,
    output_dir: PathBuf,
    next_id: AtomicU64,
    attached: Mutex<HashMap<TriggerId, DownloadTrigger>>,
    tasks: Mutex<Vec<JoinHandle<bool>>>,
}

impl FetchSurface {
    /// Creates a surface writing into `output_dir`.
    #[must_use]
    pub fn new(client: HttpClient, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
            next_id: AtomicU64::new(1),
            attached: Mutex::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Directory downloads are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Number of triggers currently attached.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[instrument(skip(client, trigger), fields(url = %trigger.url))]
async fn fetch_trigger(client: HttpClient, output_dir: PathBuf, trigger: DownloadTrigger) -> bool {
    if let Err(error) = tokio::fs::create_dir_all(&output_dir).await {
        warn!(error = %error, dir = %output_dir.display(), "cannot create output directory");
        return false;
    }
    let (path, file) = match reserve_unique_path(&output_dir, &trigger.filename).await {
        Ok(reserved) => reserved,
        Err(error) => {
            warn!(error = %error, dir = %output_dir.display(), "cannot reserve output file");
            return false;
        }
    };
    match client.download_into_file(&trigger.url, file, &path, &|_| {}).await {
        Ok(saved) => {
            info!(path = %saved.path.display(), bytes = saved.bytes, "saved download");
            true
        }
        Err(error) => {
            warn!(error = %error, "download failed");
            false
        }
    }
}

#[async_trait]
impl DownloadSurface for FetchSurface {
    fn attach(&self, trigger: DownloadTrigger) -> Result<TriggerId, DownloadError> {
        let id = TriggerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, trigger);
        Ok(id)
    }

    fn activate(&self, id: TriggerId) -> Result<(), DownloadError> {
        let trigger = self
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| DownloadError::trigger_failed(format!("trigger {} not attached", id.0)))?;
        let handle = Handle::try_current()
            .map_err(|e| DownloadError::trigger_failed(format!("no async runtime: {e}")))?;

        let task = handle.spawn(fetch_trigger(
            self.client.clone(),
            self.output_dir.clone(),
            trigger,
        ));
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
        Ok(())
    }

    fn detach(&self, id: TriggerId) {
        self.attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    async fn settle(&self) -> SettleReport {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        let mut report = SettleReport::default();
        for task in tasks {
            match task.await {
                Ok(true) => report.completed += 1,
                Ok(false) => report.failed += 1,
                Err(error) => {
                    warn!(error = %error, "download task panicked");
                    report.failed += 1;
                }
            }
        }
        report
    }
}
