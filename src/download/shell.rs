//! Mobile-shell host: permission negotiation followed by a file transfer into
//! the shell's public `Download` folder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::DownloadJob;
use super::client::{SavedFile, TransferProgress};
use super::error::{DownloadError, TransferErrorCode};
use super::filename::safe_file_name;
use crate::feedback::{ConfirmState, Feedback, Notification};

/// Folder under the external root that receives downloads.
pub const DOWNLOAD_FOLDER: &str = "Download";

const COMPLETED_MESSAGE: &str = "Download completed! Saved in Download folder.";

/// Permissions a shell can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Write access to shared external storage.
    WriteExternalStorage,
}

/// The shell's permission plugin.
#[async_trait]
pub trait PermissionPlugin: Send + Sync {
    /// Reports whether `permission` is already granted.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::PermissionCheckFailed`] when the status is unavailable.
    async fn check(&self, permission: Permission) -> Result<bool, DownloadError>;

    /// Prompts for `permission`, returning whether it was granted.
    async fn request(&self, permission: Permission) -> bool;
}

/// The shell's file-transfer plugin.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Downloads `url` to `target`, reporting progress as bytes arrive.
    ///
    /// # Errors
    ///
    /// Returns the shell's numeric failure code.
    async fn download(
        &self,
        url: &str,
        target: &Path,
        on_progress: &(dyn Fn(TransferProgress) + Send + Sync),
    ) -> Result<SavedFile, TransferErrorCode>;
}

/// Capabilities exposed by a mobile shell.
#[async_trait]
pub trait ShellBridge: Send + Sync {
    /// Resolves once the shell is ready for plugin calls.
    async fn ready(&self);

    /// The permission plugin, if installed.
    fn permissions(&self) -> Option<&dyn PermissionPlugin>;

    /// The file-transfer plugin, if installed.
    fn file_transfer(&self) -> Option<&dyn FileTransfer>;

    /// Root of shared external storage, if the shell exposes one.
    fn external_root(&self) -> Option<PathBuf>;
}

/// Host that downloads through a [`ShellBridge`].
#[derive(Clone)]
pub struct MobileShellHost {
    bridge: Arc<dyn ShellBridge>,
}

impl std::fmt::Debug for MobileShellHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MobileShellHost").finish_non_exhaustive()
    }
}

impl MobileShellHost {
    /// Creates a host over `bridge`.
    #[must_use]
    pub fn new(bridge: Arc<dyn ShellBridge>) -> Self {
        Self { bridge }
    }

    /// Spawns [`transfer`](Self::transfer) on the current runtime.
    pub(crate) fn spawn(
        &self,
        job: DownloadJob,
        feedback: Arc<dyn Feedback>,
    ) -> Result<JoinHandle<bool>, DownloadError> {
        let handle = Handle::try_current()
            .map_err(|e| DownloadError::bridge_unavailable(format!("no async runtime: {e}")))?;
        let host = self.clone();
        Ok(handle.spawn(async move {
            host.transfer(&job, feedback.as_ref()).await.is_ok()
        }))
    }

    /// Runs the full permission and transfer sequence, reporting every step.
    ///
    /// The confirm control always ends in [`ConfirmState::Idle`].
    ///
    /// # Errors
    ///
    /// Returns the step that failed; it has already been reported to `feedback`.
    #[instrument(skip(self, job, feedback), fields(filename = %job.filename))]
    pub async fn transfer(
        &self,
        job: &DownloadJob,
        feedback: &dyn Feedback,
    ) -> Result<SavedFile, DownloadError> {
        self.bridge.ready().await;
        let outcome = self.run(job, feedback).await;

        match &outcome {
            Ok(saved) => {
                feedback.confirm_state(ConfirmState::Completed);
                feedback.notify(Notification::success(COMPLETED_MESSAGE));
                info!(path = %saved.path.display(), "file saved");
            }
            Err(error) => {
                feedback.confirm_state(ConfirmState::Failed);
                feedback.notify(Notification::error(error.user_message()));
                warn!(error = %error, "mobile download failed");
            }
        }
        feedback.confirm_state(ConfirmState::Idle);
        outcome
    }

    async fn run(
        &self,
        job: &DownloadJob,
        feedback: &dyn Feedback,
    ) -> Result<SavedFile, DownloadError> {
        let permissions = self
            .bridge
            .permissions()
            .ok_or(DownloadError::PluginMissing { plugin: "Permission" })?;

        feedback.confirm_state(ConfirmState::RequestingPermission);
        let granted = permissions
            .check(Permission::WriteExternalStorage)
            .await?;
        if !granted {
            debug!("storage permission not granted; requesting");
            if !permissions.request(Permission::WriteExternalStorage).await {
                return Err(DownloadError::PermissionDenied);
            }
        }

        let transfer = self
            .bridge
            .file_transfer()
            .ok_or(DownloadError::PluginMissing {
                plugin: "FileTransfer",
            })?;
        let root = self
            .bridge
            .external_root()
            .ok_or_else(|| DownloadError::bridge_unavailable("no external storage root"))?;
        let target = target_path(&root, &job.filename);

        feedback.confirm_state(ConfirmState::Transferring(0));
        let on_progress = |progress: TransferProgress| {
            if let Some(percent) = progress.percent() {
                feedback.confirm_state(ConfirmState::Transferring(percent));
            }
        };
        transfer
            .download(&job.url, &target, &on_progress)
            .await
            .map_err(|code| DownloadError::Transfer { code })
    }
}

/// `<root>/Download/<filename>`.
#[must_use]
pub fn target_path(root: &Path, filename: &str) -> PathBuf {
    root.join(DOWNLOAD_FOLDER).join(safe_file_name(filename))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::feedback::RecordingFeedback;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakePermissions {
        granted: AtomicBool,
        grant_on_request: bool,
        check_fails: bool,
        requests: AtomicUsize,
    }

    #[async_trait]
    impl PermissionPlugin for FakePermissions {
        async fn check(&self, _permission: Permission) -> Result<bool, DownloadError> {
            if self.check_fails {
                return Err(DownloadError::permission_check_failed("bridge error"));
            }
            Ok(self.granted.load(Ordering::SeqCst))
        }

        async fn request(&self, _permission: Permission) -> bool {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.grant_on_request {
                self.granted.store(true, Ordering::SeqCst);
            }
            self.grant_on_request
        }
    }

    #[derive(Default)]
    struct FakeTransfer {
        targets: Mutex<Vec<PathBuf>>,
        fail_with: Option<TransferErrorCode>,
    }

    #[async_trait]
    impl FileTransfer for FakeTransfer {
        async fn download(
            &self,
            _url: &str,
            target: &Path,
            on_progress: &(dyn Fn(TransferProgress) + Send + Sync),
        ) -> Result<SavedFile, TransferErrorCode> {
            self.targets.lock().unwrap().push(target.to_path_buf());
            if let Some(code) = self.fail_with {
                return Err(code);
            }
            on_progress(TransferProgress {
                length_computable: false,
                loaded: 10,
                total: 0,
            });
            on_progress(TransferProgress {
                length_computable: true,
                loaded: 50,
                total: 100,
            });
            Ok(SavedFile {
                path: target.to_path_buf(),
                bytes: 100,
            })
        }
    }

    struct FakeBridge {
        permissions: Option<FakePermissions>,
        transfer: Option<FakeTransfer>,
    }

    #[async_trait]
    impl ShellBridge for FakeBridge {
        async fn ready(&self) {}

        fn permissions(&self) -> Option<&dyn PermissionPlugin> {
            self.permissions.as_ref().map(|p| p as &dyn PermissionPlugin)
        }

        fn file_transfer(&self) -> Option<&dyn FileTransfer> {
            self.transfer.as_ref().map(|t| t as &dyn FileTransfer)
        }

        fn external_root(&self) -> Option<PathBuf> {
            Some(PathBuf::from("/storage/emulated/0"))
        }
    }

    fn permissions(granted: bool, grant_on_request: bool) -> FakePermissions {
        FakePermissions {
            granted: AtomicBool::new(granted),
            grant_on_request,
            check_fails: false,
            requests: AtomicUsize::new(0),
        }
    }

    fn job() -> DownloadJob {
        DownloadJob {
            url: "http://x/y.mp3".to_string(),
            filename: "Band - Song.mp3".to_string(),
        }
    }

    #[tokio::test]
    async fn test_granted_transfer_reports_progress_and_completes() {
        let bridge = Arc::new(FakeBridge {
            permissions: Some(permissions(true, false)),
            transfer: Some(FakeTransfer::default()),
        });
        let host = MobileShellHost::new(bridge.clone());
        let feedback = RecordingFeedback::new();

        let saved = host.transfer(&job(), &feedback).await.unwrap();

        assert_eq!(
            saved.path,
            PathBuf::from("/storage/emulated/0/Download/Band - Song.mp3")
        );
        assert_eq!(
            feedback.states(),
            vec![
                ConfirmState::RequestingPermission,
                ConfirmState::Transferring(0),
                ConfirmState::Transferring(50),
                ConfirmState::Completed,
                ConfirmState::Idle,
            ]
        );
        assert_eq!(feedback.messages(), vec![COMPLETED_MESSAGE]);
    }

    #[tokio::test]
    async fn test_denied_permission_skips_transfer() {
        let bridge = Arc::new(FakeBridge {
            permissions: Some(permissions(false, false)),
            transfer: Some(FakeTransfer::default()),
        });
        let host = MobileShellHost::new(bridge.clone());
        let feedback = RecordingFeedback::new();

        let result = host.transfer(&job(), &feedback).await;

        assert!(matches!(result, Err(DownloadError::PermissionDenied)));
        let perms = bridge.permissions.as_ref().unwrap();
        assert_eq!(perms.requests.load(Ordering::SeqCst), 1);
        assert!(bridge.transfer.as_ref().unwrap().targets.lock().unwrap().is_empty());
        assert_eq!(feedback.messages(), vec!["Storage permission denied."]);
        assert_eq!(feedback.states().last(), Some(&ConfirmState::Idle));
    }

    #[tokio::test]
    async fn test_request_grant_proceeds_to_transfer() {
        let bridge = Arc::new(FakeBridge {
            permissions: Some(permissions(false, true)),
            transfer: Some(FakeTransfer::default()),
        });
        let host = MobileShellHost::new(bridge.clone());
        let feedback = RecordingFeedback::new();

        assert!(host.transfer(&job(), &feedback).await.is_ok());
        assert_eq!(bridge.transfer.as_ref().unwrap().targets.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_plugins_are_reported() {
        let feedback = RecordingFeedback::new();
        let no_permissions = MobileShellHost::new(Arc::new(FakeBridge {
            permissions: None,
            transfer: Some(FakeTransfer::default()),
        }));
        assert!(no_permissions.transfer(&job(), &feedback).await.is_err());

        let no_transfer = MobileShellHost::new(Arc::new(FakeBridge {
            permissions: Some(permissions(true, false)),
            transfer: None,
        }));
        assert!(no_transfer.transfer(&job(), &feedback).await.is_err());

        assert_eq!(
            feedback.messages(),
            vec!["Permission plugin missing.", "FileTransfer plugin missing."]
        );
    }

    #[tokio::test]
    async fn test_check_error_and_transfer_code_messages() {
        let feedback = RecordingFeedback::new();
        let mut failing = permissions(true, false);
        failing.check_fails = true;
        let check_fails = MobileShellHost::new(Arc::new(FakeBridge {
            permissions: Some(failing),
            transfer: Some(FakeTransfer::default()),
        }));
        assert!(check_fails.transfer(&job(), &feedback).await.is_err());

        let transfer_fails = MobileShellHost::new(Arc::new(FakeBridge {
            permissions: Some(permissions(true, false)),
            transfer: Some(FakeTransfer {
                targets: Mutex::new(Vec::new()),
                fail_with: Some(TransferErrorCode::Connection),
            }),
        }));
        assert!(transfer_fails.transfer(&job(), &feedback).await.is_err());

        assert_eq!(
            feedback.messages(),
            vec!["Permission check failed.", "Download failed: 3"]
        );
    }

    #[tokio::test]
    async fn test_plugin_abort_is_reported_with_its_code() {
        let feedback = RecordingFeedback::new();
        let host = MobileShellHost::new(Arc::new(FakeBridge {
            permissions: Some(permissions(true, false)),
            transfer: Some(FakeTransfer {
                targets: Mutex::new(Vec::new()),
                fail_with: Some(TransferErrorCode::Abort),
            }),
        }));

        let result = host.transfer(&job(), &feedback).await;

        assert!(matches!(
            result,
            Err(DownloadError::Transfer {
                code: TransferErrorCode::Abort
            })
        ));
        assert_eq!(feedback.messages(), vec!["Download failed: 4"]);
        assert_eq!(feedback.states().last(), Some(&ConfirmState::Idle));
    }

    #[test]
    fn test_target_path_stays_in_download_folder() {
        let root = Path::new("/sd");
        assert_eq!(
            target_path(root, "a.mp3"),
            PathBuf::from("/sd/Download/a.mp3")
        );
        assert_eq!(
            target_path(root, "../escape.mp3"),
            PathBuf::from("/sd/Download/download.mp3")
        );
    }
}
