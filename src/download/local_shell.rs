//! A [`ShellBridge`] backed by the local filesystem.
//!
//! "Permission" means the `Download/` folder under the storage root exists and
//! is writable; requesting it creates the folder. Transfers stream over HTTP.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::client::{HttpClient, SavedFile, TransferProgress};
use super::error::{DownloadError, TransferErrorCode};
use super::shell::{DOWNLOAD_FOLDER, FileTransfer, Permission, PermissionPlugin, ShellBridge};

/// Storage permission over a local directory.
#[derive(Debug, Clone)]
pub struct LocalStoragePermissions {
    download_dir: PathBuf,
}

#[async_trait]
impl PermissionPlugin for LocalStoragePermissions {
    async fn check(&self, _permission: Permission) -> Result<bool, DownloadError> {
        match tokio::fs::metadata(&self.download_dir).await {
            Ok(meta) => Ok(meta.is_dir() && !meta.permissions().readonly()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DownloadError::permission_check_failed(e.to_string())),
        }
    }

    async fn request(&self, permission: Permission) -> bool {
        if let Err(error) = tokio::fs::create_dir_all(&self.download_dir).await {
            debug!(error = %error, dir = %self.download_dir.display(), "cannot create download folder");
            return false;
        }
        self.check(permission).await.unwrap_or(false)
    }
}

/// File transfer over HTTP into local paths.
#[derive(Debug, Clone)]
pub struct LocalFileTransfer {
    client: HttpClient,
}

#[async_trait]
impl FileTransfer for LocalFileTransfer {
    #[instrument(skip(self, on_progress), fields(target = %target.display()))]
    async fn download(
        &self,
        url: &str,
        target: &Path,
        on_progress: &(dyn Fn(TransferProgress) + Send + Sync),
    ) -> Result<SavedFile, TransferErrorCode> {
        self.client
            .download_to_path(url, target, on_progress)
            .await
            .map_err(|error| {
                debug!(error = %error, "local transfer failed");
                error.transfer_code()
            })
    }
}

/// Filesystem-backed shell rooted at a storage directory.
#[derive(Debug, Clone)]
pub struct LocalShell {
    root: PathBuf,
    permissions: LocalStoragePermissions,
    transfer: LocalFileTransfer,
}

impl LocalShell {
    /// Creates a shell whose external storage is `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, client: HttpClient) -> Self {
        let root = root.into();
        Self {
            permissions: LocalStoragePermissions {
                download_dir: root.join(DOWNLOAD_FOLDER),
            },
            transfer: LocalFileTransfer { client },
            root,
        }
    }

    /// The storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ShellBridge for LocalShell {
    async fn ready(&self) {}

    fn permissions(&self) -> Option<&dyn PermissionPlugin> {
        Some(&self.permissions)
    }

    fn file_transfer(&self) -> Option<&dyn FileTransfer> {
        Some(&self.transfer)
    }

    fn external_root(&self) -> Option<PathBuf> {
        Some(self.root.clone())
    }
}
