//! Error types for the download module.
//!
//! Covers both the HTTP transfer itself and the host-side steps around it
//! (permission negotiation, missing plugins, trigger failures).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// File-transfer failure codes reported by a mobile shell.
///
/// The numeric values match the shell's file-transfer plugin so they can be
/// shown to the user unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferErrorCode {
    /// The remote file or the local target could not be found or written.
    FileNotFound,
    /// The source URL is not valid.
    InvalidUrl,
    /// The connection failed or the server answered with an error.
    Connection,
    /// The transfer was aborted by the shell.
    ///
    /// [`crate::download::LocalShell`] never reports it since transfers
    /// cannot be cancelled; a shell's own plugin may still return it.
    Abort,
    /// The server reported the resource as not modified.
    NotModified,
}

impl TransferErrorCode {
    /// Numeric code as reported by the shell.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::FileNotFound => 1,
            Self::InvalidUrl => 2,
            Self::Connection => 3,
            Self::Abort => 4,
            Self::NotModified => 5,
        }
    }
}

impl fmt::Display for TransferErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors that can occur while dispatching or performing a download.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error during download (create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {reason}")]
    ClientBuild {
        /// Builder failure description.
        reason: String,
    },

    /// No download URL was available when the download was confirmed.
    #[error("download URL is empty")]
    EmptyUrl,

    /// The user declined the storage permission request.
    #[error("storage permission denied")]
    PermissionDenied,

    /// The shell failed to report the permission status.
    #[error("permission check failed: {reason}")]
    PermissionCheckFailed {
        /// Host-reported reason.
        reason: String,
    },

    /// A shell plugin the transfer depends on is not installed.
    #[error("{plugin} plugin missing")]
    PluginMissing {
        /// Plugin name as shown to the user.
        plugin: &'static str,
    },

    /// The shell's file transfer failed.
    #[error("file transfer failed with code {code}")]
    Transfer {
        /// Shell-reported error code.
        code: TransferErrorCode,
    },

    /// The download trigger could not be created or activated.
    #[error("failed to start download: {reason}")]
    TriggerFailed {
        /// Why the trigger failed.
        reason: String,
    },

    /// The shell bridge cannot be used (no runtime, missing storage root).
    #[error("mobile shell unavailable: {reason}")]
    BridgeUnavailable {
        /// Why the bridge is unavailable.
        reason: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a permission-check failure.
    pub fn permission_check_failed(reason: impl Into<String>) -> Self {
        Self::PermissionCheckFailed {
            reason: reason.into(),
        }
    }

    /// Creates a trigger failure.
    pub fn trigger_failed(reason: impl Into<String>) -> Self {
        Self::TriggerFailed {
            reason: reason.into(),
        }
    }

    /// Creates a bridge-unavailable error.
    pub fn bridge_unavailable(reason: impl Into<String>) -> Self {
        Self::BridgeUnavailable {
            reason: reason.into(),
        }
    }

    /// Maps a transfer failure onto the shell's file-transfer error codes.
    #[must_use]
    pub fn transfer_code(&self) -> TransferErrorCode {
        match self {
            Self::Transfer { code } => *code,
            Self::InvalidUrl { .. } | Self::EmptyUrl => TransferErrorCode::InvalidUrl,
            Self::Io { .. } => TransferErrorCode::FileNotFound,
            Self::HttpStatus { status: 404, .. } => TransferErrorCode::FileNotFound,
            Self::HttpStatus { status: 304, .. } => TransferErrorCode::NotModified,
            _ => TransferErrorCode::Connection,
        }
    }

    /// Message shown to the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyUrl => "Download link is not ready yet.".to_string(),
            Self::PermissionDenied => "Storage permission denied.".to_string(),
            Self::PermissionCheckFailed { .. } => "Permission check failed.".to_string(),
            Self::PluginMissing { plugin } => format!("{plugin} plugin missing."),
            Self::Transfer { code } => format!("Download failed: {code}"),
            Self::TriggerFailed { .. } => "Failed to start download.".to_string(),
            Self::BridgeUnavailable { .. } => "Mobile download failed.".to_string(),
            other => format!("Download failed: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_http_status_display() {
        let error = DownloadError::http_status("https://example.com/a.mp3", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("https://example.com/a.mp3"));
    }

    #[test]
    fn test_download_error_io_display() {
        let error = DownloadError::io(
            "/tmp/a.mp3",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(error.to_string().contains("/tmp/a.mp3"));
    }

    #[test]
    fn test_transfer_codes_match_shell_values() {
        assert_eq!(TransferErrorCode::FileNotFound.code(), 1);
        assert_eq!(TransferErrorCode::InvalidUrl.code(), 2);
        assert_eq!(TransferErrorCode::Connection.code(), 3);
        assert_eq!(TransferErrorCode::Abort.code(), 4);
        assert_eq!(TransferErrorCode::NotModified.code(), 5);
    }

    #[test]
    fn test_transfer_code_mapping() {
        assert_eq!(
            DownloadError::http_status("u", 404).transfer_code(),
            TransferErrorCode::FileNotFound
        );
        assert_eq!(
            DownloadError::http_status("u", 500).transfer_code(),
            TransferErrorCode::Connection
        );
        assert_eq!(
            DownloadError::invalid_url("::").transfer_code(),
            TransferErrorCode::InvalidUrl
        );
        assert_eq!(
            DownloadError::timeout("u").transfer_code(),
            TransferErrorCode::Connection
        );
    }

    #[test]
    fn test_user_messages_per_cause() {
        assert_eq!(
            DownloadError::EmptyUrl.user_message(),
            "Download link is not ready yet."
        );
        assert_eq!(
            DownloadError::PermissionDenied.user_message(),
            "Storage permission denied."
        );
        assert_eq!(
            DownloadError::PluginMissing {
                plugin: "FileTransfer"
            }
            .user_message(),
            "FileTransfer plugin missing."
        );
        assert_eq!(
            DownloadError::Transfer {
                code: TransferErrorCode::Connection
            }
            .user_message(),
            "Download failed: 3"
        );
        assert_eq!(
            DownloadError::trigger_failed("detached").user_message(),
            "Failed to start download."
        );
    }
}
