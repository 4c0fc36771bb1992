//! User-facing feedback: transient notifications and the confirm control state.
//!
//! Library code never prints. It reports through a [`Feedback`] sink that the
//! embedding application implements (a terminal UI, a log, a test recorder).

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::{error, info, warn};

/// How long a notification stays visible when no duration is given.
pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_millis(5000);

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Something completed.
    Success,
    /// Informational or recoverable.
    Warning,
    /// Something failed.
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub message: String,
    /// How long to display it.
    pub duration: Duration,
}

impl Notification {
    /// Creates a notification with the default duration.
    #[must_use]
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            duration: DEFAULT_NOTICE_DURATION,
        }
    }

    /// Success notification.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    /// Warning notification.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    /// Error notification.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    /// Overrides the display duration.
    #[must_use]
    pub fn lasting(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// State of the download confirm control during a shell transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmState {
    /// Ready to start a download.
    Idle,
    /// Waiting on the storage permission prompt.
    RequestingPermission,
    /// Transfer running, with the last known whole percentage.
    Transferring(u8),
    /// Transfer finished.
    Completed,
    /// Transfer or setup failed.
    Failed,
}

/// Sink for user feedback.
pub trait Feedback: Send + Sync {
    /// Shows a transient notification.
    fn notify(&self, notification: Notification);

    /// Updates the confirm control. Sinks without one ignore it.
    fn confirm_state(&self, _state: ConfirmState) {}
}

/// Feedback that only emits tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl Feedback for LogFeedback {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NoticeLevel::Success => info!(message = %notification.message, "notification"),
            NoticeLevel::Warning => warn!(message = %notification.message, "notification"),
            NoticeLevel::Error => error!(message = %notification.message, "notification"),
        }
    }
}

/// Feedback that records everything it receives.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    notifications: Mutex<Vec<Notification>>,
    states: Mutex<Vec<ConfirmState>>,
}

impl RecordingFeedback {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far, oldest first.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Notification messages received so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .map(|n| n.message)
            .collect()
    }

    /// Confirm states received so far, oldest first.
    #[must_use]
    pub fn states(&self) -> Vec<ConfirmState> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Feedback for RecordingFeedback {
    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }

    fn confirm_state(&self, state: ConfirmState) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(state);
    }
}
