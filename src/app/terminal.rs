//! Terminal feedback: notifications on stderr and an indicatif bar for
//! shell transfers.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use trackgrab_core::{ConfirmState, Feedback, NoticeLevel, Notification};

/// Feedback sink for interactive runs.
#[derive(Debug)]
pub(crate) struct TerminalFeedback {
    quiet: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalFeedback {
    pub(crate) fn new(quiet: bool) -> Self {
        Self {
            quiet,
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&mut Option<ProgressBar>)) {
        let mut guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

fn line_for(notification: &Notification) -> String {
    let marker = match notification.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    format!("[{marker}] {}", notification.message)
}

fn transfer_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("Downloading");
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

impl Feedback for TerminalFeedback {
    fn notify(&self, notification: Notification) {
        if self.quiet && notification.level != NoticeLevel::Error {
            return;
        }
        let line = line_for(&notification);
        self.with_bar(|bar| match bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        });
    }

    fn confirm_state(&self, state: ConfirmState) {
        if self.quiet {
            return;
        }
        self.with_bar(|bar| match state {
            ConfirmState::RequestingPermission => {
                let spinner = ProgressBar::new_spinner();
                spinner.set_message("Requesting storage permission...");
                spinner.enable_steady_tick(Duration::from_millis(100));
                *bar = Some(spinner);
            }
            ConfirmState::Transferring(percent) => {
                let current = bar.get_or_insert_with(transfer_bar);
                if current.length() != Some(100) {
                    current.finish_and_clear();
                    *current = transfer_bar();
                }
                current.set_position(u64::from(percent));
            }
            ConfirmState::Completed | ConfirmState::Failed | ConfirmState::Idle => {
                if let Some(done) = bar.take() {
                    done.finish_and_clear();
                }
            }
        });
    }
}
