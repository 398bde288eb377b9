use crate::api::{ApiError, StoredFile};
use crate::upload::{
    rejection_message, validate, AllowList, BatchReport, CandidateFile, FileStatus, UploadStatus,
};
use derivative::Derivative;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

const NOTICE_LIFETIME: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    SignIn,
    SignUp,
    Upload,
    Share,
    Files,
}

impl Page {
    pub const ALL: [Page; 5] = [Page::SignIn, Page::SignUp, Page::Upload, Page::Share, Page::Files];

    pub fn title(self) -> &'static str {
        match self {
            Page::SignIn => "Sign In",
            Page::SignUp => "Sign Up",
            Page::Upload => "Upload",
            Page::Share => "Share",
            Page::Files => "My Files",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    shown_at: Instant,
}

/// Transient success and error messages shown at the bottom of the window.
#[derive(Debug, Default)]
pub struct Notices {
    items: Vec<Notice>,
}

impl Notices {
    pub fn success(&mut self, text: impl Into<String>) {
        self.push(NoticeKind::Success, text.into());
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(NoticeKind::Error, text.into());
    }

    fn push(&mut self, kind: NoticeKind, text: String) {
        match kind {
            NoticeKind::Success => tracing::info!("{}", text),
            NoticeKind::Error => tracing::warn!("{}", text),
        }
        self.items.push(Notice {
            kind,
            text,
            shown_at: Instant::now(),
        });
    }

    pub fn prune(&mut self, now: Instant) {
        self.items
            .retain(|n| now.saturating_duration_since(n.shown_at) < NOTICE_LIFETIME);
    }

    pub fn dismiss(&mut self, index: usize) {
        if index < self.items.len() {
            self.items.remove(index);
        }
    }

    pub fn items(&self) -> &[Notice] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum ActionProgress {
    #[default]
    NotStarted,
    Uploading {
        total: usize,
        current: usize,
        successful: usize,
        failed: usize,
        skipped: usize,
    },
    Completed {
        total: usize,
        successful: usize,
        failed: usize,
        skipped: usize,
    },
}

#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct UploadState {
    pub identity: String,
    pub selected: Vec<CandidateFile>,
    pub is_dragging: bool,
    pub is_uploading: bool,
    pub progress: ActionProgress,
    pub current_file: Option<String>,
    pub file_statuses: Vec<FileStatus>,
    pub show_details: bool,
    #[derivative(Debug = "ignore")]
    pub status_receiver: Option<Receiver<FileStatus>>,
    #[derivative(Debug = "ignore")]
    pub report_receiver: Option<Receiver<BatchReport>>,
}

impl UploadState {
    /// Adds files to the selection, keeping only allowed extensions.
    /// Returns one aggregated message naming the rejected files, if any.
    pub fn add_candidates(&mut self, files: Vec<CandidateFile>, allow_list: &AllowList) -> Option<String> {
        let outcome = validate(files, allow_list);
        self.selected.extend(outcome.accepted);
        rejection_message(&outcome.rejected)
    }

    pub fn remove(&mut self, index: usize) {
        if !self.is_uploading && index < self.selected.len() {
            self.selected.remove(index);
        }
    }

    /// Marks a batch of `total` files as in flight.
    pub fn begin(&mut self, total: usize) {
        self.is_uploading = true;
        self.file_statuses.clear();
        self.current_file = None;
        self.progress = ActionProgress::Uploading {
            total,
            current: 0,
            successful: 0,
            failed: 0,
            skipped: 0,
        };
    }

    pub fn apply_status(&mut self, status: FileStatus) {
        if let ActionProgress::Uploading {
            current,
            successful,
            failed,
            skipped,
            ..
        } = &mut self.progress
        {
            match &status.status {
                UploadStatus::Processing => *current += 1,
                UploadStatus::Success => *successful += 1,
                UploadStatus::Error(_) => *failed += 1,
                UploadStatus::Skipped(_) => *skipped += 1,
            }
        }

        self.current_file = Some(status.name.clone());
        if status.status != UploadStatus::Processing {
            self.file_statuses.push(status);
        }
    }

    /// Settles the batch: clears the in-flight flag, drops uploaded files
    /// from the selection and returns the (success, failure) notifications.
    ///
    /// Results come back in selection order and the selection is frozen while
    /// uploading, so each result is paired with its entry by position.
    pub fn finish(&mut self, report: &BatchReport) -> (Option<String>, Option<String>) {
        let total = match &self.progress {
            ActionProgress::Uploading { total, .. } => *total,
            _ => report.results.len() + report.rejected.len(),
        };
        let succeeded = report.succeeded();

        self.progress = ActionProgress::Completed {
            total,
            successful: succeeded.len(),
            failed: report.failed().len(),
            skipped: report.rejected.len(),
        };
        let mut outcomes = report.results.iter().peekable();
        self.selected.retain(|file| match outcomes.peek() {
            Some(result) if result.name() == file.name => {
                outcomes.next().map_or(true, |result| !result.is_success())
            }
            _ => true,
        });
        self.is_uploading = false;
        self.status_receiver = None;
        self.report_receiver = None;

        let failures = [report.failure_message(), report.rejection_message()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        let failure = if failures.is_empty() {
            None
        } else {
            Some(failures.join(". "))
        };
        (report.success_message(), failure)
    }

    /// Settles a batch whose worker went away without reporting.
    pub fn abort(&mut self) {
        self.is_uploading = false;
        self.status_receiver = None;
        self.report_receiver = None;
        self.progress = ActionProgress::NotStarted;
    }

    pub fn get_progress_percentage(&self) -> f32 {
        match &self.progress {
            ActionProgress::NotStarted => 0.0,
            ActionProgress::Uploading {
                total,
                successful,
                failed,
                skipped,
                ..
            } => {
                if *total == 0 {
                    0.0
                } else {
                    ((successful + failed + skipped) as f32) / (*total as f32)
                }
            }
            ActionProgress::Completed { total, .. } => {
                if *total == 0 {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }

    pub fn get_status_text(&self) -> String {
        match &self.progress {
            ActionProgress::NotStarted => String::new(),
            ActionProgress::Uploading {
                total,
                current,
                successful,
                failed,
                skipped,
            } => format!(
                "Progress: {}/{} started | ✅ Success: {} | ⏩ Skipped: {} | ❌ Failed: {}",
                current, total, successful, skipped, failed
            ),
            ActionProgress::Completed {
                total,
                successful,
                failed,
                skipped,
            } => format!(
                "Final Status: {} files | ✅ Success: {} | ⏩ Skipped: {} | ❌ Failed: {}",
                total, successful, skipped, failed
            ),
        }
    }
}

/// Username/password form shared by the sign-in and sign-up pages.
#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct AuthForm {
    pub username: String,
    #[derivative(Debug = "ignore")]
    pub password: String,
    #[derivative(Debug = "ignore")]
    pub receiver: Option<Receiver<Result<(), ApiError>>>,
}

impl AuthForm {
    pub fn in_flight(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn can_submit(&self) -> bool {
        !self.in_flight() && !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct FilesState {
    pub files: Vec<StoredFile>,
    pub error: Option<String>,
    pub loaded_for: Option<String>,
    #[derivative(Debug = "ignore")]
    pub receiver: Option<Receiver<Result<Vec<StoredFile>, ApiError>>>,
}

impl FilesState {
    pub fn is_loading(&self) -> bool {
        self.receiver.is_some()
    }
}

#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct ShareState {
    pub search: String,
    pub selected: Option<String>,
    pub recipient: String,
    #[derivative(Debug = "ignore")]
    pub receiver: Option<Receiver<Result<(), ApiError>>>,
}

impl ShareState {
    pub fn in_flight(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn can_share(&self) -> bool {
        !self.in_flight() && self.selected.is_some() && !self.recipient.trim().is_empty()
    }

    pub fn reset(&mut self) {
        self.selected = None;
        self.recipient.clear();
    }
}
