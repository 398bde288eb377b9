use bytes::Bytes;
use derivative::Derivative;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Progress event for a single file, streamed to the UI while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    Processing,
    Success,
    Error(String),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileStatus {
    pub name: String,
    pub status: UploadStatus,
}

/// A file selected for upload. The payload is held in memory.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct CandidateFile {
    pub name: String,
    pub content_type: String,
    #[derivative(Debug = "ignore")]
    pub bytes: Bytes,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Declared content type, or `application/octet-stream` when none was declared.
    pub fn transfer_content_type(&self) -> &str {
        if self.content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            &self.content_type
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub accepted: Vec<CandidateFile>,
    pub rejected: Vec<Rejection>,
}

/// Write destination for exactly one file.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTarget {
    pub file_name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadResult {
    Succeeded { name: String },
    Failed { name: String, reason: String },
}

impl UploadResult {
    pub fn name(&self) -> &str {
        match self {
            UploadResult::Succeeded { name } | UploadResult::Failed { name, .. } => name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Succeeded { .. })
    }

    pub fn to_status(&self) -> FileStatus {
        match self {
            UploadResult::Succeeded { name } => FileStatus {
                name: name.clone(),
                status: UploadStatus::Success,
            },
            UploadResult::Failed { name, reason } => FileStatus {
                name: name.clone(),
                status: UploadStatus::Error(reason.clone()),
            },
        }
    }
}

/// Aggregated outcome of one upload batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub results: Vec<UploadResult>,
    pub rejected: Vec<Rejection>,
}

impl BatchReport {
    pub fn succeeded(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.name())
            .collect()
    }

    pub fn failed(&self) -> Vec<(&str, &str)> {
        self.results
            .iter()
            .filter_map(|r| match r {
                UploadResult::Failed { name, reason } => Some((name.as_str(), reason.as_str())),
                UploadResult::Succeeded { .. } => None,
            })
            .collect()
    }

    pub fn success_message(&self) -> Option<String> {
        let names = self.succeeded();
        if names.is_empty() {
            None
        } else {
            Some(format!("Uploaded: {}", names.join(", ")))
        }
    }

    pub fn failure_message(&self) -> Option<String> {
        let failed = self.failed();
        if failed.is_empty() {
            return None;
        }
        let details: Vec<String> = failed
            .iter()
            .map(|(name, reason)| format!("{} ({})", name, reason))
            .collect();
        Some(format!("Failed: {}", details.join(", ")))
    }

    pub fn rejection_message(&self) -> Option<String> {
        rejection_message(&self.rejected)
    }
}

/// One aggregated message naming every rejected file.
pub fn rejection_message(rejected: &[Rejection]) -> Option<String> {
    if rejected.is_empty() {
        return None;
    }
    let names: Vec<&str> = rejected.iter().map(|r| r.name.as_str()).collect();
    Some(format!("Unsupported file(s): {}", names.join(", ")))
}
