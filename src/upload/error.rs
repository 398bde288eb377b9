use crate::upload::types::Rejection;
use thiserror::Error;

pub const GENERIC_TRANSFER_FAILURE: &str = "transfer failed";

/// Per-file failure inside an upload batch. Never escapes the batch.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{reason}")]
    ValidationRejected { reason: String },

    #[error("{0}")]
    DestinationUnavailable(String),

    #[error("{0}")]
    TransferFailed(String),

    #[error("transfer failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl From<&Rejection> for UploadError {
    fn from(rejection: &Rejection) -> Self {
        UploadError::ValidationRejected {
            reason: rejection.reason.clone(),
        }
    }
}
