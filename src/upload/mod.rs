mod coordinator;
mod error;
pub mod source;
mod strategy;
mod types;
mod validation;

pub use coordinator::UploadCoordinator;
pub use strategy::UploadStrategy;
pub use types::{
    rejection_message, BatchReport, CandidateFile, FileStatus, Rejection, UploadResult,
    UploadStatus,
};
pub use validation::{validate, AllowList};
