//! crates/study_aid_core/src/error.rs
//!
//! The error taxonomy shared by the pipelines and the quiz session.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    /// Bad caller input. No upstream call was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The generation service call failed or returned a non-success status.
    #[error("Generation service failed: {0}")]
    UpstreamGeneration(String),

    /// The generation service answered, but the payload violates the expected schema.
    #[error("Generation service returned a malformed result: {0}")]
    MalformedGeneration(String),

    /// An internal precondition was broken, e.g. a quiz over an empty pack.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// The content store rejected or failed an operation.
    #[error("Store error: {0}")]
    Store(String),
}

pub type StudyResult<T> = Result<T, StudyError>;

impl From<PortError> for StudyError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => StudyError::NotFound(msg),
            PortError::Unauthorized => StudyError::Unauthorized,
            PortError::Upstream(msg) => StudyError::UpstreamGeneration(msg),
            PortError::Malformed(msg) => StudyError::MalformedGeneration(msg),
            PortError::Conflict(msg) | PortError::Unexpected(msg) => StudyError::Store(msg),
        }
    }
}
