//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{AttemptError, SessionError};
use storage::repository::StorageError;

/// Errors emitted by test services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestError {
    #[error("test is still in progress")]
    NotFinished,
    #[error("no questions could be extracted from the source text")]
    NoQuestions,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
