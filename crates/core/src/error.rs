use thiserror::Error;

use crate::model::{AttemptError, QuestionError, SessionError, TopicError};

/// Crate-level error aggregating the domain validation errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Topic(#[from] TopicError),
}
