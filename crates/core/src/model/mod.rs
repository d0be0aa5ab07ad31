mod attempt;
mod ids;
mod question;
mod session;
mod topic;

pub use ids::{AttemptId, ParseIdError};

pub use attempt::{AttemptError, AttemptRecord};
pub use question::{OptionLabel, Question, QuestionError};
pub use session::{
    QUESTION_TIME_BUDGET_SECS, QuestionResult, QuestionStatus, Session, SessionError,
    SessionReport,
};
pub use topic::{Topic, TopicError};
