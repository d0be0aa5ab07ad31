#![forbid(unsafe_code)]

pub mod attempts;
pub mod error;
pub mod extract;

pub use exam_core::Clock;

pub use error::TestError;
pub use extract::extract_mcqs;

pub use attempts::{
    AttemptHistoryService, AttemptListItem, ScoreTrendPoint, TestFlowService, TestProgress,
    TestRun, TopicProgress,
};
