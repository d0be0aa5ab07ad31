//! Test attempt services: running a test, browsing history, tracking progress.

mod progress;
mod view;
mod workflow;

pub use progress::TestProgress;
pub use view::{AttemptHistoryService, AttemptListItem, ScoreTrendPoint, TopicProgress};
pub use workflow::{TestFlowService, TestRun};
