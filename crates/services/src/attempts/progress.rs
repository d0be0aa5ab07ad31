use exam_core::model::Session;

/// Completion snapshot for an in-flight test, for progress bars and the
/// question navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

impl TestProgress {
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        let total = session.total_questions();
        let answered = session.answered_count();
        Self {
            total,
            answered,
            remaining: total - answered,
            is_complete: session.is_terminal(),
        }
    }
}
