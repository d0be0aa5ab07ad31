use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;

use exam_core::Clock;
use exam_core::model::{AttemptId, AttemptRecord, OptionLabel, Question, Session, Topic};
use storage::repository::AttemptRepository;

use crate::error::TestError;
use crate::extract::extract_mcqs;

/// One in-flight test: the session state machine plus the identity the
/// finished attempt will be recorded under.
#[derive(Debug, Clone)]
pub struct TestRun {
    session: Session,
    username: String,
    topic: Topic,
    attempt_number: u32,
    attempt_id: Option<AttemptId>,
}

impl TestRun {
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    /// Set once the attempt has been persisted.
    #[must_use]
    pub fn attempt_id(&self) -> Option<AttemptId> {
        self.attempt_id
    }
}

/// Orchestrates a test from start through persistence of the finished
/// attempt.
///
/// The session itself never touches a clock or the repository; this service
/// supplies `now` at each entry point and owns the single write at the end.
#[derive(Clone)]
pub struct TestFlowService {
    clock: Clock,
    attempts: Arc<dyn AttemptRepository>,
    shuffle: bool,
}

impl TestFlowService {
    #[must_use]
    pub fn new(clock: Clock, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self {
            clock,
            attempts,
            shuffle: true,
        }
    }

    /// Override the question shuffle at test start; on by default, opt out
    /// for a deterministic question order.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Start a test over the given questions.
    ///
    /// The attempt number is one past the user's stored attempt count for
    /// this topic.
    ///
    /// # Errors
    ///
    /// Returns `TestError` if the question set is empty or the attempt count
    /// cannot be read.
    pub async fn start_test(
        &self,
        username: impl Into<String>,
        topic: Topic,
        mut questions: Vec<Question>,
    ) -> Result<TestRun, TestError> {
        let username = username.into();
        if self.shuffle {
            let mut rng = rng();
            questions.as_mut_slice().shuffle(&mut rng);
        }

        let attempt_number = self.attempts.count_attempts(&username, &topic).await? + 1;
        let session = Session::start(questions, self.clock.now())?;

        Ok(TestRun {
            session,
            username,
            topic,
            attempt_number,
            attempt_id: None,
        })
    }

    /// Start a test from raw study text, deriving the topic from the source
    /// filename.
    ///
    /// # Errors
    ///
    /// Returns `TestError::NoQuestions` when no question blocks can be
    /// extracted from the text.
    pub async fn start_test_from_text(
        &self,
        username: impl Into<String>,
        filename: &str,
        text: &str,
    ) -> Result<TestRun, TestError> {
        let questions = extract_mcqs(text);
        if questions.is_empty() {
            return Err(TestError::NoQuestions);
        }
        self.start_test(username, Topic::from_filename(filename), questions)
            .await
    }

    /// Advance the current question's countdown.
    pub fn tick(&self, run: &mut TestRun) {
        run.session.tick(self.clock.now());
    }

    /// Record a tentative answer for the question at `index`.
    pub fn select_answer(&self, run: &mut TestRun, index: usize, option: OptionLabel) {
        run.session.select_answer(index, option);
    }

    /// Submit the current question with the chosen answer and advance.
    pub fn submit_current(&self, run: &mut TestRun, chosen: Option<OptionLabel>) {
        let index = run.session.current_index();
        run.session.submit(index, chosen, self.clock.now());
    }

    /// Switch the active question.
    pub fn navigate_to(&self, run: &mut TestRun, index: usize) {
        run.session.navigate_to(index, self.clock.now());
    }

    /// Disqualify the run after a focus-loss signal.
    pub fn report_focus_loss(&self, run: &mut TestRun) {
        run.session.report_focus_loss();
    }

    /// Persist the finished run as an attempt record, returning its id.
    ///
    /// Idempotent: a run that was already persisted returns its existing id
    /// without a second write, and a failed write may be retried because the
    /// session is not consumed.
    ///
    /// # Errors
    ///
    /// Returns `TestError::NotFinished` while questions remain, and storage
    /// or validation errors from the write.
    pub async fn finalize_attempt(&self, run: &mut TestRun) -> Result<AttemptId, TestError> {
        if let Some(id) = run.attempt_id {
            return Ok(id);
        }
        if !run.session.is_terminal() {
            return Err(TestError::NotFinished);
        }

        let now = self.clock.now();
        let report = run.session.finalize(now);
        let record = AttemptRecord::from_report(
            run.username.clone(),
            run.topic.clone(),
            run.attempt_number,
            now,
            report,
        )?;

        let id = self.attempts.store_attempt(&record).await?;
        run.attempt_id = Some(id);
        Ok(id)
    }
}
