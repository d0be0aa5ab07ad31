use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::question::{OptionLabel, Question};

/// Per-question countdown budget, in seconds.
pub const QUESTION_TIME_BUDGET_SECS: f64 = 60.0;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    EmptyQuestionSet,
}

//
// ─── QUESTION STATUS ──────────────────────────────────────────────────────────
//

/// Lifecycle of a single question within a session.
///
/// `Completed` and `Expired` are terminal: a question never leaves them.
/// At most one question is `Active` at a time; none once the session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Pending,
    Active,
    Completed,
    Expired,
}

impl QuestionStatus {
    /// True once the question can no longer be answered.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }
}

//
// ─── QUESTION RESULT ──────────────────────────────────────────────────────────
//

/// Outcome of one question: what was asked, what was chosen, and how long it
/// took. `user_answer = None` means the question went unanswered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_text: String,
    pub user_answer: Option<OptionLabel>,
    pub correct_answer: OptionLabel,
    pub is_correct: bool,
    pub time_taken_secs: f64,
}

impl QuestionResult {
    /// The answer as shown to the user, with the unanswered sentinel.
    #[must_use]
    pub fn user_answer_text(&self) -> &str {
        self.user_answer
            .map_or("Not answered", OptionLabel::as_str)
    }
}

//
// ─── SESSION REPORT ───────────────────────────────────────────────────────────
//

/// Immutable aggregate produced by [`Session::finalize`]; the input for a
/// persisted attempt record.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub results: Vec<QuestionResult>,
    pub total_score: u32,
    pub total_questions: u32,
    pub total_time_taken_secs: f64,
    pub average_time_per_question_secs: f64,
    pub disqualified: bool,
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

/// In-memory state machine for one test attempt.
///
/// All transitions are synchronous, total functions: time arrives as a `now`
/// parameter, precondition violations are silent no-ops, and the value is
/// never observable mid-transition. Question order is fixed at construction;
/// callers that want a shuffled attempt shuffle before [`Session::start`].
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    questions: Vec<Question>,
    current_index: usize,
    timers: Vec<f64>,
    status: Vec<QuestionStatus>,
    selected: Vec<Option<OptionLabel>>,
    results: Vec<Option<QuestionResult>>,
    score: u32,
    disqualified: bool,
    started_at: DateTime<Utc>,
    last_tick_at: DateTime<Utc>,
    question_started_at: DateTime<Utc>,
}

fn secs_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let millis = (later - earlier).num_milliseconds();
    (millis as f64 / 1000.0).max(0.0)
}

impl Session {
    /// Start a session over the given questions, first question active and
    /// every timer at the full budget.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyQuestionSet` when no questions are given.
    pub fn start(questions: Vec<Question>, now: DateTime<Utc>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyQuestionSet);
        }

        let len = questions.len();
        let mut status = vec![QuestionStatus::Pending; len];
        status[0] = QuestionStatus::Active;

        Ok(Self {
            questions,
            current_index: 0,
            timers: vec![QUESTION_TIME_BUDGET_SECS; len],
            status,
            selected: vec![None; len],
            results: vec![None; len],
            score: 0,
            disqualified: false,
            started_at: now,
            last_tick_at: now,
            question_started_at: now,
        })
    }

    //
    // ─── ACCESSORS ────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The question currently presented, `None` once the session has ended.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question_status(&self, index: usize) -> Option<QuestionStatus> {
        self.status.get(index).copied()
    }

    /// Remaining countdown for a question, in seconds.
    #[must_use]
    pub fn remaining_time(&self, index: usize) -> Option<f64> {
        self.timers.get(index).copied()
    }

    /// Tentative answer recorded via [`Session::select_answer`].
    #[must_use]
    pub fn selected_answer(&self, index: usize) -> Option<OptionLabel> {
        self.selected.get(index).copied().flatten()
    }

    #[must_use]
    pub fn result(&self, index: usize) -> Option<&QuestionResult> {
        self.results.get(index).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn is_disqualified(&self) -> bool {
        self.disqualified
    }

    /// Number of questions that reached a terminal status.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.status.iter().filter(|s| s.is_terminal()).count()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The session is over once every question is processed or the attempt
    /// was disqualified.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.disqualified || self.current_index == self.questions.len()
    }

    //
    // ─── TRANSITIONS ──────────────────────────────────────────────────────────
    //

    /// Advance the current question's countdown by the wall time elapsed
    /// since the previous tick, expiring it when the budget runs out.
    ///
    /// Called once per rendering cycle. No-op when the session is terminal.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.is_terminal() {
            return;
        }

        let elapsed = secs_between(self.last_tick_at, now);
        self.last_tick_at = now;

        let idx = self.current_index;
        if self.status[idx] != QuestionStatus::Active || self.timers[idx] <= 0.0 {
            return;
        }

        self.timers[idx] = (self.timers[idx] - elapsed).max(0.0);
        if self.timers[idx] <= 0.0 {
            self.expire(idx, now);
        }
    }

    /// Record a tentative answer for an active question.
    ///
    /// Ignored for inactive questions: stale UI events must not mutate state.
    /// The tentative answer becomes the submitted one if the timer expires.
    pub fn select_answer(&mut self, index: usize, option: OptionLabel) {
        if self.is_terminal() {
            return;
        }
        if self.status.get(index).copied() == Some(QuestionStatus::Active) {
            self.selected[index] = Some(option);
        }
    }

    /// Submit an answer for the active current question and advance.
    ///
    /// `chosen = None` records "Not answered". Silent no-op when the index is
    /// not the active current question (duplicate submit events included).
    pub fn submit(&mut self, index: usize, chosen: Option<OptionLabel>, now: DateTime<Utc>) {
        if self.is_terminal()
            || index != self.current_index
            || self.status[index] != QuestionStatus::Active
        {
            return;
        }

        let time_taken = secs_between(self.question_started_at, now);
        self.finish(index, chosen, time_taken, QuestionStatus::Completed);
        self.advance_from(index, now);
    }

    /// Switch the active question to another non-terminal one.
    ///
    /// Timers are untouched: a countdown only runs while its question is
    /// current, so the abandoned question resumes later from where it left
    /// off. The time-taken clock restarts for the target question.
    pub fn navigate_to(&mut self, index: usize, now: DateTime<Utc>) {
        if self.is_terminal() || index == self.current_index {
            return;
        }
        let Some(status) = self.status.get(index).copied() else {
            return;
        };
        if status.is_terminal() {
            return;
        }

        if self.status[self.current_index] == QuestionStatus::Active {
            self.status[self.current_index] = QuestionStatus::Pending;
        }
        self.status[index] = QuestionStatus::Active;
        self.current_index = index;
        self.question_started_at = now;
    }

    /// Disqualify the attempt after a focus-loss signal.
    ///
    /// One-way: every question not yet finished is recorded as unanswered
    /// with zero time, and the session becomes terminal immediately.
    pub fn report_focus_loss(&mut self) {
        if self.is_terminal() {
            return;
        }

        self.disqualified = true;
        for index in 0..self.questions.len() {
            if self.status[index].is_terminal() {
                continue;
            }
            self.status[index] = QuestionStatus::Expired;
            self.results[index] = Some(QuestionResult {
                question_text: self.questions[index].text().to_string(),
                user_answer: None,
                correct_answer: self.questions[index].correct_option(),
                is_correct: false,
                time_taken_secs: 0.0,
            });
        }
    }

    /// Produce the aggregate report for a terminal session.
    ///
    /// Pure with respect to the session value, so callers may retry a failed
    /// persistence write with the same report. Missing results are backfilled
    /// as unanswered; the transitions above make that unreachable, but a
    /// partial state must never produce a partial report.
    #[must_use]
    pub fn finalize(&self, now: DateTime<Utc>) -> SessionReport {
        let results: Vec<QuestionResult> = self
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                self.results[i].clone().unwrap_or_else(|| QuestionResult {
                    question_text: q.text().to_string(),
                    user_answer: None,
                    correct_answer: q.correct_option(),
                    is_correct: false,
                    time_taken_secs: 0.0,
                })
            })
            .collect();

        let total_questions = results.len();
        let total_time_taken_secs = secs_between(self.started_at, now);
        let average_time_per_question_secs = if total_questions == 0 {
            0.0
        } else {
            total_time_taken_secs / total_questions as f64
        };

        SessionReport {
            results,
            total_score: self.score,
            total_questions: total_questions as u32,
            total_time_taken_secs,
            average_time_per_question_secs,
            disqualified: self.disqualified,
        }
    }

    //
    // ─── INTERNAL ─────────────────────────────────────────────────────────────
    //

    /// Timeout transition: submit with the tentative answer, if any, and mark
    /// the question `Expired` instead of `Completed`.
    fn expire(&mut self, index: usize, now: DateTime<Utc>) {
        let chosen = self.selected[index];
        let time_taken = secs_between(self.question_started_at, now);
        self.finish(index, chosen, time_taken, QuestionStatus::Expired);
        self.advance_from(index, now);
    }

    fn finish(
        &mut self,
        index: usize,
        chosen: Option<OptionLabel>,
        time_taken_secs: f64,
        terminal: QuestionStatus,
    ) {
        let question = &self.questions[index];
        let is_correct = chosen.is_some_and(|c| question.is_correct(c));

        self.results[index] = Some(QuestionResult {
            question_text: question.text().to_string(),
            user_answer: chosen,
            correct_answer: question.correct_option(),
            is_correct,
            time_taken_secs,
        });
        self.status[index] = terminal;
        if is_correct {
            self.score += 1;
        }
    }

    /// Ascending scan from index 0 for the next available question; resumes
    /// in array order, not most-recently-abandoned order.
    fn advance_from(&mut self, finished: usize, now: DateTime<Utc>) {
        let next = (0..self.questions.len())
            .find(|&i| i != finished && !self.status[i].is_terminal());

        match next {
            Some(i) => {
                self.status[i] = QuestionStatus::Active;
                self.current_index = i;
                self.question_started_at = now;
            }
            None => {
                self.current_index = self.questions.len();
            }
        }
    }
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
//
