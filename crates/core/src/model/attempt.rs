use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::session::{QuestionResult, SessionReport};
use crate::model::topic::Topic;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("attempt number must be at least 1")]
    InvalidAttemptNumber,

    #[error("total questions ({total}) does not match result count ({len})")]
    CountMismatch { total: u32, len: usize },

    #[error("total score ({score}) does not match correct results ({correct})")]
    ScoreMismatch { score: u32, correct: u32 },

    #[error("negative duration for attempt")]
    NegativeDuration,
}

/// Persisted record of one terminal test attempt.
///
/// Exactly one record exists per completed-or-disqualified session. The
/// constructors re-validate the aggregates against the per-question results
/// so a corrupt row can never rehydrate silently.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    username: String,
    topic: Topic,
    attempt_number: u32,
    finished_at: DateTime<Utc>,
    total_score: u32,
    total_questions: u32,
    total_time_taken_secs: f64,
    average_time_per_question_secs: f64,
    results: Vec<QuestionResult>,
}

impl AttemptRecord {
    /// Build a record from a finalized session report.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the report's aggregates disagree with its
    /// results, or the attempt number is zero.
    pub fn from_report(
        username: impl Into<String>,
        topic: Topic,
        attempt_number: u32,
        finished_at: DateTime<Utc>,
        report: SessionReport,
    ) -> Result<Self, AttemptError> {
        Self::from_persisted(
            username,
            topic,
            attempt_number,
            finished_at,
            report.total_score,
            report.total_questions,
            report.total_time_taken_secs,
            report.average_time_per_question_secs,
            report.results,
        )
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::CountMismatch` or `AttemptError::ScoreMismatch`
    /// if aggregates do not align with the results, `NegativeDuration` for
    /// negative timings, and `InvalidAttemptNumber` for a zero attempt number.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        username: impl Into<String>,
        topic: Topic,
        attempt_number: u32,
        finished_at: DateTime<Utc>,
        total_score: u32,
        total_questions: u32,
        total_time_taken_secs: f64,
        average_time_per_question_secs: f64,
        results: Vec<QuestionResult>,
    ) -> Result<Self, AttemptError> {
        if attempt_number == 0 {
            return Err(AttemptError::InvalidAttemptNumber);
        }
        if total_questions as usize != results.len() {
            return Err(AttemptError::CountMismatch {
                total: total_questions,
                len: results.len(),
            });
        }
        let correct = results.iter().filter(|r| r.is_correct).count() as u32;
        if correct != total_score {
            return Err(AttemptError::ScoreMismatch {
                score: total_score,
                correct,
            });
        }
        if total_time_taken_secs < 0.0 || average_time_per_question_secs < 0.0 {
            return Err(AttemptError::NegativeDuration);
        }

        Ok(Self {
            username: username.into(),
            topic,
            attempt_number,
            finished_at,
            total_score,
            total_questions,
            total_time_taken_secs,
            average_time_per_question_secs,
            results,
        })
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

    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn total_time_taken_secs(&self) -> f64 {
        self.total_time_taken_secs
    }

    #[must_use]
    pub fn average_time_per_question_secs(&self) -> f64 {
        self.average_time_per_question_secs
    }

    #[must_use]
    pub fn results(&self) -> &[QuestionResult] {
        &self.results
    }

    /// Score as a percentage of the question count.
    #[must_use]
    pub fn score_percent(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.total_score) / f64::from(self.total_questions) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OptionLabel;
    use crate::time::fixed_now;

    fn result(correct: bool) -> QuestionResult {
        QuestionResult {
            question_text: "Q?".to_string(),
            user_answer: Some(OptionLabel::A),
            correct_answer: OptionLabel::A,
            is_correct: correct,
            time_taken_secs: 4.0,
        }
    }

    #[test]
    fn builds_from_consistent_report() {
        let report = SessionReport {
            results: vec![result(true), result(false)],
            total_score: 1,
            total_questions: 2,
            total_time_taken_secs: 30.0,
            average_time_per_question_secs: 15.0,
            disqualified: false,
        };

        let record = AttemptRecord::from_report(
            "amelia",
            Topic::new("Probability").unwrap(),
            1,
            fixed_now(),
            report,
        )
        .unwrap();

        assert_eq!(record.total_score(), 1);
        assert_eq!(record.results().len(), 2);
        assert!((record.score_percent() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_score_mismatch() {
        let err = AttemptRecord::from_persisted(
            "amelia",
            Topic::new("Probability").unwrap(),
            1,
            fixed_now(),
            2,
            1,
            10.0,
            10.0,
            vec![result(false)],
        )
        .unwrap_err();
        assert!(matches!(err, AttemptError::ScoreMismatch { .. }));
    }

    #[test]
    fn rejects_count_mismatch() {
        let err = AttemptRecord::from_persisted(
            "amelia",
            Topic::new("Probability").unwrap(),
            1,
            fixed_now(),
            1,
            3,
            10.0,
            10.0,
            vec![result(true)],
        )
        .unwrap_err();
        assert!(matches!(err, AttemptError::CountMismatch { .. }));
    }

    #[test]
    fn rejects_zero_attempt_number() {
        let err = AttemptRecord::from_persisted(
            "amelia",
            Topic::new("Probability").unwrap(),
            0,
            fixed_now(),
            0,
            0,
            0.0,
            0.0,
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AttemptError::InvalidAttemptNumber));
    }

    #[test]
    fn rejects_negative_duration() {
        let err = AttemptRecord::from_persisted(
            "amelia",
            Topic::new("Probability").unwrap(),
            1,
            fixed_now(),
            1,
            1,
            -1.0,
            1.0,
            vec![result(true)],
        )
        .unwrap_err();
        assert!(matches!(err, AttemptError::NegativeDuration));
    }
}
