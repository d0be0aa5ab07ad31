use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use exam_core::Clock;
use exam_core::model::{AttemptId, AttemptRecord, Topic};
use storage::repository::{AttemptRepository, AttemptRow};

use crate::error::TestError;

/// One row in an attempt history listing.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptListItem {
    pub id: AttemptId,
    pub attempt_number: u32,
    pub finished_at: DateTime<Utc>,
    pub total_score: u32,
    pub total_questions: u32,
    pub score_percent: f64,
    pub total_time_taken_secs: f64,
}

impl AttemptListItem {
    fn from_row(row: &AttemptRow) -> Self {
        Self {
            id: row.id,
            attempt_number: row.record.attempt_number(),
            finished_at: row.record.finished_at(),
            total_score: row.record.total_score(),
            total_questions: row.record.total_questions(),
            score_percent: row.record.score_percent(),
            total_time_taken_secs: row.record.total_time_taken_secs(),
        }
    }
}

/// Aggregate progress for one topic, across every stored attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicProgress {
    pub total_attempts: u32,
    /// Mean of the per-attempt score percentages, so a short quiz counts the
    /// same as a long one.
    pub average_score_percent: f64,
    /// Total recorded per-question time divided by the number of recorded
    /// question results.
    pub average_time_per_question_secs: f64,
}

/// One point on the score-over-time chart, ascending by finish time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTrendPoint {
    pub finished_at: DateTime<Utc>,
    pub score_percent: f64,
}

/// Read-side queries over stored attempts.
#[derive(Clone)]
pub struct AttemptHistoryService {
    clock: Clock,
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptHistoryService {
    #[must_use]
    pub fn new(clock: Clock, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { clock, attempts }
    }

    /// List a user's attempts for a topic, most recent first, optionally
    /// limited to the last `days` days.
    ///
    /// # Errors
    ///
    /// Returns `TestError` on repository failures.
    pub async fn list_recent_attempts(
        &self,
        username: &str,
        topic: &Topic,
        days: Option<u32>,
        limit: u32,
    ) -> Result<Vec<AttemptListItem>, TestError> {
        let finished_from = days.map(|d| self.clock.now() - Duration::days(i64::from(d)));
        let rows = self
            .attempts
            .list_attempts(username, topic, finished_from, None, limit)
            .await?;
        Ok(rows.iter().map(AttemptListItem::from_row).collect())
    }

    /// Distinct topics the user has attempted, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `TestError` on repository failures.
    pub async fn list_topics(&self, username: &str) -> Result<Vec<Topic>, TestError> {
        Ok(self.attempts.list_topics(username).await?)
    }

    /// Full record of a single attempt, per-question results included.
    ///
    /// # Errors
    ///
    /// Returns `TestError` if the attempt is missing or cannot be loaded.
    pub async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, TestError> {
        Ok(self.attempts.get_attempt(id).await?)
    }

    /// Aggregate progress for a topic, or `None` when the user has no
    /// attempts for it.
    ///
    /// # Errors
    ///
    /// Returns `TestError` on repository failures.
    pub async fn topic_progress(
        &self,
        username: &str,
        topic: &Topic,
    ) -> Result<Option<TopicProgress>, TestError> {
        let rows = self
            .attempts
            .list_attempts(username, topic, None, None, u32::MAX)
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let percent_sum: f64 = rows.iter().map(|row| row.record.score_percent()).sum();

        let mut time_sum = 0.0;
        let mut result_count: usize = 0;
        for row in &rows {
            for result in row.record.results() {
                time_sum += result.time_taken_secs;
                result_count += 1;
            }
        }
        let average_time_per_question_secs = if result_count == 0 {
            0.0
        } else {
            time_sum / result_count as f64
        };

        Ok(Some(TopicProgress {
            total_attempts: rows.len() as u32,
            average_score_percent: percent_sum / rows.len() as f64,
            average_time_per_question_secs,
        }))
    }

    /// Score percentages over time for a topic, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `TestError` on repository failures.
    pub async fn score_trend(
        &self,
        username: &str,
        topic: &Topic,
    ) -> Result<Vec<ScoreTrendPoint>, TestError> {
        let rows = self
            .attempts
            .list_attempts(username, topic, None, None, u32::MAX)
            .await?;

        // Listing is most recent first; the chart reads left to right.
        let points: Vec<ScoreTrendPoint> = rows
            .iter()
            .rev()
            .map(|row| ScoreTrendPoint {
                finished_at: row.record.finished_at(),
                score_percent: row.record.score_percent(),
            })
            .collect();
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{OptionLabel, QuestionResult};
    use exam_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn build_record(
        topic: &str,
        attempt_number: u32,
        correct: u32,
        total: u32,
        finished_at: DateTime<Utc>,
    ) -> AttemptRecord {
        let results: Vec<QuestionResult> = (0..total)
            .map(|i| QuestionResult {
                question_text: format!("Q{i}?"),
                user_answer: Some(OptionLabel::A),
                correct_answer: OptionLabel::A,
                is_correct: i < correct,
                time_taken_secs: 10.0,
            })
            .collect();
        AttemptRecord::from_persisted(
            "amelia",
            Topic::new(topic).unwrap(),
            attempt_number,
            finished_at,
            correct,
            total,
            f64::from(total) * 10.0,
            10.0,
            results,
        )
        .unwrap()
    }

    async fn build_service_with_attempts() -> (AttemptHistoryService, Topic) {
        let repo = Arc::new(InMemoryRepository::new());
        let topic = Topic::new("Probability").unwrap();

        // Attempt 1: 1/2 correct, ten days before the fixed clock.
        // Attempt 2: 4/4 correct, one day before.
        repo.store_attempt(&build_record(
            "Probability",
            1,
            1,
            2,
            fixed_now() - Duration::days(10),
        ))
        .await
        .unwrap();
        repo.store_attempt(&build_record(
            "Probability",
            2,
            4,
            4,
            fixed_now() - Duration::days(1),
        ))
        .await
        .unwrap();

        (AttemptHistoryService::new(fixed_clock(), repo), topic)
    }

    #[tokio::test]
    async fn lists_recent_attempts_within_window() {
        let (service, topic) = build_service_with_attempts().await;

        let all = service
            .list_recent_attempts("amelia", &topic, None, 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].attempt_number, 2);
        assert!((all[0].score_percent - 100.0).abs() < f64::EPSILON);

        let recent = service
            .list_recent_attempts("amelia", &topic, Some(7), 10)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].attempt_number, 2);
    }

    #[tokio::test]
    async fn aggregates_topic_progress() {
        let (service, topic) = build_service_with_attempts().await;

        let progress = service
            .topic_progress("amelia", &topic)
            .await
            .unwrap()
            .expect("progress for attempted topic");
        assert_eq!(progress.total_attempts, 2);
        // Mean of 50% and 100%.
        assert!((progress.average_score_percent - 75.0).abs() < f64::EPSILON);
        assert!((progress.average_time_per_question_secs - 10.0).abs() < f64::EPSILON);

        let none = service
            .topic_progress("amelia", &Topic::new("Regression").unwrap())
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn score_trend_is_oldest_first() {
        let (service, topic) = build_service_with_attempts().await;

        let trend = service.score_trend("amelia", &topic).await.unwrap();
        assert_eq!(trend.len(), 2);
        assert!(trend[0].finished_at < trend[1].finished_at);
        assert!((trend[0].score_percent - 50.0).abs() < f64::EPSILON);
        assert!((trend[1].score_percent - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn fetches_attempt_detail() {
        let repo = Arc::new(InMemoryRepository::new());
        let record = build_record("Probability", 1, 1, 2, fixed_now());
        let id = repo.store_attempt(&record).await.unwrap();

        let service = AttemptHistoryService::new(fixed_clock(), repo);
        let fetched = service.get_attempt(id).await.unwrap();
        assert_eq!(fetched, record);

        let err = service
            .get_attempt(AttemptId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::Storage(_)));
    }
}
