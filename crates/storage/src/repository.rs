use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{AttemptId, AttemptRecord, Topic};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A persisted attempt paired with its storage identifier.
///
/// Useful for list views that navigate to a detail lookup without a second
/// query.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRow {
    pub id: AttemptId,
    pub record: AttemptRecord,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: AttemptId, record: AttemptRecord) -> Self {
        Self { id, record }
    }
}

/// Repository contract for test attempts. Append-only: records are never
/// updated or deleted through this interface.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append a terminal attempt record, returning its generated id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn store_attempt(&self, record: &AttemptRecord) -> Result<AttemptId, StorageError>;

    /// Fetch an attempt by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError>;

    /// Count a user's attempts for a topic; drives attempt numbering.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn count_attempts(&self, username: &str, topic: &Topic) -> Result<u32, StorageError>;

    /// List a user's attempts for a topic, most recent first, within an
    /// optional finished-at window.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_attempts(
        &self,
        username: &str,
        topic: &Topic,
        finished_from: Option<DateTime<Utc>>,
        finished_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError>;

    /// Distinct topics the user has attempted, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_topics(&self, username: &str) -> Result<Vec<Topic>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    attempts: Arc<Mutex<Vec<AttemptRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn store_attempt(&self, record: &AttemptRecord) -> Result<AttemptId, StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = AttemptId::generate();
        guard.push(AttemptRow::new(id, record.clone()));
        Ok(id)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.record.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn count_attempts(&self, username: &str, topic: &Topic) -> Result<u32, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let count = guard
            .iter()
            .filter(|row| row.record.username() == username && row.record.topic() == topic)
            .count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("count overflow".into()))
    }

    async fn list_attempts(
        &self,
        username: &str,
        topic: &Topic,
        finished_from: Option<DateTime<Utc>>,
        finished_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<AttemptRow> = guard
            .iter()
            .filter(|row| row.record.username() == username && row.record.topic() == topic)
            .filter(|row| finished_from.is_none_or(|from| row.record.finished_at() >= from))
            .filter(|row| finished_until.is_none_or(|until| row.record.finished_at() <= until))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.record
                .finished_at()
                .cmp(&a.record.finished_at())
                .then(b.record.attempt_number().cmp(&a.record.attempt_number()))
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn list_topics(&self, username: &str) -> Result<Vec<Topic>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut topics: Vec<Topic> = Vec::new();
        for row in guard.iter() {
            if row.record.username() == username && !topics.contains(row.record.topic()) {
                topics.push(row.record.topic().clone());
            }
        }
        topics.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(topics)
    }
}

/// Aggregates the attempt repository behind a trait object for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            attempts: Arc::new(InMemoryRepository::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::{OptionLabel, QuestionResult};
    use exam_core::time::fixed_now;

    fn build_record(username: &str, topic: &str, attempt_number: u32, correct: bool) -> AttemptRecord {
        let result = QuestionResult {
            question_text: "Q?".to_string(),
            user_answer: Some(OptionLabel::A),
            correct_answer: OptionLabel::A,
            is_correct: correct,
            time_taken_secs: 5.0,
        };
        AttemptRecord::from_persisted(
            username,
            Topic::new(topic).unwrap(),
            attempt_number,
            fixed_now() + Duration::minutes(i64::from(attempt_number)),
            u32::from(correct),
            1,
            5.0,
            5.0,
            vec![result],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn round_trips_attempt() {
        let repo = InMemoryRepository::new();
        let record = build_record("amelia", "Probability", 1, true);

        let id = repo.store_attempt(&record).await.unwrap();
        let fetched = repo.get_attempt(id).await.unwrap();

        assert_eq!(fetched, record);
        assert!(matches!(
            repo.get_attempt(AttemptId::generate()).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn counts_scoped_to_user_and_topic() {
        let repo = InMemoryRepository::new();
        repo.store_attempt(&build_record("amelia", "Probability", 1, true))
            .await
            .unwrap();
        repo.store_attempt(&build_record("amelia", "Probability", 2, false))
            .await
            .unwrap();
        repo.store_attempt(&build_record("amelia", "Regression", 1, true))
            .await
            .unwrap();
        repo.store_attempt(&build_record("noor", "Probability", 1, true))
            .await
            .unwrap();

        let topic = Topic::new("Probability").unwrap();
        assert_eq!(repo.count_attempts("amelia", &topic).await.unwrap(), 2);
        assert_eq!(repo.count_attempts("noor", &topic).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn lists_most_recent_first_with_window() {
        let repo = InMemoryRepository::new();
        for n in 1..=3 {
            repo.store_attempt(&build_record("amelia", "Probability", n, true))
                .await
                .unwrap();
        }

        let topic = Topic::new("Probability").unwrap();
        let rows = repo
            .list_attempts("amelia", &topic, None, None, 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].record.attempt_number(), 3);
        assert_eq!(rows[2].record.attempt_number(), 1);

        // Window excludes the first attempt.
        let from = fixed_now() + Duration::minutes(2);
        let rows = repo
            .list_attempts("amelia", &topic, Some(from), None, 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rows = repo
            .list_attempts("amelia", &topic, None, None, 1)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.attempt_number(), 3);
    }

    #[tokio::test]
    async fn lists_distinct_topics_sorted() {
        let repo = InMemoryRepository::new();
        repo.store_attempt(&build_record("amelia", "Regression", 1, true))
            .await
            .unwrap();
        repo.store_attempt(&build_record("amelia", "Probability", 1, true))
            .await
            .unwrap();
        repo.store_attempt(&build_record("amelia", "Probability", 2, true))
            .await
            .unwrap();

        let topics = repo.list_topics("amelia").await.unwrap();
        let names: Vec<&str> = topics.iter().map(Topic::as_str).collect();
        assert_eq!(names, vec!["Probability", "Regression"]);
    }
}
