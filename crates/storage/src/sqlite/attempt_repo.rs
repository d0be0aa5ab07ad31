use chrono::{DateTime, Utc};
use exam_core::model::{AttemptId, AttemptRecord, Topic};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{AttemptHeader, map_attempt_header, map_result_row, ser, u32_from_i64};
use crate::repository::{AttemptRepository, AttemptRow, StorageError};

impl SqliteRepository {
    async fn load_results(
        &self,
        id: AttemptId,
    ) -> Result<Vec<exam_core::model::QuestionResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT question_text, user_answer, correct_answer, is_correct, time_taken
                FROM attempt_results
                WHERE attempt_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(map_result_row(&row)?);
        }
        Ok(results)
    }

    async fn into_row(&self, header: AttemptHeader) -> Result<AttemptRow, StorageError> {
        let results = self.load_results(header.id).await?;
        let record = AttemptRecord::from_persisted(
            header.username,
            header.topic,
            header.attempt_number,
            header.finished_at,
            header.total_score,
            header.total_questions,
            header.total_time_taken,
            header.average_time_per_question,
            results,
        )
        .map_err(ser)?;
        Ok(AttemptRow::new(header.id, record))
    }
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn store_attempt(&self, record: &AttemptRecord) -> Result<AttemptId, StorageError> {
        let id = AttemptId::generate();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
                INSERT INTO attempts (
                    id, username, topic, attempt_number, finished_at,
                    total_score, total_questions, total_time_taken,
                    average_time_per_question
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(id.to_string())
        .bind(record.username())
        .bind(record.topic().as_str())
        .bind(i64::from(record.attempt_number()))
        .bind(record.finished_at())
        .bind(i64::from(record.total_score()))
        .bind(i64::from(record.total_questions()))
        .bind(record.total_time_taken_secs())
        .bind(record.average_time_per_question_secs())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        for (position, result) in record.results().iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            sqlx::query(
                r"
                    INSERT INTO attempt_results (
                        attempt_id, position, question_text, user_answer,
                        correct_answer, is_correct, time_taken
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(id.to_string())
            .bind(position)
            .bind(result.question_text.as_str())
            .bind(result.user_answer.map(|l| l.as_str()))
            .bind(result.correct_answer.as_str())
            .bind(i64::from(result.is_correct))
            .bind(result.time_taken_secs)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(id)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, username, topic, attempt_number, finished_at,
                    total_score, total_questions, total_time_taken,
                    average_time_per_question
                FROM attempts
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        let header = map_attempt_header(&row)?;
        Ok(self.into_row(header).await?.record)
    }

    async fn count_attempts(&self, username: &str, topic: &Topic) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
                SELECT COUNT(*) AS n
                FROM attempts
                WHERE username = ?1 AND topic = ?2
            ",
        )
        .bind(username)
        .bind(topic.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        u32_from_i64("count", row.try_get::<i64, _>("n").map_err(ser)?)
    }

    async fn list_attempts(
        &self,
        username: &str,
        topic: &Topic,
        finished_from: Option<DateTime<Utc>>,
        finished_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let mut sql = String::from(
            r"
                SELECT
                    id, username, topic, attempt_number, finished_at,
                    total_score, total_questions, total_time_taken,
                    average_time_per_question
                FROM attempts
                WHERE username = ?1 AND topic = ?2
            ",
        );

        let mut bind_index = 3;
        if finished_from.is_some() {
            sql.push_str(" AND finished_at >= ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        if finished_until.is_some() {
            sql.push_str(" AND finished_at <= ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        sql.push_str(" ORDER BY finished_at DESC, attempt_number DESC");
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql).bind(username).bind(topic.as_str());
        if let Some(from) = finished_from {
            query = query.bind(from);
        }
        if let Some(until) = finished_until {
            query = query.bind(until);
        }
        query = query.bind(i64::from(limit));

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let header = map_attempt_header(&row)?;
            out.push(self.into_row(header).await?);
        }

        Ok(out)
    }

    async fn list_topics(&self, username: &str) -> Result<Vec<Topic>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT DISTINCT topic
                FROM attempts
                WHERE username = ?1
                ORDER BY topic ASC
            ",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut topics = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("topic").map_err(ser)?;
            topics.push(super::mapping::topic_from_str(&name)?);
        }
        Ok(topics)
    }
}
