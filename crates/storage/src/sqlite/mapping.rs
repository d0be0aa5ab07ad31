use exam_core::model::{AttemptId, OptionLabel, QuestionResult, Topic};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn attempt_id_from_str(s: &str) -> Result<AttemptId, StorageError> {
    s.parse::<AttemptId>().map_err(ser)
}

pub(crate) fn label_from_str(field: &'static str, s: &str) -> Result<OptionLabel, StorageError> {
    s.parse::<OptionLabel>()
        .map_err(|_| StorageError::Serialization(format!("invalid {field}: {s}")))
}

pub(crate) fn topic_from_str(s: &str) -> Result<Topic, StorageError> {
    Topic::new(s).map_err(ser)
}

/// Fields of an `attempts` row; results are loaded separately and stitched
/// together in `AttemptRecord::from_persisted`.
pub(crate) struct AttemptHeader {
    pub id: AttemptId,
    pub username: String,
    pub topic: Topic,
    pub attempt_number: u32,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub total_score: u32,
    pub total_questions: u32,
    pub total_time_taken: f64,
    pub average_time_per_question: f64,
}

pub(crate) fn map_attempt_header(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AttemptHeader, StorageError> {
    let id = attempt_id_from_str(row.try_get::<String, _>("id").map_err(ser)?.as_str())?;
    let username: String = row.try_get("username").map_err(ser)?;
    let topic = topic_from_str(row.try_get::<String, _>("topic").map_err(ser)?.as_str())?;
    let attempt_number = u32_from_i64(
        "attempt_number",
        row.try_get::<i64, _>("attempt_number").map_err(ser)?,
    )?;
    let finished_at = row.try_get("finished_at").map_err(ser)?;
    let total_score = u32_from_i64(
        "total_score",
        row.try_get::<i64, _>("total_score").map_err(ser)?,
    )?;
    let total_questions = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let total_time_taken: f64 = row.try_get("total_time_taken").map_err(ser)?;
    let average_time_per_question: f64 =
        row.try_get("average_time_per_question").map_err(ser)?;

    Ok(AttemptHeader {
        id,
        username,
        topic,
        attempt_number,
        finished_at,
        total_score,
        total_questions,
        total_time_taken,
        average_time_per_question,
    })
}

pub(crate) fn map_result_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<QuestionResult, StorageError> {
    let question_text: String = row.try_get("question_text").map_err(ser)?;
    let user_answer = row
        .try_get::<Option<String>, _>("user_answer")
        .map_err(ser)?
        .map(|s| label_from_str("user_answer", &s))
        .transpose()?;
    let correct_answer = label_from_str(
        "correct_answer",
        row.try_get::<String, _>("correct_answer").map_err(ser)?.as_str(),
    )?;
    let is_correct = row.try_get::<i64, _>("is_correct").map_err(ser)? != 0;
    let time_taken_secs: f64 = row.try_get("time_taken").map_err(ser)?;

    Ok(QuestionResult {
        question_text,
        user_answer,
        correct_answer,
        is_correct,
        time_taken_secs,
    })
}
