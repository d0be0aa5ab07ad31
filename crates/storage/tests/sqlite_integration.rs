use chrono::Duration;
use exam_core::model::{AttemptRecord, OptionLabel, QuestionResult, Topic};
use exam_core::time::fixed_now;
use storage::repository::{AttemptRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn build_record(username: &str, topic: &str, attempt_number: u32) -> AttemptRecord {
    let results = vec![
        QuestionResult {
            question_text: "What is the capital of France?".to_string(),
            user_answer: Some(OptionLabel::C),
            correct_answer: OptionLabel::C,
            is_correct: true,
            time_taken_secs: 12.5,
        },
        QuestionResult {
            question_text: "What is 2 + 2?".to_string(),
            user_answer: None,
            correct_answer: OptionLabel::B,
            is_correct: false,
            time_taken_secs: 0.0,
        },
    ];
    AttemptRecord::from_persisted(
        username,
        Topic::new(topic).unwrap(),
        attempt_number,
        fixed_now() + Duration::minutes(i64::from(attempt_number)),
        1,
        2,
        70.0,
        35.0,
        results,
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_results() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let record = build_record("amelia", "Probability", 1);
    let id = repo.store_attempt(&record).await.unwrap();

    let fetched = repo.get_attempt(id).await.unwrap();
    assert_eq!(fetched, record);
    assert_eq!(fetched.results().len(), 2);
    assert_eq!(fetched.results()[1].user_answer, None);
    assert_eq!(fetched.results()[1].user_answer_text(), "Not answered");

    let missing = exam_core::model::AttemptId::generate();
    assert!(matches!(
        repo.get_attempt(missing).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_counts_and_lists_per_user_topic() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_listing?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    for n in 1..=3 {
        repo.store_attempt(&build_record("amelia", "Probability", n))
            .await
            .unwrap();
    }
    repo.store_attempt(&build_record("amelia", "Regression", 1))
        .await
        .unwrap();
    repo.store_attempt(&build_record("noor", "Probability", 1))
        .await
        .unwrap();

    let topic = Topic::new("Probability").unwrap();
    assert_eq!(repo.count_attempts("amelia", &topic).await.unwrap(), 3);

    let rows = repo
        .list_attempts("amelia", &topic, None, None, 10)
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].record.attempt_number(), 3);
    assert_eq!(rows[2].record.attempt_number(), 1);

    let from = fixed_now() + Duration::minutes(2);
    let rows = repo
        .list_attempts("amelia", &topic, Some(from), None, 10)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let topics = repo.list_topics("amelia").await.unwrap();
    let names: Vec<&str> = topics.iter().map(Topic::as_str).collect();
    assert_eq!(names, vec!["Probability", "Regression"]);
}
