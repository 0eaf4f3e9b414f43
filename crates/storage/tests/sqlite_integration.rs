use chrono::Duration;
use exam_core::model::{
    AttemptId, CategoryCode, Choice, ChoiceLabel, Question, QuestionId, SchoolId, Selection,
    SessionSummary,
};
use exam_core::time::fixed_now;
use storage::repository::{
    QuestionFilter, QuestionRecord, QuestionRepository, ResultRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn record(id: u64, category: &str, topic: Option<&str>, choices: usize) -> QuestionRecord {
    let choices = ChoiceLabel::ALL
        .iter()
        .take(choices)
        .map(|label| Choice::new(*label, format!("answer {label}")))
        .collect();
    let question = Question::new(
        QuestionId::new(id),
        format!("Question {id}"),
        choices,
        ChoiceLabel::B,
        None,
    )
    .unwrap();
    QuestionRecord::new(
        question,
        CategoryCode::parse(category).unwrap(),
        topic.map(str::to_string),
    )
}

fn summary(selection: Selection, correct: u32, total: u32, minutes_ago: i64) -> SessionSummary {
    SessionSummary::new(
        AttemptId::generate(),
        selection,
        correct,
        total,
        300,
        fixed_now() - Duration::minutes(minutes_ago),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_choices_and_labels() {
    let repo = connect("memdb_question_roundtrip").await;

    let mut q = record(1, "ARA", Some("ripeam"), 3);
    q.question = Question::new(
        QuestionId::new(1),
        "Which side?",
        vec![
            Choice::new(ChoiceLabel::A, "x"),
            Choice::new(ChoiceLabel::B, "y"),
            Choice::new(ChoiceLabel::C, "z"),
        ],
        ChoiceLabel::B,
        Some("buoy.png".into()),
    )
    .unwrap();
    repo.upsert_question(&q).await.unwrap();

    let fetched = repo
        .fetch_questions(&QuestionFilter::topic("RIPEAM"), 10)
        .await
        .unwrap();
    assert_eq!(fetched.len(), 1);
    let question = &fetched[0];
    assert_eq!(question, &q.question);
    assert_eq!(question.label_of(1), Some(ChoiceLabel::B));
    assert_eq!(question.image_ref(), Some("buoy.png"));
}

#[tokio::test]
async fn sqlite_filters_active_questions_and_limits() {
    let repo = connect("memdb_question_filters").await;

    for id in 1..=6 {
        repo.upsert_question(&record(id, "ARA", None, 2)).await.unwrap();
    }
    repo.upsert_question(&record(7, "MTA", Some("IALA"), 5))
        .await
        .unwrap();
    repo.upsert_question(&record(8, "ARA", None, 2).inactive())
        .await
        .unwrap();

    let ara = QuestionFilter::category(CategoryCode::parse("ara").unwrap());
    assert_eq!(repo.count_questions(&ara).await.unwrap(), 6);
    assert_eq!(
        repo.count_questions(&QuestionFilter::default()).await.unwrap(),
        7
    );

    let limited = repo.fetch_questions(&ara, 4).await.unwrap();
    assert_eq!(limited.len(), 4);
    assert!(limited.iter().all(|q| q.id().value() <= 6));

    let err = repo.fetch_questions(&ara, 0).await.unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
}

#[tokio::test]
async fn sqlite_upsert_replaces_existing_question() {
    let repo = connect("memdb_question_upsert").await;

    repo.upsert_question(&record(1, "ARA", None, 2)).await.unwrap();
    repo.upsert_question(&record(1, "ARA", None, 4)).await.unwrap();

    let fetched = repo
        .fetch_questions(&QuestionFilter::default(), 5)
        .await
        .unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].choices().len(), 4);

    repo.upsert_question(&record(1, "ARA", None, 4).inactive())
        .await
        .unwrap();
    assert_eq!(
        repo.count_questions(&QuestionFilter::default()).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn sqlite_records_and_lists_results_per_tenant() {
    let repo = connect("memdb_results").await;
    let school = SchoolId::new(12);
    let ara = Selection::Category(CategoryCode::parse("ARA").unwrap());
    let iala = Selection::topic("iala").unwrap();

    let older = summary(ara.clone(), 30, 40, 60);
    let newer = summary(iala, 5, 10, 5);
    let other = summary(ara, 10, 40, 1);

    repo.record_result(&older, Some(school)).await.unwrap();
    repo.record_result(&newer, Some(school)).await.unwrap();
    repo.record_result(&other, None).await.unwrap();

    let rows = repo.list_results(Some(school), 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].summary, newer);
    assert_eq!(rows[1].summary, older);
    assert!(rows.iter().all(|row| row.tenant == Some(school)));

    let all = repo.list_results(None, 10).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].summary.attempt_id(), other.attempt_id());

    let capped = repo.list_results(None, 1).await.unwrap();
    assert_eq!(capped.len(), 1);
}

#[tokio::test]
async fn sqlite_all_results_is_not_capped() {
    let repo = connect("memdb_results_all").await;
    let school = SchoolId::new(3);
    let ara = Selection::Category(CategoryCode::parse("ARA").unwrap());
    for minutes in 0..7 {
        repo.record_result(&summary(ara.clone(), 20, 40, minutes), Some(school))
            .await
            .unwrap();
    }
    repo.record_result(&summary(ara, 1, 40, 0), None).await.unwrap();

    assert_eq!(repo.list_results(Some(school), 2).await.unwrap().len(), 2);
    let rows = repo.all_results(Some(school)).await.unwrap();
    assert_eq!(rows.len(), 7);
    assert!(rows.iter().all(|row| row.tenant == Some(school)));
    assert_eq!(repo.all_results(None).await.unwrap().len(), 8);
}

#[tokio::test]
async fn sqlite_duplicate_attempt_is_conflict() {
    let repo = connect("memdb_results_conflict").await;
    let s = summary(Selection::topic("RIPEAM").unwrap(), 1, 2, 0);

    repo.record_result(&s, None).await.unwrap();
    let err = repo.record_result(&s, None).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    repo.upsert_question(&record(1, "VLA", None, 2)).await.unwrap();
    assert_eq!(
        repo.count_questions(&QuestionFilter::default()).await.unwrap(),
        1
    );
}
