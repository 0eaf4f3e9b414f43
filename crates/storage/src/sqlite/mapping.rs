use exam_core::model::{
    AttemptId, CategoryCode, ChoiceLabel, MAX_CHOICES, Question, QuestionId, SchoolId, Selection,
    SessionSummary,
};
use sqlx::Row;

use crate::repository::{ResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn school_id_from_i64(v: i64) -> Result<SchoolId, StorageError> {
    Ok(SchoolId::new(i64_to_u64("school_id", v)?))
}

/// Spread a question's choices over the five answer columns by label.
pub(crate) fn answer_columns(question: &Question) -> [Option<String>; MAX_CHOICES] {
    let mut columns: [Option<String>; MAX_CHOICES] = Default::default();
    for choice in question.choices() {
        columns[choice.label.position()] = Some(choice.text.clone());
    }
    columns
}

/// Storage encoding of a selection: `(kind, value)`.
pub(crate) fn selection_to_columns(selection: &Selection) -> (&'static str, &str) {
    match selection {
        Selection::Category(code) => ("category", code.as_str()),
        Selection::Topic(topic) => ("topic", topic.as_str()),
    }
}

pub(crate) fn selection_from_columns(kind: &str, value: &str) -> Result<Selection, StorageError> {
    match kind {
        "category" => Ok(Selection::Category(CategoryCode::parse(value).map_err(ser)?)),
        "topic" => Selection::topic(value).map_err(ser),
        other => Err(StorageError::Serialization(format!(
            "invalid selection kind: {other}"
        ))),
    }
}

/// Rebuild a question from its row without validating it.
///
/// Malformed bank entries are surfaced when an exam begins, not here.
pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let prompt: String = row.try_get("prompt").map_err(ser)?;
    let answers = [
        row.try_get::<Option<String>, _>("answer_a").map_err(ser)?,
        row.try_get::<Option<String>, _>("answer_b").map_err(ser)?,
        row.try_get::<Option<String>, _>("answer_c").map_err(ser)?,
        row.try_get::<Option<String>, _>("answer_d").map_err(ser)?,
        row.try_get::<Option<String>, _>("answer_e").map_err(ser)?,
    ];
    let correct: String = row.try_get("correct_answer").map_err(ser)?;
    let correct = correct.parse::<ChoiceLabel>().map_err(ser)?;
    let image_ref: Option<String> = row.try_get("image_ref").map_err(ser)?;

    Ok(Question::from_answer_columns(
        id, prompt, answers, correct, image_ref,
    ))
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<ResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let attempt_id = row
        .try_get::<String, _>("attempt_id")
        .map_err(ser)?
        .parse::<AttemptId>()
        .map_err(ser)?;
    let kind: String = row.try_get("selection_kind").map_err(ser)?;
    let value: String = row.try_get("selection_value").map_err(ser)?;
    let selection = selection_from_columns(&kind, &value)?;

    let score = u32::try_from(row.try_get::<i64, _>("score").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("invalid score".into()))?;
    let total = u32::try_from(row.try_get::<i64, _>("total_questions").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("invalid total_questions".into()))?;
    let elapsed = i64_to_u64(
        "elapsed_seconds",
        row.try_get::<i64, _>("elapsed_seconds").map_err(ser)?,
    )?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;
    let tenant = row
        .try_get::<Option<i64>, _>("school_id")
        .map_err(ser)?
        .map(school_id_from_i64)
        .transpose()?;

    let summary = SessionSummary::new(attempt_id, selection, score, total, elapsed, completed_at)
        .map_err(ser)?;

    Ok(ResultRow {
        id,
        summary,
        tenant,
    })
}
