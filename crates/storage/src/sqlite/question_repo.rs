use exam_core::model::Question;

use super::SqliteRepository;
use super::mapping::{answer_columns, id_to_i64, map_question_row, ser};
use crate::repository::{
    QuestionFilter, QuestionRecord, QuestionRepository, StorageError, ensure_limit,
};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, record: &QuestionRecord) -> Result<(), StorageError> {
        let question = &record.question;
        let id = id_to_i64("question_id", question.id().value())?;
        let [a, b, c, d, e] = answer_columns(question);
        let active = i64::from(record.active);

        sqlx::query(
            r"
            INSERT INTO questions (
                id, category, topic, prompt,
                answer_a, answer_b, answer_c, answer_d, answer_e,
                correct_answer, image_ref, active, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(id) DO UPDATE SET
                category = excluded.category,
                topic = excluded.topic,
                prompt = excluded.prompt,
                answer_a = excluded.answer_a,
                answer_b = excluded.answer_b,
                answer_c = excluded.answer_c,
                answer_d = excluded.answer_d,
                answer_e = excluded.answer_e,
                correct_answer = excluded.correct_answer,
                image_ref = excluded.image_ref,
                active = excluded.active
            ",
        )
        .bind(id)
        .bind(record.category.as_str())
        .bind(record.topic.as_deref())
        .bind(question.prompt())
        .bind(a)
        .bind(b)
        .bind(c)
        .bind(d)
        .bind(e)
        .bind(question.correct_label().to_string())
        .bind(question.image_ref())
        .bind(active)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn fetch_questions(
        &self,
        filter: &QuestionFilter,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        ensure_limit(limit)?;

        let rows = sqlx::query(
            r"
            SELECT
                id, prompt, answer_a, answer_b, answer_c, answer_d, answer_e,
                correct_answer, image_ref
            FROM questions
            WHERE active = 1
              AND (?1 IS NULL OR category = ?1)
              AND (?2 IS NULL OR topic = ?2 COLLATE NOCASE)
            ORDER BY RANDOM()
            LIMIT ?3
            ",
        )
        .bind(filter.category.as_ref().map(|c| c.as_str()))
        .bind(filter.topic.as_deref())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tracing::debug!(
            category = ?filter.category,
            topic = ?filter.topic,
            limit,
            fetched = rows.len(),
            "fetched questions"
        );

        rows.iter().map(map_question_row).collect()
    }

    async fn count_questions(&self, filter: &QuestionFilter) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM questions
            WHERE active = 1
              AND (?1 IS NULL OR category = ?1)
              AND (?2 IS NULL OR topic = ?2 COLLATE NOCASE)
            ",
        )
        .bind(filter.category.as_ref().map(|c| c.as_str()))
        .bind(filter.topic.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        u32::try_from(count).map_err(ser)
    }
}
