use exam_core::model::{SchoolId, SessionSummary};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_result_row, selection_to_columns};
use crate::repository::{ResultRepository, ResultRow, StorageError};

fn write_error(e: sqlx::Error) -> StorageError {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        StorageError::Conflict
    } else {
        StorageError::Connection(e.to_string())
    }
}

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn record_result(
        &self,
        summary: &SessionSummary,
        tenant: Option<SchoolId>,
    ) -> Result<i64, StorageError> {
        let (kind, value) = selection_to_columns(summary.selection());
        let elapsed = id_to_i64("elapsed_seconds", summary.elapsed_seconds())?;
        let school_id = tenant
            .map(|t| id_to_i64("school_id", t.value()))
            .transpose()?;

        let res = sqlx::query(
            r"
                INSERT INTO results (
                    attempt_id, selection_kind, selection_value, score,
                    total_questions, elapsed_seconds, school_id, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(summary.attempt_id().to_string())
        .bind(kind)
        .bind(value)
        .bind(i64::from(summary.correct_count()))
        .bind(i64::from(summary.total()))
        .bind(elapsed)
        .bind(school_id)
        .bind(summary.completed_at())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_results(
        &self,
        tenant: Option<SchoolId>,
        limit: u32,
    ) -> Result<Vec<ResultRow>, StorageError> {
        self.select_results(tenant, i64::from(limit)).await
    }

    async fn all_results(&self, tenant: Option<SchoolId>) -> Result<Vec<ResultRow>, StorageError> {
        // A negative LIMIT has no upper bound in SQLite.
        self.select_results(tenant, -1).await
    }
}

impl SqliteRepository {
    async fn select_results(
        &self,
        tenant: Option<SchoolId>,
        limit: i64,
    ) -> Result<Vec<ResultRow>, StorageError> {
        let school_id = tenant
            .map(|t| id_to_i64("school_id", t.value()))
            .transpose()?;

        let rows = sqlx::query(
            r"
                SELECT
                    id, attempt_id, selection_kind, selection_value, score,
                    total_questions, elapsed_seconds, school_id, completed_at
                FROM results
                WHERE (?1 IS NULL OR school_id = ?1)
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(school_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_result_row).collect()
    }
}
