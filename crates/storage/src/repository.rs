use async_trait::async_trait;
use exam_core::model::{CategoryCode, Question, QuestionId, SchoolId, Selection, SessionSummary};
use std::collections::BTreeMap;
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

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

/// Which questions to draw. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    pub category: Option<CategoryCode>,
    pub topic: Option<String>,
}

impl QuestionFilter {
    #[must_use]
    pub fn category(code: CategoryCode) -> Self {
        Self {
            category: Some(code),
            topic: None,
        }
    }

    #[must_use]
    pub fn topic(topic: impl Into<String>) -> Self {
        Self {
            category: None,
            topic: Some(topic.into()),
        }
    }

    #[must_use]
    pub fn for_selection(selection: &Selection) -> Self {
        match selection {
            Selection::Category(code) => Self::category(code.clone()),
            Selection::Topic(topic) => Self::topic(topic.clone()),
        }
    }

    /// True if an active record passes this filter.
    #[must_use]
    pub fn matches(&self, record: &QuestionRecord) -> bool {
        if !record.active {
            return false;
        }
        if self
            .category
            .as_ref()
            .is_some_and(|category| category != &record.category)
        {
            return false;
        }
        match (&self.topic, &record.topic) {
            (None, _) => true,
            (Some(wanted), Some(topic)) => wanted.eq_ignore_ascii_case(topic),
            (Some(_), None) => false,
        }
    }
}

/// Persisted shape of a question-bank entry.
///
/// The domain `Question` carries no bank metadata; category, topic and the
/// active flag only matter for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub question: Question,
    pub category: CategoryCode,
    pub topic: Option<String>,
    pub active: bool,
}

impl QuestionRecord {
    #[must_use]
    pub fn new(question: Question, category: CategoryCode, topic: Option<String>) -> Self {
        Self {
            question,
            category,
            topic: topic.map(|t| t.trim().to_ascii_uppercase()),
            active: true,
        }
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Question bank contract.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert or replace a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_question(&self, record: &QuestionRecord) -> Result<(), StorageError>;

    /// Fetch up to `limit` active questions matching the filter, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` when `limit` is zero, or other storage errors.
    async fn fetch_questions(
        &self,
        filter: &QuestionFilter,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError>;

    /// Count active questions matching the filter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_questions(&self, filter: &QuestionFilter) -> Result<u32, StorageError>;
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// A persisted exam result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub id: i64,
    pub summary: SessionSummary,
    pub tenant: Option<SchoolId>,
}

/// Sink for completed session summaries.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Persist a completed summary and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the attempt was already recorded,
    /// or other storage errors.
    async fn record_result(
        &self,
        summary: &SessionSummary,
        tenant: Option<SchoolId>,
    ) -> Result<i64, StorageError>;

    /// List results newest first. `None` lists every tenant.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_results(
        &self,
        tenant: Option<SchoolId>,
        limit: u32,
    ) -> Result<Vec<ResultRow>, StorageError>;

    /// Every result for `tenant`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn all_results(&self, tenant: Option<SchoolId>) -> Result<Vec<ResultRow>, StorageError>;
}

pub(crate) fn ensure_limit(limit: u32) -> Result<(), StorageError> {
    if limit == 0 {
        return Err(StorageError::Serialization(
            "question limit must be > 0".into(),
        ));
    }
    Ok(())
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository for tests and prototyping.
///
/// Questions are returned in ascending id order so selections are deterministic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<QuestionId, QuestionRecord>>>,
    results: Arc<Mutex<Vec<ResultRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn results_for(&self, tenant: Option<SchoolId>) -> Result<Vec<ResultRow>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<ResultRow> = guard
            .iter()
            .filter(|row| tenant.is_none() || row.tenant == tenant)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.summary
                .completed_at()
                .cmp(&a.summary.completed_at())
                .then(b.id.cmp(&a.id))
        });
        Ok(rows)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, record: &QuestionRecord) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(record.question.id(), record.clone());
        Ok(())
    }

    async fn fetch_questions(
        &self,
        filter: &QuestionFilter,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        ensure_limit(limit)?;
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|record| filter.matches(record))
            .take(take)
            .map(|record| record.question.clone())
            .collect())
    }

    async fn count_questions(&self, filter: &QuestionFilter) -> Result<u32, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let count = guard.values().filter(|record| filter.matches(record)).count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("count overflow".into()))
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn record_result(
        &self,
        summary: &SessionSummary,
        tenant: Option<SchoolId>,
    ) -> Result<i64, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard
            .iter()
            .any(|row| row.summary.attempt_id() == summary.attempt_id())
        {
            return Err(StorageError::Conflict);
        }
        let id = i64::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?;
        guard.push(ResultRow {
            id,
            summary: summary.clone(),
            tenant,
        });
        Ok(id)
    }

    async fn list_results(
        &self,
        tenant: Option<SchoolId>,
        limit: u32,
    ) -> Result<Vec<ResultRow>, StorageError> {
        let mut rows = self.results_for(tenant)?;
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn all_results(&self, tenant: Option<SchoolId>) -> Result<Vec<ResultRow>, StorageError> {
        self.results_for(tenant)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub results: Arc<dyn ResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ResultRepository> = Arc::new(repo);
        Self { questions, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{AttemptId, Choice, ChoiceLabel};
    use exam_core::time::fixed_now;

    fn record(id: u64, category: &str, topic: Option<&str>) -> QuestionRecord {
        let question = Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            vec![Choice::new(ChoiceLabel::A, "x"), Choice::new(ChoiceLabel::B, "y")],
            ChoiceLabel::A,
            None,
        )
        .unwrap();
        QuestionRecord::new(
            question,
            CategoryCode::parse(category).unwrap(),
            topic.map(str::to_string),
        )
    }

    fn summary(correct: u32) -> SessionSummary {
        SessionSummary::new(
            AttemptId::generate(),
            Selection::Category(CategoryCode::parse("ARA").unwrap()),
            correct,
            2,
            10,
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn filters_by_category_topic_and_active() {
        let repo = InMemoryRepository::new();
        repo.upsert_question(&record(1, "ARA", Some("ripeam"))).await.unwrap();
        repo.upsert_question(&record(2, "ARA", None)).await.unwrap();
        repo.upsert_question(&record(3, "MTA", Some("RIPEAM"))).await.unwrap();
        repo.upsert_question(&record(4, "ARA", None).inactive())
            .await
            .unwrap();

        let ara = QuestionFilter::category(CategoryCode::parse("ARA").unwrap());
        assert_eq!(repo.count_questions(&ara).await.unwrap(), 2);

        let ripeam = repo
            .fetch_questions(&QuestionFilter::topic("RIPEAM"), 10)
            .await
            .unwrap();
        let ids: Vec<u64> = ripeam.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![1, 3]);

        let limited = repo.fetch_questions(&ara, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn zero_limit_is_rejected() {
        let repo = InMemoryRepository::new();
        let err = repo
            .fetch_questions(&QuestionFilter::default(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn duplicate_attempt_is_a_conflict() {
        let repo = InMemoryRepository::new();
        let s = summary(1);
        repo.record_result(&s, None).await.unwrap();
        let err = repo.record_result(&s, None).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn lists_results_for_tenant_newest_first() {
        let repo = InMemoryRepository::new();
        let school = SchoolId::new(9);
        let first = repo.record_result(&summary(1), Some(school)).await.unwrap();
        repo.record_result(&summary(2), None).await.unwrap();
        let third = repo.record_result(&summary(0), Some(school)).await.unwrap();

        let rows = repo.list_results(Some(school), 10).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third, first]);

        let all = repo.list_results(None, 2).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn all_results_ignores_the_list_cap() {
        let repo = InMemoryRepository::new();
        let school = Some(SchoolId::new(2));
        for _ in 0..5 {
            repo.record_result(&summary(1), school).await.unwrap();
        }
        repo.record_result(&summary(2), None).await.unwrap();

        assert_eq!(repo.list_results(school, 3).await.unwrap().len(), 3);
        let rows = repo.all_results(school).await.unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows.windows(2).all(|w| w[0].id > w[1].id));
        assert_eq!(repo.all_results(None).await.unwrap().len(), 6);
    }
}
