use std::sync::Arc;

use exam_core::Clock;
use exam_core::model::{ExamCatalog, Question, SchoolId, Selection};
use storage::repository::{QuestionFilter, QuestionRepository};

use super::engine::{ExamEngine, SessionConfig};
use super::events::{EventBus, ExamEventListener};
use super::randomizer::SessionRandomizer;
use super::timer::TickSource;
use super::view::ExamSnapshot;
use crate::error::ExamServiceError;

/// A resolved exam request: configuration plus the fetched questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedExam {
    pub config: SessionConfig,
    pub questions: Vec<Question>,
}

/// Orchestrates exam start: catalog lookup, question fetch, engine wiring.
#[derive(Clone)]
pub struct ExamLoopService {
    catalog: ExamCatalog,
    questions: Arc<dyn QuestionRepository>,
    clock: Clock,
    ticks: TickSource,
    randomizer: SessionRandomizer,
    events: EventBus,
}

impl ExamLoopService {
    #[must_use]
    pub fn new(
        catalog: ExamCatalog,
        questions: Arc<dyn QuestionRepository>,
        clock: Clock,
        ticks: TickSource,
    ) -> Self {
        Self {
            catalog,
            questions,
            clock,
            ticks,
            randomizer: SessionRandomizer::Entropy,
            events: EventBus::new(),
        }
    }

    #[must_use]
    pub fn with_randomizer(mut self, randomizer: SessionRandomizer) -> Self {
        self.randomizer = randomizer;
        self
    }

    /// Every engine built after this call reports to `listener`.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ExamEventListener>) -> Self {
        self.events.subscribe(listener);
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &ExamCatalog {
        &self.catalog
    }

    /// Build an idle engine wired to this service's listeners.
    #[must_use]
    pub fn engine(&self) -> ExamEngine {
        ExamEngine::new(self.ticks.clone(), self.events.clone())
            .with_randomizer(self.randomizer)
            .with_clock(self.clock)
    }

    /// Resolve `selection` against the catalog and fetch its questions.
    ///
    /// `count` overrides the catalog's question count.
    ///
    /// # Errors
    ///
    /// - `UnknownCategory` / `UnknownTopic` if the catalog has no such entry
    /// - `InvalidCount` if `count` is zero
    /// - `NoContent` if the bank returns nothing or fails
    pub async fn prepare(
        &self,
        selection: &Selection,
        count: Option<u32>,
        tenant: Option<SchoolId>,
    ) -> Result<PreparedExam, ExamServiceError> {
        let (default_count, min_correct) = match selection {
            Selection::Category(code) => {
                let category =
                    self.catalog
                        .category(code)
                        .ok_or_else(|| ExamServiceError::UnknownCategory {
                            code: code.to_string(),
                        })?;
                (category.question_count, Some(category.min_correct))
            }
            Selection::Topic(slug) => {
                let topic =
                    self.catalog
                        .topic(slug)
                        .ok_or_else(|| ExamServiceError::UnknownTopic {
                            slug: slug.clone(),
                        })?;
                (topic.question_count, None)
            }
        };
        let limit = count.unwrap_or(default_count);
        if limit == 0 {
            return Err(ExamServiceError::InvalidCount);
        }

        let filter = QuestionFilter::for_selection(selection);
        let questions = match self.questions.fetch_questions(&filter, limit).await {
            Ok(questions) => questions,
            Err(err) => {
                tracing::warn!(%selection, error = %err, "question fetch failed");
                Vec::new()
            }
        };
        if questions.is_empty() {
            return Err(ExamServiceError::NoContent {
                selection: selection.clone(),
            });
        }
        tracing::debug!(%selection, fetched = questions.len(), limit, "questions ready");

        let config = SessionConfig::new(selection.clone())
            .with_tenant(tenant)
            .with_min_correct(min_correct);
        Ok(PreparedExam { config, questions })
    }

    /// Prepare `selection` and begin it on `engine`.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError` from [`Self::prepare`], or `Exam` if the
    /// engine refuses to begin.
    pub async fn start(
        &self,
        engine: &mut ExamEngine,
        selection: &Selection,
        count: Option<u32>,
        tenant: Option<SchoolId>,
    ) -> Result<ExamSnapshot, ExamServiceError> {
        let prepared = self.prepare(selection, count, tenant).await?;
        Ok(engine.begin(prepared.config, prepared.questions)?)
    }
}
