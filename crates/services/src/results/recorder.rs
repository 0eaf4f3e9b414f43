use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use storage::repository::ResultRepository;

use crate::exam::ExamEvent;

/// Counters reported when the recorder's channel closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderReport {
    pub recorded: u32,
    pub failed: u32,
}

/// Persists completed attempts off the engine's path.
///
/// Consumes events from a [`ChannelListener`](crate::exam::ChannelListener)
/// and writes each `Completed` summary to the result sink. Write failures are
/// logged and dropped; the student already has their result.
#[derive(Clone)]
pub struct ResultRecorder {
    results: Arc<dyn ResultRepository>,
}

impl ResultRecorder {
    #[must_use]
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }

    /// Drain `events` until every sender is gone.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<ExamEvent>) -> RecorderReport {
        let mut report = RecorderReport::default();
        while let Some(event) = events.recv().await {
            let ExamEvent::Completed { summary, tenant } = event else {
                continue;
            };
            match self.results.record_result(&summary, tenant).await {
                Ok(id) => {
                    report.recorded += 1;
                    tracing::info!(
                        attempt_id = %summary.attempt_id(),
                        result_id = id,
                        "result recorded"
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        attempt_id = %summary.attempt_id(),
                        error = %err,
                        "failed to record result"
                    );
                }
            }
        }
        report
    }

    /// Run the recorder on the current tokio runtime.
    #[must_use]
    pub fn spawn(self, events: mpsc::UnboundedReceiver<ExamEvent>) -> JoinHandle<RecorderReport> {
        tokio::spawn(self.run(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{
        AttemptId, CategoryCode, SchoolId, Selection, SessionSummary,
    };
    use exam_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, ResultRow, StorageError};

    use crate::exam::ChannelListener;
    use crate::exam::ExamEventListener;

    fn summary() -> SessionSummary {
        SessionSummary::new(
            AttemptId::generate(),
            Selection::Category(CategoryCode::parse("MTA").unwrap()),
            15,
            20,
            600,
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn records_only_completed_events() {
        let repo = InMemoryRepository::new();
        let (listener, rx) = ChannelListener::channel();
        let handle = ResultRecorder::new(Arc::new(repo.clone())).spawn(rx);

        let s = summary();
        listener.on_event(&ExamEvent::Abandoned {
            attempt_id: AttemptId::generate(),
        });
        listener.on_event(&ExamEvent::Completed {
            summary: s.clone(),
            tenant: Some(SchoolId::new(4)),
        });
        drop(listener);

        let report = handle.await.unwrap();
        assert_eq!(report, RecorderReport { recorded: 1, failed: 0 });

        let rows = repo.list_results(None, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary, s);
        assert_eq!(rows[0].tenant, Some(SchoolId::new(4)));
    }

    struct BrokenSink;

    #[async_trait::async_trait]
    impl ResultRepository for BrokenSink {
        async fn record_result(
            &self,
            _summary: &SessionSummary,
            _tenant: Option<SchoolId>,
        ) -> Result<i64, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn list_results(
            &self,
            _tenant: Option<SchoolId>,
            _limit: u32,
        ) -> Result<Vec<ResultRow>, StorageError> {
            Ok(Vec::new())
        }

        async fn all_results(
            &self,
            _tenant: Option<SchoolId>,
        ) -> Result<Vec<ResultRow>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn sink_failures_are_swallowed() {
        let (listener, rx) = ChannelListener::channel();
        let handle = ResultRecorder::new(Arc::new(BrokenSink)).spawn(rx);

        listener.on_event(&ExamEvent::Completed {
            summary: summary(),
            tenant: None,
        });
        listener.on_event(&ExamEvent::Completed {
            summary: summary(),
            tenant: None,
        });
        drop(listener);

        let report = handle.await.unwrap();
        assert_eq!(report, RecorderReport { recorded: 0, failed: 2 });
    }
}
