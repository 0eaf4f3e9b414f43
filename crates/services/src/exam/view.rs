use exam_core::format_elapsed;
use exam_core::model::{AttemptId, Question};

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamStatus {
    /// No session: the student is still choosing what to take.
    Selecting,
    Running,
    Finished,
}

/// What the presentation layer sees after every transition.
///
/// Carries data only; formatting beyond the elapsed clock is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSnapshot {
    pub attempt_id: AttemptId,
    pub status: ExamStatus,
    pub cursor: usize,
    pub total: usize,
    pub question: Question,
    pub selected: Option<usize>,
    pub elapsed_seconds: u64,
    pub min_correct: Option<u32>,
}

impl ExamSnapshot {
    /// 1-based position for display, e.g. `3 / 40`.
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor + 1
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.cursor + 1 == self.total
    }

    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.status == ExamStatus::Running && self.selected.is_some()
    }

    #[must_use]
    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed_seconds)
    }
}
