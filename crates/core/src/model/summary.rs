use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AttemptId, Selection};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SummaryError {
    #[error("a session summary needs at least one question")]
    EmptySession,

    #[error("correct count ({correct}) exceeds total ({total})")]
    CountMismatch { correct: u32, total: u32 },
}

/// Final result of a completed exam attempt. Produced exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    attempt_id: AttemptId,
    selection: Selection,
    correct_count: u32,
    total: u32,
    elapsed_seconds: u64,
    completed_at: DateTime<Utc>,
}

impl SessionSummary {
    /// # Errors
    ///
    /// Returns `SummaryError::EmptySession` if `total` is zero.
    /// Returns `SummaryError::CountMismatch` if `correct_count > total`.
    pub fn new(
        attempt_id: AttemptId,
        selection: Selection,
        correct_count: u32,
        total: u32,
        elapsed_seconds: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, SummaryError> {
        if total == 0 {
            return Err(SummaryError::EmptySession);
        }
        if correct_count > total {
            return Err(SummaryError::CountMismatch {
                correct: correct_count,
                total,
            });
        }

        Ok(Self {
            attempt_id,
            selection,
            correct_count,
            total,
            elapsed_seconds,
            completed_at,
        })
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Score as a whole percentage, rounded half up.
    #[must_use]
    pub fn percent(&self) -> u32 {
        percent(self.correct_count, self.total)
    }

    /// Presentation helper: compare the raw score against a minimum.
    ///
    /// With a configured minimum the student needs at least that many correct
    /// answers; without one, at least half of the questions.
    #[must_use]
    pub fn meets_minimum(&self, min_correct: Option<u32>) -> bool {
        match min_correct {
            Some(min) => self.correct_count >= min,
            None => u64::from(self.correct_count) * 2 >= u64::from(self.total),
        }
    }
}

/// Whole percentage of `correct` over `total`, rounded half up. Zero for an empty total.
#[must_use]
pub fn percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = u64::from(correct) * 200 + u64::from(total);
    let value = scaled / (u64::from(total) * 2);
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CategoryCode;
    use crate::time::fixed_now;

    fn selection() -> Selection {
        Selection::Category(CategoryCode::parse("ARA").unwrap())
    }

    #[test]
    fn rejects_more_correct_than_total() {
        let err = SessionSummary::new(AttemptId::generate(), selection(), 3, 2, 0, fixed_now())
            .unwrap_err();
        assert_eq!(err, SummaryError::CountMismatch { correct: 3, total: 2 });
    }

    #[test]
    fn rejects_empty_session() {
        let err = SessionSummary::new(AttemptId::generate(), selection(), 0, 0, 0, fixed_now())
            .unwrap_err();
        assert_eq!(err, SummaryError::EmptySession);
    }

    #[test]
    fn half_is_a_pass_without_configured_minimum() {
        let summary =
            SessionSummary::new(AttemptId::generate(), selection(), 20, 40, 95, fixed_now())
                .unwrap();
        assert!(summary.meets_minimum(None));
        assert!(summary.meets_minimum(Some(20)));
        assert!(!summary.meets_minimum(Some(21)));
        assert_eq!(summary.percent(), 50);
    }

    #[test]
    fn odd_totals_round_half_up() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(0, 0), 0);

        let summary =
            SessionSummary::new(AttemptId::generate(), selection(), 9, 19, 0, fixed_now())
                .unwrap();
        assert!(!summary.meets_minimum(None));
    }
}
