use std::sync::Arc;

use exam_core::model::{SchoolId, SelectionKind, percent};
use storage::repository::{ResultRepository, ResultRow};

use crate::error::HistoryError;

/// Pass mark used by the history screen, in percent.
pub const PASS_PERCENT: u32 = 50;

/// Aggregate over one kind of activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityStats {
    pub count: u32,
    pub passed: u32,
    /// Mean of the per-attempt percentages, rounded. `0` with no attempts.
    pub average_percent: u32,
}

impl ActivityStats {
    fn from_rows<'a>(rows: impl Iterator<Item = &'a ResultRow>) -> Self {
        let mut count = 0_u32;
        let mut passed = 0_u32;
        // Percentages as fixed point with four decimals.
        let mut scaled_sum = 0_u64;
        for row in rows {
            let summary = &row.summary;
            count += 1;
            if summary.percent() >= PASS_PERCENT {
                passed += 1;
            }
            scaled_sum += u64::from(summary.correct_count()) * 1_000_000
                / u64::from(summary.total());
        }
        let average_percent = if count == 0 {
            0
        } else {
            let mean = scaled_sum / u64::from(count);
            u32::try_from((mean + 5_000) / 10_000).unwrap_or(u32::MAX)
        };
        Self {
            count,
            passed,
            average_percent,
        }
    }
}

/// History split into simulated exams and topic exercises.
///
/// The aggregates cover every recorded attempt; only `recent` is capped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub exams: ActivityStats,
    pub exercises: ActivityStats,
    /// Newest first.
    pub recent: Vec<HistoryEntry>,
}

/// One line of the history list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub kind: SelectionKind,
    pub label: String,
    pub correct: u32,
    pub total: u32,
    pub percent: u32,
    pub passed: bool,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl HistoryEntry {
    #[must_use]
    pub fn from_row(row: &ResultRow) -> Self {
        let summary = &row.summary;
        let percent = percent(summary.correct_count(), summary.total());
        Self {
            kind: summary.selection().kind(),
            label: summary.selection().value().to_string(),
            correct: summary.correct_count(),
            total: summary.total(),
            percent,
            passed: percent >= PASS_PERCENT,
            completed_at: summary.completed_at(),
        }
    }
}

impl HistoryStats {
    /// Aggregate `rows` (newest first) and keep the first `recent` as entries.
    #[must_use]
    pub fn from_rows(rows: &[ResultRow], recent: usize) -> Self {
        let of_kind = |kind: SelectionKind| {
            ActivityStats::from_rows(
                rows.iter()
                    .filter(move |row| row.summary.selection().kind() == kind),
            )
        };
        Self {
            exams: of_kind(SelectionKind::Exam),
            exercises: of_kind(SelectionKind::Exercise),
            recent: rows.iter().take(recent).map(HistoryEntry::from_row).collect(),
        }
    }
}

/// Read side of the result history for one tenant.
#[derive(Clone)]
pub struct HistoryService {
    results: Arc<dyn ResultRepository>,
}

impl HistoryService {
    #[must_use]
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }

    /// Aggregate the tenant's whole history and list its `limit` newest results.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn stats(
        &self,
        tenant: Option<SchoolId>,
        limit: u32,
    ) -> Result<HistoryStats, HistoryError> {
        let rows = self.results.all_results(tenant).await?;
        let recent = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(HistoryStats::from_rows(&rows, recent))
    }
}
