mod recorder;
mod stats;

pub use crate::error::HistoryError;
pub use recorder::{RecorderReport, ResultRecorder};
pub use stats::{ActivityStats, HistoryEntry, HistoryService, HistoryStats, PASS_PERCENT};
