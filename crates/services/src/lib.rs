#![forbid(unsafe_code)]

pub mod error;
pub mod exam;
pub mod navigation;
pub mod results;

pub use exam_core::Clock;

pub use error::{ExamError, ExamServiceError, HistoryError, NavigationError};
pub use exam::{
    Advance, ChannelListener, EventBus, ExamEngine, ExamEvent, ExamEventListener,
    ExamLoopService, ExamSnapshot, ExamStatus, ExamTimer, PreparedExam, RecordingListener,
    SessionConfig, SessionRandomizer, TickSource,
};
pub use navigation::{NavigationController, Screen};
pub use results::{HistoryService, HistoryStats, RecorderReport, ResultRecorder};
