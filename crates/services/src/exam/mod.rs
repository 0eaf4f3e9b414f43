mod engine;
mod events;
mod randomizer;
mod scoring;
mod timer;
mod view;
mod workflow;

// Public API of the exam subsystem.
pub use crate::error::{ExamError, ExamServiceError};
pub use engine::{Advance, ExamEngine, SessionConfig};
pub use events::{ChannelListener, EventBus, ExamEvent, ExamEventListener, RecordingListener};
pub use randomizer::SessionRandomizer;
pub use scoring::score;
pub use timer::{ExamTimer, TickSource};
pub use view::{ExamSnapshot, ExamStatus};
pub use workflow::{ExamLoopService, PreparedExam};
