//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{QuestionError, QuestionId, Selection, SummaryError};
use storage::repository::StorageError;

use crate::navigation::Screen;

/// Errors emitted by `ExamEngine`.
///
/// Every variant is returned before the session is touched: a failed call
/// leaves the engine exactly as it was.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("cannot begin an exam without questions")]
    EmptyQuestionSet,
    #[error("question {question_id} is malformed: {source}")]
    InvalidQuestionSet {
        question_id: QuestionId,
        source: QuestionError,
    },
    #[error("too many questions for one exam: {len}")]
    TooManyQuestions { len: usize },
    #[error("choice {index} is out of range (question has {len} choices)")]
    InvalidChoiceIndex { index: usize, len: usize },
    #[error("question {cursor} has not been answered")]
    QuestionNotAnswered { cursor: usize },
    #[error("exam session already finished")]
    SessionAlreadyFinished,
    #[error("no active exam session")]
    NoActiveSession,
    #[error("an exam session is already running")]
    SessionInProgress,
    #[error(transparent)]
    Summary(#[from] SummaryError),
}

/// Errors emitted by `ExamLoopService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamServiceError {
    #[error("unknown exam category: {code}")]
    UnknownCategory { code: String },
    #[error("unknown exercise topic: {slug}")]
    UnknownTopic { slug: String },
    #[error("question count must be greater than zero")]
    InvalidCount,
    #[error("no questions available for {selection}")]
    NoContent { selection: Selection },
    #[error(transparent)]
    Exam(#[from] ExamError),
}

/// Errors emitted by `HistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `NavigationController`.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("cannot open {requested:?} while an exam is in progress")]
    ExamInProgress { requested: Screen },
    #[error("{requested:?} is only reachable through an exam")]
    Unreachable { requested: Screen },
}
