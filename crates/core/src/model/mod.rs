mod catalog;
mod ids;
mod question;
mod summary;

pub use ids::{AttemptId, ParseIdError, QuestionId, SchoolId};

pub use catalog::{
    CatalogError, CategoryCode, ExamCatalog, ExamCategory, ExerciseTopic, Selection,
    SelectionKind,
};
pub use question::{
    Choice, ChoiceLabel, MAX_CHOICES, MIN_CHOICES, ParseLabelError, Question, QuestionError,
};
pub use summary::{SessionSummary, SummaryError, percent};
