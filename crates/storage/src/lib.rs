#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, QuestionFilter, QuestionRecord, QuestionRepository, ResultRepository,
    ResultRow, Storage, StorageError,
};
