use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("category code must be 2-8 ASCII letters, got {raw:?}")]
    InvalidCategoryCode { raw: String },

    #[error("topic cannot be empty")]
    EmptyTopic,
}

//
// ─── CATEGORY ──────────────────────────────────────────────────────────────────
//

/// Short uppercase code of a license category (e.g. `ARA`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryCode(String);

impl CategoryCode {
    /// Parse and normalize a category code.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidCategoryCode` unless the code is 2-8 ASCII letters.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, CatalogError> {
        let trimmed = raw.as_ref().trim();
        let valid = (2..=8).contains(&trimmed.len())
            && trimmed.chars().all(|c| c.is_ascii_alphabetic());
        if !valid {
            return Err(CatalogError::InvalidCategoryCode {
                raw: trimmed.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration of an official exam category.
///
/// `time_limit` and `min_correct` are informational: the session engine reports
/// raw scores and never enforces either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamCategory {
    pub code: CategoryCode,
    pub title: String,
    pub description: String,
    pub question_count: u32,
    pub time_limit: Duration,
    pub min_correct: u32,
}

/// Practice topic questions can be tagged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseTopic {
    pub slug: String,
    pub title: String,
    /// Size of the topic's bank; an exercise draws the whole topic by default.
    pub question_count: u32,
}

/// What an exam attempt was drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selection {
    Category(CategoryCode),
    Topic(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionKind {
    /// Full simulated exam for a license category.
    Exam,
    /// Topic practice.
    Exercise,
}

impl Selection {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyTopic` if the topic is blank.
    pub fn topic(raw: impl AsRef<str>) -> Result<Self, CatalogError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CatalogError::EmptyTopic);
        }
        Ok(Self::Topic(trimmed.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn kind(&self) -> SelectionKind {
        match self {
            Selection::Category(_) => SelectionKind::Exam,
            Selection::Topic(_) => SelectionKind::Exercise,
        }
    }

    /// Category code or topic slug.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Selection::Category(code) => code.as_str(),
            Selection::Topic(topic) => topic,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Category(code) => write!(f, "category {code}"),
            Selection::Topic(topic) => write!(f, "topic {topic}"),
        }
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// The set of exam categories and exercise topics offered to students.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamCatalog {
    categories: Vec<ExamCategory>,
    topics: Vec<ExerciseTopic>,
}

fn category(
    code: &str,
    title: &str,
    description: &str,
    question_count: u32,
    minutes: u64,
    min_correct: u32,
) -> ExamCategory {
    ExamCategory {
        code: CategoryCode(code.to_string()),
        title: title.to_string(),
        description: description.to_string(),
        question_count,
        time_limit: Duration::from_secs(minutes * 60),
        min_correct,
    }
}

fn topic(slug: &str, title: &str, question_count: u32) -> ExerciseTopic {
    ExerciseTopic {
        slug: slug.to_string(),
        title: title.to_string(),
        question_count,
    }
}

impl ExamCatalog {
    #[must_use]
    pub fn new(categories: Vec<ExamCategory>, topics: Vec<ExerciseTopic>) -> Self {
        Self { categories, topics }
    }

    /// Official boating-license categories and the standard practice topics.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(
            vec![
                category("MTA", "Motonauta", "Jet ski in inland waters", 20, 90, 10),
                category("ARA", "Arrais-Amador", "Inland navigation", 40, 120, 20),
                category("MSA", "Mestre-Amador", "Coastal navigation", 40, 120, 20),
                category("CPA", "Capitão-Amador", "Ocean navigation", 40, 240, 20),
                category("VLA", "Veleiro", "Sailing vessels", 20, 90, 10),
            ],
            vec![
                topic("RIPEAM", "RIPEAM 72", 50),
                topic("IALA", "Balizamento IALA", 46),
                topic("MANOBRA", "Manobra", 50),
                topic("INCENDIO", "Combate a Incêndio", 39),
                topic("SOBREVIVENCIA", "Sobrevivência", 51),
                topic("SOCORROS", "Primeiros Socorros", 43),
            ],
        )
    }

    #[must_use]
    pub fn categories(&self) -> &[ExamCategory] {
        &self.categories
    }

    #[must_use]
    pub fn topics(&self) -> &[ExerciseTopic] {
        &self.topics
    }

    #[must_use]
    pub fn category(&self, code: &CategoryCode) -> Option<&ExamCategory> {
        self.categories.iter().find(|c| &c.code == code)
    }

    #[must_use]
    pub fn topic(&self, slug: &str) -> Option<&ExerciseTopic> {
        self.topics
            .iter()
            .find(|t| t.slug.eq_ignore_ascii_case(slug.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_code_is_normalized() {
        let code = CategoryCode::parse(" ara ").unwrap();
        assert_eq!(code.as_str(), "ARA");
        assert!(CategoryCode::parse("A").is_err());
        assert!(CategoryCode::parse("AR-A").is_err());
    }

    #[test]
    fn builtin_catalog_has_official_categories() {
        let catalog = ExamCatalog::builtin();
        let ara = catalog
            .category(&CategoryCode::parse("ARA").unwrap())
            .unwrap();
        assert_eq!(ara.question_count, 40);
        assert_eq!(ara.min_correct, 20);
        assert_eq!(ara.time_limit, Duration::from_secs(2 * 60 * 60));

        let cpa = catalog
            .category(&CategoryCode::parse("CPA").unwrap())
            .unwrap();
        assert_eq!(cpa.time_limit, Duration::from_secs(4 * 60 * 60));
        assert_eq!(catalog.categories().len(), 5);
    }

    #[test]
    fn topic_lookup_ignores_case() {
        let catalog = ExamCatalog::builtin();
        let ripeam = catalog.topic("ripeam").unwrap();
        assert_eq!(ripeam.title, "RIPEAM 72");
        assert_eq!(ripeam.question_count, 50);
        assert!(catalog.topic("astronomy").is_none());
    }

    #[test]
    fn selection_kind_and_value() {
        let exam = Selection::Category(CategoryCode::parse("MTA").unwrap());
        assert_eq!(exam.kind(), SelectionKind::Exam);
        assert_eq!(exam.value(), "MTA");

        let practice = Selection::topic("iala").unwrap();
        assert_eq!(practice.kind(), SelectionKind::Exercise);
        assert_eq!(practice.value(), "IALA");
        assert!(Selection::topic("  ").is_err());
    }
}
