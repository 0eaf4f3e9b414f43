use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Maximum number of choices a question may carry (A through E).
pub const MAX_CHOICES: usize = 5;

/// Minimum number of choices a question must carry (A and B).
pub const MIN_CHOICES: usize = 2;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question needs at least 2 choices, found {len}")]
    TooFewChoices { len: usize },

    #[error("question allows at most 5 choices, found {len}")]
    TooManyChoices { len: usize },

    #[error("choice labels must be contiguous from A: expected {expected}, found {found}")]
    LabelGap {
        expected: ChoiceLabel,
        found: ChoiceLabel,
    },

    #[error("choice {label} has no text")]
    EmptyChoiceText { label: ChoiceLabel },

    #[error("correct label {label} is not one of the question's choices")]
    CorrectLabelMissing { label: ChoiceLabel },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid choice label: {raw:?}")]
pub struct ParseLabelError {
    raw: String,
}

//
// ─── LABELS ────────────────────────────────────────────────────────────────────
//

/// Letter shown next to a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChoiceLabel {
    A,
    B,
    C,
    D,
    E,
}

impl ChoiceLabel {
    pub const ALL: [ChoiceLabel; MAX_CHOICES] = [
        ChoiceLabel::A,
        ChoiceLabel::B,
        ChoiceLabel::C,
        ChoiceLabel::D,
        ChoiceLabel::E,
    ];

    /// Label that belongs at `position` in a gap-free choice list.
    #[must_use]
    pub fn from_position(position: usize) -> Option<Self> {
        Self::ALL.get(position).copied()
    }

    #[must_use]
    pub fn position(self) -> usize {
        match self {
            ChoiceLabel::A => 0,
            ChoiceLabel::B => 1,
            ChoiceLabel::C => 2,
            ChoiceLabel::D => 3,
            ChoiceLabel::E => 4,
        }
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            ChoiceLabel::A => 'A',
            ChoiceLabel::B => 'B',
            ChoiceLabel::C => 'C',
            ChoiceLabel::D => 'D',
            ChoiceLabel::E => 'E',
        }
    }
}

impl fmt::Display for ChoiceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<char> for ChoiceLabel {
    type Error = ParseLabelError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c.to_ascii_uppercase() {
            'A' => Ok(ChoiceLabel::A),
            'B' => Ok(ChoiceLabel::B),
            'C' => Ok(ChoiceLabel::C),
            'D' => Ok(ChoiceLabel::D),
            'E' => Ok(ChoiceLabel::E),
            _ => Err(ParseLabelError { raw: c.to_string() }),
        }
    }
}

impl FromStr for ChoiceLabel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => ChoiceLabel::try_from(c),
            _ => Err(ParseLabelError {
                raw: trimmed.to_string(),
            }),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: ChoiceLabel,
    pub text: String,
}

impl Choice {
    #[must_use]
    pub fn new(label: ChoiceLabel, text: impl Into<String>) -> Self {
        Self {
            label,
            text: text.into(),
        }
    }
}

/// A multiple-choice question. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    choices: Vec<Choice>,
    correct_label: ChoiceLabel,
    image_ref: Option<String>,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the choices or correct label break the
    /// question invariants (see [`Question::validate`]).
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        choices: Vec<Choice>,
        correct_label: ChoiceLabel,
        image_ref: Option<String>,
    ) -> Result<Self, QuestionError> {
        let question = Self::from_parts(id, prompt, choices, correct_label, image_ref);
        question.validate()?;
        Ok(question)
    }

    /// Build a question without validating it.
    ///
    /// Used for repository data, which is only checked when an exam begins.
    #[must_use]
    pub fn from_parts(
        id: QuestionId,
        prompt: impl Into<String>,
        choices: Vec<Choice>,
        correct_label: ChoiceLabel,
        image_ref: Option<String>,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            choices,
            correct_label,
            image_ref,
        }
    }

    /// Build a question from the five answer columns used by the question bank.
    ///
    /// Blank or missing columns are skipped; each kept choice is labeled with
    /// its column letter. A blank column followed by a filled one therefore
    /// leaves a label gap, which [`Question::validate`] rejects.
    #[must_use]
    pub fn from_answer_columns(
        id: QuestionId,
        prompt: impl Into<String>,
        answers: [Option<String>; MAX_CHOICES],
        correct_label: ChoiceLabel,
        image_ref: Option<String>,
    ) -> Self {
        let choices = ChoiceLabel::ALL
            .into_iter()
            .zip(answers)
            .filter_map(|(label, text)| {
                text.filter(|t| !t.trim().is_empty())
                    .map(|t| Choice::new(label, t))
            })
            .collect();
        let image_ref = image_ref.filter(|r| !r.trim().is_empty());
        Self::from_parts(id, prompt, choices, correct_label, image_ref)
    }

    /// Check the question invariants.
    ///
    /// # Errors
    ///
    /// - `EmptyPrompt` if the prompt is blank
    /// - `TooFewChoices` / `TooManyChoices` if the choice count is outside 2..=5
    /// - `LabelGap` if labels are not A, B, ... in order
    /// - `EmptyChoiceText` if a choice is blank
    /// - `CorrectLabelMissing` if the correct label is not among the choices
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }

        let len = self.choices.len();
        if len < MIN_CHOICES {
            return Err(QuestionError::TooFewChoices { len });
        }
        if len > MAX_CHOICES {
            return Err(QuestionError::TooManyChoices { len });
        }

        for (position, choice) in self.choices.iter().enumerate() {
            let expected = ChoiceLabel::ALL[position];
            if choice.label != expected {
                return Err(QuestionError::LabelGap {
                    expected,
                    found: choice.label,
                });
            }
            if choice.text.trim().is_empty() {
                return Err(QuestionError::EmptyChoiceText {
                    label: choice.label,
                });
            }
        }

        if !self.choices.iter().any(|c| c.label == self.correct_label) {
            return Err(QuestionError::CorrectLabelMissing {
                label: self.correct_label,
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    #[must_use]
    pub fn correct_label(&self) -> ChoiceLabel {
        self.correct_label
    }

    #[must_use]
    pub fn image_ref(&self) -> Option<&str> {
        self.image_ref.as_deref()
    }

    /// Label of the choice at `choice_index` in this question's own list.
    #[must_use]
    pub fn label_of(&self, choice_index: usize) -> Option<ChoiceLabel> {
        self.choices.get(choice_index).map(|c| c.label)
    }

    /// True when the choice at `choice_index` carries the correct label.
    ///
    /// Out-of-range indices are never correct.
    #[must_use]
    pub fn is_correct(&self, choice_index: usize) -> bool {
        self.label_of(choice_index) == Some(self.correct_label)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
