use rand::SeedableRng;
use rand::rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use exam_core::model::Question;

use crate::error::ExamError;

/// Source of the presentation order for an exam.
///
/// Production uses `Entropy`; tests pin the order with `Seeded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionRandomizer {
    #[default]
    Entropy,
    Seeded(u64),
}

impl SessionRandomizer {
    /// Returns the questions in a random order. Question content is untouched.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::EmptyQuestionSet` for an empty input.
    pub fn shuffle(self, mut questions: Vec<Question>) -> Result<Vec<Question>, ExamError> {
        if questions.is_empty() {
            return Err(ExamError::EmptyQuestionSet);
        }
        match self {
            Self::Entropy => questions.shuffle(&mut rng()),
            Self::Seeded(seed) => questions.shuffle(&mut StdRng::seed_from_u64(seed)),
        }
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Choice, ChoiceLabel, QuestionId};

    fn questions(n: u64) -> Vec<Question> {
        (1..=n)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Q{id}"),
                    vec![Choice::new(ChoiceLabel::A, "x"), Choice::new(ChoiceLabel::B, "y")],
                    ChoiceLabel::A,
                    None,
                )
                .unwrap()
            })
            .collect()
    }

    fn sorted_ids(qs: &[Question]) -> Vec<u64> {
        let mut ids: Vec<u64> = qs.iter().map(|q| q.id().value()).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn shuffle_is_a_permutation() {
        for n in [1, 2, 7, 40] {
            let input = questions(n);
            let expected = sorted_ids(&input);
            for randomizer in [SessionRandomizer::Entropy, SessionRandomizer::Seeded(n)] {
                let out = randomizer.shuffle(input.clone()).unwrap();
                assert_eq!(out.len(), input.len());
                assert_eq!(sorted_ids(&out), expected);
            }
        }
    }

    #[test]
    fn seeded_shuffle_is_deterministic() {
        let a = SessionRandomizer::Seeded(42).shuffle(questions(20)).unwrap();
        let b = SessionRandomizer::Seeded(42).shuffle(questions(20)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shuffle_keeps_question_content() {
        let input = questions(5);
        let out = SessionRandomizer::Seeded(7).shuffle(input.clone()).unwrap();
        for q in &out {
            let original = input.iter().find(|o| o.id() == q.id()).unwrap();
            assert_eq!(q, original);
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = SessionRandomizer::Entropy.shuffle(Vec::new()).unwrap_err();
        assert_eq!(err, ExamError::EmptyQuestionSet);
    }
}
