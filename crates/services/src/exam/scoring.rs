use exam_core::model::Question;

/// Count the correct answers of an attempt.
///
/// `answers[i]` is the chosen position within `questions[i]`'s own choices.
/// The label is looked up on that question, so questions with fewer than five
/// choices score correctly. Unanswered questions and positions with no choice
/// never count.
#[must_use]
pub fn score(questions: &[Question], answers: &[Option<usize>]) -> u32 {
    let correct = questions
        .iter()
        .zip(answers)
        .filter(|(question, answer)| answer.is_some_and(|index| question.is_correct(index)))
        .count();
    u32::try_from(correct).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Choice, ChoiceLabel, QuestionId};

    fn pair() -> Vec<Question> {
        vec![
            Question::new(
                QuestionId::new(1),
                "Q1",
                vec![
                    Choice::new(ChoiceLabel::A, "x"),
                    Choice::new(ChoiceLabel::B, "y"),
                    Choice::new(ChoiceLabel::C, "z"),
                ],
                ChoiceLabel::B,
                None,
            )
            .unwrap(),
            Question::new(
                QuestionId::new(2),
                "Q2",
                vec![Choice::new(ChoiceLabel::A, "p"), Choice::new(ChoiceLabel::B, "q")],
                ChoiceLabel::A,
                None,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn all_correct() {
        assert_eq!(score(&pair(), &[Some(1), Some(0)]), 2);
    }

    #[test]
    fn all_wrong() {
        assert_eq!(score(&pair(), &[Some(0), Some(1)]), 0);
    }

    #[test]
    fn missing_or_out_of_range_answers_are_wrong() {
        assert_eq!(score(&pair(), &[None, Some(0)]), 1);
        assert_eq!(score(&pair(), &[Some(4), Some(9)]), 0);
    }

    #[test]
    fn unmatched_correct_label_is_never_correct() {
        let broken = Question::from_parts(
            QuestionId::new(3),
            "Q3",
            vec![Choice::new(ChoiceLabel::A, "x"), Choice::new(ChoiceLabel::B, "y")],
            ChoiceLabel::E,
            None,
        );
        assert_eq!(score(&[broken.clone()], &[Some(0)]), 0);
        assert_eq!(score(&[broken], &[Some(1)]), 0);
    }
}
