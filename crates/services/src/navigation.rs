//! Screen state for the presentation layer.
//!
//! The exam engine never touches the current screen directly. It reports
//! lifecycle events and the controller moves between screens in response.

use std::sync::Mutex;

use crate::error::NavigationError;
use crate::exam::{ExamEvent, ExamEventListener};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Home,
    Exercises,
    Statistics,
    Exam,
    Result,
}

/// Owns the current screen.
#[derive(Debug, Default)]
pub struct NavigationController {
    current: Mutex<Screen>,
}

impl NavigationController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> Screen {
        *self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Move to a screen at the user's request.
    ///
    /// # Errors
    ///
    /// - `ExamInProgress` while an exam is on screen; abandon it first
    /// - `Unreachable` for `Exam` and `Result`, which only exam events open
    pub fn go(&self, requested: Screen) -> Result<Screen, NavigationError> {
        if matches!(requested, Screen::Exam | Screen::Result) {
            return Err(NavigationError::Unreachable { requested });
        }
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if *current == Screen::Exam {
            return Err(NavigationError::ExamInProgress { requested });
        }
        *current = requested;
        Ok(requested)
    }
}

impl ExamEventListener for NavigationController {
    fn on_event(&self, event: &ExamEvent) {
        let next = match event {
            ExamEvent::Started { .. } => Screen::Exam,
            ExamEvent::Completed { .. } => Screen::Result,
            ExamEvent::Abandoned { .. } => Screen::Home,
            ExamEvent::Advanced { .. } => return,
        };
        *self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use exam_core::model::{Choice, ChoiceLabel, Question, QuestionId, Selection};

    use crate::exam::{EventBus, ExamEngine, SessionConfig, SessionRandomizer, TickSource};

    fn engine(nav: &Arc<NavigationController>) -> ExamEngine {
        let listener: Arc<dyn ExamEventListener> = nav.clone();
        ExamEngine::new(TickSource::Manual, EventBus::new().with_listener(listener))
            .with_randomizer(SessionRandomizer::Seeded(3))
    }

    fn one_question() -> Vec<Question> {
        vec![
            Question::new(
                QuestionId::new(1),
                "Q",
                vec![Choice::new(ChoiceLabel::A, "x"), Choice::new(ChoiceLabel::B, "y")],
                ChoiceLabel::A,
                None,
            )
            .unwrap(),
        ]
    }

    fn config() -> SessionConfig {
        SessionConfig::new(Selection::topic("RIPEAM").unwrap())
    }

    #[test]
    fn user_can_move_between_menus() {
        let nav = NavigationController::new();
        assert_eq!(nav.current(), Screen::Home);
        assert_eq!(nav.go(Screen::Statistics), Ok(Screen::Statistics));
        assert_eq!(nav.go(Screen::Exercises), Ok(Screen::Exercises));
        assert_eq!(
            nav.go(Screen::Result),
            Err(NavigationError::Unreachable {
                requested: Screen::Result
            })
        );
    }

    #[test]
    fn exam_events_drive_screens() {
        let nav = Arc::new(NavigationController::new());
        let mut engine = engine(&nav);

        engine.begin(config(), one_question()).unwrap();
        assert_eq!(nav.current(), Screen::Exam);
        assert_eq!(
            nav.go(Screen::Home),
            Err(NavigationError::ExamInProgress {
                requested: Screen::Home
            })
        );

        engine.select_answer(0).unwrap();
        engine.advance().unwrap();
        assert_eq!(nav.current(), Screen::Result);

        assert_eq!(nav.go(Screen::Home), Ok(Screen::Home));
    }

    #[test]
    fn abandon_returns_home() {
        let nav = Arc::new(NavigationController::new());
        let mut engine = engine(&nav);

        engine.begin(config(), one_question()).unwrap();
        engine.abandon();
        assert_eq!(nav.current(), Screen::Home);
    }
}
