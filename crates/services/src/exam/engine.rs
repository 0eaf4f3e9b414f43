use std::fmt;

use exam_core::Clock;
use exam_core::model::{AttemptId, Question, SchoolId, Selection, SessionSummary};

use super::events::{EventBus, ExamEvent};
use super::randomizer::SessionRandomizer;
use super::scoring::score;
use super::timer::{ExamTimer, TickSource};
use super::view::{ExamSnapshot, ExamStatus};
use crate::error::ExamError;

/// What a session was started for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub selection: Selection,
    pub tenant: Option<SchoolId>,
    /// Informational pass mark from the category; never enforced here.
    pub min_correct: Option<u32>,
}

impl SessionConfig {
    #[must_use]
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            tenant: None,
            min_correct: None,
        }
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant: Option<SchoolId>) -> Self {
        self.tenant = tenant;
        self
    }

    #[must_use]
    pub fn with_min_correct(mut self, min_correct: Option<u32>) -> Self {
        self.min_correct = min_correct;
        self
    }
}

/// Result of a successful `advance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next question.
    Next(ExamSnapshot),
    /// The last question was answered; the attempt is scored.
    Finished(SessionSummary),
}

struct ActiveSession {
    attempt_id: AttemptId,
    config: SessionConfig,
    questions: Vec<Question>,
    answers: Vec<Option<usize>>,
    cursor: usize,
    total: u32,
    timer: ExamTimer,
    summary: Option<SessionSummary>,
}

impl ActiveSession {
    fn status(&self) -> ExamStatus {
        if self.summary.is_some() {
            ExamStatus::Finished
        } else {
            ExamStatus::Running
        }
    }

    fn snapshot(&self) -> ExamSnapshot {
        ExamSnapshot {
            attempt_id: self.attempt_id,
            status: self.status(),
            cursor: self.cursor,
            total: self.questions.len(),
            question: self.questions[self.cursor].clone(),
            selected: self.answers[self.cursor],
            elapsed_seconds: self.timer.elapsed_seconds(),
            min_correct: self.config.min_correct,
        }
    }
}

/// Drives one timed attempt at a time through `running` to `finished`.
///
/// All transitions take `&mut self`, so they never interleave. Each either
/// applies completely or returns an error with the session untouched.
pub struct ExamEngine {
    randomizer: SessionRandomizer,
    ticks: TickSource,
    clock: Clock,
    events: EventBus,
    session: Option<ActiveSession>,
}

impl ExamEngine {
    #[must_use]
    pub fn new(ticks: TickSource, events: EventBus) -> Self {
        Self {
            randomizer: SessionRandomizer::Entropy,
            ticks,
            clock: Clock::system(),
            events,
            session: None,
        }
    }

    #[must_use]
    pub fn with_randomizer(mut self, randomizer: SessionRandomizer) -> Self {
        self.randomizer = randomizer;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Start a new attempt over `questions`, presented in shuffled order.
    ///
    /// A finished attempt still on screen is replaced.
    ///
    /// # Errors
    ///
    /// - `SessionInProgress` if an attempt is still running
    /// - `EmptyQuestionSet` if `questions` is empty
    /// - `InvalidQuestionSet` if any question breaks the question invariants
    pub fn begin(
        &mut self,
        config: SessionConfig,
        questions: Vec<Question>,
    ) -> Result<ExamSnapshot, ExamError> {
        if self.status() == ExamStatus::Running {
            return Err(ExamError::SessionInProgress);
        }
        if questions.is_empty() {
            return Err(ExamError::EmptyQuestionSet);
        }
        for question in &questions {
            question
                .validate()
                .map_err(|source| ExamError::InvalidQuestionSet {
                    question_id: question.id(),
                    source,
                })?;
        }
        let len = questions.len();
        let total = u32::try_from(len).map_err(|_| ExamError::TooManyQuestions { len })?;
        let questions = self.randomizer.shuffle(questions)?;

        let mut timer = ExamTimer::new(self.ticks.clone());
        timer.start();

        let attempt_id = AttemptId::generate();
        let session = ActiveSession {
            attempt_id,
            config,
            answers: vec![None; len],
            questions,
            cursor: 0,
            total,
            timer,
            summary: None,
        };
        tracing::info!(
            %attempt_id,
            selection = %session.config.selection,
            total,
            "exam started"
        );
        let snapshot = session.snapshot();
        let selection = session.config.selection.clone();
        self.session = Some(session);

        self.events.emit(&ExamEvent::Started {
            attempt_id,
            selection,
            total: len,
        });
        Ok(snapshot)
    }

    /// Record the choice at `choice_index` for the current question.
    ///
    /// Selecting again before advancing replaces the earlier choice.
    ///
    /// # Errors
    ///
    /// - `NoActiveSession` / `SessionAlreadyFinished` outside a running attempt
    /// - `InvalidChoiceIndex` if the current question has no such choice
    pub fn select_answer(&mut self, choice_index: usize) -> Result<ExamSnapshot, ExamError> {
        let session = self.running_mut()?;
        let len = session.questions[session.cursor].choices().len();
        if choice_index >= len {
            return Err(ExamError::InvalidChoiceIndex {
                index: choice_index,
                len,
            });
        }
        session.answers[session.cursor] = Some(choice_index);
        Ok(session.snapshot())
    }

    /// Move past the current question, finishing the attempt after the last one.
    ///
    /// # Errors
    ///
    /// - `NoActiveSession` / `SessionAlreadyFinished` outside a running attempt
    /// - `QuestionNotAnswered` if the current question has no selection
    pub fn advance(&mut self) -> Result<Advance, ExamError> {
        let clock = self.clock;
        let session = self.running_mut()?;
        if session.answers[session.cursor].is_none() {
            return Err(ExamError::QuestionNotAnswered {
                cursor: session.cursor,
            });
        }

        if session.cursor + 1 < session.questions.len() {
            session.cursor += 1;
            let snapshot = session.snapshot();
            let event = ExamEvent::Advanced {
                attempt_id: session.attempt_id,
                cursor: session.cursor,
            };
            self.events.emit(&event);
            return Ok(Advance::Next(snapshot));
        }

        let correct = score(&session.questions, &session.answers);
        let elapsed = session.timer.stop();
        let summary = match SessionSummary::new(
            session.attempt_id,
            session.config.selection.clone(),
            correct,
            session.total,
            elapsed,
            clock.now(),
        ) {
            Ok(summary) => summary,
            Err(e) => {
                session.timer.start();
                return Err(e.into());
            }
        };
        session.summary = Some(summary.clone());
        tracing::info!(
            attempt_id = %summary.attempt_id(),
            correct = summary.correct_count(),
            total = summary.total(),
            elapsed_seconds = summary.elapsed_seconds(),
            "exam finished"
        );

        let event = ExamEvent::Completed {
            summary: summary.clone(),
            tenant: session.config.tenant,
        };
        self.events.emit(&event);
        Ok(Advance::Finished(summary))
    }

    /// Leave the current attempt.
    ///
    /// A running attempt is cancelled: its timer stops before this returns and
    /// no summary is produced. A finished attempt is simply discarded. With no
    /// session this does nothing.
    pub fn abandon(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.timer.stop();
        if session.summary.is_none() {
            tracing::info!(attempt_id = %session.attempt_id, cursor = session.cursor, "exam abandoned");
            self.events.emit(&ExamEvent::Abandoned {
                attempt_id: session.attempt_id,
            });
        }
    }

    #[must_use]
    pub fn status(&self) -> ExamStatus {
        self.session
            .as_ref()
            .map_or(ExamStatus::Selecting, ActiveSession::status)
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<ExamSnapshot> {
        self.session.as_ref().map(ActiveSession::snapshot)
    }

    /// The final summary, once the attempt is finished.
    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.session.as_ref().and_then(|s| s.summary.as_ref())
    }

    #[must_use]
    pub fn timer(&self) -> Option<&ExamTimer> {
        self.session.as_ref().map(|s| &s.timer)
    }

    fn running_mut(&mut self) -> Result<&mut ActiveSession, ExamError> {
        match self.session.as_mut() {
            None => Err(ExamError::NoActiveSession),
            Some(session) if session.summary.is_some() => Err(ExamError::SessionAlreadyFinished),
            Some(session) => Ok(session),
        }
    }
}

impl fmt::Debug for ExamEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamEngine")
            .field("randomizer", &self.randomizer)
            .field("ticks", &self.ticks)
            .field("events", &self.events)
            .field("status", &self.status())
            .field(
                "cursor",
                &self.session.as_ref().map(|session| session.cursor),
            )
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
