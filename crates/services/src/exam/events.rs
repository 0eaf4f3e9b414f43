use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use exam_core::model::{AttemptId, SchoolId, Selection, SessionSummary};

/// Lifecycle notifications emitted by the exam engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamEvent {
    Started {
        attempt_id: AttemptId,
        selection: Selection,
        total: usize,
    },
    Advanced {
        attempt_id: AttemptId,
        cursor: usize,
    },
    /// Emitted exactly once per finished attempt.
    Completed {
        summary: SessionSummary,
        tenant: Option<SchoolId>,
    },
    Abandoned {
        attempt_id: AttemptId,
    },
}

impl ExamEvent {
    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        match self {
            Self::Started { attempt_id, .. }
            | Self::Advanced { attempt_id, .. }
            | Self::Abandoned { attempt_id } => *attempt_id,
            Self::Completed { summary, .. } => summary.attempt_id(),
        }
    }
}

/// Receives engine events synchronously, in emission order.
///
/// Implementations must not block: slow work belongs behind a channel.
pub trait ExamEventListener: Send + Sync {
    fn on_event(&self, event: &ExamEvent);
}

/// Fan-out of engine events to every subscribed listener.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Vec<Arc<dyn ExamEventListener>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn ExamEventListener>) {
        self.listeners.push(listener);
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ExamEventListener>) -> Self {
        self.subscribe(listener);
        self
    }

    pub fn emit(&self, event: &ExamEvent) {
        tracing::debug!(?event, listeners = self.listeners.len(), "exam event");
        for listener in &self.listeners {
            listener.on_event(event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Forwards events into a tokio channel for an async subscriber.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<ExamEvent>,
}

impl ChannelListener {
    /// Returns the listener and the receiving half of its channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ExamEventListener for ChannelListener {
    fn on_event(&self, event: &ExamEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::debug!(attempt_id = %event.attempt_id(), "event receiver closed");
        }
    }
}

/// Keeps every event it sees.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ExamEvent>>,
}

impl RecordingListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<ExamEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn completed(&self) -> Vec<SessionSummary> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ExamEvent::Completed { summary, .. } => Some(summary),
                _ => None,
            })
            .collect()
    }
}

impl ExamEventListener for RecordingListener {
    fn on_event(&self, event: &ExamEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_delivers_to_every_listener_in_order() {
        let first = Arc::new(RecordingListener::new());
        let second = Arc::new(RecordingListener::new());
        let bus = EventBus::new()
            .with_listener(first.clone())
            .with_listener(second.clone());

        let attempt_id = AttemptId::generate();
        bus.emit(&ExamEvent::Advanced {
            attempt_id,
            cursor: 1,
        });
        bus.emit(&ExamEvent::Abandoned { attempt_id });

        assert_eq!(first.events(), second.events());
        assert_eq!(first.events().len(), 2);
        assert!(matches!(first.events()[1], ExamEvent::Abandoned { .. }));
    }

    #[tokio::test]
    async fn channel_listener_forwards_and_survives_closed_receiver() {
        let (listener, mut rx) = ChannelListener::channel();
        let attempt_id = AttemptId::generate();

        listener.on_event(&ExamEvent::Abandoned { attempt_id });
        assert_eq!(rx.recv().await.map(|e| e.attempt_id()), Some(attempt_id));

        drop(rx);
        listener.on_event(&ExamEvent::Abandoned { attempt_id });
    }
}
