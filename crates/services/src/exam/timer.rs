use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Where an `ExamTimer` gets its ticks from.
#[derive(Clone)]
pub enum TickSource {
    /// A recurring task on the given runtime, one tick per `period`.
    Interval { handle: Handle, period: Duration },
    /// Ticks are delivered by calling [`ExamTimer::tick`].
    Manual,
}

impl TickSource {
    /// One tick per second on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn every_second() -> Self {
        Self::Interval {
            handle: Handle::current(),
            period: Duration::from_secs(1),
        }
    }
}

impl fmt::Debug for TickSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval { period, .. } => f
                .debug_struct("Interval")
                .field("period", period)
                .finish_non_exhaustive(),
            Self::Manual => f.write_str("Manual"),
        }
    }
}

#[derive(Debug, Default)]
struct TimerState {
    running: bool,
    elapsed: u64,
}

fn lock(state: &Mutex<TimerState>) -> MutexGuard<'_, TimerState> {
    state
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Counts whole elapsed seconds while running.
///
/// Stopping keeps the count; only dropping the timer resets it. A tick that
/// lands after `stop` is ignored.
pub struct ExamTimer {
    state: Arc<Mutex<TimerState>>,
    source: TickSource,
    task: Option<JoinHandle<()>>,
}

impl ExamTimer {
    #[must_use]
    pub fn new(source: TickSource) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::default())),
            source,
            task: None,
        }
    }

    /// Start counting. No-op when already running.
    pub fn start(&mut self) {
        {
            let mut state = lock(&self.state);
            if state.running {
                return;
            }
            state.running = true;
        }

        if let TickSource::Interval { handle, period } = &self.source {
            let period = *period;
            let state = Arc::clone(&self.state);
            self.task = Some(handle.spawn(async move {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    if !advance(&state) {
                        break;
                    }
                }
            }));
        }
    }

    /// Stop counting and cancel the tick task. No-op when already stopped.
    ///
    /// Returns the final elapsed seconds.
    pub fn stop(&mut self) -> u64 {
        let elapsed = {
            let mut state = lock(&self.state);
            state.running = false;
            state.elapsed
        };
        if let Some(task) = self.task.take() {
            task.abort();
        }
        elapsed
    }

    /// Deliver one tick. Returns `false` if the timer was stopped.
    pub fn tick(&self) -> bool {
        advance(&self.state)
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        lock(&self.state).elapsed
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }
}

fn advance(state: &Mutex<TimerState>) -> bool {
    let mut state = lock(state);
    if !state.running {
        return false;
    }
    state.elapsed = state.elapsed.saturating_add(1);
    true
}

impl Drop for ExamTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl fmt::Debug for ExamTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("ExamTimer")
            .field("running", &state.running)
            .field("elapsed", &state.elapsed)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_ticks_count_only_while_running() {
        let mut timer = ExamTimer::new(TickSource::Manual);
        assert!(!timer.tick());
        assert_eq!(timer.elapsed_seconds(), 0);

        timer.start();
        assert!(timer.tick());
        assert!(timer.tick());
        assert_eq!(timer.elapsed_seconds(), 2);

        assert_eq!(timer.stop(), 2);
        assert!(!timer.tick());
        assert_eq!(timer.elapsed_seconds(), 2);
    }

    #[test]
    fn start_and_stop_are_idempotent_and_resume() {
        let mut timer = ExamTimer::new(TickSource::Manual);
        timer.start();
        timer.start();
        timer.tick();
        timer.stop();
        timer.stop();
        assert!(!timer.is_running());

        timer.start();
        timer.tick();
        assert_eq!(timer.elapsed_seconds(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticks_once_per_second() {
        let mut timer = ExamTimer::new(TickSource::every_second());
        timer.start();

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(timer.elapsed_seconds(), 3);

        timer.stop();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(timer.elapsed_seconds(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_resumes_from_last_value() {
        let mut timer = ExamTimer::new(TickSource::every_second());
        timer.start();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        timer.stop();

        timer.start();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(timer.elapsed_seconds(), 3);
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_the_tick_task() {
        let mut timer = ExamTimer::new(TickSource::every_second());
        timer.start();
        let task = timer.task.as_ref().map(JoinHandle::abort_handle).unwrap();
        timer.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(task.is_finished());
    }
}
