//! Timer engine implementation.
//!
//! The engine is a tick-counted state machine. It does not own a clock:
//! the caller feeds it one `tick()` per second, normally from a
//! [`Ticker`](super::Ticker).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running | Paused -> Stopped
//! Idle | Stopped -> Resting -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new();
//! engine.start();
//! engine.tick(); // once per second
//! let frozen = engine.stop();
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::events::{Event, RestKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// Counting a rest interval down to zero.
    Resting,
    /// Elapsed time frozen, waiting for the caller to read it.
    Stopped,
}

/// Core timer engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    state: TimerState,
    elapsed_secs: u64,
    rest_remaining_secs: u64,
    #[serde(default)]
    rest_kind: Option<RestKind>,
}

impl TimerEngine {
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            elapsed_secs: 0,
            rest_remaining_secs: 0,
            rest_kind: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn rest_remaining_secs(&self) -> u64 {
        self.rest_remaining_secs
    }

    pub fn rest_kind(&self) -> Option<RestKind> {
        self.rest_kind
    }

    /// Whether a tick source should be attached right now.
    pub fn is_ticking(&self) -> bool {
        matches!(self.state, TimerState::Running | TimerState::Resting)
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state,
            elapsed_secs: self.elapsed_secs,
            rest_remaining_secs: self.rest_remaining_secs,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        self.start_from(0)
    }

    /// Start counting from `elapsed_secs` instead of zero.
    pub fn start_from(&mut self, elapsed_secs: u64) -> Option<Event> {
        match self.state {
            TimerState::Idle | TimerState::Stopped => {
                self.state = TimerState::Running;
                self.elapsed_secs = elapsed_secs;
                Some(Event::TimerStarted {
                    elapsed_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Running => {
                self.state = TimerState::Paused;
                Some(Event::TimerPaused {
                    elapsed_secs: self.elapsed_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    pub fn resume(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Paused => {
                self.state = TimerState::Running;
                Some(Event::TimerResumed {
                    elapsed_secs: self.elapsed_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    pub fn stop(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Running | TimerState::Paused => {
                self.state = TimerState::Stopped;
                Some(Event::TimerStopped {
                    elapsed_secs: self.elapsed_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// Count `duration_secs` down, then report `RestFinished { kind }`.
    ///
    /// A zero-length rest finishes immediately and the returned event is
    /// already `RestFinished`.
    pub fn begin_rest(&mut self, duration_secs: u64, kind: RestKind) -> Option<Event> {
        match self.state {
            TimerState::Idle | TimerState::Stopped => {
                if duration_secs == 0 {
                    self.state = TimerState::Idle;
                    self.rest_kind = None;
                    return Some(Event::RestFinished {
                        kind,
                        at: Utc::now(),
                    });
                }
                self.state = TimerState::Resting;
                self.rest_remaining_secs = duration_secs;
                self.rest_kind = Some(kind);
                Some(Event::RestStarted {
                    kind,
                    duration_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) -> Option<Event> {
        *self = Self::new();
        Some(self.snapshot())
    }

    /// Advance one second.
    pub fn tick(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Running => {
                self.elapsed_secs += 1;
                Some(Event::TimerTicked {
                    elapsed_secs: self.elapsed_secs,
                    at: Utc::now(),
                })
            }
            TimerState::Resting => {
                let kind = self.rest_kind.unwrap_or(RestKind::Short);
                self.rest_remaining_secs = self.rest_remaining_secs.saturating_sub(1);
                if self.rest_remaining_secs == 0 {
                    self.state = TimerState::Idle;
                    self.rest_kind = None;
                    return Some(Event::RestFinished {
                        kind,
                        at: Utc::now(),
                    });
                }
                Some(Event::RestTicked {
                    kind,
                    remaining_secs: self.rest_remaining_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_pause_resume() {
        let mut engine = TimerEngine::new();
        assert_eq!(engine.state(), TimerState::Idle);

        assert!(engine.start().is_some());
        assert_eq!(engine.state(), TimerState::Running);

        assert!(engine.pause().is_some());
        assert_eq!(engine.state(), TimerState::Paused);

        assert!(engine.resume().is_some());
        assert_eq!(engine.state(), TimerState::Running);
    }

    #[test]
    fn ticks_count_only_while_running() {
        let mut engine = TimerEngine::new();
        engine.start();
        for _ in 0..3 {
            engine.tick();
        }
        assert_eq!(engine.elapsed_secs(), 3);

        engine.pause();
        assert!(engine.tick().is_none());
        assert_eq!(engine.elapsed_secs(), 3);

        engine.resume();
        engine.tick();
        assert_eq!(engine.elapsed_secs(), 4);
    }

    #[test]
    fn stop_freezes_elapsed() {
        let mut engine = TimerEngine::new();
        engine.start();
        engine.tick();
        engine.tick();
        match engine.stop() {
            Some(Event::TimerStopped { elapsed_secs, .. }) => assert_eq!(elapsed_secs, 2),
            other => panic!("Expected TimerStopped, got {other:?}"),
        }
        assert!(engine.tick().is_none());
        assert_eq!(engine.elapsed_secs(), 2);
        assert_eq!(engine.state(), TimerState::Stopped);
    }

    #[test]
    fn start_resets_or_resumes_elapsed() {
        let mut engine = TimerEngine::new();
        engine.start();
        engine.tick();
        engine.stop();
        engine.start();
        assert_eq!(engine.elapsed_secs(), 0);

        engine.stop();
        engine.start_from(90);
        engine.tick();
        assert_eq!(engine.elapsed_secs(), 91);
    }

    #[test]
    fn start_while_running_is_ignored() {
        let mut engine = TimerEngine::new();
        engine.start();
        engine.tick();
        assert!(engine.start().is_none());
        assert_eq!(engine.elapsed_secs(), 1);
    }

    #[test]
    fn rest_counts_down_then_returns_to_idle() {
        let mut engine = TimerEngine::new();
        assert!(engine.begin_rest(3, RestKind::Short).is_some());
        assert_eq!(engine.state(), TimerState::Resting);
        assert!(engine.is_ticking());

        assert!(matches!(
            engine.tick(),
            Some(Event::RestTicked { remaining_secs: 2, .. })
        ));
        engine.tick();
        match engine.tick() {
            Some(Event::RestFinished { kind, .. }) => assert_eq!(kind, RestKind::Short),
            other => panic!("Expected RestFinished, got {other:?}"),
        }
        assert_eq!(engine.state(), TimerState::Idle);
        assert!(engine.tick().is_none());
    }

    #[test]
    fn zero_rest_finishes_immediately() {
        let mut engine = TimerEngine::new();
        assert!(matches!(
            engine.begin_rest(0, RestKind::Long),
            Some(Event::RestFinished { kind: RestKind::Long, .. })
        ));
        assert_eq!(engine.state(), TimerState::Idle);
    }

    #[test]
    fn rest_requires_timer_not_running() {
        let mut engine = TimerEngine::new();
        engine.start();
        assert!(engine.begin_rest(5, RestKind::Short).is_none());
        assert_eq!(engine.state(), TimerState::Running);
    }

    #[test]
    fn reset_goes_to_idle() {
        let mut engine = TimerEngine::new();
        engine.begin_rest(10, RestKind::Long);
        engine.reset();
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.rest_remaining_secs(), 0);
        assert_eq!(engine.rest_kind(), None);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let engine = TimerEngine::new();
        match engine.snapshot() {
            Event::StateSnapshot {
                state,
                elapsed_secs,
                rest_remaining_secs,
                ..
            } => {
                assert_eq!(state, TimerState::Idle);
                assert_eq!(elapsed_secs, 0);
                assert_eq!(rest_remaining_secs, 0);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }
}
