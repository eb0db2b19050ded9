use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Id;
use crate::timer::TimerState;

/// Which rest interval finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestKind {
    /// Between repetitions.
    Short,
    /// After the last repetition of a session.
    Long,
}

/// Every timer or lifecycle state change produces an Event.
/// The CLI prints them; callers react to rest completion through them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    TimerStopped {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    TimerTicked {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    RestStarted {
        kind: RestKind,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    RestTicked {
        kind: RestKind,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    RestFinished {
        kind: RestKind,
        at: DateTime<Utc>,
    },
    RepetitionAdvanced {
        session_id: Id,
        current: u32,
        total: u32,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        category_id: Id,
        session_id: Id,
        at: DateTime<Utc>,
    },
    /// The final rest is over; a new session may start.
    ReadyForSession {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        elapsed_secs: u64,
        rest_remaining_secs: u64,
        at: DateTime<Utc>,
    },
}
