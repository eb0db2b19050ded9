//! Category and timer session records.
//!
//! Plain data with serde derives; all behavior lives in the store and
//! controller. The JSON shape matches what the record service and the
//! local `categories` blob hold.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Opaque identifier shared by categories and sessions.
///
/// Freshly minted ids are UUID v4 strings. Older data used integer
/// millisecond timestamps; those still deserialize and are kept as their
/// decimal text so only one id type exists at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Id(s),
            RawId::Unsigned(n) => Id(n.to_string()),
            RawId::Signed(n) => Id(n.to_string()),
        })
    }
}

/// Display/lifecycle tag of a session. Not enforced as a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionStatus {
    #[default]
    Start,
    Running,
    Paused,
    Stop,
    #[serde(alias = "Complete")]
    Stopped,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Start => "Start",
            SessionStatus::Running => "Running",
            SessionStatus::Paused => "Paused",
            SessionStatus::Stop => "Stop",
            SessionStatus::Stopped => "Stopped",
            SessionStatus::Completed => "Completed",
        };
        f.write_str(label)
    }
}

/// One recorded batch of repetitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepSet {
    pub repetitions: u32,
}

impl RepSet {
    pub fn new(repetitions: u32) -> Self {
        Self { repetitions }
    }
}

/// One timed exercise instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSession {
    pub id: Id,
    /// Elapsed seconds accumulated while the timer was running.
    #[serde(default)]
    pub time: u64,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub sets: Vec<RepSet>,
}

impl TimerSession {
    pub fn new(time: u64, note: impl Into<String>, status: SessionStatus, sets: Vec<RepSet>) -> Self {
        Self {
            id: Id::new(),
            time,
            note: note.into(),
            status,
            sets,
        }
    }

    pub fn total_repetitions(&self) -> u32 {
        self.sets.iter().map(|s| s.repetitions).sum()
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Case-insensitive substring match on the note.
    pub fn note_contains(&self, term: &str) -> bool {
        self.note.to_lowercase().contains(&term.to_lowercase())
    }

    /// Human-readable summary of the recorded sets.
    pub fn sets_label(&self) -> String {
        if self.sets.is_empty() {
            return "No sets available".to_string();
        }
        self.sets
            .iter()
            .enumerate()
            .map(|(i, s)| format!("Set {}: {} reps", i + 1, s.repetitions))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Named grouping of timer sessions. Owns its sessions exclusively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
    /// Display order is insertion order.
    #[serde(default)]
    pub sessions: Vec<TimerSession>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Id::new(),
            name: name.into(),
            sessions: Vec::new(),
        }
    }

    pub fn session(&self, id: &Id) -> Option<&TimerSession> {
        self.sessions.iter().find(|s| &s.id == id)
    }
}
