//! # Reptimer Core Library
//!
//! Core logic for Reptimer, a workout timer: users group exercise
//! sessions into categories, time them, record repetition sets, and work
//! through those repetitions with rests in between. The CLI binary is a
//! thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a tick-counted state machine fed once per second by
//!   a cancellable [`Ticker`]
//! - **Store**: the single in-memory source of truth for categories and
//!   sessions, broadcasting every committed change
//! - **Sync**: mirrors store changes to local device storage or a REST
//!   record service
//! - **Controller**: drives a session from start to completion
//!
//! ## Key Components
//!
//! - [`SessionController`]: session lifecycle and repetition sequencing
//! - [`CategoryStore`]: category/session mutations and read projections
//! - [`TimerEngine`]: timer state machine
//! - [`Backend`]: configured persistence medium
//! - [`Config`]: application configuration management

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod model;
pub mod store;
pub mod sync;
pub mod timer;

pub use config::{Config, StorageMode, WorkoutConfig};
pub use controller::{Draft, RepetitionSequence, SequencePhase, SessionController, Step};
pub use error::{ConfigError, CoreError, PersistenceError, ValidationError};
pub use events::{Event, RestKind};
pub use model::{Category, Id, RepSet, SessionStatus, TimerSession};
pub use store::{CategoryStore, Change};
pub use sync::{Backend, LocalStorage, Persistence, RecordClient};
pub use timer::{Ticker, TimerEngine, TimerState};
