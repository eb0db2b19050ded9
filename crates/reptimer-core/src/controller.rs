//! Session lifecycle controller.
//!
//! Sequences a session through its life: select or create a category,
//! run the timer, stop it, attach a note and sets, then optionally work
//! through the recorded repetitions with rests in between.
//!
//! Store mutations are applied first and persisted afterwards. When
//! persistence fails the error is returned, the in-memory change stays,
//! and any state transition that came with the call has already happened.
//!
//! Timer commands spawn a [`Ticker`], so they must run inside a tokio
//! runtime. The controller holds at most one ticker, and only while the
//! engine is running or resting.

use chrono::Utc;

use crate::config::WorkoutConfig;
use crate::error::PersistenceError;
use crate::events::{Event, RestKind};
use crate::model::{Category, Id, RepSet, SessionStatus, TimerSession};
use crate::store::{CategoryStore, Change};
use crate::sync::{Backend, Persistence};
use crate::timer::{Ticker, TimerEngine, TimerState};

/// A stopped timing whose session has not been saved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    /// Minted at stop time so a retried save reuses it.
    pub session_id: Id,
    pub category_id: Id,
    pub elapsed_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePhase {
    /// Waiting for the current repetition to be done.
    Working,
    ShortRest,
    FinalRest,
}

/// Progress through a session's repetitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepetitionSequence {
    pub category_id: Id,
    pub session_id: Id,
    /// 1-based repetition being worked on.
    pub current: u32,
    pub total: u32,
    pub phase: SequencePhase,
}

/// Events from a repetition command, with the persistence failure that
/// came with it. The events describe state that has already changed, so
/// they are returned even when saving failed.
#[derive(Debug, Default)]
pub struct Step {
    pub events: Vec<Event>,
    pub error: Option<PersistenceError>,
}

impl Step {
    fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            error: None,
        }
    }
}

pub struct SessionController<P: Persistence = Backend> {
    store: CategoryStore,
    persistence: P,
    workout: WorkoutConfig,
    current_category: Option<Id>,
    engine: TimerEngine,
    ticker: Option<Ticker>,
    draft: Option<Draft>,
    sequence: Option<RepetitionSequence>,
}

impl<P: Persistence> SessionController<P> {
    pub fn new(persistence: P, workout: WorkoutConfig) -> Self {
        Self {
            store: CategoryStore::new(),
            persistence,
            workout,
            current_category: None,
            engine: TimerEngine::new(),
            ticker: None,
            draft: None,
            sequence: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn store(&self) -> &CategoryStore {
        &self.store
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn current_category(&self) -> Option<&Category> {
        self.store.category(self.current_category.as_ref()?)
    }

    pub fn timer_state(&self) -> TimerState {
        self.engine.state()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.engine.elapsed_secs()
    }

    pub fn rest_remaining_secs(&self) -> u64 {
        self.engine.rest_remaining_secs()
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn sequence(&self) -> Option<&RepetitionSequence> {
        self.sequence.as_ref()
    }

    pub fn has_ticker(&self) -> bool {
        self.ticker.as_ref().is_some_and(Ticker::is_active)
    }

    /// True when a new session may be started.
    pub fn is_ready(&self) -> bool {
        self.current_category.is_some()
            && self.sequence.is_none()
            && matches!(self.engine.state(), TimerState::Idle | TimerState::Stopped)
    }

    pub fn completed_ids(&self) -> Vec<Id> {
        self.store.completed_ids()
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot()
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Replace the store with what the backend holds. Returns the category count.
    pub async fn load(&mut self) -> Result<usize, PersistenceError> {
        let categories = self.persistence.load().await?;
        self.abandon();
        self.current_category = None;
        self.store.replace_all(categories);
        Ok(self.store.len())
    }

    // ── Categories ───────────────────────────────────────────────────

    /// Create and select a category. `Ok(None)` when the name is blank.
    pub async fn create_category(&mut self, name: &str) -> Result<Option<Id>, PersistenceError> {
        let change = match self.store.create_category(name) {
            Ok(change) => change,
            Err(e) => {
                tracing::debug!(error = %e, "category not created");
                return Ok(None);
            }
        };
        let id = change.category_id().cloned();
        if let Some(id) = &id {
            self.select_category(id);
        }
        self.persist(&change).await?;
        Ok(id)
    }

    /// Make `id` the current category, discarding any timer, draft or
    /// repetition sequence from the previous one.
    pub fn select_category(&mut self, id: &Id) -> bool {
        if self.store.category(id).is_none() {
            return false;
        }
        self.abandon();
        self.current_category = Some(id.clone());
        true
    }

    pub async fn rename_category(&mut self, id: &Id, name: &str) -> Result<bool, PersistenceError> {
        let Some(change) = self.store.rename_category(id, name) else {
            return Ok(false);
        };
        self.persist(&change).await?;
        Ok(true)
    }

    pub async fn remove_category(&mut self, id: &Id) -> Result<bool, PersistenceError> {
        let Some(change) = self.store.remove_category(id) else {
            return Ok(false);
        };
        if self.current_category.as_ref() == Some(id) {
            self.abandon();
            self.current_category = None;
        }
        if self.sequence.as_ref().is_some_and(|s| &s.category_id == id) {
            self.abandon();
        }
        self.persist(&change).await?;
        Ok(true)
    }

    // ── Timer ────────────────────────────────────────────────────────

    /// Start timing a new session in the current category.
    pub fn start(&mut self) -> Option<Event> {
        if !self.is_ready() {
            tracing::debug!(state = ?self.engine.state(), "start ignored");
            return None;
        }
        let event = self.engine.start()?;
        self.draft = None;
        self.sync_ticker();
        Some(event)
    }

    pub fn pause(&mut self) -> Option<Event> {
        let event = self.engine.pause()?;
        self.sync_ticker();
        Some(event)
    }

    pub fn resume(&mut self) -> Option<Event> {
        let event = self.engine.resume()?;
        self.sync_ticker();
        Some(event)
    }

    /// Freeze the timer. The elapsed time waits in a [`Draft`] until
    /// `finish_session` saves it.
    pub fn stop(&mut self) -> Option<Event> {
        let category_id = self.current_category.clone()?;
        let event = self.engine.stop()?;
        self.sync_ticker();
        self.draft = Some(Draft {
            session_id: Id::new(),
            category_id,
            elapsed_secs: self.engine.elapsed_secs(),
        });
        Some(event)
    }

    /// Wait for the next tick and apply it. `None` when nothing is ticking.
    pub async fn next_tick(&mut self) -> Option<Vec<Event>> {
        let ticker = self.ticker.as_mut()?;
        ticker.next().await?;
        Some(self.tick())
    }

    /// Apply one tick from the ticker.
    fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        let Some(event) = self.engine.tick() else {
            return events;
        };
        let finished = match &event {
            Event::RestFinished { kind, .. } => Some(*kind),
            _ => None,
        };
        events.push(event);
        if let Some(kind) = finished {
            self.sync_ticker();
            events.extend(self.on_rest_finished(kind));
        }
        events
    }

    /// Tear down the timer, ticker, draft and repetition sequence.
    pub fn abandon(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
        }
        self.engine.reset();
        self.draft = None;
        self.sequence = None;
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Save the stopped timing as a session of the current category.
    ///
    /// `Ok(None)` when there is no stopped timing or the note is blank.
    /// On a persistence error the draft is kept, so calling again resends
    /// the same session.
    pub async fn finish_session(
        &mut self,
        note: &str,
        sets: Vec<RepSet>,
    ) -> Result<Option<Id>, PersistenceError> {
        let Some(draft) = self.draft.clone() else {
            tracing::debug!("no stopped timing to save");
            return Ok(None);
        };
        let note = note.trim();
        if note.is_empty() {
            tracing::debug!("session not saved: empty note");
            return Ok(None);
        }

        let session = TimerSession {
            id: draft.session_id.clone(),
            time: draft.elapsed_secs,
            note: note.to_string(),
            status: SessionStatus::Stopped,
            sets,
        };
        let change = match self.store.add_session(&draft.category_id, session.clone()) {
            Some(change) => Some(change),
            None => self.store.update_session(&draft.category_id, session),
        };
        let Some(change) = change else {
            self.draft = None;
            return Ok(None);
        };

        self.persist(&change).await?;
        self.draft = None;
        Ok(Some(draft.session_id))
    }

    /// Set the note of a saved session that is not being timed.
    pub async fn attach_note(
        &mut self,
        category_id: &Id,
        session_id: &Id,
        note: &str,
    ) -> Result<bool, PersistenceError> {
        let note = note.trim();
        if note.is_empty() {
            return Ok(false);
        }
        let Some(mut session) = self.store.session(category_id, session_id).cloned() else {
            return Ok(false);
        };
        if matches!(session.status, SessionStatus::Running | SessionStatus::Paused) {
            tracing::debug!(%session_id, "note rejected: session still running");
            return Ok(false);
        }
        session.note = note.to_string();
        let change = self.store.update_session(category_id, session);
        self.apply(change).await
    }

    pub async fn update_sets(
        &mut self,
        category_id: &Id,
        session_id: &Id,
        sets: Vec<RepSet>,
    ) -> Result<bool, PersistenceError> {
        let change = self.store.update_sets(category_id, session_id, sets);
        self.apply(change).await
    }

    pub async fn mark_complete(
        &mut self,
        category_id: &Id,
        session_id: &Id,
    ) -> Result<bool, PersistenceError> {
        let change = self.store.mark_complete(category_id, session_id);
        self.apply(change).await
    }

    pub async fn remove_session(
        &mut self,
        category_id: &Id,
        session_id: &Id,
    ) -> Result<bool, PersistenceError> {
        let change = self.store.remove_session(category_id, session_id);
        if change.is_some() && self.sequence_targets(session_id) {
            self.abandon();
        }
        self.apply(change).await
    }

    /// Remove the session from every category. Returns how many held it.
    pub async fn delete_session(&mut self, session_id: &Id) -> Result<usize, PersistenceError> {
        let changes = self.store.delete_session(session_id);
        if !changes.is_empty() && self.sequence_targets(session_id) {
            self.abandon();
        }
        let mut first_error = None;
        for change in &changes {
            if let Err(e) = self.persist(change).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(changes.len()),
        }
    }

    /// Add an existing session to another category. No-op if it is already there.
    pub async fn copy_session_to(
        &mut self,
        category_id: &Id,
        session: &TimerSession,
    ) -> Result<bool, PersistenceError> {
        let change = self.store.add_session(category_id, session.clone());
        self.apply(change).await
    }

    // ── Repetitions ──────────────────────────────────────────────────

    /// Begin working through a saved session's repetitions.
    ///
    /// A session without repetitions completes at once with no rest.
    pub async fn begin_repetitions(&mut self, category_id: &Id, session_id: &Id) -> Step {
        if self.sequence.is_some()
            || !matches!(self.engine.state(), TimerState::Idle | TimerState::Stopped)
        {
            tracing::debug!("repetitions ignored: controller busy");
            return Step::default();
        }
        let Some(session) = self.store.session(category_id, session_id) else {
            return Step::default();
        };

        let total = session.total_repetitions();
        if total == 0 {
            let (event, change) = self.complete(category_id, session_id);
            let mut step = Step::new(vec![event]);
            step.error = self.persist_opt(change).await;
            return step;
        }

        self.sequence = Some(RepetitionSequence {
            category_id: category_id.clone(),
            session_id: session_id.clone(),
            current: 1,
            total,
            phase: SequencePhase::Working,
        });
        Step::new(vec![Event::RepetitionAdvanced {
            session_id: session_id.clone(),
            current: 1,
            total,
            at: Utc::now(),
        }])
    }

    /// Report the current repetition as done.
    ///
    /// Starts a short rest, or after the last repetition marks the session
    /// complete and starts the final rest. Ignored while resting.
    ///
    /// A failed save of the completion does not stop the final rest.
    pub async fn complete_repetition(&mut self) -> Step {
        let Some(seq) = self.sequence.as_mut() else {
            return Step::default();
        };
        if seq.phase != SequencePhase::Working {
            return Step::default();
        }

        let mut events = Vec::new();
        if seq.current < seq.total {
            seq.phase = SequencePhase::ShortRest;
            self.rest(self.workout.rest_secs, RestKind::Short, &mut events);
            return Step::new(events);
        }

        seq.phase = SequencePhase::FinalRest;
        let (category_id, session_id) = (seq.category_id.clone(), seq.session_id.clone());
        let (event, change) = self.complete(&category_id, &session_id);
        events.push(event);
        self.rest(self.workout.final_rest_secs, RestKind::Long, &mut events);
        let mut step = Step::new(events);
        step.error = self.persist_opt(change).await;
        step
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Keep exactly one live ticker while the engine is running or
    /// resting, and none otherwise.
    fn sync_ticker(&mut self) {
        if self.engine.is_ticking() {
            if !self.has_ticker() {
                self.ticker = Some(Ticker::spawn());
            }
        } else if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    fn rest(&mut self, secs: u64, kind: RestKind, events: &mut Vec<Event>) {
        let Some(event) = self.engine.begin_rest(secs, kind) else {
            return;
        };
        let finished = matches!(event, Event::RestFinished { .. });
        events.push(event);
        self.sync_ticker();
        if finished {
            events.extend(self.on_rest_finished(kind));
        }
    }

    fn on_rest_finished(&mut self, kind: RestKind) -> Option<Event> {
        let seq = self.sequence.as_mut()?;
        match (seq.phase, kind) {
            (SequencePhase::ShortRest, RestKind::Short) => {
                seq.current += 1;
                seq.phase = SequencePhase::Working;
                Some(Event::RepetitionAdvanced {
                    session_id: seq.session_id.clone(),
                    current: seq.current,
                    total: seq.total,
                    at: Utc::now(),
                })
            }
            (SequencePhase::FinalRest, RestKind::Long) => {
                self.sequence = None;
                Some(Event::ReadyForSession { at: Utc::now() })
            }
            _ => None,
        }
    }

    fn complete(&mut self, category_id: &Id, session_id: &Id) -> (Event, Option<Change>) {
        let change = self.store.mark_complete(category_id, session_id);
        let event = Event::SessionCompleted {
            category_id: category_id.clone(),
            session_id: session_id.clone(),
            at: Utc::now(),
        };
        (event, change)
    }

    fn sequence_targets(&self, session_id: &Id) -> bool {
        self.sequence.as_ref().is_some_and(|s| &s.session_id == session_id)
    }

    async fn apply(&self, change: Option<Change>) -> Result<bool, PersistenceError> {
        let Some(change) = change else {
            return Ok(false);
        };
        self.persist(&change).await?;
        Ok(true)
    }

    async fn persist_opt(&self, change: Option<Change>) -> Option<PersistenceError> {
        self.persist(&change?).await.err()
    }

    async fn persist(&self, change: &Change) -> Result<(), PersistenceError> {
        let result = self.persistence.mirror(change, self.store.categories()).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "persistence failed; in-memory change kept");
        }
        result
    }
}
