//! Authoritative in-memory holder of all categories and their sessions.
//!
//! Every mutation is synchronous and returns the committed [`Change`]
//! (or `None` for a no-op). Committed changes are also broadcast to
//! observers, who only ever see whole mutations. Persistence happens
//! elsewhere; the store never waits on it and never rolls back.

use std::collections::HashSet;

use tokio::sync::broadcast;

use crate::error::ValidationError;
use crate::model::{Category, Id, RepSet, SessionStatus, TimerSession};

const OBSERVER_CAPACITY: usize = 64;

/// A committed store mutation, as observers and persistence see it.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// The whole category list was replaced (startup load).
    Loaded,
    CategoryCreated(Category),
    CategoryRenamed {
        id: Id,
        name: String,
    },
    /// Carries the removed category with the sessions that went with it.
    CategoryRemoved(Category),
    SessionAdded {
        category_id: Id,
        session: TimerSession,
    },
    SessionUpdated {
        category_id: Id,
        session: TimerSession,
    },
    SessionRemoved {
        category_id: Id,
        session_id: Id,
    },
}

impl Change {
    /// The category the change touched, if it touched exactly one.
    pub fn category_id(&self) -> Option<&Id> {
        match self {
            Change::Loaded => None,
            Change::CategoryCreated(c) | Change::CategoryRemoved(c) => Some(&c.id),
            Change::CategoryRenamed { id, .. } => Some(id),
            Change::SessionAdded { category_id, .. }
            | Change::SessionUpdated { category_id, .. }
            | Change::SessionRemoved { category_id, .. } => Some(category_id),
        }
    }
}

pub struct CategoryStore {
    categories: Vec<Category>,
    observers: broadcast::Sender<Change>,
}

impl CategoryStore {
    pub fn new() -> Self {
        let (observers, _) = broadcast::channel(OBSERVER_CAPACITY);
        Self {
            categories: Vec::new(),
            observers,
        }
    }

    pub fn with_categories(categories: Vec<Category>) -> Self {
        let mut store = Self::new();
        store.replace_all(categories);
        store
    }

    /// Receive every change committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.observers.subscribe()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: &Id) -> Option<&Category> {
        self.categories.iter().find(|c| &c.id == id)
    }

    pub fn session(&self, category_id: &Id, session_id: &Id) -> Option<&TimerSession> {
        self.category(category_id)?.session(session_id)
    }

    /// First session with this id in store order, with its category.
    pub fn find_session(&self, session_id: &Id) -> Option<(&Category, &TimerSession)> {
        self.categories
            .iter()
            .find_map(|c| c.session(session_id).map(|s| (c, s)))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// All sessions across categories, keeping only the first session seen
    /// for each note. Lossy; meant for the cross-category search view.
    pub fn all_sessions(&self) -> Vec<&TimerSession> {
        let mut seen = HashSet::new();
        self.categories
            .iter()
            .flat_map(|c| c.sessions.iter())
            .filter(|s| seen.insert(s.note.as_str()))
            .collect()
    }

    /// `all_sessions` filtered by case-insensitive substring match on note.
    pub fn search(&self, term: &str) -> Vec<&TimerSession> {
        self.all_sessions()
            .into_iter()
            .filter(|s| s.note_contains(term))
            .collect()
    }

    /// Ids of completed sessions, in store order, without repeats.
    pub fn completed_ids(&self) -> Vec<Id> {
        let mut seen = HashSet::new();
        self.categories
            .iter()
            .flat_map(|c| c.sessions.iter())
            .filter(|s| s.is_completed() && seen.insert(&s.id))
            .map(|s| s.id.clone())
            .collect()
    }

    pub fn is_completed(&self, session_id: &Id) -> bool {
        self.categories
            .iter()
            .flat_map(|c| c.sessions.iter())
            .any(|s| &s.id == session_id && s.is_completed())
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Replace everything. Categories with an id already seen are dropped,
    /// as are repeated session ids within a category; the first one wins.
    pub fn replace_all(&mut self, categories: Vec<Category>) -> Change {
        let mut seen = HashSet::new();
        self.categories = categories
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .map(|mut c| {
                let mut ids = HashSet::new();
                c.sessions.retain(|s| ids.insert(s.id.clone()));
                c
            })
            .collect();
        self.commit(Change::Loaded)
    }

    pub fn create_category(&mut self, name: &str) -> Result<Change, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let mut category = Category::new(name);
        while self.category(&category.id).is_some() {
            category.id = Id::new();
        }
        self.categories.push(category.clone());
        Ok(self.commit(Change::CategoryCreated(category)))
    }

    pub fn rename_category(&mut self, id: &Id, name: &str) -> Option<Change> {
        let name = name.trim();
        if name.is_empty() {
            tracing::debug!(%id, "ignoring rename to empty name");
            return None;
        }
        let category = self.category_mut(id)?;
        category.name = name.to_string();
        Some(self.commit(Change::CategoryRenamed {
            id: id.clone(),
            name: name.to_string(),
        }))
    }

    /// Remove a category together with all of its sessions.
    pub fn remove_category(&mut self, id: &Id) -> Option<Change> {
        let index = self.categories.iter().position(|c| &c.id == id)?;
        let removed = self.categories.remove(index);
        Some(self.commit(Change::CategoryRemoved(removed)))
    }

    /// Append a session. No-op when the id is already in that category.
    pub fn add_session(&mut self, category_id: &Id, session: TimerSession) -> Option<Change> {
        let category = self.category_mut(category_id)?;
        if category.sessions.iter().any(|s| s.id == session.id) {
            tracing::debug!(%category_id, session_id = %session.id, "session already present");
            return None;
        }
        category.sessions.push(session.clone());
        Some(self.commit(Change::SessionAdded {
            category_id: category_id.clone(),
            session,
        }))
    }

    pub fn remove_session(&mut self, category_id: &Id, session_id: &Id) -> Option<Change> {
        let category = self.category_mut(category_id)?;
        let index = category.sessions.iter().position(|s| &s.id == session_id)?;
        category.sessions.remove(index);
        Some(self.commit(Change::SessionRemoved {
            category_id: category_id.clone(),
            session_id: session_id.clone(),
        }))
    }

    /// Remove a session id from every category that holds it.
    pub fn delete_session(&mut self, session_id: &Id) -> Vec<Change> {
        let holders: Vec<Id> = self
            .categories
            .iter()
            .filter(|c| c.session(session_id).is_some())
            .map(|c| c.id.clone())
            .collect();
        holders
            .iter()
            .filter_map(|category_id| self.remove_session(category_id, session_id))
            .collect()
    }

    /// Replace a session by id.
    pub fn update_session(&mut self, category_id: &Id, session: TimerSession) -> Option<Change> {
        let slot = self
            .category_mut(category_id)?
            .sessions
            .iter_mut()
            .find(|s| s.id == session.id)?;
        *slot = session.clone();
        Some(self.commit(Change::SessionUpdated {
            category_id: category_id.clone(),
            session,
        }))
    }

    pub fn update_sets(
        &mut self,
        category_id: &Id,
        session_id: &Id,
        sets: Vec<RepSet>,
    ) -> Option<Change> {
        let mut session = self.session(category_id, session_id)?.clone();
        session.sets = sets;
        self.update_session(category_id, session)
    }

    pub fn mark_complete(&mut self, category_id: &Id, session_id: &Id) -> Option<Change> {
        let mut session = self.session(category_id, session_id)?.clone();
        if session.is_completed() {
            return None;
        }
        session.status = SessionStatus::Completed;
        self.update_session(category_id, session)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn category_mut(&mut self, id: &Id) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| &c.id == id)
    }

    fn commit(&self, change: Change) -> Change {
        // No receivers is fine; the change is still committed.
        let _ = self.observers.send(change.clone());
        change
    }
}

impl Default for CategoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn session(note: &str) -> TimerSession {
        TimerSession::new(10, note, SessionStatus::Stopped, vec![RepSet::new(5)])
    }

    fn created_id(change: Change) -> Id {
        match change {
            Change::CategoryCreated(c) => c.id,
            other => panic!("Expected CategoryCreated, got {other:?}"),
        }
    }

    #[test]
    fn create_category_trims_and_rejects_empty() {
        let mut store = CategoryStore::new();
        assert_eq!(store.create_category("   "), Err(ValidationError::EmptyName));
        assert!(store.is_empty());

        let id = created_id(store.create_category("  Legs ").unwrap());
        let category = store.category(&id).unwrap();
        assert_eq!(category.name, "Legs");
        assert!(category.sessions.is_empty());
    }

    #[test]
    fn add_session_is_idempotent() {
        let mut store = CategoryStore::new();
        let id = created_id(store.create_category("Arms").unwrap());
        let s = session("Curls");

        assert!(store.add_session(&id, s.clone()).is_some());
        assert!(store.add_session(&id, s.clone()).is_none());
        assert_eq!(store.category(&id).unwrap().sessions.len(), 1);
    }

    #[test]
    fn add_session_to_missing_category_is_noop() {
        let mut store = CategoryStore::new();
        assert!(store.add_session(&Id::from("nope"), session("x")).is_none());
    }

    #[test]
    fn remove_category_cascades() {
        let mut store = CategoryStore::new();
        let legs = created_id(store.create_category("Legs").unwrap());
        let arms = created_id(store.create_category("Arms").unwrap());
        let squat = session("Squats");
        store.add_session(&legs, squat.clone());
        store.add_session(&arms, session("Curls"));

        match store.remove_category(&legs) {
            Some(Change::CategoryRemoved(c)) => assert_eq!(c.sessions.len(), 1),
            other => panic!("Expected CategoryRemoved, got {other:?}"),
        }
        assert!(store.category(&legs).is_none());
        assert!(store.find_session(&squat.id).is_none());
        assert!(store.remove_category(&legs).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_and_remove_session() {
        let mut store = CategoryStore::new();
        let id = created_id(store.create_category("Core").unwrap());
        let mut s = session("Plank");
        store.add_session(&id, s.clone());

        s.time = 99;
        assert!(store.update_session(&id, s.clone()).is_some());
        assert_eq!(store.session(&id, &s.id).unwrap().time, 99);

        assert!(store.update_session(&id, session("Ghost")).is_none());

        assert!(store.remove_session(&id, &s.id).is_some());
        assert!(store.remove_session(&id, &s.id).is_none());
    }

    #[test]
    fn update_sets_replaces_sets() {
        let mut store = CategoryStore::new();
        let id = created_id(store.create_category("Back").unwrap());
        let s = session("Rows");
        store.add_session(&id, s.clone());

        store.update_sets(&id, &s.id, vec![RepSet::new(8), RepSet::new(6)]);
        assert_eq!(store.session(&id, &s.id).unwrap().total_repetitions(), 14);
    }

    #[test]
    fn mark_complete_sets_status_once() {
        let mut store = CategoryStore::new();
        let id = created_id(store.create_category("Legs").unwrap());
        let s = session("Squats");
        store.add_session(&id, s.clone());

        assert!(store.mark_complete(&id, &s.id).is_some());
        assert!(store.mark_complete(&id, &s.id).is_none());
        assert!(store.is_completed(&s.id));
        assert_eq!(store.completed_ids(), vec![s.id.clone()]);
    }

    #[test]
    fn delete_session_hits_every_category() {
        let mut store = CategoryStore::new();
        let a = created_id(store.create_category("A").unwrap());
        let b = created_id(store.create_category("B").unwrap());
        let s = session("Shared");
        store.add_session(&a, s.clone());
        store.add_session(&b, s.clone());

        assert_eq!(store.delete_session(&s.id).len(), 2);
        assert!(store.find_session(&s.id).is_none());
    }

    #[test]
    fn all_sessions_dedups_by_note_first_wins() {
        let mut store = CategoryStore::new();
        let a = created_id(store.create_category("First").unwrap());
        let b = created_id(store.create_category("Second").unwrap());
        let first_a = session("A");
        store.add_session(&a, first_a.clone());
        store.add_session(&a, session("B"));
        store.add_session(&b, session("A"));

        let all = store.all_sessions();
        let notes: Vec<&str> = all.iter().map(|s| s.note.as_str()).collect();
        assert_eq!(notes, vec!["A", "B"]);
        assert_eq!(all[0].id, first_a.id);
    }

    #[test]
    fn search_is_case_insensitive() {
        let mut store = CategoryStore::new();
        let id = created_id(store.create_category("Legs").unwrap());
        store.add_session(&id, session("Front Squats"));
        store.add_session(&id, session("Lunges"));

        let found = store.search("squat");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].note, "Front Squats");
        assert_eq!(store.search("").len(), 2);
    }

    #[test]
    fn rename_category_ignores_blank_names() {
        let mut store = CategoryStore::new();
        let id = created_id(store.create_category("Legs").unwrap());
        assert!(store.rename_category(&id, "  ").is_none());
        assert!(store.rename_category(&id, "Lower body").is_some());
        assert_eq!(store.category(&id).unwrap().name, "Lower body");
    }

    #[test]
    fn replace_all_drops_duplicate_ids() {
        let mut dup = Category::new("One");
        dup.id = Id::from("same");
        let mut other = Category::new("Two");
        other.id = Id::from("same");

        let store = CategoryStore::with_categories(vec![dup, other]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.categories()[0].name, "One");
    }

    #[test]
    fn replace_all_drops_repeated_session_ids() {
        let mut legs = Category::new("Legs");
        let first = session("Squats");
        let mut repeat = session("Lunges");
        repeat.id = first.id.clone();
        legs.sessions = vec![first.clone(), repeat, session("Calf raises")];
        let legs_id = legs.id.clone();

        let mut store = CategoryStore::with_categories(vec![legs]);
        let sessions = &store.category(&legs_id).unwrap().sessions;
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].note, "Squats");

        assert!(store.remove_session(&legs_id, &first.id).is_some());
        assert!(store.session(&legs_id, &first.id).is_none());
    }

    #[test]
    fn observers_see_committed_changes_only() {
        let mut store = CategoryStore::new();
        let mut rx = store.subscribe();

        let _ = store.create_category("");
        let id = created_id(store.create_category("Legs").unwrap());
        store.remove_session(&id, &Id::from("missing"));
        store.remove_category(&id);

        assert!(matches!(rx.try_recv(), Ok(Change::CategoryCreated(_))));
        assert!(matches!(rx.try_recv(), Ok(Change::CategoryRemoved(_))));
        assert!(rx.try_recv().is_err());
    }

    proptest! {
        #[test]
        fn removing_a_category_leaves_no_trace(
            notes in proptest::collection::vec("[a-z]{1,6}", 0..8),
            victim in 0usize..3,
        ) {
            let mut store = CategoryStore::new();
            let ids: Vec<Id> = ["A", "B", "C"]
                .iter()
                .map(|n| created_id(store.create_category(n).unwrap()))
                .collect();
            for (i, note) in notes.iter().enumerate() {
                store.add_session(&ids[i % 3], session(note));
            }
            let doomed: Vec<Id> = store
                .category(&ids[victim])
                .unwrap()
                .sessions
                .iter()
                .map(|s| s.id.clone())
                .collect();

            store.remove_category(&ids[victim]);

            prop_assert!(store.category(&ids[victim]).is_none());
            for sid in &doomed {
                prop_assert!(store.find_session(sid).is_none());
            }
        }

        #[test]
        fn repeated_adds_keep_one_copy(times in 1usize..6) {
            let mut store = CategoryStore::new();
            let id = created_id(store.create_category("Legs").unwrap());
            let s = session("Squats");
            for _ in 0..times {
                store.add_session(&id, s.clone());
            }
            let count = store
                .category(&id)
                .unwrap()
                .sessions
                .iter()
                .filter(|x| x.id == s.id)
                .count();
            prop_assert_eq!(count, 1);
        }
    }
}
