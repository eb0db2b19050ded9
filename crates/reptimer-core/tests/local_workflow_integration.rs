//! End-to-end workout flow against local device storage.

use reptimer_core::{
    Backend, Config, Event, LocalStorage, RepSet, SessionController, SessionStatus, TimerState,
};
use tempfile::TempDir;

fn local_config(dir: &TempDir) -> Config {
    let mut cfg = Config::default();
    cfg.storage.data_dir = Some(dir.path().to_path_buf());
    cfg.workout.rest_secs = 1;
    cfg.workout.final_rest_secs = 2;
    cfg
}

fn controller(cfg: &Config) -> SessionController {
    SessionController::new(Backend::from_config(cfg).unwrap(), cfg.workout.clone())
}

#[tokio::test(start_paused = true)]
async fn test_session_survives_restart() {
    let dir = TempDir::new().unwrap();
    let cfg = local_config(&dir);

    let mut c = controller(&cfg);
    assert_eq!(c.load().await.unwrap(), 0);

    let legs = c.create_category("Legs").await.unwrap().unwrap();
    assert!(c.start().is_some());
    for _ in 0..3 {
        c.next_tick().await.unwrap();
    }
    c.stop();
    assert_eq!(c.timer_state(), TimerState::Stopped);

    let session = c
        .finish_session("Squats", vec![RepSet::new(10)])
        .await
        .unwrap()
        .unwrap();

    // A fresh controller sees what the first one wrote.
    let mut reloaded = controller(&cfg);
    assert_eq!(reloaded.load().await.unwrap(), 1);
    let category = reloaded.store().category(&legs).unwrap();
    assert_eq!(category.name, "Legs");
    let saved = category.session(&session).unwrap();
    assert_eq!(saved.note, "Squats");
    assert_eq!(saved.time, 3);
    assert_eq!(saved.status, SessionStatus::Stopped);
    assert_eq!(saved.sets, vec![RepSet::new(10)]);
}

#[tokio::test(start_paused = true)]
async fn test_completion_is_persisted() {
    let dir = TempDir::new().unwrap();
    let cfg = local_config(&dir);
    let mut c = controller(&cfg);

    let core = c.create_category("Core").await.unwrap().unwrap();
    c.start();
    c.stop();
    let plank = c
        .finish_session("Plank", vec![RepSet::new(2)])
        .await
        .unwrap()
        .unwrap();

    c.begin_repetitions(&core, &plank).await;
    let mut events = Vec::new();
    while c.sequence().is_some() {
        let step = c.complete_repetition().await;
        assert!(step.error.is_none());
        events.extend(step.events);
        while let Some(ticked) = c.next_tick().await {
            events.extend(ticked);
        }
    }
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::SessionCompleted { .. })));

    let stored = LocalStorage::new(dir.path()).load_categories();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].session(&plank).unwrap().is_completed());
}

#[tokio::test]
async fn test_removing_category_removes_its_sessions_on_disk() {
    let dir = TempDir::new().unwrap();
    let cfg = local_config(&dir);
    let mut c = controller(&cfg);

    let arms = c.create_category("Arms").await.unwrap().unwrap();
    c.start();
    c.stop();
    let curls = c.finish_session("Curls", Vec::new()).await.unwrap().unwrap();
    c.create_category("Back").await.unwrap();

    assert!(c.remove_category(&arms).await.unwrap());

    let stored = LocalStorage::new(dir.path()).load_categories();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Back");
    assert!(stored
        .iter()
        .all(|cat| cat.session(&curls).is_none()));
}

#[tokio::test]
async fn test_corrupt_storage_starts_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("categories.json"), "[{broken").unwrap();
    let cfg = local_config(&dir);

    let mut c = controller(&cfg);
    assert_eq!(c.load().await.unwrap(), 0);
    assert!(c.create_category("Legs").await.unwrap().is_some());
    assert_eq!(LocalStorage::new(dir.path()).load_categories().len(), 1);
}
