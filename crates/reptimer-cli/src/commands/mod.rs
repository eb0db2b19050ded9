pub mod category;
pub mod config;
pub mod session;
pub mod workout;

use reptimer_core::{Backend, Category, Config, Id, RepSet, SessionController, TimerSession};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Build a controller over the configured backend and load its categories.
pub async fn open(config: &Config) -> Result<SessionController, Box<dyn std::error::Error>> {
    let backend = Backend::from_config(config)?;
    tracing::debug!(backend = %backend.describe(), "opening store");
    let mut controller = SessionController::new(backend, config.workout.clone());
    controller.load().await?;
    Ok(controller)
}

/// Find a category by id, then by case-insensitive name.
pub fn find_category<'a>(categories: &'a [Category], key: &str) -> Option<&'a Category> {
    categories
        .iter()
        .find(|c| c.id.as_str() == key)
        .or_else(|| categories.iter().find(|c| c.name.eq_ignore_ascii_case(key.trim())))
}

pub fn category_id(controller: &SessionController, key: &str) -> Result<Id, String> {
    find_category(controller.store().categories(), key)
        .map(|c| c.id.clone())
        .ok_or_else(|| format!("category not found: {key}"))
}

/// Locate a session by id, returning its owning category.
pub fn locate_session(
    controller: &SessionController,
    session_id: &str,
) -> Result<(Id, TimerSession), String> {
    controller
        .store()
        .find_session(&Id::from(session_id))
        .map(|(c, s)| (c.id.clone(), s.clone()))
        .ok_or_else(|| format!("session not found: {session_id}"))
}

pub fn to_sets(reps: &[u32]) -> Vec<RepSet> {
    reps.iter().copied().map(RepSet::new).collect()
}

/// Parse "10, 8,6" into sets. Blank input means no sets.
pub fn parse_sets(input: &str) -> Result<Vec<RepSet>, String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map(RepSet::new)
                .map_err(|_| format!("invalid repetition count: {s}"))
        })
        .collect()
}

/// `mm:ss`, or `h:mm:ss` past an hour.
pub fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
