use clap::Subcommand;
use reptimer_core::{Config, Id, SessionStatus, TimerSession};

use super::{category_id, format_duration, locate_session, open, to_sets, CmdResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// List sessions
    List {
        /// Only sessions whose note contains this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
        /// Only sessions of this category (id or name)
        #[arg(long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a session without running the timer
    Add {
        /// Category id or name
        category: String,
        /// Exercise note
        note: String,
        /// Elapsed seconds
        #[arg(long, default_value = "0")]
        time: u64,
        /// Repetitions per set, comma separated
        #[arg(long, value_delimiter = ',')]
        sets: Vec<u32>,
    },
    /// Change a session's note
    Note {
        /// Session id
        session: String,
        /// New note
        note: String,
    },
    /// Replace a session's sets
    Sets {
        /// Session id
        session: String,
        /// Repetitions per set, comma separated
        #[arg(value_delimiter = ',')]
        reps: Vec<u32>,
    },
    /// Mark a session complete
    Complete {
        /// Session id
        session: String,
    },
    /// Remove a session from one category
    Remove {
        /// Category id or name
        category: String,
        /// Session id
        session: String,
    },
    /// Delete a session from every category holding it
    Delete {
        /// Session id
        session: String,
    },
    /// Copy a session into another category
    Copy {
        /// Session id
        session: String,
        /// Target category id or name
        to: String,
    },
}

fn print_session(session: &TimerSession) {
    let mark = if session.is_completed() { "✓" } else { " " };
    println!(
        "{mark} {}  {}  {:<9}  {}  [{}]",
        session.id,
        format_duration(session.time),
        session.status.to_string(),
        session.note,
        session.sets_label()
    );
}

pub async fn run(action: SessionAction) -> CmdResult {
    let config = Config::load()?;
    let mut controller = open(&config).await?;

    match action {
        SessionAction::List {
            search,
            category,
            json,
        } => {
            let store = controller.store();
            let sessions: Vec<&TimerSession> = match (&category, &search) {
                (Some(key), term) => {
                    let id = category_id(&controller, key)?;
                    store
                        .category(&id)
                        .map(|c| {
                            c.sessions
                                .iter()
                                .filter(|s| term.as_deref().map_or(true, |t| s.note_contains(t)))
                                .collect()
                        })
                        .unwrap_or_default()
                }
                (None, Some(term)) => store.search(term),
                (None, None) => store.all_sessions(),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else if sessions.is_empty() {
                println!("No sessions.");
            } else {
                for s in sessions {
                    print_session(s);
                }
            }
        }
        SessionAction::Add {
            category,
            note,
            time,
            sets,
        } => {
            let id = category_id(&controller, &category)?;
            let note = note.trim();
            if note.is_empty() {
                return Err("session note must not be empty".into());
            }
            let session = TimerSession::new(time, note, SessionStatus::Stopped, to_sets(&sets));
            let session_id = session.id.clone();
            controller.copy_session_to(&id, &session).await?;
            println!("Session added: {session_id}");
        }
        SessionAction::Note { session, note } => {
            let (category, found) = locate_session(&controller, &session)?;
            if !controller.attach_note(&category, &found.id, &note).await? {
                return Err("note rejected: empty note or session still running".into());
            }
            println!("Note updated: {}", found.id);
        }
        SessionAction::Sets { session, reps } => {
            let (category, found) = locate_session(&controller, &session)?;
            controller
                .update_sets(&category, &found.id, to_sets(&reps))
                .await?;
            println!("Sets updated: {}", found.id);
        }
        SessionAction::Complete { session } => {
            let (category, found) = locate_session(&controller, &session)?;
            if controller.mark_complete(&category, &found.id).await? {
                println!("Session completed: {}", found.id);
            } else {
                println!("Session already completed: {}", found.id);
            }
        }
        SessionAction::Remove { category, session } => {
            let id = category_id(&controller, &category)?;
            let session_id = Id::from(session.as_str());
            if !controller.remove_session(&id, &session_id).await? {
                return Err(format!("session {session} is not in category {category}").into());
            }
            println!("Session removed: {session}");
        }
        SessionAction::Delete { session } => {
            let count = controller.delete_session(&Id::from(session.as_str())).await?;
            if count == 0 {
                return Err(format!("session not found: {session}").into());
            }
            println!("Session deleted from {count} categories: {session}");
        }
        SessionAction::Copy { session, to } => {
            let (_, found) = locate_session(&controller, &session)?;
            let target = category_id(&controller, &to)?;
            if controller.copy_session_to(&target, &found).await? {
                println!("Session copied: {}", found.id);
            } else {
                println!("Session already in target category: {}", found.id);
            }
        }
    }
    Ok(())
}
