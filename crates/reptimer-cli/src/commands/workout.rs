//! Interactive workout: time a session, record it, then work through its
//! repetitions with rests in between.

use std::io::Write;

use clap::Args;
use reptimer_core::{Config, Event, RestKind, SequencePhase, SessionController, Step};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use super::{find_category, format_duration, open, parse_sets, CmdResult};

#[derive(Args)]
pub struct WorkoutArgs {
    /// Category id or name; created when no category matches
    category: String,
    /// Note for the session (prompted when omitted)
    #[arg(long)]
    note: Option<String>,
    /// Rest between repetitions, in seconds
    #[arg(long)]
    rest: Option<u64>,
    /// Rest after the last repetition, in seconds
    #[arg(long)]
    final_rest: Option<u64>,
}

type Input = Lines<BufReader<Stdin>>;

enum Wake {
    Tick(Vec<Event>),
    Line(Option<String>),
}

/// One line for each event worth showing. Ticks redraw in place.
fn render(event: &Event) {
    match event {
        Event::TimerTicked { elapsed_secs, .. } => {
            print!("\r  {}  ", format_duration(*elapsed_secs));
        }
        Event::RestTicked { remaining_secs, .. } => {
            print!("\r  rest {}  ", format_duration(*remaining_secs));
        }
        Event::TimerStarted { .. } => println!("Timer started. Press Enter to stop."),
        Event::TimerStopped { elapsed_secs, .. } => {
            println!("\nStopped at {}.", format_duration(*elapsed_secs));
        }
        Event::RestStarted {
            kind,
            duration_secs,
            ..
        } => {
            let label = match kind {
                RestKind::Short => "Rest",
                RestKind::Long => "Final rest",
            };
            println!("{label}: {}", format_duration(*duration_secs));
        }
        Event::RestFinished { .. } => println!(),
        Event::RepetitionAdvanced { current, total, .. } => {
            println!("Repetition {current}/{total}. Press Enter when done.");
        }
        Event::SessionCompleted { session_id, .. } => {
            println!("Session completed: {session_id}");
        }
        Event::ReadyForSession { .. } => println!("Ready for the next session."),
        _ => {}
    }
    let _ = std::io::stdout().flush();
}

fn render_all(events: &[Event]) {
    events.iter().for_each(render);
}

/// Show a repetition step. A failed save is reported and the workout
/// carries on, since the rest has already started.
fn render_step(step: Step) {
    render_all(&step.events);
    if let Some(e) = step.error {
        eprintln!("\nwarning: progress not saved: {e}");
    }
}

async fn prompt(input: &mut Input, text: &str) -> Result<Option<String>, std::io::Error> {
    print!("{text}");
    std::io::stdout().flush()?;
    input.next_line().await
}

/// Wait for either the next tick or a line of input.
async fn wake(controller: &mut SessionController, input: &mut Input) -> std::io::Result<Wake> {
    tokio::select! {
        Some(events) = controller.next_tick() => Ok(Wake::Tick(events)),
        line = input.next_line() => Ok(Wake::Line(line?)),
    }
}

pub async fn run(args: WorkoutArgs) -> CmdResult {
    let mut config = Config::load()?;
    if let Some(rest) = args.rest {
        config.workout.rest_secs = rest;
    }
    if let Some(final_rest) = args.final_rest {
        config.workout.final_rest_secs = final_rest;
    }
    let mut controller = open(&config).await?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let existing =
        find_category(controller.store().categories(), &args.category).map(|c| c.id.clone());
    match existing {
        Some(id) => {
            controller.select_category(&id);
        }
        None => {
            if controller.create_category(&args.category).await?.is_none() {
                return Err("category name must not be empty".into());
            }
            println!("Category created: {}", args.category.trim());
        }
    }

    // Timing
    render_all(controller.start().as_slice());
    loop {
        match wake(&mut controller, &mut input).await? {
            Wake::Tick(events) => render_all(&events),
            Wake::Line(_) => break,
        }
    }
    render_all(controller.stop().as_slice());

    // Recording
    let note = match args.note {
        Some(note) => note,
        None => prompt(&mut input, "Note: ").await?.unwrap_or_default(),
    };
    let sets_line = prompt(&mut input, "Reps per set (e.g. 10,8,6): ")
        .await?
        .unwrap_or_default();
    let sets = parse_sets(&sets_line)?;
    let Some(session_id) = controller.finish_session(&note, sets).await? else {
        return Err("session not saved: note must not be empty".into());
    };
    println!("Session saved: {session_id}");

    // Repetitions
    let Some(category_id) = controller.current_category().map(|c| c.id.clone()) else {
        return Ok(());
    };
    render_step(controller.begin_repetitions(&category_id, &session_id).await);
    while let Some(phase) = controller.sequence().map(|s| s.phase) {
        match phase {
            SequencePhase::Working => match input.next_line().await? {
                Some(_) => render_step(controller.complete_repetition().await),
                None => {
                    tracing::debug!("input closed; abandoning repetitions");
                    controller.abandon();
                }
            },
            SequencePhase::ShortRest | SequencePhase::FinalRest => {
                match controller.next_tick().await {
                    Some(events) => render_all(&events),
                    None => controller.abandon(),
                }
            }
        }
    }
    Ok(())
}
