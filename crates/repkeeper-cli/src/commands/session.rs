use std::path::PathBuf;

use clap::Subcommand;
use repkeeper_core::clock::{datetime_from_ms, now_ms};
use repkeeper_core::{Command, ProgramSeed, SessionRuntime, WorkoutSession};
use serde_json::json;

use super::{apply_once, print_events, CliResult, Context};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a new workout
    Start {
        /// JSON program day to seed the workout from
        #[arg(long)]
        program_file: Option<PathBuf>,
        /// Replace an unfinished workout
        #[arg(long)]
        force: bool,
    },
    /// Print the active workout as JSON
    Status,
    /// Pause the workout clock
    Pause,
    /// Resume the workout clock
    Resume,
    /// Finish the workout and record it in history
    Finish,
    /// Drop the workout without recording it
    Discard,
}

pub fn run(action: SessionAction) -> CliResult {
    match action {
        SessionAction::Start {
            program_file,
            force,
        } => start(program_file, force),
        SessionAction::Status => {
            let ctx = Context::open()?;
            let now = now_ms();
            let (mut runtime, _) = ctx.restore(now)?;
            let events = runtime.tick(now);
            println!("{}", serde_json::to_string_pretty(&status_view(&runtime, now))?);
            runtime.shutdown(now);
            for event in &events {
                eprintln!("{}", serde_json::to_string(event)?);
            }
            Ok(())
        }
        SessionAction::Pause => apply_once(Command::PauseSession),
        SessionAction::Resume => apply_once(Command::ResumeSession),
        SessionAction::Finish => finish(true),
        SessionAction::Discard => finish(false),
    }
}

fn start(program_file: Option<PathBuf>, force: bool) -> CliResult {
    let ctx = Context::open()?;
    let now = now_ms();

    if let Some((mut existing, _)) = SessionRuntime::restore(ctx.collaborators(), &ctx.config, now) {
        if !force {
            return Err(format!(
                "workout {} is still active; finish it or pass --force",
                existing.session().id()
            )
            .into());
        }
        existing.end_session(now)?;
    }

    let session = match program_file {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            let seed: ProgramSeed = serde_json::from_str(&raw)?;
            WorkoutSession::from_program(seed, now)
        }
        None => WorkoutSession::new(now),
    };

    let (mut runtime, mut events) = SessionRuntime::start(session, ctx.collaborators(), &ctx.config, now);
    events.extend(runtime.shutdown(now));
    print_events(&events)
}

fn finish(record: bool) -> CliResult {
    let ctx = Context::open()?;
    let now = now_ms();
    let (mut runtime, _) = ctx.restore(now)?;
    let (summary, events) = runtime.end_session(now)?;
    if record {
        ctx.db.record_workout(&summary)?;
    }
    print_events(&events)?;
    if record {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

/// JSON view of the whole session.
pub fn status_view(runtime: &SessionRuntime, now: u64) -> serde_json::Value {
    let session = runtime.session();
    let exercises: Vec<_> = session
        .exercises()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            json!({
                "index": i,
                "name": entry.name,
                "kind": format!("{:?}", entry.kind()).to_lowercase(),
                "supersetWith": session.partner(i),
                "current": i == session.current_exercise_index(),
                "sets": session.sets(i),
            })
        })
        .collect();

    json!({
        "id": session.id(),
        "startedAt": datetime_from_ms(session.start_time_ms()),
        "elapsedSecs": session.elapsed_secs(now),
        "paused": session.is_paused(),
        "program": session.program_name(),
        "day": session.day_name(),
        "exercises": exercises,
        "totals": session.totals(),
        "rest": {
            "status": runtime.rest().status(),
            "remainingSecs": runtime.rest().remaining_secs(now),
            "targetSecs": runtime.rest().target_secs(),
        },
    })
}
