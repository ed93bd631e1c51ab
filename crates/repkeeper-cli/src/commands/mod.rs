pub mod config;
pub mod exercise;
pub mod history;
pub mod rest;
pub mod session;
pub mod set;
pub mod superset;
pub mod watch;

use std::sync::Arc;

use repkeeper_core::clock::now_ms;
use repkeeper_core::{
    Collaborators, Command, Config, Database, Event, LogAlert, LogScheduler, SessionRuntime,
    ValidationError, WorkoutSession,
};
use tracing::debug;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

const NO_SESSION: &str = "no active workout; start one with `repkeeper session start`";

/// Config and storage shared by every command.
///
/// The CLI keeps the durable snapshot and the agent mirror in the same
/// database under different keys.
pub struct Context {
    pub config: Config,
    pub db: Arc<Database>,
}

impl Context {
    pub fn open() -> CliResult<Self> {
        let config = Config::load()?;
        let db = Arc::new(Database::open()?);
        debug!(session_key = %config.storage.session_key, "storage opened");
        Ok(Self { config, db })
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            durable: self.db.clone(),
            mirror: self.db.clone(),
            scheduler: Arc::new(LogScheduler::default()),
            alert: Arc::new(LogAlert),
        }
    }

    pub fn restore(&self, now: u64) -> CliResult<(SessionRuntime, Vec<Event>)> {
        Ok(SessionRuntime::restore(self.collaborators(), &self.config, now).ok_or(NO_SESSION)?)
    }
}

/// Restore the session, apply one command and flush.
///
/// Deadlines that passed since the last invocation (rest expiry) are
/// serviced first, as a foreground process would.
pub fn apply_once(command: Command) -> CliResult {
    apply_checked(command, |_| Ok(()))
}

/// One JSON object per line.
pub fn print_events(events: &[Event]) -> CliResult {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

pub fn check_exercise(session: &WorkoutSession, index: usize) -> Result<(), ValidationError> {
    let len = session.exercises().len();
    if index < len {
        Ok(())
    } else {
        Err(ValidationError::OutOfBounds {
            collection: "exercises".into(),
            index,
            len,
        })
    }
}

pub fn check_set(session: &WorkoutSession, exercise: usize, set: usize) -> Result<(), ValidationError> {
    check_exercise(session, exercise)?;
    let len = session.sets(exercise).len();
    if set < len {
        Ok(())
    } else {
        Err(ValidationError::OutOfBounds {
            collection: format!("sets of exercise {exercise}"),
            index: set,
            len,
        })
    }
}

/// Like [`apply_once`], validating indices against the restored session
/// before anything is applied.
pub fn apply_checked(
    command: Command,
    check: impl FnOnce(&WorkoutSession) -> Result<(), ValidationError>,
) -> CliResult {
    let ctx = Context::open()?;
    let now = now_ms();
    let (mut runtime, _) = ctx.restore(now)?;
    check(runtime.session())?;
    let mut events = runtime.tick(now);
    events.extend(runtime.apply(command, now)?);
    events.extend(runtime.shutdown(now));
    print_events(&events)
}
