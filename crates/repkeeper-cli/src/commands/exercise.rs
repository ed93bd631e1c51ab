use clap::Subcommand;
use repkeeper_core::clock::now_ms;
use repkeeper_core::{Command, ExerciseEntry, MoveDirection, Mutation};

use super::{apply_checked, apply_once, check_exercise, print_events, CliResult, Context};

#[derive(Subcommand)]
pub enum ExerciseAction {
    /// Append an exercise with one empty set
    Add {
        name: String,
        #[arg(long)]
        equipment: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete an exercise and its sets
    Delete { index: usize },
    /// Move an exercise up or down
    Move {
        index: usize,
        /// up or down
        direction: MoveDirection,
        /// Number of steps
        #[arg(long, default_value = "1")]
        count: usize,
    },
    /// Mark an exercise as the one being worked on
    Current { index: usize },
}

pub fn run(action: ExerciseAction) -> CliResult {
    match action {
        ExerciseAction::Add {
            name,
            equipment,
            category,
        } => {
            let entry = ExerciseEntry::new(name, equipment, category);
            apply_once(Command::Mutate(Mutation::AddExercise { entry }))
        }
        ExerciseAction::Delete { index } => apply_checked(
            Command::Mutate(Mutation::DeleteExercise { exercise: index }),
            |s| check_exercise(s, index),
        ),
        ExerciseAction::Current { index } => apply_checked(
            Command::Mutate(Mutation::SetCurrentExercise { exercise: index }),
            |s| check_exercise(s, index),
        ),
        ExerciseAction::Move {
            index,
            direction,
            count,
        } => move_exercise(index, direction, count),
    }
}

/// Every step goes through the coalescer, so `--count 3` lands as a single
/// move when the process flushes.
fn move_exercise(index: usize, direction: MoveDirection, count: usize) -> CliResult {
    let ctx = Context::open()?;
    let now = now_ms();
    let (mut runtime, _) = ctx.restore(now)?;
    check_exercise(runtime.session(), index)?;

    let mut events = runtime.tick(now);
    for _ in 0..count.max(1) {
        events.extend(runtime.apply(Command::RequestMove { index, direction }, now)?);
    }
    events.extend(runtime.shutdown(now));
    print_events(&events)
}
