use clap::Subcommand;
use repkeeper_core::{Command, Mutation, SetField, SetType};

use super::{apply_checked, check_exercise, check_set, CliResult};

#[derive(Subcommand)]
pub enum SetAction {
    /// Append a set to an exercise
    Add { exercise: usize },
    /// Delete a set (an exercise keeps at least one)
    Delete { exercise: usize, set: usize },
    /// Update weight, reps or rpe
    Update {
        exercise: usize,
        set: usize,
        /// weight, reps or rpe
        field: SetField,
        value: String,
    },
    /// Change the set type (normal, warmup, dropset, failure, superset)
    Type {
        exercise: usize,
        set: usize,
        set_type: SetType,
    },
}

pub fn run(action: SetAction) -> CliResult {
    match action {
        SetAction::Add { exercise } => apply_checked(
            Command::Mutate(Mutation::AddSet { exercise }),
            |s| check_exercise(s, exercise),
        ),
        SetAction::Delete { exercise, set } => apply_checked(
            Command::Mutate(Mutation::DeleteSet { exercise, set }),
            |s| check_set(s, exercise, set),
        ),
        SetAction::Update {
            exercise,
            set,
            field,
            value,
        } => apply_checked(
            Command::Mutate(Mutation::UpdateSetField {
                exercise,
                set,
                field,
                value,
            }),
            |s| check_set(s, exercise, set),
        ),
        SetAction::Type {
            exercise,
            set,
            set_type,
        } => apply_checked(
            Command::Mutate(Mutation::SetType {
                exercise,
                set,
                set_type,
            }),
            |s| check_set(s, exercise, set),
        ),
    }
}
