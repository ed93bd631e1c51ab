use clap::Subcommand;
use repkeeper_core::{Command, Mutation, ValidationError};

use super::{apply_checked, check_exercise, CliResult};

#[derive(Subcommand)]
pub enum SupersetAction {
    /// Pair two exercises, replacing any existing partner of either
    Pair { a: usize, b: usize },
    /// Remove an exercise's pairing
    Unpair { exercise: usize },
}

pub fn run(action: SupersetAction) -> CliResult {
    match action {
        SupersetAction::Pair { a, b } => apply_checked(
            Command::Mutate(Mutation::PairSuperset { a, b }),
            |s| {
                check_exercise(s, a)?;
                check_exercise(s, b)?;
                if a == b {
                    return Err(ValidationError::InvalidValue {
                        field: "b".into(),
                        message: "an exercise cannot be paired with itself".into(),
                    });
                }
                Ok(())
            },
        ),
        SupersetAction::Unpair { exercise } => apply_checked(
            Command::Mutate(Mutation::UnpairSuperset { exercise }),
            |s| check_exercise(s, exercise),
        ),
    }
}
