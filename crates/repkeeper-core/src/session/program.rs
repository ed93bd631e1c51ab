//! Seeding a session from a workout program / plan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ExerciseEntry, SetRecord, WorkoutSession};

/// Pre-built exercise and set structure handed over by a program importer.
///
/// Uses the same field names as the durable snapshot so a plan exported by
/// another tool can be read directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSeed {
    #[serde(default)]
    pub program_name: Option<String>,
    #[serde(default)]
    pub day_name: Option<String>,
    pub exercises: Vec<ExerciseEntry>,
    #[serde(default)]
    pub exercise_sets: BTreeMap<usize, Vec<SetRecord>>,
}

impl WorkoutSession {
    /// Start a session pre-populated from a program.
    ///
    /// Program-provided set targets (reps, planned durations) are kept as-is;
    /// exercises without sets get one empty set of the right shape.
    pub fn from_program(seed: ProgramSeed, now_ms: u64) -> Self {
        let mut session = Self::new(now_ms);
        session.exercises = seed.exercises;
        session.sets = seed.exercise_sets;
        session.from_program = true;
        session.program_name = seed.program_name;
        session.day_name = seed.day_name;
        session.repair();
        session
    }
}
