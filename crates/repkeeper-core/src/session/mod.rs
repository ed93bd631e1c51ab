//! The workout session aggregate.
//!
//! A [`WorkoutSession`] is the sole mutable aggregate for one in-progress
//! workout. Structural edits go through [`Mutation`]s (see `mutator`), the
//! session clock lives in `clock`, and set durations are written only by the
//! cardio [`TimerPool`](crate::timer::TimerPool).
//!
//! Positional invariant: exercises occupy positions `0..len`, and every
//! position has a non-empty entry in the set map.

mod classify;
mod clock;
mod mutator;
mod program;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use classify::{classify, ExerciseKind};
pub use mutator::{moved_position, normalize_reps, reps_lower_bound, Mutation, SetField};
pub use program::ProgramSeed;

/// Kind of set, as shown next to the set number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetType {
    #[default]
    Normal,
    Warmup,
    Dropset,
    Failure,
    Superset,
}

impl std::str::FromStr for SetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(SetType::Normal),
            "warmup" | "warm-up" => Ok(SetType::Warmup),
            "dropset" | "drop-set" => Ok(SetType::Dropset),
            "failure" => Ok(SetType::Failure),
            "superset" => Ok(SetType::Superset),
            other => Err(format!("unknown set type '{other}'")),
        }
    }
}

/// One logged unit of work.
///
/// Loaded and bodyweight sets use `weight`/`reps`/`rpe`; cardio sets use
/// `duration_seconds`. Unused fields stay empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRecord {
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub reps: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpe: Option<String>,
    #[serde(default)]
    pub set_type: SetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    /// Set once the cardio timer has run for this set. A duration on a set
    /// that was never started is a program target, not logged time.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timer_started: bool,
    #[serde(default)]
    pub completed: bool,
}

impl SetRecord {
    /// Empty set shaped for the given exercise kind.
    pub fn for_kind(kind: ExerciseKind) -> Self {
        match kind {
            ExerciseKind::Cardio => Self {
                duration_seconds: Some(0),
                ..Self::default()
            },
            ExerciseKind::Loaded | ExerciseKind::Bodyweight => Self::default(),
        }
    }

    /// Program target duration that has not been overwritten by a timer yet.
    pub fn has_planned_duration(&self) -> bool {
        !self.timer_started && self.duration_seconds.is_some_and(|d| d > 0)
    }
}

/// An exercise in the session's ordered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub is_cardio: bool,
    #[serde(default)]
    pub is_bodyweight: bool,
}

impl ExerciseEntry {
    pub fn new(
        name: impl Into<String>,
        equipment: Option<String>,
        category: Option<String>,
    ) -> Self {
        let mut entry = Self {
            name: name.into(),
            equipment,
            category,
            is_cardio: false,
            is_bodyweight: false,
        };
        entry.reclassify();
        entry
    }

    /// Recompute the classification flags from name and tags.
    ///
    /// Used when entries arrive from outside (snapshots, programs) where the
    /// flags may be missing or stale.
    pub fn reclassify(&mut self) {
        let kind = classify(&self.name, self.equipment.as_deref(), self.category.as_deref());
        self.is_cardio = kind == ExerciseKind::Cardio;
        self.is_bodyweight = kind == ExerciseKind::Bodyweight;
    }

    pub fn kind(&self) -> ExerciseKind {
        if self.is_cardio {
            ExerciseKind::Cardio
        } else if self.is_bodyweight {
            ExerciseKind::Bodyweight
        } else {
            ExerciseKind::Loaded
        }
    }
}

/// Derived aggregates, recomputed after every mutation that could change them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_volume: f64,
    pub total_set_count: usize,
}

/// Aggregate root for one in-progress workout.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutSession {
    pub(crate) id: String,
    pub(crate) start_time_ms: u64,
    pub(crate) paused_accumulated_secs: u64,
    pub(crate) pause_started_at_ms: Option<u64>,
    pub(crate) exercises: Vec<ExerciseEntry>,
    pub(crate) sets: BTreeMap<usize, Vec<SetRecord>>,
    pub(crate) pairings: BTreeMap<usize, usize>,
    pub(crate) current_exercise_index: usize,
    pub(crate) from_program: bool,
    pub(crate) program_name: Option<String>,
    pub(crate) day_name: Option<String>,
    pub(crate) totals: Totals,
}

impl WorkoutSession {
    /// Start an empty session at `now_ms`.
    pub fn new(now_ms: u64) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), now_ms)
    }

    pub fn with_id(id: impl Into<String>, now_ms: u64) -> Self {
        Self {
            id: id.into(),
            start_time_ms: now_ms,
            paused_accumulated_secs: 0,
            pause_started_at_ms: None,
            exercises: Vec::new(),
            sets: BTreeMap::new(),
            pairings: BTreeMap::new(),
            current_exercise_index: 0,
            from_program: false,
            program_name: None,
            day_name: None,
            totals: Totals::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start_time_ms(&self) -> u64 {
        self.start_time_ms
    }

    pub fn exercises(&self) -> &[ExerciseEntry] {
        &self.exercises
    }

    pub fn exercise(&self, index: usize) -> Option<&ExerciseEntry> {
        self.exercises.get(index)
    }

    pub fn sets(&self, exercise: usize) -> &[SetRecord] {
        self.sets.get(&exercise).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set(&self, exercise: usize, set: usize) -> Option<&SetRecord> {
        self.sets.get(&exercise).and_then(|s| s.get(set))
    }

    pub fn sets_by_exercise(&self) -> &BTreeMap<usize, Vec<SetRecord>> {
        &self.sets
    }

    pub fn pairings(&self) -> &BTreeMap<usize, usize> {
        &self.pairings
    }

    pub fn partner(&self, exercise: usize) -> Option<usize> {
        self.pairings.get(&exercise).copied()
    }

    pub fn current_exercise_index(&self) -> usize {
        self.current_exercise_index
    }

    pub fn is_from_program(&self) -> bool {
        self.from_program
    }

    pub fn program_name(&self) -> Option<&str> {
        self.program_name.as_deref()
    }

    pub fn day_name(&self) -> Option<&str> {
        self.day_name.as_deref()
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// True when there is something worth persisting.
    pub fn has_data(&self) -> bool {
        !self.exercises.is_empty()
    }

    /// Check the positional and pairing invariants.
    pub fn is_consistent(&self) -> bool {
        let len = self.exercises.len();
        let sets_ok = self.sets.len() == len
            && (0..len).all(|i| self.sets.get(&i).is_some_and(|s| !s.is_empty()));
        let pairs_ok = self
            .pairings
            .iter()
            .all(|(a, b)| a != b && *b < len && self.pairings.get(b) == Some(a));
        let current_ok = len == 0 || self.current_exercise_index < len;
        sets_ok && pairs_ok && current_ok
    }

    // ── Crate-internal writers ───────────────────────────────────────

    /// Write a cardio duration. Only the timer pool calls this.
    pub(crate) fn write_duration(&mut self, exercise: usize, set: usize, secs: u64) -> bool {
        match self.sets.get_mut(&exercise).and_then(|s| s.get_mut(set)) {
            Some(record) => {
                record.duration_seconds = Some(secs);
                record.timer_started = true;
                true
            }
            None => false,
        }
    }

    /// Restore the positional invariants on data that came from outside.
    pub(crate) fn repair(&mut self) {
        let len = self.exercises.len();
        for entry in &mut self.exercises {
            entry.reclassify();
        }
        self.sets.retain(|k, _| *k < len);
        for (i, entry) in self.exercises.iter().enumerate() {
            let sets = self.sets.entry(i).or_default();
            if sets.is_empty() {
                sets.push(SetRecord::for_kind(entry.kind()));
            }
        }
        let snapshot = self.pairings.clone();
        self.pairings
            .retain(|a, b| a != b && *b < len && snapshot.get(b) == Some(a));
        if len == 0 {
            self.current_exercise_index = 0;
        } else if self.current_exercise_index >= len {
            self.current_exercise_index = len - 1;
        }
        self.recompute_totals();
    }
}
