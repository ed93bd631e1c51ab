//! Durable JSON snapshot of a session.
//!
//! Shared with external readers and writers, so field names are camelCase
//! and set lists are keyed by the exercise position as a string
//! (`"exerciseSets": {"0": [...]}`). Fields beyond the core ones default when
//! absent, which lets an external writer emit the minimal shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::{datetime_from_ms, ms_from_datetime};
use crate::session::{ExerciseEntry, SetRecord, Totals, WorkoutSession};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub exercises: Vec<ExerciseEntry>,
    #[serde(default)]
    pub exercise_sets: BTreeMap<usize, Vec<SetRecord>>,
    #[serde(default)]
    pub current_exercise_index: usize,
    #[serde(default)]
    pub from_program: bool,
    #[serde(default)]
    pub program_name: Option<String>,
    #[serde(default)]
    pub day_name: Option<String>,
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub superset_pairings: BTreeMap<usize, usize>,
    #[serde(default)]
    pub paused_accumulated_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_started_at: Option<DateTime<Utc>>,
    /// Convenience cache; recomputed on load.
    #[serde(default)]
    pub total_volume: f64,
    #[serde(default)]
    pub total_set_count: usize,
}

impl SessionSnapshot {
    pub fn from_session(session: &WorkoutSession, now_ms: u64) -> Self {
        let Totals {
            total_volume,
            total_set_count,
        } = session.totals();
        Self {
            id: session.id.clone(),
            start_time: datetime_from_ms(session.start_time_ms),
            exercises: session.exercises.clone(),
            exercise_sets: session.sets.clone(),
            current_exercise_index: session.current_exercise_index,
            from_program: session.from_program,
            program_name: session.program_name.clone(),
            day_name: session.day_name.clone(),
            last_updated: datetime_from_ms(now_ms),
            superset_pairings: session.pairings.clone(),
            paused_accumulated_seconds: session.paused_accumulated_secs,
            pause_started_at: session.pause_started_at_ms.map(datetime_from_ms),
            total_volume,
            total_set_count,
        }
    }

    /// Rebuild the session, repairing anything an external writer broke.
    pub fn into_session(self) -> WorkoutSession {
        let mut session = WorkoutSession::with_id(self.id, ms_from_datetime(self.start_time));
        session.exercises = self.exercises;
        session.sets = self.exercise_sets;
        session.pairings = self.superset_pairings;
        session.current_exercise_index = self.current_exercise_index;
        session.from_program = self.from_program;
        session.program_name = self.program_name;
        session.day_name = self.day_name;
        session.paused_accumulated_secs = self.paused_accumulated_seconds;
        session.pause_started_at_ms = self.pause_started_at.map(ms_from_datetime);
        session.repair();
        session
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a stored snapshot. Malformed input is logged and treated as absent.
    pub fn decode(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "ignoring malformed session snapshot");
                None
            }
        }
    }
}
