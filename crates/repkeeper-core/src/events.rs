use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reorder::MoveDirection;
use crate::session::Mutation;

/// Every state change of the session runtime produces an Event.
/// Hosts print or forward them; nothing in the engine consumes them.
///
/// `at` is derived from the `now_ms` the runtime was driven with, so event
/// streams are reproducible under a manual clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: String,
        from_program: bool,
        at: DateTime<Utc>,
    },
    SessionRestored {
        session_id: String,
        exercise_count: usize,
        at: DateTime<Utc>,
    },
    SessionPaused {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SessionEnded {
        session_id: String,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    MutationApplied {
        mutation: Mutation,
        total_set_count: usize,
        total_volume: f64,
        at: DateTime<Utc>,
    },
    /// A move request was absorbed by the coalescer.
    MoveRequested {
        index: usize,
        direction: MoveDirection,
        count: usize,
        at: DateTime<Utc>,
    },
    ExerciseMoved {
        from: usize,
        to: usize,
        at: DateTime<Utc>,
    },
    RestStarted {
        duration_secs: u64,
        end_ms: u64,
        notification_scheduled: bool,
        at: DateTime<Utc>,
    },
    RestPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    RestCanceled {
        at: DateTime<Utc>,
    },
    /// Countdown reached zero. `alerted` is false when the app was in the
    /// background and the scheduled notification was the only signal.
    RestExpired {
        alerted: bool,
        at: DateTime<Utc>,
    },
    /// Countdown picked up again from the stored end timestamp.
    RestResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    CardioStarted {
        exercise: usize,
        set: usize,
        at: DateTime<Utc>,
    },
    CardioPaused {
        exercise: usize,
        set: usize,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    CardioTicked {
        exercise: usize,
        set: usize,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    SnapshotWritten {
        write_count: u64,
        at: DateTime<Utc>,
    },
    /// A write was due but failed or had nothing to write.
    SnapshotSkipped {
        reason: String,
        at: DateTime<Utc>,
    },
    /// The mirror was re-read after an external edit window.
    MirrorReconciled {
        adopted: bool,
        at: DateTime<Utc>,
    },
    Foregrounded {
        at: DateTime<Utc>,
    },
    Backgrounded {
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::SessionStarted { at, .. }
            | Event::SessionRestored { at, .. }
            | Event::SessionPaused { at, .. }
            | Event::SessionResumed { at, .. }
            | Event::SessionEnded { at, .. }
            | Event::MutationApplied { at, .. }
            | Event::MoveRequested { at, .. }
            | Event::ExerciseMoved { at, .. }
            | Event::RestStarted { at, .. }
            | Event::RestPaused { at, .. }
            | Event::RestCanceled { at }
            | Event::RestExpired { at, .. }
            | Event::RestResumed { at, .. }
            | Event::CardioStarted { at, .. }
            | Event::CardioPaused { at, .. }
            | Event::CardioTicked { at, .. }
            | Event::SnapshotWritten { at, .. }
            | Event::SnapshotSkipped { at, .. }
            | Event::MirrorReconciled { at, .. }
            | Event::Foregrounded { at }
            | Event::Backgrounded { at } => *at,
        }
    }
}
