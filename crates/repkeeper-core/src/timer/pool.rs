//! Cardio set stopwatches, one per (exercise, set).
//!
//! Each handle keeps the milliseconds banked from earlier segments plus the
//! start of the running segment. Durations are always recomputed as
//! `base + (now - started_at)` and written back into the set record, never
//! incremented per tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::datetime_from_ms;
use crate::events::Event;
use crate::session::{moved_position, ExerciseKind, WorkoutSession};

/// Position of a set within the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SetKey {
    pub exercise: usize,
    pub set: usize,
}

impl SetKey {
    pub fn new(exercise: usize, set: usize) -> Self {
        Self { exercise, set }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerHandle {
    /// Start of the running segment; `None` while paused.
    pub started_at_ms: Option<u64>,
    /// Time banked from finished segments.
    pub base_ms: u64,
    /// Paused by a background transition rather than by the user.
    pub suspended: bool,
    /// Next write, on a grid anchored at the segment start.
    next_tick_ms: Option<u64>,
}

impl TimerHandle {
    pub fn is_running(&self) -> bool {
        self.started_at_ms.is_some()
    }

    pub fn total_ms(&self, now_ms: u64) -> u64 {
        let segment = self
            .started_at_ms
            .map(|started| now_ms.saturating_sub(started))
            .unwrap_or(0);
        self.base_ms.saturating_add(segment)
    }

    fn run_from(&mut self, now_ms: u64, tick_ms: u64) {
        self.started_at_ms = Some(now_ms);
        self.next_tick_ms = Some(now_ms.saturating_add(tick_ms));
        self.suspended = false;
    }

    fn fold(&mut self, now_ms: u64) -> u64 {
        self.base_ms = self.total_ms(now_ms);
        self.started_at_ms = None;
        self.next_tick_ms = None;
        self.base_ms
    }

    /// True when a tick is due; advances the grid past `now_ms`.
    fn take_due(&mut self, now_ms: u64, tick_ms: u64) -> bool {
        let (Some(started), Some(next)) = (self.started_at_ms, self.next_tick_ms) else {
            return false;
        };
        if now_ms < next {
            return false;
        }
        let periods = now_ms.saturating_sub(started) / tick_ms + 1;
        self.next_tick_ms = Some(started.saturating_add(periods.saturating_mul(tick_ms)));
        true
    }
}

#[derive(Debug, Clone)]
pub struct TimerPool {
    timers: BTreeMap<SetKey, TimerHandle>,
    tick_ms: u64,
}

impl TimerPool {
    pub fn new(tick_ms: u64) -> Self {
        Self {
            timers: BTreeMap::new(),
            tick_ms: tick_ms.max(1),
        }
    }

    pub fn get(&self, key: SetKey) -> Option<&TimerHandle> {
        self.timers.get(&key)
    }

    pub fn is_running(&self, key: SetKey) -> bool {
        self.timers.get(&key).is_some_and(TimerHandle::is_running)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Start or resume the stopwatch for a cardio set.
    ///
    /// A new handle is seeded from time already logged on the set, except
    /// that a program-planned duration that was never timed resets to zero.
    pub fn start(&mut self, session: &mut WorkoutSession, key: SetKey, now_ms: u64) -> Option<Event> {
        if session.exercise(key.exercise).map(|e| e.kind()) != Some(ExerciseKind::Cardio) {
            debug!(?key, "cardio timer start ignored for non-cardio set");
            return None;
        }
        let record = session.set(key.exercise, key.set)?;
        let seeded_ms = if record.has_planned_duration() {
            0
        } else {
            record.duration_seconds.unwrap_or(0).saturating_mul(1000)
        };

        let handle = self.timers.entry(key).or_insert_with(|| TimerHandle {
            base_ms: seeded_ms,
            ..TimerHandle::default()
        });
        if handle.is_running() {
            return None;
        }
        handle.run_from(now_ms, self.tick_ms);
        let secs = handle.total_ms(now_ms) / 1000;
        session.write_duration(key.exercise, key.set, secs);

        debug!(?key, base_ms = handle.base_ms, "cardio timer started");
        Some(Event::CardioStarted {
            exercise: key.exercise,
            set: key.set,
            at: datetime_from_ms(now_ms),
        })
    }

    /// Stop the stopwatch, banking the running segment. No-op when paused.
    pub fn pause(&mut self, session: &mut WorkoutSession, key: SetKey, now_ms: u64) -> Option<Event> {
        let handle = self.timers.get_mut(&key)?;
        if !handle.is_running() {
            return None;
        }
        let secs = handle.fold(now_ms) / 1000;
        handle.suspended = false;
        session.write_duration(key.exercise, key.set, secs);
        debug!(?key, secs, "cardio timer paused");
        Some(Event::CardioPaused {
            exercise: key.exercise,
            set: key.set,
            duration_secs: secs,
            at: datetime_from_ms(now_ms),
        })
    }

    /// Pause and drop the handle; the set keeps its final duration.
    pub fn finalize(&mut self, session: &mut WorkoutSession, key: SetKey, now_ms: u64) -> Option<Event> {
        let event = self.pause(session, key, now_ms);
        self.timers.remove(&key);
        event
    }

    /// Write the current total of every running stopwatch whose tick is due.
    /// Ticks fall every `tick_ms` after the start of the running segment.
    pub fn tick(&mut self, session: &mut WorkoutSession, now_ms: u64) -> Vec<Event> {
        let tick_ms = self.tick_ms;
        let mut events = Vec::new();
        for (key, handle) in self.timers.iter_mut() {
            if !handle.take_due(now_ms, tick_ms) {
                continue;
            }
            let secs = handle.total_ms(now_ms) / 1000;
            if session.set(key.exercise, key.set).and_then(|s| s.duration_seconds) == Some(secs) {
                continue;
            }
            session.write_duration(key.exercise, key.set, secs);
            events.push(Event::CardioTicked {
                exercise: key.exercise,
                set: key.set,
                duration_secs: secs,
                at: datetime_from_ms(now_ms),
            });
        }
        events
    }

    /// Background transition: bank every running segment and remember which
    /// stopwatches to restart.
    pub fn suspend_all(&mut self, session: &mut WorkoutSession, now_ms: u64) -> usize {
        let mut suspended = 0;
        for (key, handle) in self.timers.iter_mut().filter(|(_, h)| h.is_running()) {
            let secs = handle.fold(now_ms) / 1000;
            handle.suspended = true;
            session.write_duration(key.exercise, key.set, secs);
            suspended += 1;
        }
        suspended
    }

    /// Foreground transition: restart suspended stopwatches from `now_ms`,
    /// so the background gap does not count.
    pub fn resume_suspended(&mut self, now_ms: u64) -> usize {
        let mut resumed = 0;
        for handle in self.timers.values_mut().filter(|h| h.suspended) {
            handle.run_from(now_ms, self.tick_ms);
            resumed += 1;
        }
        resumed
    }

    /// Re-key every handle. Handles mapped to `None` are dropped.
    pub fn remap(&mut self, f: impl Fn(SetKey) -> Option<SetKey>) {
        let timers = std::mem::take(&mut self.timers);
        self.timers = timers
            .into_iter()
            .filter_map(|(key, handle)| f(key).map(|k| (k, handle)))
            .collect();
    }

    pub fn exercise_deleted(&mut self, index: usize) {
        self.remap(|key| match key.exercise {
            e if e == index => None,
            e if e > index => Some(SetKey::new(e - 1, key.set)),
            _ => Some(key),
        });
    }

    pub fn exercise_moved(&mut self, from: usize, to: usize) {
        self.remap(|key| Some(SetKey::new(moved_position(from, to, key.exercise), key.set)));
    }

    pub fn set_deleted(&mut self, exercise: usize, set: usize) {
        self.remap(|key| {
            if key.exercise != exercise {
                Some(key)
            } else if key.set == set {
                None
            } else if key.set > set {
                Some(SetKey::new(exercise, key.set - 1))
            } else {
                Some(key)
            }
        });
    }

    /// Drop handles whose set no longer exists or is no longer cardio.
    pub fn retain_valid(&mut self, session: &WorkoutSession) {
        self.timers.retain(|key, _| {
            session.exercise(key.exercise).map(|e| e.kind()) == Some(ExerciseKind::Cardio)
                && session.set(key.exercise, key.set).is_some()
        });
    }

    /// Bank every stopwatch into its set and drop all handles.
    pub fn teardown(&mut self, session: &mut WorkoutSession, now_ms: u64) {
        for (key, handle) in self.timers.iter_mut().filter(|(_, h)| h.is_running()) {
            let secs = handle.fold(now_ms) / 1000;
            session.write_duration(key.exercise, key.set, secs);
        }
        self.timers.clear();
    }
}
