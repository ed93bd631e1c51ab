//! The session runtime: single owner of one workout session.
//!
//! [`SessionRuntime`] holds the session together with its rest timer, cardio
//! timer pool, reorder coalescer and autosave. Commands go through
//! [`SessionRuntime::apply`] one at a time; deadlines (rest expiry, cardio
//! ticks, the reorder window, the autosave window) are serviced by
//! [`SessionRuntime::tick`]. Nothing here spawns tasks or reads the clock,
//! see [`driver`] for the async loop around it.
//!
//! ## Usage
//!
//! ```ignore
//! let (mut runtime, _) = SessionRuntime::start(WorkoutSession::new(now), collaborators, &config, now);
//! runtime.apply(Command::Mutate(Mutation::AddSet { exercise: 0 }), now)?;
//! // In a loop:
//! for event in runtime.tick(clock.now_ms()) { /* forward */ }
//! ```

pub mod driver;

use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::datetime_from_ms;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::notify::{ExpiryAlert, NotificationScheduler};
use crate::persistence::{load_session, AutoPersistence, SessionSnapshot};
use crate::reorder::{MoveDirection, PendingMove, ReorderCoalescer};
use crate::session::{ExerciseKind, Mutation, WorkoutSession};
use crate::storage::{Config, KeyValueStore, WorkoutRecord};
use crate::timer::{RestTimer, SetKey, TimerPool};

pub use driver::{spawn_runtime, RuntimeHandle};

/// External collaborators the runtime talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Store used to restore the session after a restart.
    pub durable: Arc<dyn KeyValueStore>,
    /// Store shared with the external agent.
    pub mirror: Arc<dyn KeyValueStore>,
    pub scheduler: Arc<dyn NotificationScheduler>,
    pub alert: Arc<dyn ExpiryAlert>,
}

/// One input to the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Mutate(Mutation),
    RequestMove {
        index: usize,
        direction: MoveDirection,
    },
    PauseSession,
    ResumeSession,
    StartRest {
        seconds: Option<u64>,
    },
    PauseRest,
    CancelRest,
    StartCardio {
        exercise: usize,
        set: usize,
    },
    PauseCardio {
        exercise: usize,
        set: usize,
    },
    Foreground,
    Background,
    /// The session view went inactive.
    FocusLost,
    /// The external agent may start writing the mirror.
    ExternalEditBegan,
    ExternalEditEnded,
    EndSession,
}

impl Command {
    /// Commands that address exercises or sets by position. A requested
    /// move is committed before any of these runs.
    fn names_positions(&self) -> bool {
        matches!(
            self,
            Command::Mutate(_) | Command::StartCardio { .. } | Command::PauseCardio { .. }
        )
    }

    /// Commands that read or change session state, and so must not run
    /// against a mirror the external agent may still be editing.
    fn touches_session(&self) -> bool {
        !matches!(
            self,
            Command::StartRest { .. }
                | Command::PauseRest
                | Command::CancelRest
                | Command::Foreground
                | Command::Background
                | Command::ExternalEditBegan
                | Command::ExternalEditEnded
        )
    }
}

pub struct SessionRuntime {
    session: WorkoutSession,
    rest: RestTimer,
    cardio: TimerPool,
    reorder: ReorderCoalescer,
    persistence: AutoPersistence,
    foreground: bool,
    ended: bool,
}

impl std::fmt::Debug for SessionRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRuntime")
            .field("session_id", &self.session.id())
            .field("rest", &self.rest)
            .field("cardio_timers", &self.cardio.len())
            .field("pending_move", &self.reorder.pending())
            .field("persistence", &self.persistence)
            .field("foreground", &self.foreground)
            .field("ended", &self.ended)
            .finish()
    }
}

impl SessionRuntime {
    fn assemble(session: WorkoutSession, collaborators: Collaborators, config: &Config) -> Self {
        let Collaborators {
            durable,
            mirror,
            scheduler,
            alert,
        } = collaborators;
        let rest = RestTimer::new(
            durable.clone(),
            scheduler,
            alert,
            config.rest_payload(),
            config.storage.rest_end_key.clone(),
            config.storage.rest_state_key.clone(),
            config.rest.default_seconds,
        );
        let persistence = AutoPersistence::new(
            durable,
            mirror,
            config.storage.session_key.clone(),
            config.storage.mirror_key.clone(),
            config.timing.persist_debounce_ms,
        );
        Self {
            session,
            rest,
            cardio: TimerPool::new(config.timing.cardio_tick_ms),
            reorder: ReorderCoalescer::new(config.timing.reorder_debounce_ms),
            persistence,
            foreground: true,
            ended: false,
        }
    }

    /// Take ownership of a new session and schedule its first write.
    pub fn start(
        session: WorkoutSession,
        collaborators: Collaborators,
        config: &Config,
        now_ms: u64,
    ) -> (Self, Vec<Event>) {
        let mut runtime = Self::assemble(session, collaborators, config);
        let mut events = vec![Event::SessionStarted {
            session_id: runtime.session.id().to_string(),
            from_program: runtime.session.is_from_program(),
            at: datetime_from_ms(now_ms),
        }];
        events.extend(runtime.rest.recover(now_ms));
        runtime.persistence.mark_dirty(now_ms);
        info!(session_id = %runtime.session.id(), "session started");
        (runtime, events)
    }

    /// Resume the session stored in the durable store, if there is one.
    ///
    /// The mirror is re-read before anything else runs, so edits the
    /// external agent made between processes are picked up instead of being
    /// overwritten by the next write.
    pub fn restore(
        collaborators: Collaborators,
        config: &Config,
        now_ms: u64,
    ) -> Option<(Self, Vec<Event>)> {
        let session = load_session(collaborators.durable.as_ref(), &config.storage.session_key)?;
        let mut runtime = Self::assemble(session, collaborators, config);
        let reconciled = runtime
            .persistence
            .reconcile_on_restore(&mut runtime.session, now_ms);
        let mut events = vec![Event::SessionRestored {
            session_id: runtime.session.id().to_string(),
            exercise_count: runtime.session.exercises().len(),
            at: datetime_from_ms(now_ms),
        }];
        if matches!(reconciled, Event::MirrorReconciled { adopted: true, .. }) {
            events.push(reconciled);
        }
        events.extend(runtime.rest.recover(now_ms));
        debug!(session_id = %runtime.session.id(), "session restored");
        Some((runtime, events))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> &WorkoutSession {
        &self.session
    }

    pub fn rest(&self) -> &RestTimer {
        &self.rest
    }

    pub fn cardio(&self) -> &TimerPool {
        &self.cardio
    }

    pub fn persistence(&self) -> &AutoPersistence {
        &self.persistence
    }

    pub fn pending_move(&self) -> Option<PendingMove> {
        self.reorder.pending()
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Execute one command.
    ///
    /// # Errors
    ///
    /// Fails once the session has ended, or when the rest timer rejects a
    /// start. Rejected edits are not errors; they produce no events.
    pub fn apply(&mut self, command: Command, now_ms: u64) -> Result<Vec<Event>> {
        if self.ended {
            return Err(CoreError::SessionEnded {
                session_id: self.session.id().to_string(),
            });
        }

        let mut events = Vec::new();
        if self.persistence.in_external_edit() && command.touches_session() {
            events.push(self.close_external_edit(now_ms));
        }
        if command.names_positions() {
            events.extend(self.commit_pending_move(now_ms));
        }

        match command {
            Command::Mutate(mutation) => events.extend(self.mutate(mutation, now_ms)),
            Command::RequestMove { index, direction } => {
                if index >= self.session.exercises().len() {
                    debug!(index, "move request for missing exercise ignored");
                } else {
                    let pending = self.reorder.request_move(index, direction, now_ms);
                    events.push(Event::MoveRequested {
                        index: pending.index,
                        direction: pending.direction,
                        count: pending.count,
                        at: datetime_from_ms(now_ms),
                    });
                }
            }
            Command::PauseSession => {
                if self.session.pause_clock(now_ms) {
                    self.persistence.mark_dirty(now_ms);
                    events.push(Event::SessionPaused {
                        elapsed_secs: self.session.elapsed_secs(now_ms),
                        at: datetime_from_ms(now_ms),
                    });
                }
            }
            Command::ResumeSession => {
                if self.session.resume_clock(now_ms) {
                    self.persistence.mark_dirty(now_ms);
                    events.push(Event::SessionResumed {
                        elapsed_secs: self.session.elapsed_secs(now_ms),
                        at: datetime_from_ms(now_ms),
                    });
                }
            }
            Command::StartRest { seconds } => events.push(self.rest.start(seconds, now_ms)?),
            Command::PauseRest => events.extend(self.rest.pause(now_ms)),
            Command::CancelRest => events.extend(self.rest.cancel(now_ms)),
            Command::StartCardio { exercise, set } => {
                let started = self
                    .cardio
                    .start(&mut self.session, SetKey::new(exercise, set), now_ms);
                if started.is_some() {
                    self.persistence.mark_dirty(now_ms);
                }
                events.extend(started);
            }
            Command::PauseCardio { exercise, set } => {
                let paused = self
                    .cardio
                    .pause(&mut self.session, SetKey::new(exercise, set), now_ms);
                if paused.is_some() {
                    self.persistence.mark_dirty(now_ms);
                }
                events.extend(paused);
            }
            Command::Foreground => events.extend(self.enter_foreground(now_ms)),
            Command::Background => events.extend(self.enter_background(now_ms)),
            Command::FocusLost => {
                events.push(self.persistence.flush_on_focus_loss(&self.session, now_ms));
            }
            Command::ExternalEditBegan => {
                events.extend(self.commit_pending_move(now_ms));
                events.extend(self.persistence.begin_external_edit(&self.session, now_ms));
            }
            Command::ExternalEditEnded => {
                if self.persistence.in_external_edit() {
                    events.push(self.close_external_edit(now_ms));
                }
            }
            Command::EndSession => {
                let (_, ended) = self.end_session(now_ms)?;
                events.extend(ended);
            }
        }
        Ok(events)
    }

    /// Service every deadline that has come due.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Event> {
        if self.ended {
            return Vec::new();
        }
        let mut events = Vec::new();

        if let Some((from, to)) = self.reorder.poll(now_ms, self.session.exercises().len()) {
            events.extend(self.move_exercise(from, to, now_ms));
        }

        // Backgrounded: only the stored end timestamp matters, and the
        // scheduled notification is the user-visible signal.
        if self.foreground {
            events.extend(self.rest.poll(now_ms, true));

            let ticked = self.cardio.tick(&mut self.session, now_ms);
            if !ticked.is_empty() {
                self.persistence.mark_dirty(now_ms);
            }
            events.extend(ticked);
        }

        events.extend(self.persistence.poll(&self.session, now_ms));
        events
    }

    /// Stop driving the session without ending it: commit any pending move,
    /// bank running cardio time and flush. The rest timer keeps its stored
    /// end so the next process can pick it up.
    ///
    /// An empty session is only written when an edit made it empty.
    pub fn shutdown(&mut self, now_ms: u64) -> Vec<Event> {
        if self.ended {
            return Vec::new();
        }
        let mut events = self.commit_pending_move(now_ms);
        self.cardio.teardown(&mut self.session, now_ms);
        if self.persistence.in_external_edit() {
            events.push(self.close_external_edit(now_ms));
        }
        if self.session.has_data() || self.persistence.is_dirty() {
            events.push(self.persistence.write(&self.session, now_ms));
        }
        events
    }

    /// Finish the workout: tear down every timer, remove the stored
    /// snapshots and return the summary for history.
    ///
    /// # Errors
    ///
    /// Fails if the session already ended or cannot be serialized.
    pub fn end_session(&mut self, now_ms: u64) -> Result<(WorkoutRecord, Vec<Event>)> {
        if self.ended {
            return Err(CoreError::SessionEnded {
                session_id: self.session.id().to_string(),
            });
        }
        let mut events = self.commit_pending_move(now_ms);
        self.cardio.teardown(&mut self.session, now_ms);
        events.extend(self.rest.cancel(now_ms));
        self.persistence.clear();
        self.reorder.cancel();
        self.ended = true;

        let elapsed_secs = self.session.elapsed_secs(now_ms);
        let totals = self.session.totals();
        let record = WorkoutRecord {
            id: self.session.id().to_string(),
            started_at: datetime_from_ms(self.session.start_time_ms()),
            finished_at: datetime_from_ms(now_ms),
            elapsed_secs,
            exercise_count: self.session.exercises().len(),
            set_count: totals.total_set_count,
            total_volume: totals.total_volume,
            program_name: self.session.program_name().map(str::to_string),
            day_name: self.session.day_name().map(str::to_string),
            snapshot: SessionSnapshot::from_session(&self.session, now_ms).encode()?,
        };

        info!(session_id = %record.id, elapsed_secs, "session ended");
        events.push(Event::SessionEnded {
            session_id: record.id.clone(),
            elapsed_secs,
            at: datetime_from_ms(now_ms),
        });
        Ok((record, events))
    }

    // ── Internals ────────────────────────────────────────────────────

    fn mutate(&mut self, mutation: Mutation, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();

        // Adding a cardio set closes out the previous one.
        if let Mutation::AddSet { exercise } = mutation {
            let is_cardio = self
                .session
                .exercise(exercise)
                .is_some_and(|e| e.kind() == ExerciseKind::Cardio);
            let last = self.session.sets(exercise).len().checked_sub(1);
            if let (true, Some(last)) = (is_cardio, last) {
                events.extend(self.cardio.finalize(&mut self.session, SetKey::new(exercise, last), now_ms));
            }
        }

        if !self.session.apply(&mutation) {
            return events;
        }

        match mutation {
            Mutation::DeleteExercise { exercise } => self.cardio.exercise_deleted(exercise),
            Mutation::DeleteSet { exercise, set } => self.cardio.set_deleted(exercise, set),
            Mutation::MoveExercise { from, to } => self.cardio.exercise_moved(from, to),
            _ => {}
        }

        self.persistence.mark_dirty(now_ms);
        let totals = self.session.totals();
        events.push(Event::MutationApplied {
            mutation,
            total_set_count: totals.total_set_count,
            total_volume: totals.total_volume,
            at: datetime_from_ms(now_ms),
        });
        events
    }

    fn move_exercise(&mut self, from: usize, to: usize, now_ms: u64) -> Vec<Event> {
        if !self.session.apply(&Mutation::MoveExercise { from, to }) {
            return Vec::new();
        }
        self.cardio.exercise_moved(from, to);
        self.persistence.mark_dirty(now_ms);
        debug!(from, to, "coalesced move applied");
        vec![Event::ExerciseMoved {
            from,
            to,
            at: datetime_from_ms(now_ms),
        }]
    }

    fn commit_pending_move(&mut self, now_ms: u64) -> Vec<Event> {
        match self.reorder.take(self.session.exercises().len()) {
            Some((from, to)) => self.move_exercise(from, to, now_ms),
            None => Vec::new(),
        }
    }

    fn close_external_edit(&mut self, now_ms: u64) -> Event {
        let event = self.persistence.end_external_edit(&mut self.session, now_ms);
        if matches!(event, Event::MirrorReconciled { adopted: true, .. }) {
            self.cardio.retain_valid(&self.session);
            self.reorder.cancel();
        }
        event
    }

    fn enter_foreground(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.foreground {
            self.foreground = true;
            self.cardio.resume_suspended(now_ms);
            events.push(Event::Foregrounded {
                at: datetime_from_ms(now_ms),
            });
        }
        events.extend(self.rest.recover(now_ms));
        events
    }

    fn enter_background(&mut self, now_ms: u64) -> Vec<Event> {
        if !self.foreground {
            return Vec::new();
        }
        self.foreground = false;
        if self.cardio.suspend_all(&mut self.session, now_ms) > 0 {
            self.persistence.mark_dirty(now_ms);
        }
        vec![Event::Backgrounded {
            at: datetime_from_ms(now_ms),
        }]
    }
}
