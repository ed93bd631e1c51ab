//! Debounced snapshot writes to the durable store and the external mirror.
//!
//! Every change re-arms a single deadline; the write happens when the
//! deadline passes and always serializes the session as it is at that
//! moment. While an external edit window is open, no writes go out: the
//! external writer owns the mirror until the window is closed and the mirror
//! has been re-read.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::snapshot::SessionSnapshot;
use crate::clock::datetime_from_ms;
use crate::error::StorageError;
use crate::events::Event;
use crate::session::WorkoutSession;
use crate::storage::KeyValueStore;

pub struct AutoPersistence {
    durable: Arc<dyn KeyValueStore>,
    mirror: Arc<dyn KeyValueStore>,
    session_key: String,
    mirror_key: String,
    debounce_ms: u64,
    deadline_ms: Option<u64>,
    /// Mirror content as we last wrote it, to tell external edits apart.
    last_written: Option<String>,
    external_edit: bool,
    write_count: u64,
}

impl std::fmt::Debug for AutoPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoPersistence")
            .field("session_key", &self.session_key)
            .field("mirror_key", &self.mirror_key)
            .field("debounce_ms", &self.debounce_ms)
            .field("deadline_ms", &self.deadline_ms)
            .field("external_edit", &self.external_edit)
            .field("write_count", &self.write_count)
            .finish_non_exhaustive()
    }
}

impl AutoPersistence {
    pub fn new(
        durable: Arc<dyn KeyValueStore>,
        mirror: Arc<dyn KeyValueStore>,
        session_key: impl Into<String>,
        mirror_key: impl Into<String>,
        debounce_ms: u64,
    ) -> Self {
        Self {
            durable,
            mirror,
            session_key: session_key.into(),
            mirror_key: mirror_key.into(),
            debounce_ms,
            deadline_ms: None,
            last_written: None,
            external_edit: false,
            write_count: 0,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    pub fn in_external_edit(&self) -> bool {
        self.external_edit
    }

    /// Snapshot writes performed by this instance.
    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    /// Schedule a write, pushing back any pending one.
    pub fn mark_dirty(&mut self, now_ms: u64) {
        self.deadline_ms = Some(now_ms.saturating_add(self.debounce_ms));
    }

    /// Write if the debounce window has closed.
    pub fn poll(&mut self, session: &WorkoutSession, now_ms: u64) -> Option<Event> {
        if self.external_edit {
            return None;
        }
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => Some(self.write(session, now_ms)),
            _ => None,
        }
    }

    /// Write now. On failure the deadline is re-armed so the next poll retries.
    pub fn write(&mut self, session: &WorkoutSession, now_ms: u64) -> Event {
        self.deadline_ms = None;
        match self.try_write(session, now_ms) {
            Ok(raw) => {
                self.last_written = Some(raw);
                self.write_count += 1;
                debug!(write_count = self.write_count, "session snapshot written");
                Event::SnapshotWritten {
                    write_count: self.write_count,
                    at: datetime_from_ms(now_ms),
                }
            }
            Err(e) => {
                warn!(error = %e, "session snapshot write failed, will retry");
                self.mark_dirty(now_ms);
                Event::SnapshotSkipped {
                    reason: e.to_string(),
                    at: datetime_from_ms(now_ms),
                }
            }
        }
    }

    fn try_write(&self, session: &WorkoutSession, now_ms: u64) -> Result<String, StorageError> {
        let raw = SessionSnapshot::from_session(session, now_ms)
            .encode()
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        self.durable.set(&self.session_key, &raw)?;
        self.mirror.set(&self.mirror_key, &raw)?;
        Ok(raw)
    }

    /// Synchronous flush when the session view goes inactive.
    ///
    /// Cancels the pending debounced write and writes in its place, unless
    /// the session holds no exercises: an empty session never replaces a
    /// stored one here.
    pub fn flush_on_focus_loss(&mut self, session: &WorkoutSession, now_ms: u64) -> Event {
        self.deadline_ms = None;
        if !session.has_data() {
            debug!("focus-loss flush skipped for empty session");
            return Event::SnapshotSkipped {
                reason: "session has no exercises".into(),
                at: datetime_from_ms(now_ms),
            };
        }
        self.write(session, now_ms)
    }

    /// Hand the mirror to an external writer.
    ///
    /// Flushes first so the writer sees current state, then holds further
    /// writes until [`end_external_edit`](Self::end_external_edit).
    pub fn begin_external_edit(&mut self, session: &WorkoutSession, now_ms: u64) -> Option<Event> {
        let event = (self.is_dirty() || self.last_written.is_none())
            .then(|| self.write(session, now_ms));
        self.external_edit = true;
        info!("external edit window opened");
        event
    }

    /// Close the external edit window and reconcile with the mirror.
    ///
    /// If the mirror holds something other than our last write, it replaces
    /// the in-memory session. Otherwise, or when the mirror is missing or
    /// unreadable, local state wins and is rewritten on the next poll.
    pub fn end_external_edit(&mut self, session: &mut WorkoutSession, now_ms: u64) -> Event {
        self.external_edit = false;
        let adopted = self.reconcile(session, now_ms);
        Event::MirrorReconciled {
            adopted,
            at: datetime_from_ms(now_ms),
        }
    }

    /// Reconcile with the mirror after a restart.
    ///
    /// No process held the session while it sat in storage, so the external
    /// writer may have edited the mirror in the meantime. The durable
    /// snapshot counts as our last write; a mirror that differs from it and
    /// decodes replaces the restored session.
    pub fn reconcile_on_restore(&mut self, session: &mut WorkoutSession, now_ms: u64) -> Event {
        self.last_written = match self.durable.get(&self.session_key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "durable snapshot unreadable during restore reconciliation");
                None
            }
        };
        let adopted = self.reconcile(session, now_ms);
        Event::MirrorReconciled {
            adopted,
            at: datetime_from_ms(now_ms),
        }
    }

    fn reconcile(&mut self, session: &mut WorkoutSession, now_ms: u64) -> bool {
        let raw = match self.mirror.get(&self.mirror_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("mirror empty after external edit, keeping local session");
                self.mark_dirty(now_ms);
                return false;
            }
            Err(e) => {
                warn!(error = %e, "mirror unreadable after external edit, keeping local session");
                self.mark_dirty(now_ms);
                return false;
            }
        };

        if self.last_written.as_deref() == Some(raw.as_str()) {
            debug!("mirror unchanged by external edit");
            return false;
        }

        match SessionSnapshot::decode(&raw) {
            Some(snapshot) => {
                *session = snapshot.into_session();
                self.last_written = Some(raw);
                // Push the repaired state to the durable store as well.
                self.mark_dirty(now_ms);
                info!(session_id = %session.id(), "adopted externally edited session");
                true
            }
            None => {
                self.mark_dirty(now_ms);
                false
            }
        }
    }

    /// Remove both snapshots. Used when the session ends.
    pub fn clear(&mut self) {
        self.deadline_ms = None;
        self.last_written = None;
        self.external_edit = false;
        for (store, key) in [(&self.durable, &self.session_key), (&self.mirror, &self.mirror_key)] {
            if let Err(e) = store.remove(key) {
                warn!(error = %e, %key, "failed to remove session snapshot");
            }
        }
    }
}

/// Load the active session from the durable store.
///
/// A missing, unreadable or malformed snapshot means there is no active
/// session.
pub fn load_session(store: &dyn KeyValueStore, key: &str) -> Option<WorkoutSession> {
    let raw = match store.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(error = %e, %key, "failed to read session snapshot");
            return None;
        }
    };
    SessionSnapshot::decode(&raw).map(SessionSnapshot::into_session)
}
