//! Rest timer: a single cancelable countdown between sets.
//!
//! The countdown is anchored on an absolute end timestamp rather than a
//! tick counter, so the remaining time is correct after any gap in polling.
//! The end timestamp is also written to its own storage key, which is what
//! lets a fresh process pick the countdown back up. A second key keeps the
//! remembered duration and whether the countdown is paused, so pause and
//! cancel continue across processes too.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused | Expired) -> Idle
//!            ^          |
//!            +-- start -+
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::datetime_from_ms;
use crate::error::RestTimerError;
use crate::events::Event;
use crate::notify::{ExpiryAlert, NotificationId, NotificationPayload, NotificationScheduler};
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestStatus {
    Idle,
    Running,
    Paused,
    /// Reached zero; stays here until the next start or cancel.
    Expired,
}

/// Continuation state stored next to the end timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRest {
    target_secs: u64,
    paused: bool,
}

pub struct RestTimer {
    store: Arc<dyn KeyValueStore>,
    scheduler: Arc<dyn NotificationScheduler>,
    alert: Arc<dyn ExpiryAlert>,
    payload: NotificationPayload,
    end_key: String,
    state_key: String,
    status: RestStatus,
    /// Duration used by `start(None)`. Remembered across cancel.
    target_secs: u64,
    end_ms: Option<u64>,
    notification: Option<NotificationId>,
}

impl std::fmt::Debug for RestTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestTimer")
            .field("status", &self.status)
            .field("target_secs", &self.target_secs)
            .field("end_ms", &self.end_ms)
            .field("notification", &self.notification)
            .finish_non_exhaustive()
    }
}

impl RestTimer {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        scheduler: Arc<dyn NotificationScheduler>,
        alert: Arc<dyn ExpiryAlert>,
        payload: NotificationPayload,
        end_key: impl Into<String>,
        state_key: impl Into<String>,
        default_secs: u64,
    ) -> Self {
        Self {
            store,
            scheduler,
            alert,
            payload,
            end_key: end_key.into(),
            state_key: state_key.into(),
            status: RestStatus::Idle,
            target_secs: default_secs,
            end_ms: None,
            notification: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> RestStatus {
        self.status
    }

    pub fn target_secs(&self) -> u64 {
        self.target_secs
    }

    pub fn end_ms(&self) -> Option<u64> {
        self.end_ms
    }

    /// Whole seconds left, rounded up. Zero unless running or paused.
    pub fn remaining_secs(&self, now_ms: u64) -> u64 {
        match self.status {
            RestStatus::Running => self
                .end_ms
                .map(|end| ceil_secs(end.saturating_sub(now_ms)))
                .unwrap_or(0),
            RestStatus::Paused => self.target_secs,
            RestStatus::Idle | RestStatus::Expired => 0,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the countdown, using the remembered duration when `seconds` is `None`.
    ///
    /// # Errors
    ///
    /// Fails if a countdown is already running or the duration is zero.
    pub fn start(&mut self, seconds: Option<u64>, now_ms: u64) -> Result<Event, RestTimerError> {
        if self.status == RestStatus::Running {
            return Err(RestTimerError::AlreadyRunning {
                remaining_secs: self.remaining_secs(now_ms),
            });
        }
        let secs = seconds.unwrap_or(self.target_secs);
        if secs == 0 {
            return Err(RestTimerError::ZeroDuration);
        }

        let end_ms = now_ms.saturating_add(secs.saturating_mul(1000));
        self.target_secs = secs;
        self.end_ms = Some(end_ms);
        self.status = RestStatus::Running;

        if let Err(e) = self.store.set(&self.end_key, &end_ms.to_string()) {
            warn!(error = %e, key = %self.end_key, "failed to persist rest timer end");
        }
        self.save_state();

        if let Some(stale) = self.notification.take() {
            self.scheduler.cancel(&stale);
        }
        self.notification = match self.scheduler.schedule_once(secs, &self.payload) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "rest notification not scheduled, countdown continues");
                None
            }
        };

        info!(secs, end_ms, "rest timer started");
        Ok(Event::RestStarted {
            duration_secs: secs,
            end_ms,
            notification_scheduled: self.notification.is_some(),
            at: datetime_from_ms(now_ms),
        })
    }

    /// Foreground recomputation. Expires the countdown once it reaches zero,
    /// firing the in-app alert only when `foreground` is true.
    pub fn poll(&mut self, now_ms: u64, foreground: bool) -> Option<Event> {
        if self.status != RestStatus::Running {
            return None;
        }
        let end_ms = self.end_ms?;
        if now_ms < end_ms {
            return None;
        }
        Some(self.expire(now_ms, foreground))
    }

    /// Stop the countdown, keeping what was left as the next duration.
    pub fn pause(&mut self, now_ms: u64) -> Option<Event> {
        if self.status != RestStatus::Running {
            return None;
        }
        let remaining = self.remaining_secs(now_ms).max(1);
        self.target_secs = remaining;
        self.clear_end();
        self.cancel_notification();
        self.status = RestStatus::Paused;
        self.save_state();
        debug!(remaining, "rest timer paused");
        Some(Event::RestPaused {
            remaining_secs: remaining,
            at: datetime_from_ms(now_ms),
        })
    }

    /// Abandon the countdown. The remembered duration is kept.
    pub fn cancel(&mut self, now_ms: u64) -> Option<Event> {
        let was_active = matches!(self.status, RestStatus::Running | RestStatus::Paused);
        self.clear_end();
        self.cancel_notification();
        self.status = RestStatus::Idle;
        if was_active {
            self.save_state();
        }
        was_active.then(|| {
            debug!("rest timer canceled");
            Event::RestCanceled {
                at: datetime_from_ms(now_ms),
            }
        })
    }

    /// Re-read the stored end timestamp on a foreground transition or at
    /// process start.
    ///
    /// A future end resumes the countdown. A past end is cleared without the
    /// in-app alert: the scheduled notification already covered it. When this
    /// instance was running, that is reported as a silent expiry; a fresh
    /// instance just stays idle.
    ///
    /// The remembered duration and a paused countdown are restored from the
    /// state key first.
    pub fn recover(&mut self, now_ms: u64) -> Option<Event> {
        if let Some(state) = self.load_state() {
            self.target_secs = state.target_secs;
            if state.paused && self.status == RestStatus::Idle {
                self.status = RestStatus::Paused;
                debug!(remaining = state.target_secs, "paused rest timer restored");
            }
        }

        let stored = match self.store.get(&self.end_key) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, key = %self.end_key, "failed to read rest timer end");
                None
            }
        };
        let stored_end = stored.and_then(|raw| match raw.trim().parse::<u64>() {
            Ok(end) => Some(end),
            Err(_) => {
                warn!(value = %raw, "discarding malformed rest timer end");
                let _ = self.store.remove(&self.end_key);
                None
            }
        });

        // Fall back to the in-memory end if the stored one was lost.
        let end_ms = stored_end.or(if self.status == RestStatus::Running {
            self.end_ms
        } else {
            None
        })?;

        if end_ms > now_ms {
            self.end_ms = Some(end_ms);
            self.status = RestStatus::Running;
            let remaining = ceil_secs(end_ms - now_ms);
            debug!(remaining, "rest timer resumed from stored end");
            return Some(Event::RestResumed {
                remaining_secs: remaining,
                at: datetime_from_ms(now_ms),
            });
        }

        if self.status == RestStatus::Running {
            Some(self.expire(now_ms, false))
        } else {
            debug!(end_ms, "stale rest timer end cleared");
            self.clear_end();
            None
        }
    }

    fn expire(&mut self, now_ms: u64, foreground: bool) -> Event {
        self.clear_end();
        // The notification has fired or is about to; leave it alone.
        self.notification = None;
        self.status = RestStatus::Expired;
        self.save_state();
        if foreground {
            self.alert.rest_finished();
        }
        info!(alerted = foreground, "rest timer expired");
        Event::RestExpired {
            alerted: foreground,
            at: datetime_from_ms(now_ms),
        }
    }

    fn clear_end(&mut self) {
        self.end_ms = None;
        if let Err(e) = self.store.remove(&self.end_key) {
            warn!(error = %e, key = %self.end_key, "failed to clear rest timer end");
        }
    }

    fn save_state(&self) {
        let state = StoredRest {
            target_secs: self.target_secs,
            paused: self.status == RestStatus::Paused,
        };
        let result = serde_json::to_string(&state)
            .map_err(|e| e.to_string())
            .and_then(|raw| self.store.set(&self.state_key, &raw).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!(error = %e, key = %self.state_key, "failed to persist rest timer state");
        }
    }

    fn load_state(&self) -> Option<StoredRest> {
        let raw = match self.store.get(&self.state_key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, key = %self.state_key, "failed to read rest timer state");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(error = %e, value = %raw, "discarding malformed rest timer state");
                None
            }
        }
    }

    fn cancel_notification(&mut self) {
        if let Some(id) = self.notification.take() {
            self.scheduler.cancel(&id);
        }
    }
}

fn ceil_secs(ms: u64) -> u64 {
    ms.div_ceil(1000)
}
