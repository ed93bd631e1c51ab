//! Notification and alert collaborators.
//!
//! The host platform owns delivery. The engine only asks for a fire-once
//! notification when the rest timer starts and, when the app is in the
//! foreground at expiry, for an immediate in-app alert.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CoreError, Result};

/// Identifier returned by the scheduler for later cancellation.
pub type NotificationId = String;

/// Fixed payload carried by the rest-timer notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub kind: String,
    pub title: String,
    pub body: String,
}

impl NotificationPayload {
    pub fn rest_finished(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: "rest_timer_finished".into(),
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Schedules fire-once local notifications. Delivery is fire-and-forget.
pub trait NotificationScheduler: Send + Sync {
    fn schedule_once(&self, delay_secs: u64, payload: &NotificationPayload) -> Result<NotificationId>;

    /// Best-effort cancellation of a pending notification.
    fn cancel(&self, id: &NotificationId);
}

/// In-app expiry side effect (sound, vibration, banner).
pub trait ExpiryAlert: Send + Sync {
    fn rest_finished(&self);
}

/// A notification recorded by [`RecordingScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledNotification {
    pub id: NotificationId,
    pub delay_secs: u64,
    pub payload: NotificationPayload,
    pub canceled: bool,
}

/// In-memory scheduler that records every request.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<ScheduledNotification>>,
    next_id: AtomicU64,
    deny: AtomicBool,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate missing notification permission.
    pub fn set_denied(&self, denied: bool) {
        self.deny.store(denied, Ordering::SeqCst);
    }

    pub fn scheduled(&self) -> Vec<ScheduledNotification> {
        self.scheduled
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn pending(&self) -> Vec<ScheduledNotification> {
        self.scheduled().into_iter().filter(|n| !n.canceled).collect()
    }
}

impl NotificationScheduler for RecordingScheduler {
    fn schedule_once(&self, delay_secs: u64, payload: &NotificationPayload) -> Result<NotificationId> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(CoreError::Notification("permission denied".into()));
        }
        let id = format!("notif-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut scheduled = self
            .scheduled
            .lock()
            .map_err(|_| CoreError::Notification("scheduler poisoned".into()))?;
        scheduled.push(ScheduledNotification {
            id: id.clone(),
            delay_secs,
            payload: payload.clone(),
            canceled: false,
        });
        Ok(id)
    }

    fn cancel(&self, id: &NotificationId) {
        if let Ok(mut scheduled) = self.scheduled.lock() {
            if let Some(n) = scheduled.iter_mut().find(|n| &n.id == id) {
                n.canceled = true;
            }
        }
    }
}

/// Scheduler for headless hosts: logs the request and hands back an id.
#[derive(Debug, Default)]
pub struct LogScheduler {
    next_id: AtomicU64,
}

impl NotificationScheduler for LogScheduler {
    fn schedule_once(&self, delay_secs: u64, payload: &NotificationPayload) -> Result<NotificationId> {
        let id = format!("log-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        info!(%id, delay_secs, title = %payload.title, "notification scheduled");
        Ok(id)
    }

    fn cancel(&self, id: &NotificationId) {
        info!(%id, "notification canceled");
    }
}

/// Alert that counts how many times it fired.
#[derive(Debug, Default)]
pub struct CountingAlert {
    fired: AtomicUsize,
}

impl CountingAlert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl ExpiryAlert for CountingAlert {
    fn rest_finished(&self) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}

/// Alert for headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlert;

impl ExpiryAlert for LogAlert {
    fn rest_finished(&self) {
        info!("rest finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_scheduler_tracks_cancellation() {
        let scheduler = RecordingScheduler::new();
        let payload = NotificationPayload::rest_finished("Rest over", "Next set");
        let id = scheduler.schedule_once(90, &payload).unwrap();
        assert_eq!(scheduler.pending().len(), 1);
        scheduler.cancel(&id);
        assert!(scheduler.pending().is_empty());
        assert_eq!(scheduler.scheduled()[0].delay_secs, 90);
    }

    #[test]
    fn denied_scheduler_errors() {
        let scheduler = RecordingScheduler::new();
        scheduler.set_denied(true);
        let payload = NotificationPayload::rest_finished("t", "b");
        assert!(scheduler.schedule_once(10, &payload).is_err());
    }
}
