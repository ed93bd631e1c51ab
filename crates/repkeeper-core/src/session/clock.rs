//! Session clock: elapsed workout time with pause/resume.

use super::WorkoutSession;

impl WorkoutSession {
    pub fn is_paused(&self) -> bool {
        self.pause_started_at_ms.is_some()
    }

    pub fn pause_started_at_ms(&self) -> Option<u64> {
        self.pause_started_at_ms
    }

    pub fn paused_accumulated_secs(&self) -> u64 {
        self.paused_accumulated_secs
    }

    /// Freeze the session clock. Returns false if already paused.
    pub fn pause_clock(&mut self, now_ms: u64) -> bool {
        if self.is_paused() {
            return false;
        }
        self.pause_started_at_ms = Some(now_ms);
        true
    }

    /// Unfreeze the session clock, folding the pause into the accumulated
    /// paused seconds. Returns false if not paused.
    pub fn resume_clock(&mut self, now_ms: u64) -> bool {
        match self.pause_started_at_ms.take() {
            Some(started) => {
                let paused_secs = now_ms.saturating_sub(started) / 1000;
                self.paused_accumulated_secs = self.paused_accumulated_secs.saturating_add(paused_secs);
                true
            }
            None => false,
        }
    }

    /// Seconds of active (unpaused) workout time. Never negative.
    pub fn elapsed_secs(&self, now_ms: u64) -> u64 {
        let reference = self.pause_started_at_ms.unwrap_or(now_ms);
        let wall_secs = reference.saturating_sub(self.start_time_ms) / 1000;
        wall_secs.saturating_sub(self.paused_accumulated_secs)
    }
}
