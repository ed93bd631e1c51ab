//! Coalescing of rapid "move exercise up/down" taps.
//!
//! Taps on the same exercise in the same direction accumulate into one
//! pending move. When the debounce window passes without another tap, the
//! pending move resolves to a single `(from, to)` relocation: the net
//! displacement of the originally selected exercise, clamped to the list.
//!
//! ```text
//! request_move(3, Up) x5  ──300ms quiet──▶  poll() == Some(3 → 0)
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

impl std::str::FromStr for MoveDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(MoveDirection::Up),
            "down" => Ok(MoveDirection::Down),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

/// Accumulated move request for one exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMove {
    pub index: usize,
    pub direction: MoveDirection,
    pub count: usize,
}

impl PendingMove {
    /// Target position for a list of `len` exercises.
    pub fn target(&self, len: usize) -> usize {
        let last = len.saturating_sub(1);
        match self.direction {
            MoveDirection::Up => self.index.saturating_sub(self.count),
            MoveDirection::Down => self.index.saturating_add(self.count).min(last),
        }
    }
}

/// Debounces move requests into at most one relocation per quiet period.
#[derive(Debug, Clone)]
pub struct ReorderCoalescer {
    window_ms: u64,
    pending: Option<PendingMove>,
    deadline_ms: Option<u64>,
}

impl ReorderCoalescer {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            pending: None,
            deadline_ms: None,
        }
    }

    pub fn pending(&self) -> Option<PendingMove> {
        self.pending
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Record a tap. A tap that does not match the pending move replaces it;
    /// the old one is dropped without being applied.
    pub fn request_move(&mut self, index: usize, direction: MoveDirection, now_ms: u64) -> PendingMove {
        let pending = match self.pending {
            Some(p) if p.index == index && p.direction == direction => PendingMove {
                count: p.count + 1,
                ..p
            },
            _ => PendingMove {
                index,
                direction,
                count: 1,
            },
        };
        self.pending = Some(pending);
        self.deadline_ms = Some(now_ms.saturating_add(self.window_ms));
        pending
    }

    /// Resolve the pending move once the window has elapsed.
    ///
    /// Returns `(from, to)` for a list of `len` exercises, or `None` if nothing
    /// is due. A due move whose target equals its source is consumed and
    /// yields `None`.
    pub fn poll(&mut self, now_ms: u64, len: usize) -> Option<(usize, usize)> {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => self.take(len),
            _ => None,
        }
    }

    /// Resolve the pending move immediately, regardless of the window.
    pub fn take(&mut self, len: usize) -> Option<(usize, usize)> {
        self.deadline_ms = None;
        let pending = self.pending.take()?;
        if pending.index >= len {
            return None;
        }
        let to = pending.target(len);
        (to != pending.index).then_some((pending.index, to))
    }

    /// Drop the pending move without applying it.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.deadline_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_taps_accumulate() {
        let mut coalescer = ReorderCoalescer::new(300);
        for i in 0..5 {
            coalescer.request_move(6, MoveDirection::Up, i * 100);
        }
        assert_eq!(coalescer.pending().map(|p| p.count), Some(5));
        assert_eq!(coalescer.poll(600, 8), None, "window restarted by last tap");
        assert_eq!(coalescer.poll(700, 8), Some((6, 1)));
        assert_eq!(coalescer.pending(), None);
    }

    #[test]
    fn target_clamps_at_both_ends() {
        let up = PendingMove {
            index: 2,
            direction: MoveDirection::Up,
            count: 9,
        };
        let down = PendingMove {
            index: 2,
            direction: MoveDirection::Down,
            count: 9,
        };
        assert_eq!(up.target(4), 0);
        assert_eq!(down.target(4), 3);
    }

    #[test]
    fn different_request_replaces_pending() {
        let mut coalescer = ReorderCoalescer::new(300);
        coalescer.request_move(4, MoveDirection::Up, 0);
        coalescer.request_move(4, MoveDirection::Up, 50);
        let replaced = coalescer.request_move(1, MoveDirection::Down, 100);
        assert_eq!(replaced.count, 1);
        assert_eq!(coalescer.poll(400, 6), Some((1, 2)));
    }

    #[test]
    fn boundary_move_resolves_to_nothing() {
        let mut coalescer = ReorderCoalescer::new(300);
        coalescer.request_move(0, MoveDirection::Up, 0);
        assert_eq!(coalescer.poll(300, 3), None);
        assert_eq!(coalescer.pending(), None);
    }

    #[test]
    fn stale_index_is_dropped() {
        let mut coalescer = ReorderCoalescer::new(300);
        coalescer.request_move(5, MoveDirection::Up, 0);
        assert_eq!(coalescer.take(3), None);
    }
}
