//! Sliding-window abuse detectors.
//!
//! Detectors are evaluated lazily on each relevant packet. Callers pass the
//! current time in so tests can drive them with synthetic clocks.

use shared::PositionDelta;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const MOVEMENT_PACKET_LIMIT: usize = 200;
pub const MOVEMENT_INTERVAL: Duration = Duration::from_secs(5);
pub const BLOCK_PLACEMENT_LIMIT: usize = 47;
pub const BLOCK_INTERVAL: Duration = Duration::from_secs(6);
pub const CHAT_MESSAGE_LIMIT: usize = 3;
pub const CHAT_INTERVAL: Duration = Duration::from_secs(4);

/// Largest vertical gain per packet (16 for the stock client, 25 for WoM).
pub const MAX_JUMP_DELTA: i32 = 25;
/// Squared horizontal distance per packet, 32 units.
pub const MAX_DISTANCE_SQUARED: i64 = 1024;

/// Minimum gap between two speed-hack warnings to one player.
pub const NOTICE_INTERVAL: Duration = Duration::from_secs(1);

/// Fixed-capacity log of event timestamps.
///
/// When the log is full, the oldest entry is evicted. If that entry is
/// younger than the window interval, the new event is spam and is not logged.
#[derive(Debug, Clone)]
pub struct SpamWindow {
    log: VecDeque<Instant>,
    capacity: usize,
    interval: Duration,
}

impl SpamWindow {
    pub fn new(capacity: usize, interval: Duration) -> Self {
        Self {
            log: VecDeque::with_capacity(capacity),
            capacity,
            interval,
        }
    }

    pub fn movement() -> Self {
        Self::new(MOVEMENT_PACKET_LIMIT, MOVEMENT_INTERVAL)
    }

    pub fn blocks() -> Self {
        Self::new(BLOCK_PLACEMENT_LIMIT, BLOCK_INTERVAL)
    }

    pub fn chat() -> Self {
        Self::new(CHAT_MESSAGE_LIMIT, CHAT_INTERVAL)
    }

    /// Records an event at `now` and reports whether it exceeds the rate.
    pub fn is_spam(&mut self, now: Instant) -> bool {
        if self.log.len() >= self.capacity {
            if let Some(oldest) = self.log.pop_front() {
                if now.saturating_duration_since(oldest) < self.interval {
                    return true;
                }
            }
        }
        self.log.push_back(now);
        false
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

/// Outcome of the speed-hack distance check for one move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedCheck {
    /// Plausible move.
    Normal,
    /// First suspicious move in a row. Accept it but remember where the
    /// player came from.
    Tolerated,
    /// Second suspicious move in a row. Snap the player back.
    Rollback,
}

/// Two-strike distance guard.
#[derive(Debug, Default, Clone)]
pub struct SpeedHackGuard {
    strikes: u8,
}

impl SpeedHackGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_suspicious(delta: &PositionDelta) -> bool {
        delta.horizontal_distance_squared() > MAX_DISTANCE_SQUARED || delta.dy > MAX_JUMP_DELTA
    }

    pub fn check(&mut self, delta: &PositionDelta) -> SpeedCheck {
        if !Self::is_suspicious(delta) {
            self.strikes = 0;
            return SpeedCheck::Normal;
        }
        self.strikes += 1;
        if self.strikes >= 2 {
            self.strikes = 0;
            SpeedCheck::Rollback
        } else {
            SpeedCheck::Tolerated
        }
    }

    pub fn strikes(&self) -> u8 {
        self.strikes
    }
}

/// Lets a notice through at most once per interval.
#[derive(Debug, Clone)]
pub struct NoticeLimiter {
    last: Option<Instant>,
    interval: Duration,
}

impl NoticeLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            last: None,
            interval,
        }
    }

    pub fn allow(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

impl Default for NoticeLimiter {
    fn default() -> Self {
        Self::new(NOTICE_INTERVAL)
    }
}
