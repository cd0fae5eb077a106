//! Frame-tick scheduling for the light rays effect.
//!
//! The animation loop is a chain of self-rescheduling ticks. Instead of
//! handing callbacks to the host, the session asks a [`TickScheduler`] for a
//! [`TickToken`] and the host later fires that token back into the session.
//! Two schedulers live here:
//!
//! - [`FrameScheduler`] paces ticks for a real event loop, optionally capped
//!   to a target frame rate.
//! - [`ManualScheduler`] fires ticks only when asked, so tests can drive the
//!   loop deterministically.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Identifies one scheduled tick. Tokens are never reused by a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TickToken(u64);

impl TickToken {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Requests and cancels single animation ticks.
pub trait TickScheduler {
    /// Schedules one tick and returns the token it will fire with.
    fn schedule_tick(&mut self) -> TickToken;

    /// Cancels a pending tick. Returns `false` when the token already fired
    /// or was cancelled before.
    fn cancel_tick(&mut self, token: TickToken) -> bool;
}

fn normalize_fps(value: Option<f32>) -> Option<f32> {
    value.and_then(|fps| {
        if fps.is_finite() && fps > 0.0 {
            Some(fps)
        } else {
            None
        }
    })
}

/// Scheduler for hosts with a real event loop.
///
/// Holds at most one pending tick: scheduling again replaces the previous
/// token. The tick is released through [`FrameScheduler::take_due`] once the
/// frame budget allows. Without an FPS cap a pending tick is due immediately.
#[derive(Debug)]
pub struct FrameScheduler {
    frame_interval: Option<Duration>,
    pending: Option<TickToken>,
    next_id: u64,
    last_fired: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(target_fps: Option<f32>) -> Self {
        let frame_interval =
            normalize_fps(target_fps).map(|fps| Duration::from_secs_f32(1.0 / fps));
        Self {
            frame_interval,
            pending: None,
            next_id: 1,
            last_fired: None,
        }
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        self.frame_interval
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Earliest instant at which a pending tick may fire.
    ///
    /// Returns `None` when nothing is pending, letting the event loop idle.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.pending.is_none() {
            return None;
        }
        match (self.frame_interval, self.last_fired) {
            (Some(interval), Some(last)) => Some(last + interval),
            _ => Some(Instant::now()),
        }
    }

    pub fn ready(&self, now: Instant) -> bool {
        if self.pending.is_none() {
            return false;
        }
        match (self.frame_interval, self.last_fired) {
            (Some(interval), Some(last)) => now >= last + interval,
            _ => true,
        }
    }

    /// Releases the pending tick if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<TickToken> {
        if !self.ready(now) {
            return None;
        }
        let token = self.pending.take()?;
        self.last_fired = Some(now);
        tracing::trace!(token = token.id(), "scheduler: tick due");
        Some(token)
    }

}

impl TickScheduler for FrameScheduler {
    fn schedule_tick(&mut self) -> TickToken {
        let token = TickToken(self.next_id);
        self.next_id += 1;
        if let Some(previous) = self.pending.replace(token) {
            tracing::trace!(previous = previous.id(), "scheduler: pending tick replaced");
        }
        token
    }

    fn cancel_tick(&mut self, token: TickToken) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

/// Deterministic scheduler: ticks fire only through [`ManualScheduler::fire`].
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: BTreeSet<TickToken>,
    next_id: u64,
    scheduled: usize,
    cancelled: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the oldest pending tick.
    pub fn fire(&mut self) -> Option<TickToken> {
        self.pending.pop_first()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, token: TickToken) -> bool {
        self.pending.contains(&token)
    }

    /// Total ticks ever scheduled.
    pub fn scheduled(&self) -> usize {
        self.scheduled
    }

    /// Total successful cancellations.
    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule_tick(&mut self) -> TickToken {
        let token = TickToken(self.next_id);
        self.next_id += 1;
        self.scheduled += 1;
        self.pending.insert(token);
        token
    }

    fn cancel_tick(&mut self, token: TickToken) -> bool {
        let removed = self.pending.remove(&token);
        if removed {
            self.cancelled += 1;
        }
        removed
    }
}
