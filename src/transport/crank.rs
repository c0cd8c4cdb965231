//! Crank input and momentum
//!
//! Rotation arrives as absolute angles, drag deltas or discrete key steps.
//! Every 15 degrees of travel becomes one step. Forward steps wind up
//! momentum that keeps the playhead coasting after the hand lets go; the
//! momentum bleeds away on a fixed decay tick. A [`CrankLock`] can ratchet
//! the crank so it only turns one way.

use crate::config::{CrankConfig, CrankLock};

/// Which way a step turned the crank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrankState {
    Idle,
    /// Being turned
    Winding,
    /// Let go with momentum left
    Coasting,
}

#[derive(Debug, Clone)]
pub struct Crank {
    config: CrankConfig,
    lock: CrankLock,
    state: CrankState,
    momentum: f64,
    /// Visual angle in degrees
    rotation: f64,
    /// Angle at the last registered step
    reference: f64,
    last_step_ms: Option<u64>,
    /// Drag travel not yet turned into rotation
    drag_pending: f64,
}

impl Crank {
    pub fn new(config: &CrankConfig) -> Self {
        Self {
            config: config.clone(),
            lock: config.lock,
            state: CrankState::Idle,
            momentum: 0.0,
            rotation: 0.0,
            reference: 0.0,
            last_step_ms: None,
            drag_pending: 0.0,
        }
    }

    pub fn state(&self) -> CrankState {
        self.state
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    /// Angle to draw the crank at
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn lock(&self) -> CrankLock {
        self.lock
    }

    pub fn set_lock(&mut self, lock: CrankLock) {
        self.lock = lock;
    }

    fn allows(&self, direction: Direction) -> bool {
        !matches!(
            (self.lock, direction),
            (CrankLock::Forward, Direction::Backward) | (CrankLock::Rewind, Direction::Forward)
        )
    }

    fn debounced(&self, now_ms: u64) -> bool {
        self.last_step_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.config.debounce_ms)
    }

    /// Turn the crank to an absolute angle
    ///
    /// Returns the step taken, if the angle moved far enough from the last
    /// step, the debounce window has passed and the lock allows the
    /// direction. A locked-out turn slips without stepping.
    pub fn rotate_to(&mut self, angle: f64, now_ms: u64) -> Option<Direction> {
        if !angle.is_finite() {
            return None;
        }
        self.rotation = angle;
        if self.debounced(now_ms) {
            return None;
        }

        let travel = angle - self.reference;
        if travel.abs() < self.config.threshold_deg {
            return None;
        }
        let direction = if travel > 0.0 {
            Direction::Forward
        } else {
            Direction::Backward
        };
        self.reference = angle;
        if !self.allows(direction) {
            return None;
        }
        self.register_step(direction, now_ms);
        Some(direction)
    }

    /// Pointer drag of `pixels` (positive turns forward)
    ///
    /// Small movements accumulate until they clear the deadzone.
    pub fn drag(&mut self, pixels: f64, now_ms: u64) -> Option<Direction> {
        if !pixels.is_finite() {
            return None;
        }
        self.drag_pending += pixels;
        if self.drag_pending.abs() <= self.config.drag_deadzone {
            return None;
        }
        let angle = self.rotation + self.drag_pending * self.config.drag_gain;
        self.drag_pending = 0.0;
        self.rotate_to(angle, now_ms)
    }

    /// One discrete step, as from an arrow key
    pub fn key_step(&mut self, direction: Direction, now_ms: u64) -> Option<Direction> {
        if self.debounced(now_ms) || !self.allows(direction) {
            return None;
        }
        self.rotation += direction.sign() * self.config.threshold_deg;
        self.reference = self.rotation;
        self.register_step(direction, now_ms);
        Some(direction)
    }

    fn register_step(&mut self, direction: Direction, now_ms: u64) {
        self.momentum = match direction {
            Direction::Forward => (self.momentum + self.config.deposit).min(self.config.cap),
            Direction::Backward => (self.momentum - self.config.reverse_drain).max(0.0),
        };
        self.last_step_ms = Some(now_ms);
        self.state = CrankState::Winding;
    }

    /// The hand let go
    pub fn release(&mut self) {
        self.drag_pending = 0.0;
        if self.state == CrankState::Winding {
            self.state = self.coast_or_idle();
        }
    }

    fn coast_or_idle(&self) -> CrankState {
        if self.momentum > 0.0 {
            CrankState::Coasting
        } else {
            CrankState::Idle
        }
    }

    /// Let winding lapse into coasting once steps stop arriving
    pub fn update(&mut self, now_ms: u64) {
        if self.state != CrankState::Winding {
            return;
        }
        let idle = self
            .last_step_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.config.winding_idle_ms);
        if idle {
            self.state = self.coast_or_idle();
        }
    }

    /// One momentum decay tick
    pub fn decay(&mut self) {
        if self.momentum <= 0.0 {
            if self.state == CrankState::Coasting {
                self.state = CrankState::Idle;
            }
            return;
        }
        self.momentum = (self.momentum - self.config.decay_step).max(0.0);
        if self.momentum == 0.0 {
            self.state = CrankState::Idle;
        }
    }

    /// Beats to move on one coasting tick, if coasting
    ///
    /// Coasting yields to automatic playback.
    pub fn coast_delta(&self, playing: bool) -> Option<f64> {
        if playing || self.state != CrankState::Coasting || self.momentum <= 0.0 {
            return None;
        }
        Some(self.momentum * self.config.coast_gain / self.config.coast_hz)
    }

    /// Stop dead
    pub fn halt(&mut self) {
        self.momentum = 0.0;
        self.state = CrankState::Idle;
        self.drag_pending = 0.0;
    }
}
