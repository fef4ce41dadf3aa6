//! Variable-height jump: a single impulse plus a reduced-gravity window while the key is held.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpTuning {
    /// Upward impulse applied once at jump start.
    pub jump_force: f32,
    /// Hard cap on the held-jump window (seconds).
    pub max_jump_time: f32,
    /// Custom gravity integrated by the controller (negative is down).
    pub gravity: f32,
    /// Held-jump knob: 0 keeps `gravity`, larger values approach the engine gravity.
    pub jump_gravity: f32,
    /// Touching ground earlier than this after takeoff does not end the jump.
    pub landing_grace: f32,
    /// A press this long before touching down still jumps on landing (seconds).
    pub buffer_time: f32,
    /// A press this long after walking off an edge still jumps (seconds).
    pub coyote_time: f32,
}

impl Default for JumpTuning {
    fn default() -> Self {
        Self {
            jump_force: 8.0,
            max_jump_time: 1.0,
            gravity: -20.0,
            jump_gravity: 1.5,
            landing_grace: 0.01,
            buffer_time: 0.1,
            coyote_time: 0.15,
        }
    }
}

/// Gravity to integrate while the jump key is held.
///
/// Hyperbolic blend from `gravity` (at `jump_gravity == 0`) towards `ambient` as `jump_gravity`
/// grows. Negative knobs are treated as 0.
pub fn held_jump_gravity(gravity: f32, jump_gravity: f32, ambient: f32) -> f32 {
    let knob = jump_gravity.max(0.0);
    ambient + (gravity - ambient) / (1.0 + knob)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum JumpEndReason {
    Released,
    Landed,
    TimedOut,
}

/// Whether an event stamped at `at` is still inside `window` at `now`.
pub fn within_window(at: Option<f32>, now: f32, window: f32) -> bool {
    at.is_some_and(|at| now - at <= window)
}

/// Lives from takeoff until one of the [`JumpEndReason`]s fires.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct JumpSession {
    pub start_time: f32,
    pub held: bool,
    pub applied_impulse: bool,
}

impl JumpSession {
    pub fn start(now: f32) -> Self {
        Self {
            start_time: now,
            held: true,
            applied_impulse: false,
        }
    }

    pub fn elapsed(&self, now: f32) -> f32 {
        now - self.start_time
    }

    /// First terminating condition that holds at `now`, if any.
    pub fn check_end(
        &self,
        now: f32,
        jump_held: bool,
        grounded: bool,
        tuning: &JumpTuning,
    ) -> Option<JumpEndReason> {
        let elapsed = self.elapsed(now);
        if !jump_held {
            Some(JumpEndReason::Released)
        } else if grounded && elapsed > tuning.landing_grace {
            Some(JumpEndReason::Landed)
        } else if elapsed >= tuning.max_jump_time {
            Some(JumpEndReason::TimedOut)
        } else {
            None
        }
    }
}
