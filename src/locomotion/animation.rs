//! Maps locomotion flags onto smoothed animation blend parameters.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Below this magnitude a channel heading to zero snaps there.
const SNAP_EPSILON: f32 = 1.0e-3;

/// Named parameters understood by the animation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum AnimParam {
    /// 0 idle, 1 moving or turning in place.
    ForwardBlend,
    /// 0 walk, 1 run.
    SpeedBlend,
    Falling,
    /// One-shot fired at takeoff.
    Jump,
}

/// Receives parameters published by the bridge.
pub trait AnimationSink {
    fn set_float(&mut self, param: AnimParam, value: f32);
    fn set_bool(&mut self, param: AnimParam, value: bool);
    fn set_trigger(&mut self, param: AnimParam);
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTuning {
    /// Smoothing time for the blend channels (seconds).
    pub damp_time: f32,
}

impl Default for AnimationTuning {
    fn default() -> Self {
        Self { damp_time: 0.07 }
    }
}

/// Critically damped approach of `current` towards `target`.
///
/// `velocity` carries the channel's rate of change between calls.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    let smooth_time = smooth_time.max(1.0e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * exp;
    let mut output = target + (change + temp) * exp;

    // Never overshoot the target.
    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = 0.0;
    }
    output
}

/// One smoothed scalar with its own velocity state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub struct BlendChannel {
    pub value: f32,
    velocity: f32,
}

impl BlendChannel {
    pub fn approach(&mut self, target: f32, damp_time: f32, dt: f32) -> f32 {
        if target == 0.0 && self.value.abs() < SNAP_EPSILON {
            self.value = 0.0;
            self.velocity = 0.0;
        } else {
            self.value = smooth_damp(self.value, target, &mut self.velocity, damp_time, dt);
        }
        self.value
    }
}

/// Smoothed view of the locomotion state as published to the animator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub struct AnimationBlend {
    pub forward_blend: f32,
    pub speed_blend: f32,
    pub falling: bool,
}

/// Flags the bridge derives its targets from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlendInputs {
    pub moving: bool,
    pub turning: bool,
    pub running: bool,
    pub grounded: bool,
}

#[derive(Debug, Clone, Default, Reflect)]
pub struct AnimationBridge {
    forward: BlendChannel,
    speed: BlendChannel,
    falling: bool,
}

impl AnimationBridge {
    pub fn update(&mut self, inputs: BlendInputs, tuning: &AnimationTuning, dt: f32) -> AnimationBlend {
        let airborne = !inputs.grounded;
        let (forward_target, speed_target) = if airborne {
            (0.0, 0.0)
        } else {
            (
                if inputs.moving || inputs.turning { 1.0 } else { 0.0 },
                if inputs.running { 1.0 } else { 0.0 },
            )
        };

        self.forward.approach(forward_target, tuning.damp_time, dt);
        self.speed.approach(speed_target, tuning.damp_time, dt);
        self.falling = airborne;
        self.blend()
    }

    pub fn blend(&self) -> AnimationBlend {
        AnimationBlend {
            forward_blend: self.forward.value.clamp(0.0, 1.0),
            speed_blend: self.speed.value.clamp(0.0, 1.0),
            falling: self.falling,
        }
    }

    pub fn publish(&self, sink: &mut dyn AnimationSink) {
        let blend = self.blend();
        sink.set_float(AnimParam::ForwardBlend, blend.forward_blend);
        sink.set_float(AnimParam::SpeedBlend, blend.speed_blend);
        sink.set_bool(AnimParam::Falling, blend.falling);
    }
}
