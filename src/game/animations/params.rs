use bevy::prelude::*;

use crate::locomotion::{AnimParam, AnimationSink};

/// Parameter block written by the locomotion core and read by the graph driver.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct AnimationParams {
    pub forward_blend: f32,
    pub speed_blend: f32,
    pub falling: bool,
    /// Set by the jump trigger until the driver restarts the airborne clip.
    pub jump_pending: bool,
}

impl AnimationParams {
    pub fn take_jump(&mut self) -> bool {
        std::mem::take(&mut self.jump_pending)
    }
}

impl AnimationSink for AnimationParams {
    fn set_float(&mut self, param: AnimParam, value: f32) {
        match param {
            AnimParam::ForwardBlend => self.forward_blend = value,
            AnimParam::SpeedBlend => self.speed_blend = value,
            AnimParam::Falling | AnimParam::Jump => {
                warn_once!("{param:?} is not a float parameter");
            }
        }
    }

    fn set_bool(&mut self, param: AnimParam, value: bool) {
        match param {
            AnimParam::Falling => self.falling = value,
            _ => {
                warn_once!("{param:?} is not a bool parameter");
            }
        }
    }

    fn set_trigger(&mut self, param: AnimParam) {
        match param {
            AnimParam::Jump => self.jump_pending = true,
            _ => {
                warn_once!("{param:?} is not a trigger");
            }
        }
    }
}

/// Node weights for the idle/walk/run/fall clips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWeights {
    pub idle: f32,
    pub walk: f32,
    pub run: f32,
    pub fall: f32,
}

impl From<&AnimationParams> for ClipWeights {
    fn from(params: &AnimationParams) -> Self {
        if params.falling {
            return Self {
                idle: 0.0,
                walk: 0.0,
                run: 0.0,
                fall: 1.0,
            };
        }
        let moving = params.forward_blend.clamp(0.0, 1.0);
        let running = params.speed_blend.clamp(0.0, 1.0);
        Self {
            idle: 1.0 - moving,
            walk: moving * (1.0 - running),
            run: moving * running,
            fall: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_routes_parameters() {
        let mut params = AnimationParams::default();
        params.set_float(AnimParam::ForwardBlend, 0.4);
        params.set_float(AnimParam::SpeedBlend, 0.2);
        params.set_bool(AnimParam::Falling, true);
        params.set_trigger(AnimParam::Jump);

        assert_eq!(params.forward_blend, 0.4);
        assert_eq!(params.speed_blend, 0.2);
        assert!(params.falling);
        assert!(params.take_jump());
        assert!(!params.take_jump());
    }

    #[test]
    fn test_weights_sum_to_one() {
        for (forward, speed) in [(0.0, 0.0), (0.3, 0.0), (1.0, 0.5), (0.7, 1.0)] {
            let weights = ClipWeights::from(&AnimationParams {
                forward_blend: forward,
                speed_blend: speed,
                ..default()
            });
            let total = weights.idle + weights.walk + weights.run + weights.fall;
            assert!((total - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_falling_overrides_ground_blend() {
        let weights = ClipWeights::from(&AnimationParams {
            forward_blend: 1.0,
            speed_blend: 1.0,
            falling: true,
            ..default()
        });
        assert_eq!(weights.fall, 1.0);
        assert_eq!(weights.run, 0.0);
    }
}
