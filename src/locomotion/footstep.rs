//! Footstep detection from animated limb heights.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::ground::{GroundState, SurfaceCategory};

/// The four limb endpoints watched for footsteps, in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum Limb {
    HindLeft,
    HindRight,
    FrontLeft,
    FrontRight,
}

impl Limb {
    pub const ALL: [Limb; 4] = [
        Limb::HindLeft,
        Limb::HindRight,
        Limb::FrontLeft,
        Limb::FrontRight,
    ];

    pub fn index(self) -> usize {
        match self {
            Limb::HindLeft => 0,
            Limb::HindRight => 1,
            Limb::FrontLeft => 2,
            Limb::FrontRight => 3,
        }
    }

    pub fn is_hind(self) -> bool {
        matches!(self, Limb::HindLeft | Limb::HindRight)
    }
}

/// World-space positions of the limb endpoints, where known.
pub trait LimbSource {
    fn limb_position(&self, limb: Limb) -> Option<Vec3>;
}

/// Height above the body origin below which a limb counts as planted.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct FootstepTuning {
    pub hind_walk: f32,
    pub hind_run: f32,
    pub front_walk: f32,
    pub front_run: f32,
    /// Loudness carried by every footstep.
    pub weight: f32,
}

impl Default for FootstepTuning {
    fn default() -> Self {
        Self {
            hind_walk: 0.08,
            hind_run: 0.12,
            front_walk: 0.10,
            front_run: 0.14,
            weight: 1.0,
        }
    }
}

impl FootstepTuning {
    pub fn threshold(&self, limb: Limb, running: bool) -> f32 {
        match (limb.is_hind(), running) {
            (true, false) => self.hind_walk,
            (true, true) => self.hind_run,
            (false, false) => self.front_walk,
            (false, true) => self.front_run,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub struct FootContact {
    /// Set once a footstep fired for this limb; cleared when the limb lifts again.
    pub step_triggered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct FootstepEvent {
    pub position: Vec3,
    pub weight: f32,
    pub surface: Option<Entity>,
    pub category: Option<SurfaceCategory>,
    pub limb: Limb,
}

#[derive(Debug, Clone, Default, Reflect)]
pub struct FootstepTrigger {
    pub contacts: [FootContact; 4],
}

impl FootstepTrigger {
    /// Scan the limbs in order; at most one footstep fires per call.
    pub fn update(
        &mut self,
        limbs: &dyn LimbSource,
        body_origin_y: f32,
        running: bool,
        ground: &GroundState,
        tuning: &FootstepTuning,
    ) -> Option<FootstepEvent> {
        for limb in Limb::ALL {
            let Some(position) = limbs.limb_position(limb) else {
                continue;
            };
            let relative_height = position.y - body_origin_y;
            let contact = &mut self.contacts[limb.index()];

            if relative_height > tuning.threshold(limb, running) {
                contact.step_triggered = false;
            } else if !contact.step_triggered {
                contact.step_triggered = true;
                tracing::trace!(?limb, relative_height, "footstep");
                return Some(FootstepEvent {
                    position,
                    weight: tuning.weight,
                    surface: ground.closest_surface,
                    category: ground.surface_category,
                    limb,
                });
            }
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Limb heights set directly by the test.
    #[derive(Default)]
    pub(crate) struct StubLimbs(pub [Option<f32>; 4]);

    impl LimbSource for StubLimbs {
        fn limb_position(&self, limb: Limb) -> Option<Vec3> {
            self.0[limb.index()].map(|y| Vec3::new(0.0, y, 0.0))
        }
    }

    fn only_hind_left(y: f32) -> StubLimbs {
        StubLimbs([Some(y), None, None, None])
    }

    #[test]
    fn test_down_up_down_fires_twice() {
        let tuning = FootstepTuning::default();
        let mut trigger = FootstepTrigger::default();
        let trace = [0.3, 0.2, 0.05, 0.02, 0.01, 0.04, 0.2, 0.3, 0.06, 0.03];

        let fired = trace
            .iter()
            .filter_map(|&y| {
                trigger.update(&only_hind_left(y), 0.0, false, &GroundState::NONE, &tuning)
            })
            .count();
        assert_eq!(fired, 2);
    }

    #[test]
    fn test_one_footstep_per_tick() {
        let tuning = FootstepTuning::default();
        let mut trigger = FootstepTrigger::default();
        let planted = StubLimbs([Some(0.0); 4]);

        let first = trigger.update(&planted, 0.0, false, &GroundState::NONE, &tuning);
        assert_eq!(first.map(|e| e.limb), Some(Limb::HindLeft));
        let second = trigger.update(&planted, 0.0, false, &GroundState::NONE, &tuning);
        assert_eq!(second.map(|e| e.limb), Some(Limb::HindRight));
    }

    #[test]
    fn test_running_uses_run_threshold() {
        let tuning = FootstepTuning::default();
        let mut trigger = FootstepTrigger::default();
        // Between the walk and run thresholds for a hind limb.
        let limbs = only_hind_left(0.10);

        assert!(trigger
            .update(&limbs, 0.0, false, &GroundState::NONE, &tuning)
            .is_none());
        assert!(trigger
            .update(&limbs, 0.0, true, &GroundState::NONE, &tuning)
            .is_some());
    }

    #[test]
    fn test_height_is_relative_to_body_origin() {
        let tuning = FootstepTuning::default();
        let mut trigger = FootstepTrigger::default();
        let event = trigger.update(&only_hind_left(5.02), 5.0, false, &GroundState::NONE, &tuning);
        assert!(event.is_some());
    }

    #[test]
    fn test_thresholds_are_distinct_per_limb_and_gait() {
        let tuning = FootstepTuning::default();
        let values = [
            tuning.threshold(Limb::HindLeft, false),
            tuning.threshold(Limb::HindRight, true),
            tuning.threshold(Limb::FrontLeft, false),
            tuning.threshold(Limb::FrontRight, true),
        ];
        for (i, a) in values.iter().enumerate() {
            for b in &values[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
