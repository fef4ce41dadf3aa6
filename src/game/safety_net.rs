//! Remembers the last safe place the player stood and returns them there on request.

use avian3d::prelude::*;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    game::{
        CharacterTickSet,
        physics::SurfaceProbe,
        player::{CharacterInput, FeetOffset},
    },
    locomotion::{GroundProbe, GroundState, SurfaceMask, sense_with_mask},
};

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyNetTuning {
    /// Seconds of standing on safe ground between saves.
    pub save_interval: f32,
    /// Saves closer than this to the previous one are skipped.
    pub min_move: f32,
    /// `max_slope_deg` is the steepest surface that still counts as landing on top.
    pub probe: GroundProbe,
}

impl Default for SafetyNetTuning {
    fn default() -> Self {
        Self {
            save_interval: 0.5,
            min_move: 0.1,
            probe: GroundProbe {
                max_slope_deg: 60.0,
                ray_depth: 1.5,
                origin_offset: 0.5,
            },
        }
    }
}

#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct SafetyNet {
    pub tuning: SafetyNetTuning,
    timer: f32,
    last_safe_position: Vec3,
    standing_on: Option<Entity>,
}

impl SafetyNet {
    pub fn new(start: Vec3, tuning: SafetyNetTuning) -> Self {
        Self {
            tuning,
            timer: 0.0,
            last_safe_position: start,
            standing_on: None,
        }
    }

    pub fn last_safe_position(&self) -> Vec3 {
        self.last_safe_position
    }

    /// Feed one tick of footing. Returns `true` when a new safe position was recorded.
    ///
    /// `footing` must come from a probe that reports the first classified surface below, so a
    /// hazard lying on a floor hides the floor.
    pub fn observe(&mut self, position: Vec3, footing: &GroundState, dt: f32) -> bool {
        let safe_surface = footing
            .closest_surface
            .filter(|_| footing.surface_category.is_some_and(|c| SurfaceMask::SAFE.contains(c)));
        let Some(surface) = safe_surface else {
            self.timer = 0.0;
            self.standing_on = None;
            return false;
        };

        let landed_on_top = footing.is_jumpable && self.standing_on != Some(surface);
        self.standing_on = Some(surface);
        if landed_on_top && self.save(position) {
            return true;
        }

        self.timer += dt;
        if self.timer >= self.tuning.save_interval {
            self.timer = 0.0;
            return self.save(position);
        }
        false
    }

    fn save(&mut self, position: Vec3) -> bool {
        if position.distance(self.last_safe_position) <= self.tuning.min_move {
            return false;
        }
        self.last_safe_position = position;
        true
    }
}

fn track_safe_position(
    time: Res<Time>,
    surface_probe: SurfaceProbe,
    mut characters: Query<(
        Entity,
        &mut SafetyNet,
        &mut Transform,
        &FeetOffset,
        Option<&mut CharacterInput>,
        Option<(&mut LinearVelocity, &mut AngularVelocity)>,
    )>,
) {
    for (entity, mut net, mut transform, feet_offset, input, body) in &mut characters {
        let caster = surface_probe.caster(entity);
        let feet = transform.translation - Vec3::Y * feet_offset.0;
        let probe = net.tuning.probe;
        let footing = sense_with_mask(&caster, feet, &probe, SurfaceMask::ALL);
        if net.observe(transform.translation, &footing, time.delta_secs()) {
            debug!("Saved safe position {}", transform.translation);
        }

        let recover = input.is_some_and(|mut input| input.take_recover());
        if !recover {
            continue;
        }
        transform.translation = net.last_safe_position();
        if let Some((mut velocity, mut angular_velocity)) = body {
            velocity.0 = Vec3::ZERO;
            angular_velocity.0 = Vec3::ZERO;
        }
        info!("Returned to last safe point");
    }
}

pub(super) fn plugin(app: &mut App) {
    app.register_type::<SafetyNet>();
    app.add_systems(
        FixedUpdate,
        track_safe_position.in_set(CharacterTickSet::React),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locomotion::SurfaceCategory;

    const DT: f32 = 0.125;

    fn footing(surface: Entity, category: SurfaceCategory) -> GroundState {
        GroundState {
            distance_to_ground: 0.0,
            closest_surface: Some(surface),
            surface_category: Some(category),
            is_jumpable: true,
        }
    }

    fn ids() -> (Entity, Entity) {
        let mut world = World::new();
        (world.spawn_empty().id(), world.spawn_empty().id())
    }

    #[test]
    fn test_saves_after_interval_on_ground() {
        let (floor, _) = ids();
        let mut net = SafetyNet::new(Vec3::ZERO, SafetyNetTuning::default());
        let standing = footing(floor, SurfaceCategory::Ground);

        // Landing on the floor saves straight away.
        assert!(net.observe(Vec3::X, &standing, DT));
        assert_eq!(net.last_safe_position(), Vec3::X);

        let mut saved_at = None;
        for tick in 1..=10 {
            let position = Vec3::X * (1.0 + tick as f32);
            if net.observe(position, &standing, DT) {
                saved_at = Some(tick);
                break;
            }
        }
        assert_eq!(saved_at, Some(4));
    }

    #[test]
    fn test_small_moves_are_not_saved() {
        let (floor, _) = ids();
        let mut net = SafetyNet::new(Vec3::ZERO, SafetyNetTuning::default());
        let standing = footing(floor, SurfaceCategory::Ground);
        for _ in 0..20 {
            assert!(!net.observe(Vec3::new(0.05, 0.0, 0.0), &standing, DT));
        }
        assert_eq!(net.last_safe_position(), Vec3::ZERO);
    }

    #[test]
    fn test_hazard_and_air_reset_timer() {
        let (floor, rock) = ids();
        let mut net = SafetyNet::new(Vec3::ZERO, SafetyNetTuning::default());
        let standing = footing(floor, SurfaceCategory::Ground);
        net.observe(Vec3::X, &standing, DT);

        for _ in 0..3 {
            net.observe(Vec3::X * 2.0, &standing, DT);
        }
        assert!(!net.observe(Vec3::X * 3.0, &footing(rock, SurfaceCategory::Hazard), DT));
        assert!(!net.observe(Vec3::X * 3.0, &GroundState::NONE, DT));
        assert_eq!(net.last_safe_position(), Vec3::X);
    }

    #[test]
    fn test_landing_on_wood_saves_immediately() {
        let (floor, leaf) = ids();
        let mut net = SafetyNet::new(Vec3::ZERO, SafetyNetTuning::default());
        net.observe(Vec3::X, &footing(floor, SurfaceCategory::Ground), DT);

        let landing = Vec3::new(4.0, 2.0, 0.0);
        assert!(net.observe(landing, &footing(leaf, SurfaceCategory::Wood), DT));
        assert_eq!(net.last_safe_position(), landing);
    }

    #[test]
    fn test_side_contact_is_not_landing() {
        let (_, leaf) = ids();
        let mut net = SafetyNet::new(Vec3::ZERO, SafetyNetTuning::default());
        let mut steep = footing(leaf, SurfaceCategory::Wood);
        steep.is_jumpable = false;
        assert!(!net.observe(Vec3::X * 3.0, &steep, DT));
    }
}
