//! Level pieces that move the player around: bouncy leaves and elevators.

use avian3d::prelude::*;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    game::{
        CharacterTickSet,
        configs::LocomotionConfig,
        physics::{GroundContacts, SurfaceProbe},
        player::{FeetOffset, GroundReport, Locomotor, Player},
    },
    locomotion::{GroundProbe, SurfaceMask, sense_with_mask},
};

/// Within this distance a moving elevator snaps onto its destination.
const ARRIVE_EPSILON: f32 = 0.01;

/// Short probe under the feet. The slope limit keeps side hits from counting as landing on top.
const LEAF_PROBE: GroundProbe = GroundProbe {
    max_slope_deg: 60.0,
    ray_depth: 0.3,
    origin_offset: 0.5,
};

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct BounceTuning {
    /// Impulse for a soft landing; also the floor after scaling.
    pub min_force: f32,
    pub max_force: f32,
    /// Scales the landing speed into the bounce impulse.
    pub impact_multiplier: f32,
    /// Extra scale when the jump key is held or was pressed just before.
    pub jump_boost: f32,
    /// How long a jump press counts towards the boost (seconds).
    pub boost_window: f32,
}

impl Default for BounceTuning {
    fn default() -> Self {
        Self {
            min_force: 10.0,
            max_force: 40.0,
            impact_multiplier: 1.2,
            jump_boost: 1.5,
            boost_window: 0.5,
        }
    }
}

/// Upward impulse for landing on a leaf at `impact_speed`.
pub fn bounce_impulse(impact_speed: f32, boosted: bool, tuning: &BounceTuning) -> f32 {
    let base = (impact_speed.abs() * tuning.impact_multiplier).max(tuning.min_force);
    let force = if boosted { base * tuning.jump_boost } else { base };
    force.clamp(tuning.min_force, tuning.max_force)
}

/// Launches characters that land on it.
#[derive(Component, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct BouncyLeaf;

/// Per-character bounce bookkeeping.
#[derive(Component, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct LeafBouncer {
    on_leaf: Option<Entity>,
    /// Vertical speed at the end of the previous physics tick.
    last_vertical_speed: f32,
    /// A jump press already spent on a boost.
    spent_press: Option<f32>,
}

impl LeafBouncer {
    /// Feed the leaf under the character this tick. Returns it when it was just landed on.
    pub fn touch(&mut self, leaf: Option<Entity>) -> Option<Entity> {
        let landed = leaf.filter(|&leaf| {
            self.on_leaf != Some(leaf) && self.last_vertical_speed <= 0.0
        });
        self.on_leaf = leaf;
        landed
    }

    /// Whether this landing earns the jump boost. A boost spends the latest press.
    pub fn boosted(
        &mut self,
        jump_held: bool,
        last_press: Option<f32>,
        now: f32,
        tuning: &BounceTuning,
    ) -> bool {
        let recent_press = last_press.is_some_and(|press| {
            self.spent_press != Some(press) && now - press <= tuning.boost_window
        });
        let boosted = jump_held || recent_press;
        if boosted {
            self.spent_press = last_press;
        }
        boosted
    }

    pub fn impact_speed(&self) -> f32 {
        self.last_vertical_speed.abs()
    }
}

fn bounce_off_leaves(
    time: Res<Time>,
    config: Res<LocomotionConfig>,
    surface_probe: SurfaceProbe,
    leaves: Query<(), With<BouncyLeaf>>,
    mut characters: Query<(
        Entity,
        &Transform,
        &FeetOffset,
        &CollidingEntities,
        &Locomotor,
        &mut LeafBouncer,
        &mut LinearVelocity,
        &ComputedMass,
    )>,
) {
    let tuning = &config.bouncy_leaf;
    for (entity, transform, feet_offset, colliding, locomotor, mut bouncer, mut velocity, mass) in
        &mut characters
    {
        let feet = transform.translation - Vec3::Y * feet_offset.0;
        let footing = sense_with_mask(
            &surface_probe.caster(entity),
            feet,
            &LEAF_PROBE,
            SurfaceMask::ALL,
        );
        let leaf = footing
            .closest_surface
            .filter(|&surface| footing.is_jumpable && leaves.contains(surface))
            .filter(|surface| colliding.contains(surface));

        if let Some(leaf) = bouncer.touch(leaf) {
            let boosted = bouncer.boosted(
                locomotor.state().jump_held,
                locomotor.last_jump_press(),
                time.elapsed_secs(),
                tuning,
            );
            let impulse = bounce_impulse(bouncer.impact_speed(), boosted, tuning);
            velocity.y = impulse * mass.inverse();
            debug!("Bounced off leaf {leaf} with impulse {impulse} (boosted: {boosted})");
        }
        bouncer.last_vertical_speed = velocity.y;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevatorTuning {
    /// Travel speed (units per second).
    pub speed: f32,
}

impl Default for ElevatorTuning {
    fn default() -> Self {
        Self { speed: 3.0 }
    }
}

/// Step from `current` towards `target` by at most `max_delta`.
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let to_target = target - current;
    let distance = to_target.length();
    if distance <= max_delta || distance == 0.0 {
        target
    } else {
        current + to_target / distance * max_delta
    }
}

/// Kinematic platform that rides between two stops each time a player steps on.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Elevator {
    bottom: Vec3,
    top: Vec3,
    destination: Vec3,
    is_up: bool,
    moving: bool,
    riders: Vec<Entity>,
}

impl Elevator {
    pub fn new(bottom: Vec3, top: Vec3) -> Self {
        Self {
            bottom,
            top,
            destination: bottom,
            is_up: false,
            moving: false,
            riders: Vec::new(),
        }
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn is_up(&self) -> bool {
        self.is_up
    }

    pub fn destination(&self) -> Vec3 {
        self.destination
    }

    pub fn riders(&self) -> &[Entity] {
        &self.riders
    }

    /// Replace the rider list. Returns `true` if someone new stepped on.
    pub fn board(&mut self, aboard: Vec<Entity>) -> bool {
        let boarded = aboard.iter().any(|rider| !self.riders.contains(rider));
        self.riders = aboard;
        boarded
    }

    /// Head for the other stop. Ignored while already travelling.
    pub fn activate(&mut self) -> bool {
        if self.moving {
            return false;
        }
        self.is_up = !self.is_up;
        self.destination = if self.is_up { self.top } else { self.bottom };
        self.moving = true;
        true
    }

    /// Where the platform should be `dt` seconds after `current`.
    pub fn advance(&mut self, current: Vec3, speed: f32, dt: f32) -> Vec3 {
        if !self.moving {
            return current;
        }
        let next = move_towards(current, self.destination, speed * dt);
        if next.distance(self.destination) < ARRIVE_EPSILON {
            self.moving = false;
            return self.destination;
        }
        next
    }
}

fn run_elevators(
    time: Res<Time>,
    config: Res<LocomotionConfig>,
    mut elevators: Query<(Entity, &mut Elevator, &Transform, &mut LinearVelocity), Without<Player>>,
    mut riders: Query<
        (Entity, &GroundReport, &GroundContacts, &mut Transform),
        (With<Player>, Without<Elevator>),
    >,
) {
    let dt = time.delta_secs();
    for (entity, mut elevator, transform, mut velocity) in &mut elevators {
        let aboard = riders
            .iter()
            .filter(|(_, report, contacts, _)| {
                report.ground.closest_surface == Some(entity) || contacts.is_touching(entity)
            })
            .map(|(rider, ..)| rider)
            .collect();
        if elevator.board(aboard) && elevator.activate() {
            info!(
                "Elevator {entity} heading {}",
                if elevator.is_up() { "up" } else { "down" }
            );
        }

        let current = transform.translation;
        let delta = elevator.advance(current, config.elevator.speed, dt) - current;
        velocity.0 = if dt > 0.0 { delta / dt } else { Vec3::ZERO };

        // Riders move with the floor instead of sliding off it.
        for &rider in elevator.riders() {
            if let Ok((.., mut rider_transform)) = riders.get_mut(rider) {
                rider_transform.translation += delta;
            }
        }
    }
}

pub(super) fn plugin(app: &mut App) {
    app.register_type::<BouncyLeaf>()
        .register_type::<LeafBouncer>()
        .register_type::<Elevator>();
    app.add_systems(
        FixedUpdate,
        (bounce_off_leaves, run_elevators).in_set(CharacterTickSet::React),
    );
}
