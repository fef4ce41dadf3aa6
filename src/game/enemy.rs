//! Platform-bound chaser: hunts the player only while both stand on the same collider.

use avian3d::prelude::*;
use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    game::{
        CharacterTickSet,
        animations::AnimationParams,
        configs::LocomotionConfig,
        events::{EnemyGrowl, EnemyRoar},
        physics::{GameLayer, SurfaceProbe},
        player::{FeetOffset, GroundReport, Player},
    },
    locomotion::{
        AnimParam, AnimationSink, BlendChannel, GroundProbe, GroundState, PlayerGround, sense,
    },
    screens::Screen,
};

/// Below this horizontal speed the chaser counts as standing still.
const MOVING_SPEED: f32 = 0.05;
/// Stop seeking once this close to the player.
const STOPPING_DISTANCE: f32 = 0.8;
const ROTATION_SPEED: f32 = 10.0;

const CHASER_RADIUS: f32 = 0.5;
const CHASER_LENGTH: f32 = 0.8;
const CHASER_FEET_OFFSET: f32 = CHASER_LENGTH / 2.0 + CHASER_RADIUS;

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaserTuning {
    pub probe: GroundProbe,
    /// The player must be at most this far above their surface to count as on it.
    pub ground_check_distance: f32,
    pub chase_speed: f32,
    /// Speed from which the run blend is targeted.
    pub run_threshold: f32,
    pub damp_time: f32,
    pub growl_cooldown_min: f32,
    pub growl_cooldown_max: f32,
    pub first_growl_delay: f32,
}

impl Default for ChaserTuning {
    fn default() -> Self {
        Self {
            probe: GroundProbe {
                max_slope_deg: 45.0,
                ray_depth: 5.0,
                origin_offset: 1.0,
            },
            ground_check_distance: 1.5,
            chase_speed: 3.5,
            run_threshold: 3.0,
            damp_time: 0.1,
            growl_cooldown_min: 3.0,
            growl_cooldown_max: 6.0,
            first_growl_delay: 6.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum ChaseState {
    #[default]
    Passive,
    Chase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformDecision {
    pub next: ChaseState,
    /// The player just got away.
    pub roar: bool,
}

/// Decide whether the chaser keeps hunting.
pub fn evaluate_platform(
    state: ChaseState,
    enemy_surface: Option<Entity>,
    player: &PlayerGround,
    check_distance: f32,
) -> PlatformDecision {
    let player_surface = player.ground.closest_surface;
    let was_chasing = state == ChaseState::Chase;

    let player_close_to_surface =
        player_surface.is_some() && player.ground.distance_to_ground < check_distance;
    let roar = if player_close_to_surface && enemy_surface.is_some() {
        if enemy_surface == player_surface {
            return PlatformDecision {
                next: ChaseState::Chase,
                roar: false,
            };
        }
        was_chasing
    } else {
        let same_surface = enemy_surface.is_some() && enemy_surface == player_surface;
        was_chasing && !same_surface
    };

    PlatformDecision {
        next: ChaseState::Passive,
        roar,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChaserCues {
    pub growl: bool,
    pub roar: bool,
}

#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct PlatformChaser {
    pub state: ChaseState,
    pub ground: GroundState,
    growl_ready_at: f32,
    vert: BlendChannel,
    run: BlendChannel,
}

impl PlatformChaser {
    pub fn new(tuning: &ChaserTuning) -> Self {
        Self {
            state: ChaseState::Passive,
            ground: GroundState::NONE,
            growl_ready_at: tuning.first_growl_delay,
            vert: BlendChannel::default(),
            run: BlendChannel::default(),
        }
    }

    fn reset_growl(&mut self, now: f32, tuning: &ChaserTuning, rng: &mut impl Rng) {
        self.growl_ready_at = now + rng.random_range(tuning.growl_cooldown_min..tuning.growl_cooldown_max);
    }

    /// Update the chase state from the latest grounding of both characters.
    pub fn think(
        &mut self,
        now: f32,
        ground: GroundState,
        player: &PlayerGround,
        tuning: &ChaserTuning,
        rng: &mut impl Rng,
    ) -> ChaserCues {
        self.ground = ground;
        let decision = evaluate_platform(
            self.state,
            ground.closest_surface,
            player,
            tuning.ground_check_distance,
        );
        if decision.next != self.state {
            debug!("Chaser {:?} -> {:?}", self.state, decision.next);
        }
        self.state = decision.next;

        let mut cues = ChaserCues::default();
        if decision.roar {
            cues.roar = true;
            // Do not growl straight away if the player hops back on.
            self.reset_growl(now, tuning, rng);
        }
        if self.state == ChaseState::Chase && now > self.growl_ready_at {
            cues.growl = true;
            self.reset_growl(now, tuning, rng);
        }
        cues
    }

    /// Smooth the walk/run blend towards the current horizontal speed.
    pub fn animate(&mut self, speed: f32, tuning: &ChaserTuning, dt: f32, sink: &mut dyn AnimationSink) {
        let vert_target = if speed > MOVING_SPEED { 1.0 } else { 0.0 };
        let run_target = if speed >= tuning.run_threshold { 1.0 } else { 0.0 };
        let vert = self.vert.approach(vert_target, tuning.damp_time, dt);
        let run = self.run.approach(run_target, tuning.damp_time, dt);
        sink.set_float(AnimParam::ForwardBlend, vert);
        sink.set_float(AnimParam::SpeedBlend, run);
    }
}

/// Horizontal seek velocity towards `target`, zero once close enough.
pub fn seek_velocity(from: Vec3, target: Vec3, speed: f32) -> Vec3 {
    let offset = Vec3::new(target.x - from.x, 0.0, target.z - from.z);
    if offset.length() <= STOPPING_DISTANCE {
        return Vec3::ZERO;
    }
    offset.normalize_or_zero() * speed
}

fn update_chasers(
    time: Res<Time>,
    config: Res<LocomotionConfig>,
    surface_probe: SurfaceProbe,
    players: Query<(&Transform, &GroundReport), With<Player>>,
    mut chasers: Query<
        (
            Entity,
            &mut PlatformChaser,
            &mut Transform,
            &FeetOffset,
            &mut LinearVelocity,
            Option<&mut AnimationParams>,
        ),
        Without<Player>,
    >,
    mut growls: MessageWriter<EnemyGrowl>,
    mut roars: MessageWriter<EnemyRoar>,
) {
    let Some((player_transform, player_ground)) = players.iter().next() else {
        return;
    };
    let tuning = &config.chaser;
    let now = time.elapsed_secs();
    let dt = time.delta_secs();
    let mut rng = rand::rng();

    for (entity, mut chaser, mut transform, feet_offset, mut velocity, animation) in &mut chasers {
        let caster = surface_probe.caster(entity);
        let feet = transform.translation - Vec3::Y * feet_offset.0;
        let ground = sense(&caster, feet, &tuning.probe);

        let cues = chaser.think(now, ground, player_ground, tuning, &mut rng);
        let position = transform.translation;
        if cues.roar {
            roars.write(EnemyRoar { enemy: entity, position });
        }
        if cues.growl {
            growls.write(EnemyGrowl { enemy: entity, position });
        }

        let seek = match chaser.state {
            ChaseState::Chase => {
                seek_velocity(position, player_transform.translation, tuning.chase_speed)
            }
            ChaseState::Passive => Vec3::ZERO,
        };
        velocity.x = seek.x;
        velocity.z = seek.z;
        if let Some(direction) = seek.try_normalize() {
            let target_rotation = Quat::from_rotation_arc(Vec3::NEG_Z, direction);
            transform.rotation = transform
                .rotation
                .slerp(target_rotation, (ROTATION_SPEED * dt).min(1.0));
        }

        if let Some(mut params) = animation {
            let speed = Vec2::new(velocity.x, velocity.z).length();
            chaser.animate(speed, tuning, dt, &mut *params);
        }
    }
}

// Chaser spawn command
pub struct SpawnChaser {
    pub position: Vec3,
}

impl Command for SpawnChaser {
    fn apply(self, world: &mut World) {
        if let Err(error) = world.run_system_cached_with(spawn_chaser, self) {
            error!("Failed to spawn chaser: {error}");
        }
    }
}

fn spawn_chaser(
    In(spawn_config): In<SpawnChaser>,
    mut commands: Commands,
    config: Res<LocomotionConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands
        .spawn((
            Name::new("Chaser"),
            PlatformChaser::new(&config.chaser),
            FeetOffset(CHASER_FEET_OFFSET),
            AnimationParams::default(),
            DespawnOnExit(Screen::Gameplay),
            Transform::from_translation(spawn_config.position),
            Visibility::Visible,
            RigidBody::Dynamic,
            Collider::capsule(CHASER_RADIUS, CHASER_LENGTH),
            LockedAxes::ROTATION_LOCKED.unlock_rotation_y(),
            CollisionLayers::new(
                GameLayer::Enemy,
                [GameLayer::Default, GameLayer::Ground, GameLayer::Character],
            ),
        ))
        .with_children(|parent| {
            parent.spawn((
                Mesh3d(meshes.add(Capsule3d::new(CHASER_RADIUS, CHASER_LENGTH))),
                MeshMaterial3d(materials.add(Color::srgb(0.85, 0.45, 0.1))),
            ));
        });
}

pub(super) fn plugin(app: &mut App) {
    app.register_type::<PlatformChaser>();
    app.add_systems(FixedUpdate, update_chasers.in_set(CharacterTickSet::React));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locomotion::{SurfaceCategory, animation::tests::RecordingSink};
    use rand::{SeedableRng, rngs::StdRng};

    fn surfaces(count: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..count).map(|_| world.spawn_empty().id()).collect()
    }

    fn standing_on(surface: Entity, distance: f32) -> PlayerGround {
        PlayerGround {
            is_grounded: true,
            ground: GroundState {
                distance_to_ground: distance,
                closest_surface: Some(surface),
                surface_category: Some(SurfaceCategory::Ground),
                is_jumpable: true,
            },
        }
    }

    fn grounded(surface: Entity) -> GroundState {
        standing_on(surface, 0.0).ground
    }

    #[test]
    fn test_same_surface_starts_chase() {
        let ids = surfaces(1);
        let decision = evaluate_platform(ChaseState::Passive, Some(ids[0]), &standing_on(ids[0], 0.2), 1.5);
        assert_eq!(decision, PlatformDecision { next: ChaseState::Chase, roar: false });
    }

    #[test]
    fn test_player_on_other_platform_roars_once() {
        let ids = surfaces(2);
        let player = standing_on(ids[1], 0.0);
        let decision = evaluate_platform(ChaseState::Chase, Some(ids[0]), &player, 1.5);
        assert_eq!(decision, PlatformDecision { next: ChaseState::Passive, roar: true });

        let decision = evaluate_platform(decision.next, Some(ids[0]), &player, 1.5);
        assert!(!decision.roar);
    }

    #[test]
    fn test_player_jumping_high_leaves_chase() {
        let ids = surfaces(1);
        let decision = evaluate_platform(ChaseState::Chase, Some(ids[0]), &standing_on(ids[0], 3.0), 1.5);
        assert_eq!(decision.next, ChaseState::Passive);
        // Same collider underneath, so no roar.
        assert!(!decision.roar);
    }

    #[test]
    fn test_player_off_all_ground_roars() {
        let ids = surfaces(1);
        let decision = evaluate_platform(ChaseState::Chase, Some(ids[0]), &PlayerGround::default(), 1.5);
        assert_eq!(decision, PlatformDecision { next: ChaseState::Passive, roar: true });
    }

    #[test]
    fn test_airborne_enemy_stays_passive() {
        let ids = surfaces(1);
        let decision = evaluate_platform(ChaseState::Passive, None, &standing_on(ids[0], 0.0), 1.5);
        assert_eq!(decision, PlatformDecision { next: ChaseState::Passive, roar: false });
    }

    #[test]
    fn test_growl_waits_for_cooldown() {
        let ids = surfaces(1);
        let tuning = ChaserTuning::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut chaser = PlatformChaser::new(&tuning);
        let player = standing_on(ids[0], 0.0);

        let early = chaser.think(1.0, grounded(ids[0]), &player, &tuning, &mut rng);
        assert_eq!(chaser.state, ChaseState::Chase);
        assert!(!early.growl);

        let first = chaser.think(6.5, grounded(ids[0]), &player, &tuning, &mut rng);
        assert!(first.growl);
        // The next growl is at least the minimum cooldown away.
        let soon = chaser.think(6.5 + tuning.growl_cooldown_min - 0.1, grounded(ids[0]), &player, &tuning, &mut rng);
        assert!(!soon.growl);
        let later = chaser.think(6.5 + tuning.growl_cooldown_max + 0.1, grounded(ids[0]), &player, &tuning, &mut rng);
        assert!(later.growl);
    }

    #[test]
    fn test_roar_postpones_growl() {
        let ids = surfaces(2);
        let tuning = ChaserTuning::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut chaser = PlatformChaser::new(&tuning);

        chaser.think(10.0, grounded(ids[0]), &standing_on(ids[0], 0.0), &tuning, &mut rng);
        let lost = chaser.think(11.0, grounded(ids[0]), &standing_on(ids[1], 0.0), &tuning, &mut rng);
        assert!(lost.roar);

        let back = chaser.think(11.5, grounded(ids[0]), &standing_on(ids[0], 0.0), &tuning, &mut rng);
        assert_eq!(chaser.state, ChaseState::Chase);
        assert!(!back.growl);
    }

    #[test]
    fn test_seek_stops_near_target() {
        assert_eq!(seek_velocity(Vec3::ZERO, Vec3::new(0.5, 3.0, 0.0), 3.5), Vec3::ZERO);
        let seek = seek_velocity(Vec3::ZERO, Vec3::new(0.0, 2.0, -4.0), 3.5);
        assert!((seek - Vec3::new(0.0, 0.0, -3.5)).length() < 1e-5);
    }

    #[test]
    fn test_animation_targets_run_above_threshold() {
        let tuning = ChaserTuning::default();
        let mut chaser = PlatformChaser::new(&tuning);
        let mut sink = RecordingSink::default();
        for _ in 0..120 {
            chaser.animate(3.5, &tuning, 1.0 / 60.0, &mut sink);
        }
        let last_run = sink
            .floats
            .iter()
            .rev()
            .find(|(param, _)| *param == AnimParam::SpeedBlend)
            .map(|(_, value)| *value);
        assert!(last_run.is_some_and(|value| (value - 1.0).abs() < 1e-3));
    }
}
