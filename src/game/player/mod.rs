mod input;
mod movement;

use avian3d::prelude::*;
use bevy::prelude::*;

use crate::{
    game::{
        CharacterTickSet,
        animations::{AnimationParams, CharacterModel},
        camera_controller::FollowTarget,
        configs::LocomotionConfig,
        physics::{GameLayer, GroundContacts, LandingReporter},
        platforms::LeafBouncer,
        safety_net::SafetyNet,
    },
    locomotion::{LocomotionController, PlayerGround},
    screens::Screen,
};

pub use input::{CharacterInput, RECOVER_KEY};
pub use movement::{AvianBody, BoneLimbs, MissingDependencies, TransformBody};

// Player marker component
#[derive(Component)]
pub struct Player;

/// Drives a character through the locomotion core.
#[derive(Component, Debug, Default, Deref, DerefMut)]
pub struct Locomotor(pub LocomotionController);

/// Latest grounding result, published for AI and other readers.
#[derive(Component, Debug, Clone, Copy, Default, Deref)]
pub struct GroundReport(pub PlayerGround);

/// Distance from the transform origin down to the bottom of the collider.
#[derive(Component, Debug, Clone, Copy)]
pub struct FeetOffset(pub f32);

// Constants
pub const PLAYER_RADIUS: f32 = 0.4;
/// Length of the capsule's cylindrical section.
pub const PLAYER_CAPSULE_LENGTH: f32 = 1.2;
pub const PLAYER_FEET_OFFSET: f32 = PLAYER_CAPSULE_LENGTH / 2.0 + PLAYER_RADIUS;

// Player spawn command
pub struct SpawnPlayer {
    pub position: Vec3,
}

impl Command for SpawnPlayer {
    fn apply(self, world: &mut World) {
        if let Err(error) = world.run_system_cached_with(spawn_player, self) {
            error!("Failed to spawn player: {error}");
        }
    }
}

fn spawn_player(
    In(spawn_config): In<SpawnPlayer>,
    mut commands: Commands,
    config: Res<LocomotionConfig>,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mut player = commands.spawn((
        Name::new("Player"),
        Player,
        Locomotor(LocomotionController::new(config.tuning())),
        GroundReport::default(),
        FeetOffset(PLAYER_FEET_OFFSET),
        CharacterInput::default(),
        AnimationParams::default(),
        SafetyNet::new(spawn_config.position, config.safety_net),
        LeafBouncer::default(),
        FollowTarget,
        DespawnOnExit(Screen::Gameplay), // Cleanup when leaving Gameplay screen
        Transform::from_translation(spawn_config.position),
        Visibility::Visible,
    ));
    player.insert((
        // Avian3D physics components
        RigidBody::Dynamic,
        Collider::capsule(PLAYER_RADIUS, PLAYER_CAPSULE_LENGTH),
        Mass(1.0),
        // Gravity is integrated by the locomotion controller.
        GravityScale(0.0),
        LockedAxes::ROTATION_LOCKED.unlock_rotation_y(), // Prevent player from tipping over
        Friction::ZERO.with_combine_rule(CoefficientCombine::Min),
        CollisionLayers::new(
            GameLayer::Character,
            [GameLayer::Default, GameLayer::Ground, GameLayer::Enemy],
        ),
        CollisionEventsEnabled,
        CollidingEntities::default(),
        GroundContacts::with_feet_offset(PLAYER_FEET_OFFSET),
        LandingReporter,
    ));

    match &config.model {
        Some(model) => {
            let clip = |index: usize| {
                asset_server.load(GltfAssetLabel::Animation(index).from_asset(model.path.clone()))
            };
            player.insert(CharacterModel::mixamo([
                clip(model.idle),
                clip(model.walk),
                clip(model.run),
                clip(model.fall),
            ]));
            let scene = asset_server.load(GltfAssetLabel::Scene(0).from_asset(model.path.clone()));
            player.with_children(|parent| {
                parent.spawn((
                    SceneRoot(scene),
                    Transform::from_translation(Vec3::new(0., model.offset_y, 0.))
                        .with_rotation(Quat::from_rotation_y(std::f32::consts::PI))
                        .with_scale(Vec3::splat(model.scale)),
                ));
            });
        }
        None => {
            let mesh = meshes.add(Capsule3d::new(PLAYER_RADIUS, PLAYER_CAPSULE_LENGTH));
            let material = materials.add(Color::srgb(0.35, 0.7, 0.3));
            player.with_children(|parent| {
                parent.spawn((Mesh3d(mesh), MeshMaterial3d(material)));
            });
        }
    }
}

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        Update,
        (
            input::record_keyboard_input,
            movement::report_missing_dependencies,
            movement::sync_tuning,
        )
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        FixedUpdate,
        movement::drive_locomotion.in_set(CharacterTickSet::Drive),
    );
}
