use avian3d::prelude::*;
use bevy::prelude::*;

use crate::{
    game::{
        enemy::SpawnChaser,
        physics::{GameLayer, GroundContacts, HitGroundReporter},
        platforms::{BouncyLeaf, Elevator},
        player::SpawnPlayer,
    },
    locomotion::SurfaceCategory,
    screens::Screen,
};

/// One static or loose box in the level.
struct Block {
    label: &'static str,
    position: Vec3,
    size: Vec3,
    /// Rotation about X, in degrees.
    tilt: f32,
    surface: SurfaceCategory,
    bouncy: bool,
}

const LEVEL: [Block; 8] = [
    Block {
        label: "Ground Floor",
        position: Vec3::new(0.0, -0.5, 0.0),
        size: Vec3::new(40.0, 1.0, 40.0),
        tilt: 0.0,
        surface: SurfaceCategory::Ground,
        bouncy: false,
    },
    Block {
        label: "Chaser Platform",
        position: Vec3::new(6.0, 1.0, -6.0),
        size: Vec3::new(6.0, 0.5, 6.0),
        tilt: 0.0,
        surface: SurfaceCategory::Ground,
        bouncy: false,
    },
    Block {
        label: "High Platform",
        position: Vec3::new(-7.0, 2.0, -10.0),
        size: Vec3::new(5.0, 0.5, 5.0),
        tilt: 0.0,
        surface: SurfaceCategory::Ground,
        bouncy: false,
    },
    Block {
        label: "Leaf",
        position: Vec3::new(0.0, 1.5, -12.0),
        size: Vec3::new(3.0, 0.3, 3.0),
        tilt: 0.0,
        surface: SurfaceCategory::Wood,
        bouncy: true,
    },
    Block {
        label: "Log",
        position: Vec3::new(-3.0, 3.0, -14.0),
        size: Vec3::new(4.0, 0.6, 1.2),
        tilt: 0.0,
        surface: SurfaceCategory::Wood,
        bouncy: false,
    },
    Block {
        label: "Ramp",
        position: Vec3::new(-8.0, 0.9, 2.0),
        size: Vec3::new(4.0, 0.4, 8.0),
        tilt: 20.0,
        surface: SurfaceCategory::Terrain,
        bouncy: false,
    },
    Block {
        label: "Thorns",
        position: Vec3::new(3.0, 0.25, 4.0),
        size: Vec3::new(2.0, 0.5, 2.0),
        tilt: 0.0,
        surface: SurfaceCategory::Hazard,
        bouncy: false,
    },
    Block {
        label: "Upper Ledge",
        position: Vec3::new(10.0, 4.25, 8.5),
        size: Vec3::new(4.0, 0.5, 4.0),
        tilt: 0.0,
        surface: SurfaceCategory::Ground,
        bouncy: false,
    },
];

const PLAYER_START: Vec3 = Vec3::new(0.0, 2.0, 6.0);
const CHASER_START: Vec3 = Vec3::new(6.0, 2.5, -6.0);
const CRATE_START: Vec3 = Vec3::new(2.0, 8.0, -2.0);
const ELEVATOR_BOTTOM: Vec3 = Vec3::new(10.0, 0.25, 4.0);
/// Level with the top of the upper ledge.
const ELEVATOR_RISE: f32 = 4.0;
const ELEVATOR_SIZE: Vec3 = Vec3::new(3.0, 0.5, 3.0);

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        OnEnter(Screen::Gameplay),
        (spawn_level_geometry, spawn_level).chain(),
    );
}

fn surface_color(surface: SurfaceCategory) -> Color {
    match surface {
        SurfaceCategory::Ground => Color::srgb(0.3, 0.5, 0.3),
        SurfaceCategory::Terrain => Color::srgb(0.55, 0.5, 0.3),
        SurfaceCategory::Wood => Color::srgb(0.5, 0.35, 0.2),
        SurfaceCategory::Hazard => Color::srgb(0.7, 0.2, 0.2),
        SurfaceCategory::Prop => Color::srgb(0.6, 0.6, 0.65),
    }
}

fn surface_layer(surface: SurfaceCategory) -> GameLayer {
    if surface.is_ground_like() {
        GameLayer::Ground
    } else {
        GameLayer::Default
    }
}

/// Static level geometry, each piece tagged with its surface category.
pub fn spawn_level_geometry(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for block in &LEVEL {
        let mut entity = commands.spawn((
            Name::new(block.label),
            block.surface,
            DespawnOnExit(Screen::Gameplay),
            Mesh3d(meshes.add(Cuboid::from_size(block.size))),
            MeshMaterial3d(materials.add(surface_color(block.surface))),
            Transform::from_translation(block.position)
                .with_rotation(Quat::from_rotation_x(block.tilt.to_radians())),
            RigidBody::Static,
            Collider::cuboid(block.size.x, block.size.y, block.size.z),
            CollisionLayers::new(surface_layer(block.surface), LayerMask::ALL),
        ));
        if block.bouncy {
            entity.insert(BouncyLeaf);
        }
        debug!("Spawned {} ({:?}) at {}", block.label, block.surface, block.position);
    }

    commands.spawn((
        Name::new("Elevator"),
        SurfaceCategory::Ground,
        Elevator::new(ELEVATOR_BOTTOM, ELEVATOR_BOTTOM + Vec3::Y * ELEVATOR_RISE),
        DespawnOnExit(Screen::Gameplay),
        Mesh3d(meshes.add(Cuboid::from_size(ELEVATOR_SIZE))),
        MeshMaterial3d(materials.add(Color::srgb(0.45, 0.65, 0.35))),
        Transform::from_translation(ELEVATOR_BOTTOM),
        RigidBody::Kinematic,
        Collider::cuboid(ELEVATOR_SIZE.x, ELEVATOR_SIZE.y, ELEVATOR_SIZE.z),
        CollisionLayers::new(GameLayer::Ground, LayerMask::ALL),
    ));

    // Loose crate that thuds when it lands.
    let crate_size = Vec3::splat(0.8);
    commands.spawn((
        Name::new("Crate"),
        SurfaceCategory::Prop,
        DespawnOnExit(Screen::Gameplay),
        Mesh3d(meshes.add(Cuboid::from_size(crate_size))),
        MeshMaterial3d(materials.add(surface_color(SurfaceCategory::Prop))),
        Transform::from_translation(CRATE_START),
        RigidBody::Dynamic,
        Collider::cuboid(crate_size.x, crate_size.y, crate_size.z),
        CollisionEventsEnabled,
        CollidingEntities::default(),
        GroundContacts::with_feet_offset(crate_size.y / 2.0),
        HitGroundReporter,
    ));

    commands.spawn((
        Name::new("Sun"),
        DespawnOnExit(Screen::Gameplay),
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -1.0, -0.5, 0.0)),
    ));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 200.0,
        affects_lightmapped_meshes: false,
    });

    info!("Level spawned");
}

pub fn spawn_level(world: &mut World) {
    SpawnPlayer {
        position: PLAYER_START,
    }
    .apply(world);
    SpawnChaser {
        position: CHASER_START,
    }
    .apply(world);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_has_every_surface_kind() {
        for surface in [
            SurfaceCategory::Ground,
            SurfaceCategory::Terrain,
            SurfaceCategory::Wood,
            SurfaceCategory::Hazard,
        ] {
            assert!(LEVEL.iter().any(|block| block.surface == surface));
        }
    }

    #[test]
    fn test_ramp_is_walkable() {
        let ramp = LEVEL.iter().find(|block| block.label == "Ramp").unwrap();
        assert!(ramp.tilt < crate::locomotion::GroundProbe::default().max_slope_deg);
    }

    #[test]
    fn test_only_the_leaf_bounces() {
        let bouncy: Vec<_> = LEVEL.iter().filter(|block| block.bouncy).collect();
        assert_eq!(bouncy.len(), 1);
        assert_eq!(bouncy[0].label, "Leaf");
    }

    #[test]
    fn test_elevator_tops_out_at_upper_ledge() {
        let ledge = LEVEL
            .iter()
            .find(|block| block.label == "Upper Ledge")
            .unwrap();
        let ledge_top = ledge.position.y + ledge.size.y / 2.0;
        let elevator_top = ELEVATOR_BOTTOM.y + ELEVATOR_RISE + ELEVATOR_SIZE.y / 2.0;
        assert!((ledge_top - elevator_top).abs() < 1e-4);
    }

    #[test]
    fn test_ground_surfaces_use_ground_layer() {
        assert!(matches!(surface_layer(SurfaceCategory::Terrain), GameLayer::Ground));
        assert!(matches!(surface_layer(SurfaceCategory::Wood), GameLayer::Default));
    }
}
