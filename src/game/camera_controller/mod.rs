use bevy::prelude::*;

use crate::screens::Screen;

/// Marks the entity the camera trails.
#[derive(Component, Debug, Default)]
pub struct FollowTarget;

/// Trailing camera placed behind and above its target.
#[derive(Component, Debug, Clone, Copy)]
pub struct FollowCamera {
    pub distance: f32,
    pub height: f32,
    /// Height above the target origin to look at.
    pub look_height: f32,
    /// Larger values catch up faster.
    pub stiffness: f32,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self {
            distance: 7.0,
            height: 3.0,
            look_height: 0.8,
            stiffness: 5.0,
        }
    }
}

impl FollowCamera {
    /// Where the camera wants to be for a target at `target`.
    pub fn desired_position(&self, target: &Transform) -> Vec3 {
        let behind = target.rotation * Vec3::Z;
        let flat_behind = Vec3::new(behind.x, 0.0, behind.z).normalize_or(Vec3::Z);
        target.translation + flat_behind * self.distance + Vec3::Y * self.height
    }
}

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, spawn_camera);
    app.add_systems(
        Update,
        follow_target.run_if(in_state(Screen::Gameplay)),
    );
}

fn spawn_camera(mut commands: Commands) {
    let fov: f32 = 60.0;
    commands.spawn((
        Name::new("Camera"),
        Camera3d::default(),
        FollowCamera::default(),
        Projection::from(PerspectiveProjection {
            fov: fov.to_radians(),
            ..Default::default()
        }),
        Transform::from_xyz(0.0, 6.0, 12.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn follow_target(
    time: Res<Time>,
    targets: Query<&Transform, (With<FollowTarget>, Without<FollowCamera>)>,
    mut cameras: Query<(&FollowCamera, &mut Transform)>,
) {
    let Some(target) = targets.iter().next() else {
        return;
    };
    for (follow, mut camera_transform) in &mut cameras {
        let desired = follow.desired_position(target);
        let blend = 1.0 - (-follow.stiffness * time.delta_secs()).exp();
        camera_transform.translation = camera_transform.translation.lerp(desired, blend);
        camera_transform.look_at(target.translation + Vec3::Y * follow.look_height, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_sits_behind_target() {
        let follow = FollowCamera::default();
        // Facing -Z, so behind is +Z.
        let target = Transform::from_xyz(1.0, 0.0, 0.0);
        let desired = follow.desired_position(&target);
        assert!((desired - Vec3::new(1.0, follow.height, follow.distance)).length() < 1e-5);

        let turned = target.with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let desired = follow.desired_position(&turned);
        assert!(desired.x > 1.0 + follow.distance - 1e-3);
    }
}
