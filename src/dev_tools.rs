//! Development tools for the game. This plugin is only enabled in dev builds.

use avian3d::prelude::{PhysicsDebugPlugin, PhysicsGizmos};
use bevy::{dev_tools::states::log_transitions, prelude::*};

use crate::{
    game::{
        audio_cues::SoundCue,
        configs::LocomotionConfig,
        player::{FeetOffset, GroundReport, Locomotor},
    },
    screens::Screen,
};

const PHYSICS_DEBUG_KEY: KeyCode = KeyCode::F3;
const GROUND_RAY_KEY: KeyCode = KeyCode::F4;

/// Whether the ground probes are drawn.
#[derive(Resource, Debug)]
struct GroundRayGizmos(bool);

pub(super) fn plugin(app: &mut App) {
    // Log `Screen` state transitions.
    app.add_systems(Update, (log_transitions::<Screen>, toggle_physics_debug));
    app.add_plugins(PhysicsDebugPlugin::default());
    app.insert_resource(GroundRayGizmos(true));
    app.add_systems(
        Update,
        (toggle_ground_rays, draw_ground_rays, log_sound_cues).run_if(in_state(Screen::Gameplay)),
    );
}

fn toggle_physics_debug(keys: Res<ButtonInput<KeyCode>>, mut store: ResMut<GizmoConfigStore>) {
    if keys.just_pressed(PHYSICS_DEBUG_KEY) {
        let (config, _) = store.config_mut::<PhysicsGizmos>();
        config.enabled = !config.enabled;
        info!("Physics debug rendering: {}", if config.enabled { "ON" } else { "OFF" });
    }
}

fn toggle_ground_rays(keys: Res<ButtonInput<KeyCode>>, mut rays: ResMut<GroundRayGizmos>) {
    if keys.just_pressed(GROUND_RAY_KEY) {
        rays.0 = !rays.0;
    }
}

/// Green when the probe found footing, red otherwise.
fn draw_ground_rays(
    mut gizmos: Gizmos,
    rays: Res<GroundRayGizmos>,
    config: Res<LocomotionConfig>,
    characters: Query<(&Transform, &FeetOffset, &GroundReport), With<Locomotor>>,
) {
    if !rays.0 {
        return;
    }
    let probe = config.ground;
    for (transform, feet_offset, report) in &characters {
        let feet = transform.translation - Vec3::Y * feet_offset.0;
        let start = feet + Vec3::Y * probe.origin_offset;
        let end = feet - Vec3::Y * probe.ray_depth;
        let color = if report.ground.has_footing() {
            Color::srgb(0.1, 0.9, 0.2)
        } else {
            Color::srgb(0.9, 0.1, 0.1)
        };
        gizmos.line(start, end, color);
    }
}

fn log_sound_cues(mut cues: MessageReader<SoundCue>) {
    for cue in cues.read() {
        debug!(
            "Sound {:?} at {} (volume {:.2}, pitch {:.2})",
            cue.bank, cue.position, cue.volume, cue.pitch
        );
    }
}
