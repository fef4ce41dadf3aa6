mod params;
mod rig;

use bevy::prelude::*;

use crate::screens::Screen;

pub use params::{AnimationParams, ClipWeights};
pub use rig::{CharacterModel, LimbBones, RigBinding};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<AnimationParams>();
    app.add_systems(
        Update,
        (rig::bind_character_rig, rig::drive_animation_graph)
            .chain()
            .run_if(in_state(Screen::Gameplay)),
    );
}
