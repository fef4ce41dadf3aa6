//! Bevy integration of the locomotion core: level, characters, AI and their glue.

pub mod animations;
pub mod audio_cues;
pub mod camera_controller;
pub mod configs;
pub mod enemy;
pub mod events;
pub mod physics;
pub mod platforms;
pub mod player;
pub mod safety_net;
mod scene;

use bevy::prelude::*;

use crate::screens::Screen;

/// Order of the character work inside each physics tick.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterTickSet {
    /// Contact bookkeeping from the previous physics step.
    Sense,
    /// Player locomotion.
    Drive,
    /// Systems that read the player's fresh grounding.
    React,
}

pub(super) fn plugin(app: &mut App) {
    app.configure_sets(
        FixedUpdate,
        (
            CharacterTickSet::Sense,
            CharacterTickSet::Drive,
            CharacterTickSet::React,
        )
            .chain()
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        FixedUpdate,
        physics::track_ground_contacts.in_set(CharacterTickSet::Sense),
    );

    app.add_plugins((
        configs::plugin,
        events::plugin,
        scene::plugin,
        player::plugin,
        enemy::plugin,
        safety_net::plugin,
        platforms::plugin,
        audio_cues::plugin,
        camera_controller::plugin,
        animations::plugin,
    ));
}
