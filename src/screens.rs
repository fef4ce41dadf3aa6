//! Top-level screen flow: wait for tuning, then play.

use bevy::{asset::LoadState, prelude::*};

use crate::game::configs::LocomotionConfigHandle;

#[derive(States, Debug, Hash, PartialEq, Eq, Clone, Copy, Default)]
pub enum Screen {
    #[default]
    Loading,
    Gameplay,
}

pub(super) fn plugin(app: &mut App) {
    app.init_state::<Screen>();
    app.add_systems(
        Update,
        finish_loading.run_if(in_state(Screen::Loading)),
    );
}

fn finish_loading(
    asset_server: Res<AssetServer>,
    handle: Option<Res<LocomotionConfigHandle>>,
    mut next_screen: ResMut<NextState<Screen>>,
) {
    let Some(handle) = handle else {
        return;
    };

    match asset_server.load_state(&handle.0) {
        LoadState::Loaded => {
            info!("Locomotion config loaded");
            next_screen.set(Screen::Gameplay);
        }
        LoadState::Failed(error) => {
            warn!("Locomotion config failed to load, using defaults: {error}");
            next_screen.set(Screen::Gameplay);
        }
        LoadState::NotLoaded | LoadState::Loading => {}
    }
}
