//! Third-person platformer character control.

#[cfg(feature = "dev")]
mod dev_tools;
pub mod game;
pub mod locomotion;
pub mod screens;

use avian3d::prelude::*;
use bevy::prelude::*;

pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Leaf Runner".to_string(),
                        fit_canvas_to_parent: true,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    meta_check: bevy::asset::AssetMetaCheck::Never,
                    ..default()
                }),
            PhysicsPlugins::default(),
        ));

        app.add_plugins((screens::plugin, game::plugin));

        #[cfg(feature = "dev")]
        app.add_plugins(dev_tools::plugin);

        app.insert_resource(ClearColor(Color::srgb(0.55, 0.75, 0.95)));
    }
}
