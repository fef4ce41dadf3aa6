pub mod assets;

use bevy::prelude::*;

pub use assets::{CharacterModelConfig, LocomotionConfig, LocomotionConfigLoader};

/// Keeps the config asset alive and watched for hot reloads.
#[derive(Resource)]
pub struct LocomotionConfigHandle(pub Handle<LocomotionConfig>);

pub(super) fn plugin(app: &mut App) {
    // Register the asset loader for RON config files
    app.init_asset::<LocomotionConfig>();
    app.init_asset_loader::<LocomotionConfigLoader>();

    // Defaults until the file arrives; a broken file leaves them in place.
    app.init_resource::<LocomotionConfig>();
    app.add_systems(Startup, load_config);
    app.add_systems(Update, apply_loaded_config);
}

fn load_config(mut commands: Commands, asset_server: Res<AssetServer>) {
    let handle = asset_server.load(LocomotionConfig::PATH);
    commands.insert_resource(LocomotionConfigHandle(handle));
}

fn apply_loaded_config(
    mut events: MessageReader<AssetEvent<LocomotionConfig>>,
    configs: Res<Assets<LocomotionConfig>>,
    handle: Option<Res<LocomotionConfigHandle>>,
    mut active: ResMut<LocomotionConfig>,
) {
    let Some(handle) = handle else {
        return;
    };

    for event in events.read() {
        let relevant = event.is_loaded_with_dependencies(&handle.0) || event.is_modified(&handle.0);
        if !relevant {
            continue;
        }
        let Some(config) = configs.get(&handle.0) else {
            continue;
        };
        *active = config.clone();
        info!("Applied locomotion config from {}", LocomotionConfig::PATH);
    }
}
