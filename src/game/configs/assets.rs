use anyhow::{Context, ensure};
use bevy::{
    asset::{AssetLoader, AsyncReadExt, LoadContext},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    game::{
        enemy::ChaserTuning,
        platforms::{BounceTuning, ElevatorTuning},
        safety_net::SafetyNetTuning,
    },
    locomotion::{
        AnimationTuning, FootstepTuning, GroundProbe, JumpTuning, LocomotionTuning, MovementTuning,
    },
};

/// Every tunable of the character cluster, loaded from RON.
#[derive(Asset, Resource, Reflect, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub movement: MovementTuning,
    pub jump: JumpTuning,
    pub ground: GroundProbe,
    pub footsteps: FootstepTuning,
    pub animation: AnimationTuning,
    pub chaser: ChaserTuning,
    pub safety_net: SafetyNetTuning,
    pub bouncy_leaf: BounceTuning,
    pub elevator: ElevatorTuning,
    /// Rigged model for the player. Without one the capsule is drawn instead.
    pub model: Option<CharacterModelConfig>,
}

/// Where to find a Mixamo-style rig and which of its clips to blend.
#[derive(Reflect, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterModelConfig {
    /// Path of the glTF file, relative to `assets/`.
    pub path: String,
    pub scale: f32,
    /// Vertical offset from the capsule centre to the model root.
    pub offset_y: f32,
    /// glTF animation indices.
    pub idle: usize,
    pub walk: usize,
    pub run: usize,
    pub fall: usize,
}

impl LocomotionConfig {
    /// Path to the locomotion configuration file
    pub const PATH: &'static str = "config/locomotion.ron";

    pub fn tuning(&self) -> LocomotionTuning {
        LocomotionTuning {
            movement: self.movement,
            jump: self.jump,
            ground: self.ground,
            footsteps: self.footsteps,
            animation: self.animation,
        }
    }

    /// Reject values the controller cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let movement = &self.movement;
        ensure_non_negative("movement.base_speed", movement.base_speed)?;
        ensure_non_negative("movement.turn_speed", movement.turn_speed)?;
        ensure_non_negative("movement.run_multiplier", movement.run_multiplier)?;
        ensure_non_negative("movement.in_place_turn_factor", movement.in_place_turn_factor)?;
        ensure!(
            (0.0..1.0).contains(&movement.dead_zone),
            "movement.dead_zone must be in [0, 1), got {}",
            movement.dead_zone
        );

        let jump = &self.jump;
        ensure_non_negative("jump.jump_force", jump.jump_force)?;
        ensure_positive("jump.max_jump_time", jump.max_jump_time)?;
        ensure_finite("jump.gravity", jump.gravity)?;
        ensure_finite("jump.jump_gravity", jump.jump_gravity)?;
        ensure_non_negative("jump.landing_grace", jump.landing_grace)?;
        ensure_non_negative("jump.buffer_time", jump.buffer_time)?;
        ensure_non_negative("jump.coyote_time", jump.coyote_time)?;

        ensure_probe("ground", &self.ground)?;
        ensure_probe("chaser.probe", &self.chaser.probe)?;
        ensure_probe("safety_net.probe", &self.safety_net.probe)?;

        let footsteps = &self.footsteps;
        ensure_finite("footsteps.hind_walk", footsteps.hind_walk)?;
        ensure_finite("footsteps.hind_run", footsteps.hind_run)?;
        ensure_finite("footsteps.front_walk", footsteps.front_walk)?;
        ensure_finite("footsteps.front_run", footsteps.front_run)?;
        ensure_non_negative("footsteps.weight", footsteps.weight)?;

        ensure_positive("animation.damp_time", self.animation.damp_time)?;

        let chaser = &self.chaser;
        ensure_non_negative("chaser.chase_speed", chaser.chase_speed)?;
        ensure_non_negative("chaser.ground_check_distance", chaser.ground_check_distance)?;
        ensure_positive("chaser.damp_time", chaser.damp_time)?;
        ensure_non_negative("chaser.growl_cooldown_min", chaser.growl_cooldown_min)?;
        ensure!(
            chaser.growl_cooldown_max > chaser.growl_cooldown_min,
            "chaser.growl_cooldown_max must exceed growl_cooldown_min"
        );

        ensure_positive("safety_net.save_interval", self.safety_net.save_interval)?;
        ensure_non_negative("safety_net.min_move", self.safety_net.min_move)?;

        let bounce = &self.bouncy_leaf;
        ensure_positive("bouncy_leaf.min_force", bounce.min_force)?;
        ensure!(
            bounce.max_force >= bounce.min_force,
            "bouncy_leaf.max_force must be at least min_force"
        );
        ensure_non_negative("bouncy_leaf.impact_multiplier", bounce.impact_multiplier)?;
        ensure_non_negative("bouncy_leaf.jump_boost", bounce.jump_boost)?;
        ensure_non_negative("bouncy_leaf.boost_window", bounce.boost_window)?;

        ensure_positive("elevator.speed", self.elevator.speed)?;

        if let Some(model) = &self.model {
            ensure_positive("model.scale", model.scale)?;
            ensure_finite("model.offset_y", model.offset_y)?;
        }
        Ok(())
    }
}

fn ensure_finite(name: &str, value: f32) -> anyhow::Result<()> {
    ensure!(value.is_finite(), "{name} must be finite, got {value}");
    Ok(())
}

fn ensure_non_negative(name: &str, value: f32) -> anyhow::Result<()> {
    ensure_finite(name, value)?;
    ensure!(value >= 0.0, "{name} must not be negative, got {value}");
    Ok(())
}

fn ensure_positive(name: &str, value: f32) -> anyhow::Result<()> {
    ensure_finite(name, value)?;
    ensure!(value > 0.0, "{name} must be positive, got {value}");
    Ok(())
}

fn ensure_probe(name: &str, probe: &GroundProbe) -> anyhow::Result<()> {
    ensure_finite(name, probe.max_slope_deg)?;
    ensure!(
        (0.0..=90.0).contains(&probe.max_slope_deg),
        "{name}.max_slope_deg must be in [0, 90], got {}",
        probe.max_slope_deg
    );
    ensure_non_negative(name, probe.ray_depth)?;
    ensure_non_negative(name, probe.origin_offset)?;
    Ok(())
}

/// Parse and validate a config from RON text.
pub fn parse_config(bytes: &[u8]) -> anyhow::Result<LocomotionConfig> {
    let config: LocomotionConfig =
        ron::de::from_bytes(bytes).context("locomotion config is not valid RON")?;
    config
        .validate()
        .context("locomotion config has out-of-range values")?;
    Ok(config)
}

/// Asset loader for LocomotionConfig RON files
#[derive(Default)]
pub struct LocomotionConfigLoader;

impl AssetLoader for LocomotionConfigLoader {
    type Asset = LocomotionConfig;
    type Settings = ();
    type Error = anyhow::Error;

    async fn load(
        &self,
        reader: &mut dyn bevy::asset::io::Reader,
        _settings: &Self::Settings,
        load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        parse_config(&bytes).with_context(|| format!("loading {}", load_context.path().display()))
    }

    fn extensions(&self) -> &[&str] {
        &["ron"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(LocomotionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config = parse_config(b"(movement: (base_speed: 7.5))").unwrap();
        assert_eq!(config.movement.base_speed, 7.5);
        assert_eq!(config.movement.turn_speed, 45.0);
        assert_eq!(config.jump, JumpTuning::default());
        assert!(config.model.is_none());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(parse_config(b"(movement: (dead_zone: 1.0))").is_err());
        assert!(parse_config(b"(movement: (base_speed: -1.0))").is_err());
        assert!(parse_config(b"(jump: (max_jump_time: 0.0))").is_err());
        assert!(parse_config(b"(animation: (damp_time: 0.0))").is_err());
        assert!(parse_config(b"(jump: (buffer_time: -0.1))").is_err());
        assert!(parse_config(b"(bouncy_leaf: (min_force: 20.0, max_force: 10.0))").is_err());
        assert!(parse_config(b"(elevator: (speed: 0.0))").is_err());
    }

    #[test]
    fn test_rejects_bad_safety_net_probe() {
        assert!(parse_config(b"(safety_net: (probe: (ray_depth: -1.0)))").is_err());
        let mut config = LocomotionConfig::default();
        config.safety_net.probe.max_slope_deg = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_ron() {
        assert!(parse_config(b"(movement: ").is_err());
    }

    #[test]
    fn test_tuning_copies_sections() {
        let mut config = LocomotionConfig::default();
        config.jump.jump_force = 11.0;
        assert_eq!(config.tuning().jump.jump_force, 11.0);
    }

    #[test]
    fn test_shipped_config_parses() {
        let shipped = include_bytes!("../../../assets/config/locomotion.ron");
        assert!(parse_config(shipped).is_ok());
    }
}
