//! Turns gameplay messages into positional sound cues.
//!
//! Only the cue (bank, loudness, pitch, audible range) is decided here. Playing it is left to
//! whatever consumes [`SoundCue`].

use bevy::ecs::message::Message;
use bevy::prelude::*;
use rand::Rng;

use crate::{
    game::events::{EnemyGrowl, EnemyRoar, HitGround, PlayerFootstep, PlayerLands},
    locomotion::SurfaceCategory,
    screens::Screen,
};

pub const MIN_AUDIBLE_DISTANCE: f32 = 5.0;
pub const MAX_AUDIBLE_DISTANCE: f32 = 100.0;

/// Impacts at or below this magnitude are silent.
pub const IMPACT_MIN_FORCE: f32 = 6.0;
/// Impacts at or above this magnitude play at full volume.
pub const IMPACT_MAX_FORCE: f32 = 60.0;

/// How long a growl or roar occupies the enemy's voice.
const GROWL_PLAY_WINDOW: f32 = 2.5;
const ROAR_PLAY_WINDOW: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundBank {
    GrassStep,
    WoodStep,
    HardStep,
    Land,
    Growl,
    Roar,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundCue {
    pub bank: SoundBank,
    pub position: Vec3,
    pub volume: f32,
    pub pitch: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Message for SoundCue {}

impl SoundCue {
    fn at(bank: SoundBank, position: Vec3, volume: f32) -> Self {
        Self {
            bank,
            position,
            volume,
            pitch: 1.0,
            min_distance: MIN_AUDIBLE_DISTANCE,
            max_distance: MAX_AUDIBLE_DISTANCE,
        }
    }
}

pub fn step_bank(category: Option<SurfaceCategory>) -> SoundBank {
    match category {
        Some(SurfaceCategory::Ground | SurfaceCategory::Terrain) => SoundBank::GrassStep,
        Some(SurfaceCategory::Wood) => SoundBank::WoodStep,
        _ => SoundBank::HardStep,
    }
}

/// `None` for weightless steps.
pub fn footstep_cue(step: &PlayerFootstep, rng: &mut impl Rng) -> Option<SoundCue> {
    if step.weight == 0.0 {
        return None;
    }
    Some(SoundCue {
        pitch: rng.random_range(0.9..1.1) / step.weight * 1.2,
        ..SoundCue::at(
            step_bank(step.category),
            step.position,
            step.weight.clamp(0.0, 2.0),
        )
    })
}

/// Landing thud scaled linearly between the min and max forces.
pub fn impact_cue(position: Vec3, magnitude: f32) -> Option<SoundCue> {
    if magnitude <= IMPACT_MIN_FORCE {
        return None;
    }
    let volume = (magnitude.min(IMPACT_MAX_FORCE) - IMPACT_MIN_FORCE)
        / (IMPACT_MAX_FORCE - IMPACT_MIN_FORCE);
    Some(SoundCue::at(SoundBank::Land, position, volume))
}

/// Tracks when the enemy's current vocalisation finishes.
#[derive(Resource, Debug, Default)]
pub struct EnemyVoice {
    busy_until: f32,
}

impl EnemyVoice {
    /// Growls never cut each other off.
    pub fn growl(&mut self, now: f32, position: Vec3) -> Option<SoundCue> {
        if now < self.busy_until {
            return None;
        }
        self.busy_until = now + GROWL_PLAY_WINDOW;
        Some(SoundCue::at(SoundBank::Growl, position, 1.0))
    }

    /// A roar always plays and replaces any growl in progress.
    pub fn roar(&mut self, now: f32, position: Vec3) -> SoundCue {
        self.busy_until = now + ROAR_PLAY_WINDOW;
        SoundCue::at(SoundBank::Roar, position, 1.0)
    }
}

fn footstep_cues(mut steps: MessageReader<PlayerFootstep>, mut cues: MessageWriter<SoundCue>) {
    let mut rng = rand::rng();
    for step in steps.read() {
        if let Some(cue) = footstep_cue(step, &mut rng) {
            cues.write(cue);
        }
    }
}

fn impact_cues(
    mut lands: MessageReader<PlayerLands>,
    mut hits: MessageReader<HitGround>,
    mut cues: MessageWriter<SoundCue>,
) {
    let impacts = lands
        .read()
        .map(|land| (land.position, land.magnitude))
        .chain(hits.read().map(|hit| (hit.position, hit.magnitude)));
    for (position, magnitude) in impacts {
        if let Some(cue) = impact_cue(position, magnitude) {
            cues.write(cue);
        }
    }
}

fn enemy_cues(
    time: Res<Time>,
    mut voice: ResMut<EnemyVoice>,
    mut growls: MessageReader<EnemyGrowl>,
    mut roars: MessageReader<EnemyRoar>,
    mut cues: MessageWriter<SoundCue>,
) {
    let now = time.elapsed_secs();
    for roar in roars.read() {
        cues.write(voice.roar(now, roar.position));
    }
    for growl in growls.read() {
        if let Some(cue) = voice.growl(now, growl.position) {
            cues.write(cue);
        }
    }
}

pub(super) fn plugin(app: &mut App) {
    app.add_message::<SoundCue>();
    app.init_resource::<EnemyVoice>();
    app.add_systems(
        Update,
        (footstep_cues, impact_cues, enemy_cues).run_if(in_state(Screen::Gameplay)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn step(weight: f32, category: Option<SurfaceCategory>) -> PlayerFootstep {
        PlayerFootstep {
            position: Vec3::ZERO,
            weight,
            surface: None,
            category,
        }
    }

    #[test]
    fn test_weightless_step_is_silent() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(footstep_cue(&step(0.0, None), &mut rng).is_none());
    }

    #[test]
    fn test_footstep_pitch_and_volume() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let cue = footstep_cue(&step(2.0, None), &mut rng).unwrap();
            assert!(cue.pitch >= 0.9 / 2.0 * 1.2 - 1e-5);
            assert!(cue.pitch <= 1.1 / 2.0 * 1.2 + 1e-5);
        }
        let loud = footstep_cue(&step(3.5, None), &mut rng).unwrap();
        assert_eq!(loud.volume, 2.0);
        assert_eq!(loud.min_distance, MIN_AUDIBLE_DISTANCE);
        assert_eq!(loud.max_distance, MAX_AUDIBLE_DISTANCE);
    }

    #[test]
    fn test_step_bank_follows_surface() {
        assert_eq!(step_bank(Some(SurfaceCategory::Terrain)), SoundBank::GrassStep);
        assert_eq!(step_bank(Some(SurfaceCategory::Wood)), SoundBank::WoodStep);
        assert_eq!(step_bank(Some(SurfaceCategory::Hazard)), SoundBank::HardStep);
        assert_eq!(step_bank(None), SoundBank::HardStep);
    }

    #[test]
    fn test_impact_volume_scale() {
        assert!(impact_cue(Vec3::ZERO, 6.0).is_none());
        let mid = impact_cue(Vec3::ZERO, 33.0).unwrap();
        assert!((mid.volume - 0.5).abs() < 1e-5);
        let capped = impact_cue(Vec3::ZERO, 500.0).unwrap();
        assert_eq!(capped.volume, 1.0);
        assert_eq!(capped.bank, SoundBank::Land);
    }

    #[test]
    fn test_growl_suppressed_while_playing() {
        let mut voice = EnemyVoice::default();
        assert!(voice.growl(0.0, Vec3::ZERO).is_some());
        assert!(voice.growl(1.0, Vec3::ZERO).is_none());
        assert!(voice.growl(GROWL_PLAY_WINDOW + 0.1, Vec3::ZERO).is_some());
    }

    #[test]
    fn test_roar_interrupts_and_blocks_growl() {
        let mut voice = EnemyVoice::default();
        voice.growl(0.0, Vec3::ZERO);
        let roar = voice.roar(0.5, Vec3::ZERO);
        assert_eq!(roar.volume, 1.0);
        assert!(voice.growl(0.5 + ROAR_PLAY_WINDOW - 0.1, Vec3::ZERO).is_none());
    }
}
