//! Gameplay messages published by the character cluster.

use bevy::ecs::message::Message;
use bevy::prelude::*;

use crate::locomotion::{FootstepEvent, JumpEndReason, SurfaceCategory};

/// A limb touched down while the player was moving.
#[derive(Debug, Clone, Copy)]
pub struct PlayerFootstep {
    pub position: Vec3,
    pub weight: f32,
    pub surface: Option<Entity>,
    pub category: Option<SurfaceCategory>,
}

impl Message for PlayerFootstep {}

impl From<FootstepEvent> for PlayerFootstep {
    fn from(step: FootstepEvent) -> Self {
        Self {
            position: step.position,
            weight: step.weight,
            surface: step.surface,
            category: step.category,
        }
    }
}

/// The player touched a ground-like body.
#[derive(Debug, Clone, Copy)]
pub struct PlayerLands {
    pub position: Vec3,
    /// Vertical impulse absorbed by the contact.
    pub magnitude: f32,
}

impl Message for PlayerLands {}

/// Some reporting body struck the ground.
#[derive(Debug, Clone, Copy)]
pub struct HitGround {
    pub position: Vec3,
    pub magnitude: f32,
}

impl Message for HitGround {}

#[derive(Debug, Clone, Copy)]
pub struct PlayerJumped {
    pub position: Vec3,
}

impl Message for PlayerJumped {}

#[derive(Debug, Clone, Copy)]
pub struct PlayerJumpEnded {
    pub reason: JumpEndReason,
}

impl Message for PlayerJumpEnded {}

#[derive(Debug, Clone, Copy)]
pub struct EnemyGrowl {
    pub enemy: Entity,
    pub position: Vec3,
}

impl Message for EnemyGrowl {}

/// The enemy lost the player.
#[derive(Debug, Clone, Copy)]
pub struct EnemyRoar {
    pub enemy: Entity,
    pub position: Vec3,
}

impl Message for EnemyRoar {}

pub(super) fn plugin(app: &mut App) {
    app.add_message::<PlayerFootstep>()
        .add_message::<PlayerLands>()
        .add_message::<HitGround>()
        .add_message::<PlayerJumped>()
        .add_message::<PlayerJumpEnded>()
        .add_message::<EnemyGrowl>()
        .add_message::<EnemyRoar>();
}
