//! Per-tick character locomotion.
//!
//! Idle/moving/turning/airborne are recomputed every tick from the raw signals rather than stored,
//! so a missed engine callback can never leave the character in a stale state. Only the jump is
//! sequential, and it lives in [`JumpSession`].

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
    animation::{AnimParam, AnimationBlend, AnimationBridge, AnimationSink, AnimationTuning, BlendInputs},
    footstep::{FootstepEvent, FootstepTrigger, FootstepTuning, LimbSource},
    ground::{GroundProbe, GroundState, RayCaster, sense},
    input::{InputSample, InputSource, dead_zone},
    jump::{JumpEndReason, JumpSession, JumpTuning, held_jump_gravity, within_window},
};

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementTuning {
    /// Forward speed at full input (units per second).
    pub base_speed: f32,
    /// Turn rate at full input (degrees per second).
    pub turn_speed: f32,
    pub run_multiplier: f32,
    pub dead_zone: f32,
    /// Fraction of `turn_speed` used when turning without moving.
    pub in_place_turn_factor: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            base_speed: 5.0,
            turn_speed: 45.0,
            run_multiplier: 1.8,
            dead_zone: 0.05,
            in_place_turn_factor: 0.6,
        }
    }
}

/// Everything the controller needs to be tuned with.
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionTuning {
    pub movement: MovementTuning,
    pub jump: JumpTuning,
    pub ground: GroundProbe,
    pub footsteps: FootstepTuning,
    pub animation: AnimationTuning,
}

/// The rigid body being driven. Positions are at the character's feet.
pub trait CharacterBody {
    fn position(&self) -> Vec3;
    fn rotation(&self) -> Quat;
    fn linear_velocity(&self) -> Vec3;
    /// Move by `delta` this tick, letting the physics engine resolve collisions.
    fn translate(&mut self, delta: Vec3, dt: f32);
    fn set_rotation(&mut self, rotation: Quat);
    fn apply_impulse(&mut self, impulse: Vec3);
    fn accelerate(&mut self, acceleration: Vec3, dt: f32);
    fn clear_angular_velocity(&mut self);
}

/// Timing for one physics tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    /// Simulation time in seconds.
    pub now: f32,
    pub dt: f32,
    /// Engine gravity along Y, used as the held-jump limit.
    pub ambient_gravity: f32,
}

/// Collaborators handed to the controller each tick.
///
/// Optional ones may be missing; the features they drive are skipped.
pub struct TickDeps<'a, R: RayCaster, B: CharacterBody> {
    pub ground: &'a R,
    pub body: &'a mut B,
    /// Number of ground-like bodies currently touching the character.
    pub ground_contacts: u32,
    pub input: Option<&'a dyn InputSource>,
    pub animation: Option<&'a mut dyn AnimationSink>,
    pub limbs: Option<&'a dyn LimbSource>,
    /// The jump needs an impulse-capable body.
    pub can_jump: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum LocomotionEvent {
    Footstep(FootstepEvent),
    Jumped { position: Vec3 },
    JumpEnded { reason: JumpEndReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub struct LocomotionState {
    pub velocity: Vec3,
    pub facing_rotation: Quat,
    pub is_grounded: bool,
    pub is_moving: bool,
    pub is_turning: bool,
    pub is_running: bool,
    pub jump_held: bool,
    pub jump_elapsed: f32,
}

/// Grounding result published for other systems, notably enemy AI.
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub struct PlayerGround {
    pub is_grounded: bool,
    pub ground: GroundState,
}

#[derive(Debug, Clone, Default, Reflect)]
pub struct LocomotionController {
    pub tuning: LocomotionTuning,
    state: LocomotionState,
    jump: Option<JumpSession>,
    footsteps: FootstepTrigger,
    animation: AnimationBridge,
    ground: PlayerGround,
    /// Most recent jump press, kept for other systems that react to timing.
    last_jump_press: Option<f32>,
    /// Press waiting for footing; cleared when a jump consumes it.
    buffered_press: Option<f32>,
    /// Last tick the character stood on ground without a jump in progress.
    last_grounded: Option<f32>,
    last_jump_start: Option<f32>,
}

impl LocomotionController {
    pub fn new(tuning: LocomotionTuning) -> Self {
        Self {
            tuning,
            ..default()
        }
    }

    pub fn state(&self) -> &LocomotionState {
        &self.state
    }

    pub fn player_ground(&self) -> &PlayerGround {
        &self.ground
    }

    pub fn jump_session(&self) -> Option<&JumpSession> {
        self.jump.as_ref()
    }

    /// Simulation time of the most recent jump press, if any.
    pub fn last_jump_press(&self) -> Option<f32> {
        self.last_jump_press
    }

    pub fn animation_blend(&self) -> AnimationBlend {
        self.animation.blend()
    }

    /// Run one physics tick and return what happened.
    pub fn tick<R: RayCaster, B: CharacterBody>(
        &mut self,
        ctx: TickContext,
        deps: TickDeps<'_, R, B>,
    ) -> Vec<LocomotionEvent> {
        let TickDeps {
            ground: caster,
            body,
            ground_contacts,
            input,
            animation,
            limbs,
            can_jump,
        } = deps;
        let movement = self.tuning.movement;
        let mut events = Vec::new();

        let input = input.and_then(|source| source.sample()).unwrap_or_default();
        let forward = dead_zone(input.forward, movement.dead_zone);
        let mut turn = dead_zone(input.turn, movement.dead_zone);
        if forward < 0.0 {
            turn = -turn;
        }
        let is_moving = forward != 0.0;
        let is_turning = turn != 0.0;

        let ground = sense(caster, body.position(), &self.tuning.ground);
        let is_grounded = ground.has_footing() || ground_contacts > 0;

        let is_running = input.run_held && is_moving;
        let speed_multiplier = if is_running { movement.run_multiplier } else { 1.0 };

        let facing = body.rotation();
        let delta = facing * Vec3::NEG_Z * forward * movement.base_speed * speed_multiplier * ctx.dt;
        body.translate(delta, ctx.dt);

        let mut rotation = facing;
        if is_turning {
            let rate = if is_moving {
                movement.turn_speed
            } else {
                movement.turn_speed * movement.in_place_turn_factor
            };
            let degrees = turn * rate * ctx.dt;
            rotation = facing * Quat::from_rotation_y(-degrees.to_radians());
            body.set_rotation(rotation);
        }
        body.clear_angular_velocity();

        let held_gravity = self.update_jump(ctx, &input, is_grounded, can_jump, body, &mut events);
        let gravity = if held_gravity {
            held_jump_gravity(self.tuning.jump.gravity, self.tuning.jump.jump_gravity, ctx.ambient_gravity)
        } else {
            self.tuning.jump.gravity
        };
        body.accelerate(Vec3::Y * gravity, ctx.dt);

        let horizontal = if ctx.dt > 0.0 { delta / ctx.dt } else { Vec3::ZERO };
        self.state = LocomotionState {
            velocity: Vec3::new(horizontal.x, body.linear_velocity().y, horizontal.z),
            facing_rotation: rotation,
            is_grounded,
            is_moving,
            is_turning,
            is_running,
            jump_held: input.jump_held,
            jump_elapsed: self.jump.map_or(0.0, |session| session.elapsed(ctx.now)),
        };
        self.ground = PlayerGround { is_grounded, ground };

        if is_moving || is_turning {
            if let Some(limbs) = limbs {
                if let Some(step) = self.footsteps.update(
                    limbs,
                    body.position().y,
                    is_running,
                    &ground,
                    &self.tuning.footsteps,
                ) {
                    events.push(LocomotionEvent::Footstep(step));
                }
            }
        }

        self.animation.update(
            BlendInputs {
                moving: is_moving,
                turning: is_turning,
                running: is_running,
                grounded: is_grounded,
            },
            &self.tuning.animation,
            ctx.dt,
        );
        if let Some(sink) = animation {
            self.animation.publish(sink);
            if events.iter().any(|e| matches!(e, LocomotionEvent::Jumped { .. })) {
                sink.set_trigger(AnimParam::Jump);
            }
        }

        events
    }

    /// Start or end the jump session. Returns whether the held-jump gravity applies this tick.
    fn update_jump<B: CharacterBody>(
        &mut self,
        ctx: TickContext,
        input: &InputSample,
        is_grounded: bool,
        can_jump: bool,
        body: &mut B,
        events: &mut Vec<LocomotionEvent>,
    ) -> bool {
        let tuning = self.tuning.jump;
        if input.jump_pressed {
            self.last_jump_press = Some(ctx.now);
            self.buffered_press = Some(ctx.now);
        }
        let recently_jumped = within_window(self.last_jump_start, ctx.now, tuning.coyote_time);
        if is_grounded && self.jump.is_none() && !recently_jumped {
            self.last_grounded = Some(ctx.now);
        }

        let pressed = within_window(self.buffered_press, ctx.now, tuning.buffer_time);
        let footing = is_grounded || within_window(self.last_grounded, ctx.now, tuning.coyote_time);
        if can_jump && pressed && footing && self.jump.is_none() {
            let mut session = JumpSession::start(ctx.now);
            body.apply_impulse(Vec3::Y * tuning.jump_force);
            session.applied_impulse = true;
            self.jump = Some(session);
            self.buffered_press = None;
            self.last_grounded = None;
            self.last_jump_start = Some(ctx.now);
            tracing::debug!(now = ctx.now, grounded = is_grounded, "jump started");
            events.push(LocomotionEvent::Jumped {
                position: body.position(),
            });
        }

        let Some(session) = self.jump.as_mut() else {
            return false;
        };
        let held = input.jump_held && !input.jump_released;
        session.held = held;

        match session.check_end(ctx.now, held, is_grounded, &self.tuning.jump) {
            Some(reason) => {
                tracing::debug!(?reason, elapsed = session.elapsed(ctx.now), "jump ended");
                self.jump = None;
                events.push(LocomotionEvent::JumpEnded { reason });
                false
            }
            None => true,
        }
    }
}
