//! Engine-agnostic character locomotion.
//!
//! Everything in here talks to the world through small traits ([`RayCaster`], [`CharacterBody`],
//! [`InputSource`], [`AnimationSink`], [`LimbSource`]) so it can run against the physics engine
//! in the game or against plain stubs in tests.

pub mod animation;
pub mod controller;
pub mod footstep;
pub mod ground;
pub mod input;
pub mod jump;

pub use animation::{
    AnimParam, AnimationBlend, AnimationBridge, AnimationSink, AnimationTuning, BlendChannel,
    BlendInputs, smooth_damp,
};
pub use controller::{
    CharacterBody, LocomotionController, LocomotionEvent, LocomotionState, LocomotionTuning,
    MovementTuning, PlayerGround, TickContext, TickDeps,
};
pub use footstep::{FootContact, FootstepEvent, FootstepTrigger, FootstepTuning, Limb, LimbSource};
pub use ground::{
    FAR_FROM_GROUND, GroundProbe, GroundState, RayCaster, SurfaceCategory, SurfaceHit, SurfaceMask,
    sense, sense_with_mask,
};
pub use input::{InputSample, InputSource, dead_zone};
pub use jump::{JumpEndReason, JumpSession, JumpTuning, held_jump_gravity};
