use avian3d::prelude::*;
use bevy::prelude::*;

use crate::{
    game::{
        animations::{AnimationParams, LimbBones},
        configs::LocomotionConfig,
        events::{PlayerFootstep, PlayerJumpEnded, PlayerJumped},
        physics::{GroundContacts, SurfaceProbe},
    },
    locomotion::{
        AnimationSink, CharacterBody, InputSource, Limb, LimbSource, LocomotionEvent, TickContext,
        TickDeps,
    },
};

use super::{CharacterInput, FeetOffset, GroundReport, Locomotor};

/// [`CharacterBody`] over an avian dynamic body.
///
/// Horizontal motion is written as velocity so the solver resolves collisions; vertical motion is
/// left to the impulse and the custom gravity.
pub struct AvianBody<'a> {
    pub transform: &'a mut Transform,
    pub velocity: &'a mut LinearVelocity,
    pub angular_velocity: &'a mut AngularVelocity,
    pub inverse_mass: f32,
    pub feet_offset: f32,
}

impl CharacterBody for AvianBody<'_> {
    fn position(&self) -> Vec3 {
        self.transform.translation - Vec3::Y * self.feet_offset
    }

    fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    fn linear_velocity(&self) -> Vec3 {
        self.velocity.0
    }

    fn translate(&mut self, delta: Vec3, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.velocity.x = delta.x / dt;
        self.velocity.z = delta.z / dt;
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
    }

    fn apply_impulse(&mut self, impulse: Vec3) {
        self.velocity.0 += impulse * self.inverse_mass;
    }

    fn accelerate(&mut self, acceleration: Vec3, dt: f32) {
        self.velocity.0 += acceleration * dt;
    }

    fn clear_angular_velocity(&mut self) {
        self.angular_velocity.0 = Vec3::ZERO;
    }
}

/// Kinematic stand-in for characters spawned without a rigid body. Cannot jump or fall.
pub struct TransformBody<'a> {
    pub transform: &'a mut Transform,
    pub feet_offset: f32,
}

impl CharacterBody for TransformBody<'_> {
    fn position(&self) -> Vec3 {
        self.transform.translation - Vec3::Y * self.feet_offset
    }

    fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    fn linear_velocity(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn translate(&mut self, delta: Vec3, _dt: f32) {
        self.transform.translation += delta;
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
    }

    fn apply_impulse(&mut self, _impulse: Vec3) {}

    fn accelerate(&mut self, _acceleration: Vec3, _dt: f32) {}

    fn clear_angular_velocity(&mut self) {}
}

/// Limb endpoints read from the skeleton's global transforms this tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoneLimbs(pub [Option<Vec3>; 4]);

impl BoneLimbs {
    pub fn read(bones: &LimbBones, transforms: &Query<&GlobalTransform>) -> Self {
        Self(Limb::ALL.map(|limb| {
            bones
                .get(limb)
                .and_then(|bone| transforms.get(bone).ok())
                .map(GlobalTransform::translation)
        }))
    }
}

impl LimbSource for BoneLimbs {
    fn limb_position(&self, limb: Limb) -> Option<Vec3> {
        self.0[limb.index()]
    }
}

/// Optional collaborators a character was spawned without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MissingDependencies {
    pub input: bool,
    pub body: bool,
    pub animator: bool,
}

impl MissingDependencies {
    pub fn is_empty(&self) -> bool {
        !(self.input || self.body || self.animator)
    }

    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.input, "input"),
            (self.body, "rigid body"),
            (self.animator, "animator"),
        ]
        .into_iter()
        .filter_map(|(missing, name)| missing.then_some(name))
        .collect()
    }
}

pub fn report_missing_dependencies(
    characters: Query<
        (
            Entity,
            Option<&Name>,
            Has<CharacterInput>,
            Has<LinearVelocity>,
            Has<AnimationParams>,
        ),
        Added<Locomotor>,
    >,
) {
    for (entity, name, has_input, has_body, has_animator) in &characters {
        let missing = MissingDependencies {
            input: !has_input,
            body: !has_body,
            animator: !has_animator,
        };
        if missing.is_empty() {
            continue;
        }
        let label = name.map_or_else(|| entity.to_string(), |name| name.to_string());
        warn!(
            "{label} is missing {}; those features are disabled",
            missing.names().join(", ")
        );
    }
}

/// Push config changes into every controller.
pub fn sync_tuning(config: Res<LocomotionConfig>, mut locomotors: Query<&mut Locomotor>) {
    if !config.is_changed() {
        return;
    }
    let tuning = config.tuning();
    for mut locomotor in &mut locomotors {
        locomotor.tuning = tuning;
    }
}

pub fn drive_locomotion(
    time: Res<Time>,
    gravity: Res<Gravity>,
    surface_probe: SurfaceProbe,
    bone_transforms: Query<&GlobalTransform>,
    mut characters: Query<(
        Entity,
        &mut Locomotor,
        &mut Transform,
        &FeetOffset,
        &mut GroundReport,
        Option<(&mut LinearVelocity, &mut AngularVelocity, &ComputedMass)>,
        Option<&mut CharacterInput>,
        Option<&GroundContacts>,
        (Option<&LimbBones>, Option<&mut AnimationParams>),
    )>,
    mut footsteps: MessageWriter<PlayerFootstep>,
    mut jumps: MessageWriter<PlayerJumped>,
    mut jump_ends: MessageWriter<PlayerJumpEnded>,
) {
    let ctx = TickContext {
        now: time.elapsed_secs(),
        dt: time.delta_secs(),
        ambient_gravity: gravity.0.y,
    };

    for (
        entity,
        mut locomotor,
        mut transform,
        feet_offset,
        mut report,
        body_parts,
        mut input,
        contacts,
        (limb_bones, mut animation),
    ) in &mut characters
    {
        let caster = surface_probe.caster(entity);
        let limbs = limb_bones.map(|bones| BoneLimbs::read(bones, &bone_transforms));
        let input_source = input.as_deref().map(|input| input as &dyn InputSource);
        let sink = animation
            .as_deref_mut()
            .map(|params| params as &mut dyn AnimationSink);
        let ground_contacts = contacts.map_or(0, GroundContacts::count);
        let limbs = limbs.as_ref().map(|limbs| limbs as &dyn LimbSource);

        let events = match body_parts {
            Some((mut velocity, mut angular_velocity, mass)) => {
                let mut body = AvianBody {
                    transform: &mut transform,
                    velocity: &mut velocity,
                    angular_velocity: &mut angular_velocity,
                    inverse_mass: mass.inverse(),
                    feet_offset: feet_offset.0,
                };
                locomotor.tick(
                    ctx,
                    TickDeps {
                        ground: &caster,
                        body: &mut body,
                        ground_contacts,
                        input: input_source,
                        animation: sink,
                        limbs,
                        can_jump: true,
                    },
                )
            }
            None => {
                let mut body = TransformBody {
                    transform: &mut transform,
                    feet_offset: feet_offset.0,
                };
                locomotor.tick(
                    ctx,
                    TickDeps {
                        ground: &caster,
                        body: &mut body,
                        ground_contacts,
                        input: input_source,
                        animation: sink,
                        limbs,
                        can_jump: false,
                    },
                )
            }
        };

        if let Some(input) = input.as_mut() {
            input.consume_edges();
        }
        report.0 = *locomotor.player_ground();

        for event in events {
            match event {
                LocomotionEvent::Footstep(step) => {
                    footsteps.write(step.into());
                }
                LocomotionEvent::Jumped { position } => {
                    jumps.write(PlayerJumped { position });
                }
                LocomotionEvent::JumpEnded { reason } => {
                    debug!("Jump ended: {reason:?}");
                    jump_ends.write(PlayerJumpEnded { reason });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependencies_names() {
        let missing = MissingDependencies {
            input: true,
            animator: true,
            ..default()
        };
        assert!(!missing.is_empty());
        assert_eq!(missing.names(), vec!["input", "animator"]);
        assert!(MissingDependencies::default().is_empty());
    }

    #[test]
    fn test_avian_body_writes_horizontal_velocity() {
        let mut transform = Transform::from_xyz(0.0, 1.0, 0.0);
        let mut velocity = LinearVelocity(Vec3::new(0.0, -3.0, 0.0));
        let mut angular_velocity = AngularVelocity(Vec3::Y);
        let mut body = AvianBody {
            transform: &mut transform,
            velocity: &mut velocity,
            angular_velocity: &mut angular_velocity,
            inverse_mass: 0.5,
            feet_offset: 1.0,
        };

        assert_eq!(body.position(), Vec3::ZERO);
        body.translate(Vec3::new(0.1, 0.0, -0.2), 0.1);
        body.apply_impulse(Vec3::Y * 8.0);
        body.clear_angular_velocity();

        assert_eq!(velocity.0, Vec3::new(1.0, 1.0, -2.0));
        assert_eq!(angular_velocity.0, Vec3::ZERO);
    }

    #[test]
    fn test_transform_body_moves_directly() {
        let mut transform = Transform::default();
        let mut body = TransformBody {
            transform: &mut transform,
            feet_offset: 1.0,
        };
        body.translate(Vec3::X, 0.0);
        body.apply_impulse(Vec3::Y * 100.0);
        assert_eq!(transform.translation, Vec3::X);
    }
}
