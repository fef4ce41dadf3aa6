//! Bridges avian's spatial queries and contacts to the locomotion core.

use avian3d::prelude::*;
use bevy::{ecs::system::SystemParam, prelude::*};

use crate::{
    game::events::{HitGround, PlayerLands},
    locomotion::{RayCaster, SurfaceCategory, SurfaceHit},
};

/// Minimum impulse for a [`HitGroundReporter`] touch to count.
pub const HIT_GROUND_MIN_IMPULSE: f32 = 0.5;

/// Upper bound on intersections gathered by one downward probe.
const PROBE_MAX_HITS: u32 = 8;

#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum GameLayer {
    #[default]
    Default,
    Ground,
    Character,
    Enemy,
}

/// Layers the ground probe can see.
pub fn probe_filter(exclude: Entity) -> SpatialQueryFilter {
    SpatialQueryFilter::from_mask([GameLayer::Default, GameLayer::Ground])
        .with_excluded_entities([exclude])
}

/// Spatial queries plus surface classification, for building [`PhysicsRayCaster`]s.
#[derive(SystemParam)]
pub struct SurfaceProbe<'w, 's> {
    spatial_query: SpatialQuery<'w, 's>,
    surfaces: Query<'w, 's, &'static SurfaceCategory>,
}

impl<'w, 's> SurfaceProbe<'w, 's> {
    /// A caster that ignores `exclude`, usually the character doing the probing.
    pub fn caster(&self, exclude: Entity) -> PhysicsRayCaster<'_, 'w, 's> {
        PhysicsRayCaster {
            probe: self,
            exclude,
        }
    }
}

/// [`RayCaster`] backed by avian's spatial query pipeline.
pub struct PhysicsRayCaster<'a, 'w, 's> {
    probe: &'a SurfaceProbe<'w, 's>,
    exclude: Entity,
}

impl RayCaster for PhysicsRayCaster<'_, '_, '_> {
    fn cast_down(&self, origin: Vec3, max_distance: f32) -> Vec<SurfaceHit> {
        self.probe
            .spatial_query
            .ray_hits(
                origin,
                Dir3::NEG_Y,
                max_distance,
                PROBE_MAX_HITS,
                true,
                &probe_filter(self.exclude),
            )
            .into_iter()
            .map(|hit| SurfaceHit {
                distance: hit.distance,
                normal: hit.normal,
                surface: hit.entity,
                category: self.probe.surfaces.get(hit.entity).ok().copied(),
            })
            .collect()
    }
}

/// Ground-like bodies currently touching this one.
#[derive(Component, Debug, Clone, Default)]
pub struct GroundContacts {
    touching: Vec<Entity>,
    /// Vertical speed at the end of the previous physics tick.
    last_vertical_speed: f32,
    /// Distance from the transform origin down to the feet.
    feet_offset: f32,
}

impl GroundContacts {
    pub fn with_feet_offset(feet_offset: f32) -> Self {
        Self {
            feet_offset,
            ..default()
        }
    }

    pub fn count(&self) -> u32 {
        self.touching.len() as u32
    }

    pub fn is_touching(&self, surface: Entity) -> bool {
        self.touching.contains(&surface)
    }

    /// Returns `true` if `surface` was not already touching.
    pub fn enter(&mut self, surface: Entity) -> bool {
        if self.is_touching(surface) {
            return false;
        }
        self.touching.push(surface);
        true
    }

    /// Returns `true` if `surface` was touching.
    pub fn exit(&mut self, surface: Entity) -> bool {
        let before = self.touching.len();
        self.touching.retain(|&touching| touching != surface);
        self.touching.len() != before
    }
}

/// Emits [`HitGround`] when this body strikes the ground.
#[derive(Component, Debug, Default)]
pub struct HitGroundReporter;

/// Emits [`PlayerLands`] when this body touches the ground.
#[derive(Component, Debug, Default)]
pub struct LandingReporter;

pub fn track_ground_contacts(
    surfaces: Query<&SurfaceCategory>,
    mut bodies: Query<(
        &Transform,
        &CollidingEntities,
        &mut GroundContacts,
        Option<&LinearVelocity>,
        Option<&ComputedMass>,
        Has<LandingReporter>,
        Has<HitGroundReporter>,
    )>,
    mut lands: MessageWriter<PlayerLands>,
    mut hits: MessageWriter<HitGround>,
) {
    for (transform, colliding, mut contacts, velocity, mass, reports_landing, reports_hits) in
        &mut bodies
    {
        let is_ground = |entity: &Entity| {
            surfaces
                .get(*entity)
                .is_ok_and(|category| category.is_ground_like())
        };
        let magnitude =
            mass.map_or(1.0, |mass| mass.value()) * contacts.last_vertical_speed.abs();
        let position = transform.translation - Vec3::Y * contacts.feet_offset;

        let current: Vec<Entity> = colliding.iter().copied().filter(is_ground).collect();
        for &surface in &current {
            if !contacts.enter(surface) {
                continue;
            }
            if reports_landing {
                lands.write(PlayerLands {
                    position,
                    magnitude,
                });
            }
            if reports_hits && magnitude > HIT_GROUND_MIN_IMPULSE {
                hits.write(HitGround {
                    position,
                    magnitude,
                });
            }
        }

        let departed: Vec<Entity> = contacts
            .touching
            .iter()
            .copied()
            .filter(|surface| !current.contains(surface))
            .collect();
        for surface in departed {
            contacts.exit(surface);
        }

        contacts.last_vertical_speed = velocity.map_or(0.0, |velocity| velocity.y);
    }
}
