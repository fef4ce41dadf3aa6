//! Ground sensing: a downward probe that reports the nearest ground-like surface.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Distance reported when nothing ground-like is under the probe.
pub const FAR_FROM_GROUND: f32 = 1000.0;

/// Offset between the probe origin and the bottom of the character capsule.
const CAPSULE_RADIUS_CORRECTION: f32 = 1.0;

/// Readings closer than this are treated as standing on the surface.
const CONTACT_EPSILON: f32 = 0.001;

/// Surface classification resolved once when the level is spawned.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub enum SurfaceCategory {
    /// Floors and platforms.
    Ground,
    /// Large terrain planes.
    Terrain,
    /// Bouncy leaves, logs and other wooden props.
    Wood,
    /// Surfaces the player should never be respawned on.
    Hazard,
    /// Anything else that blocks rays.
    Prop,
}

impl SurfaceCategory {
    pub fn bit(self) -> SurfaceMask {
        match self {
            SurfaceCategory::Ground => SurfaceMask::GROUND,
            SurfaceCategory::Terrain => SurfaceMask::TERRAIN,
            SurfaceCategory::Wood => SurfaceMask::WOOD,
            SurfaceCategory::Hazard => SurfaceMask::HAZARD,
            SurfaceCategory::Prop => SurfaceMask::PROP,
        }
    }

    pub fn is_ground_like(self) -> bool {
        SurfaceMask::GROUND_LIKE.contains(self)
    }
}

/// Bitmask over [`SurfaceCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SurfaceMask(u8);

impl SurfaceMask {
    pub const NONE: Self = Self(0);
    pub const GROUND: Self = Self(1 << 0);
    pub const TERRAIN: Self = Self(1 << 1);
    pub const WOOD: Self = Self(1 << 2);
    pub const HAZARD: Self = Self(1 << 3);
    pub const PROP: Self = Self(1 << 4);

    /// Surfaces a character can stand on and jump from.
    pub const GROUND_LIKE: Self = Self(Self::GROUND.0 | Self::TERRAIN.0);
    /// Every classified surface.
    pub const ALL: Self = Self(
        Self::GROUND.0 | Self::TERRAIN.0 | Self::WOOD.0 | Self::HAZARD.0 | Self::PROP.0,
    );
    /// Surfaces the safety net will record as a recovery point.
    pub const SAFE: Self = Self(Self::GROUND.0 | Self::WOOD.0);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains(self, category: SurfaceCategory) -> bool {
        self.0 & category.bit().0 != 0
    }
}

/// A single intersection reported by a [`RayCaster`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Distance from the ray origin.
    pub distance: f32,
    /// World-space surface normal at the hit point.
    pub normal: Vec3,
    pub surface: Entity,
    /// `None` for colliders that were never classified.
    pub category: Option<SurfaceCategory>,
}

/// Casts straight down through the world and reports every intersection.
pub trait RayCaster {
    /// Hits need not be sorted.
    fn cast_down(&self, origin: Vec3, max_distance: f32) -> Vec<SurfaceHit>;
}

/// Probe tuning shared by the player and the AI.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundProbe {
    /// Steepest surface (degrees from up) that still counts as jumpable.
    pub max_slope_deg: f32,
    /// How far below the character origin to look.
    pub ray_depth: f32,
    /// The origin sits at the feet, so the ray starts this far above it.
    pub origin_offset: f32,
}

impl Default for GroundProbe {
    fn default() -> Self {
        Self {
            max_slope_deg: 45.0,
            ray_depth: 0.1,
            origin_offset: 1.0,
        }
    }
}

/// Footing under a character for one tick.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct GroundState {
    /// Always `>= 0`. [`FAR_FROM_GROUND`] when nothing was found.
    pub distance_to_ground: f32,
    /// Weak reference to the collider under the character.
    pub closest_surface: Option<Entity>,
    pub surface_category: Option<SurfaceCategory>,
    pub is_jumpable: bool,
}

impl GroundState {
    pub const NONE: Self = Self {
        distance_to_ground: FAR_FROM_GROUND,
        closest_surface: None,
        surface_category: None,
        is_jumpable: false,
    };

    /// Whether the probe found any ground-like surface within its reach.
    pub fn has_footing(&self) -> bool {
        self.closest_surface.is_some()
    }
}

impl Default for GroundState {
    fn default() -> Self {
        Self::NONE
    }
}

/// Probe the ground under `position`.
///
/// The ray starts `origin_offset` above `position` and reaches `ray_depth` below it. The nearest
/// ground-like hit wins; non-ground colliders are skipped, whether they are in front of or behind
/// it.
pub fn sense(caster: &impl RayCaster, position: Vec3, probe: &GroundProbe) -> GroundState {
    sense_with_mask(caster, position, probe, SurfaceMask::GROUND_LIKE)
}

/// [`sense`] with a caller-chosen set of accepted surfaces.
pub fn sense_with_mask(
    caster: &impl RayCaster,
    position: Vec3,
    probe: &GroundProbe,
    accepted: SurfaceMask,
) -> GroundState {
    let origin = position + Vec3::Y * probe.origin_offset;
    let total_length = probe.origin_offset + probe.ray_depth;

    let mut hits = caster.cast_down(origin, total_length);
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let Some(hit) = hits.into_iter().find(|hit| {
        hit.distance <= total_length && hit.category.is_some_and(|category| accepted.contains(category))
    }) else {
        return GroundState::NONE;
    };

    let slope = hit.normal.angle_between(Vec3::Y).to_degrees();
    let mut distance = hit.distance - probe.origin_offset - CAPSULE_RADIUS_CORRECTION;
    if distance < CONTACT_EPSILON {
        distance = 0.0;
    }

    GroundState {
        distance_to_ground: distance,
        closest_surface: Some(hit.surface),
        surface_category: hit.category,
        is_jumpable: slope < probe.max_slope_deg,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fixed list of hits, returned regardless of origin.
    pub(crate) struct StubCaster(pub Vec<SurfaceHit>);

    impl RayCaster for StubCaster {
        fn cast_down(&self, _origin: Vec3, max_distance: f32) -> Vec<SurfaceHit> {
            self.0
                .iter()
                .copied()
                .filter(|hit| hit.distance <= max_distance)
                .collect()
        }
    }

    /// Distinct live entity ids to stand in for colliders.
    pub(crate) fn surfaces(count: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..count).map(|_| world.spawn_empty().id()).collect()
    }

    pub(crate) fn hit(distance: f32, surface: Entity, category: SurfaceCategory) -> SurfaceHit {
        SurfaceHit {
            distance,
            normal: Vec3::Y,
            surface,
            category: Some(category),
        }
    }

    #[test]
    fn test_no_hits_reports_far_and_not_jumpable() {
        let state = sense(&StubCaster(vec![]), Vec3::ZERO, &GroundProbe::default());
        assert_eq!(state, GroundState::NONE);
        assert!(!state.is_jumpable);
        assert_eq!(state.distance_to_ground, FAR_FROM_GROUND);
    }

    #[test]
    fn test_only_props_in_range_is_no_ground() {
        let ids = surfaces(1);
        let caster = StubCaster(vec![hit(0.5, ids[0], SurfaceCategory::Prop)]);
        let state = sense(&caster, Vec3::ZERO, &GroundProbe::default());
        assert!(state.closest_surface.is_none());
        assert!(!state.is_jumpable);
    }

    #[test]
    fn test_nearest_ground_wins_over_closer_prop() {
        let ids = surfaces(3);
        let caster = StubCaster(vec![
            hit(1.05, ids[2], SurfaceCategory::Terrain),
            hit(0.4, ids[0], SurfaceCategory::Prop),
            hit(0.9, ids[1], SurfaceCategory::Ground),
        ]);
        let state = sense(&caster, Vec3::ZERO, &GroundProbe::default());
        assert_eq!(state.closest_surface, Some(ids[1]));
        assert_eq!(state.surface_category, Some(SurfaceCategory::Ground));
        assert!(state.is_jumpable);
    }

    #[test]
    fn test_distance_subtracts_offset_and_radius() {
        let probe = GroundProbe {
            ray_depth: 5.0,
            ..default()
        };
        let caster = StubCaster(vec![hit(3.5, surfaces(1)[0], SurfaceCategory::Ground)]);
        let state = sense(&caster, Vec3::ZERO, &probe);
        assert!((state.distance_to_ground - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_penetrating_reading_floors_to_zero() {
        let caster = StubCaster(vec![hit(1.0005, surfaces(1)[0], SurfaceCategory::Ground)]);
        let state = sense(&caster, Vec3::ZERO, &GroundProbe::default());
        assert_eq!(state.distance_to_ground, 0.0);
    }

    #[test]
    fn test_steep_surface_is_not_jumpable() {
        let mut steep = hit(1.0, surfaces(1)[0], SurfaceCategory::Ground);
        steep.normal = Vec3::new(1.0, 0.5, 0.0).normalize();
        let state = sense(&StubCaster(vec![steep]), Vec3::ZERO, &GroundProbe::default());
        assert!(state.has_footing());
        assert!(!state.is_jumpable);
    }

    #[test]
    fn test_gentle_slope_is_jumpable() {
        let mut ramp = hit(1.0, surfaces(1)[0], SurfaceCategory::Terrain);
        ramp.normal = Quat::from_rotation_z(30f32.to_radians()) * Vec3::Y;
        let state = sense(&StubCaster(vec![ramp]), Vec3::ZERO, &GroundProbe::default());
        assert!(state.is_jumpable);
    }

    #[test]
    fn test_custom_mask_accepts_wood() {
        let ids = surfaces(2);
        let caster = StubCaster(vec![
            hit(0.8, ids[0], SurfaceCategory::Wood),
            hit(1.05, ids[1], SurfaceCategory::Ground),
        ]);
        let probe = GroundProbe::default();
        assert_eq!(sense(&caster, Vec3::ZERO, &probe).closest_surface, Some(ids[1]));
        let safe = sense_with_mask(&caster, Vec3::ZERO, &probe, SurfaceMask::SAFE);
        assert_eq!(safe.surface_category, Some(SurfaceCategory::Wood));
    }

    #[test]
    fn test_surface_masks() {
        assert!(SurfaceCategory::Ground.is_ground_like());
        assert!(SurfaceCategory::Terrain.is_ground_like());
        assert!(!SurfaceCategory::Wood.is_ground_like());
        assert!(SurfaceMask::SAFE.contains(SurfaceCategory::Wood));
        assert!(!SurfaceMask::SAFE.contains(SurfaceCategory::Hazard));
        assert!(SurfaceMask::NONE.union(SurfaceMask::PROP).contains(SurfaceCategory::Prop));
    }
}
