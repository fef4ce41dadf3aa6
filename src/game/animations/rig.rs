//! Binds a loaded rig to its character and drives the clip weights.

use bevy::prelude::*;

use crate::locomotion::Limb;

use super::params::{AnimationParams, ClipWeights};

/// Mixamo bone names for the four watched limb endpoints, indexed by [`Limb::index`].
pub const MIXAMO_LIMB_BONES: [&str; 4] = ["LeftFoot", "RightFoot", "LeftHand", "RightHand"];

/// Clips and bone names of a rigged character model.
#[derive(Component, Debug, Clone)]
pub struct CharacterModel {
    /// Idle, walk, run and fall, in that order.
    pub clips: [Handle<AnimationClip>; 4],
    pub limb_bones: [String; 4],
}

impl CharacterModel {
    pub fn mixamo(clips: [Handle<AnimationClip>; 4]) -> Self {
        Self {
            clips,
            limb_bones: MIXAMO_LIMB_BONES.map(String::from),
        }
    }
}

/// Skeleton entities standing in for each [`Limb`].
#[derive(Component, Debug, Clone, Default)]
pub struct LimbBones(pub [Option<Entity>; 4]);

impl LimbBones {
    pub fn get(&self, limb: Limb) -> Option<Entity> {
        self.0[limb.index()]
    }

    pub fn bound_count(&self) -> usize {
        self.0.iter().flatten().count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClipNodes {
    pub idle: AnimationNodeIndex,
    pub walk: AnimationNodeIndex,
    pub run: AnimationNodeIndex,
    pub fall: AnimationNodeIndex,
}

/// Links a character to the [`AnimationPlayer`] inside its model.
#[derive(Component, Debug, Clone, Copy)]
pub struct RigBinding {
    pub animation_player: Entity,
    pub nodes: ClipNodes,
}

/// Matches plain and namespaced bone names, e.g. `mixamorig:LeftFoot`.
pub fn bone_matches(name: &str, bone: &str) -> bool {
    name == bone
        || name
            .rsplit_once(':')
            .is_some_and(|(_, suffix)| suffix == bone)
}

/// Creates the animation graph once the model's [`AnimationPlayer`] appears.
pub fn bind_character_rig(
    mut commands: Commands,
    mut graphs: ResMut<Assets<AnimationGraph>>,
    mut new_players: Query<(Entity, &mut AnimationPlayer), Added<AnimationPlayer>>,
    parents: Query<&ChildOf>,
    children: Query<&Children>,
    names: Query<&Name>,
    models: Query<&CharacterModel>,
) {
    for (player_entity, mut animation_player) in &mut new_players {
        let Some((owner, model)) = parents
            .iter_ancestors(player_entity)
            .find_map(|ancestor| models.get(ancestor).ok().map(|model| (ancestor, model)))
        else {
            continue;
        };

        let (graph, nodes) = AnimationGraph::from_clips(model.clips.iter().cloned());
        let &[idle, walk, run, fall] = nodes.as_slice() else {
            warn!("Unexpected clip count in graph for {owner}");
            continue;
        };
        for node in [idle, walk, run, fall] {
            animation_player.play(node).repeat().set_weight(0.0);
        }
        if let Some(active) = animation_player.animation_mut(idle) {
            active.set_weight(1.0);
        }

        let mut limbs = LimbBones::default();
        for bone_entity in children.iter_descendants(owner) {
            let Ok(name) = names.get(bone_entity) else {
                continue;
            };
            for limb in Limb::ALL {
                if bone_matches(name.as_str(), &model.limb_bones[limb.index()]) {
                    limbs.0[limb.index()] = Some(bone_entity);
                }
            }
        }
        if limbs.bound_count() < Limb::ALL.len() {
            warn!(
                "Only {} of {} limb bones found on {owner}; footsteps use those",
                limbs.bound_count(),
                Limb::ALL.len()
            );
        }

        commands
            .entity(player_entity)
            .insert(AnimationGraphHandle(graphs.add(graph)));
        commands.entity(owner).insert((
            RigBinding {
                animation_player: player_entity,
                nodes: ClipNodes {
                    idle,
                    walk,
                    run,
                    fall,
                },
            },
            limbs,
        ));
        info!("Bound animation rig for {owner}");
    }
}

/// Applies published parameters to the clip weights.
pub fn drive_animation_graph(
    mut characters: Query<(&mut AnimationParams, &RigBinding)>,
    mut players: Query<&mut AnimationPlayer>,
) {
    for (mut params, binding) in &mut characters {
        let Ok(mut animation_player) = players.get_mut(binding.animation_player) else {
            continue;
        };
        let weights = ClipWeights::from(&*params);
        let nodes = binding.nodes;
        for (node, weight) in [
            (nodes.idle, weights.idle),
            (nodes.walk, weights.walk),
            (nodes.run, weights.run),
            (nodes.fall, weights.fall),
        ] {
            if let Some(active) = animation_player.animation_mut(node) {
                active.set_weight(weight);
            }
        }
        if params.take_jump() {
            if let Some(active) = animation_player.animation_mut(nodes.fall) {
                active.replay();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bone_names_match_with_namespace() {
        assert!(bone_matches("LeftFoot", "LeftFoot"));
        assert!(bone_matches("mixamorig:LeftFoot", "LeftFoot"));
        assert!(bone_matches("mixamorig12:RightHand", "RightHand"));
        assert!(!bone_matches("mixamorig:LeftFootIndex", "LeftFoot"));
        assert!(!bone_matches("LeftHand", "LeftFoot"));
    }

    #[test]
    fn test_mixamo_model_uses_limb_order() {
        let model = CharacterModel::mixamo(std::array::from_fn(|_| Handle::default()));
        assert_eq!(model.limb_bones[Limb::HindLeft.index()], "LeftFoot");
        assert_eq!(model.limb_bones[Limb::FrontRight.index()], "RightHand");
    }
}
