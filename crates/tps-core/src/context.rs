#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Host-side identifier of a simulation entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityId(pub u64);

/// Snapshot of the querying actor and its surroundings, captured when a query is submitted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct QueryContext {
    pub actor: Option<EntityId>,
    pub actor_pos: Vec3,
    pub actor_dir: Vec3,
    pub actor_radius: f32,
    /// Weapon muzzle relative to the actor position.
    pub fire_offset: Vec3,
    pub attention_target: Option<Vec3>,
    pub attention_target_dir: Vec3,
    pub real_target: Option<Vec3>,
    pub real_target_dir: Vec3,
    pub reference_point: Option<Vec3>,
    pub reference_point_dir: Vec3,
    pub player: Option<Vec3>,
    pub distance_to_cover: f32,
    /// Seed for the `random` property.
    pub seed: u64,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self {
            actor: None,
            actor_pos: Vec3::ZERO,
            actor_dir: Vec3::new(0.0, 1.0, 0.0),
            actor_radius: 0.5,
            fire_offset: Vec3::new(0.0, 0.0, 1.5),
            attention_target: None,
            attention_target_dir: Vec3::new(0.0, 1.0, 0.0),
            real_target: None,
            real_target_dir: Vec3::new(0.0, 1.0, 0.0),
            reference_point: None,
            reference_point_dir: Vec3::new(0.0, 1.0, 0.0),
            player: None,
            distance_to_cover: 0.0,
            seed: 0,
        }
    }
}

impl QueryContext {
    pub fn new(actor_pos: Vec3) -> Self {
        Self {
            actor_pos,
            ..Self::default()
        }
    }

    pub fn with_actor(mut self, actor: EntityId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_actor_dir(mut self, dir: Vec3) -> Self {
        self.actor_dir = dir;
        self
    }

    pub fn with_attention_target(mut self, pos: Vec3) -> Self {
        self.attention_target = Some(pos);
        self
    }

    pub fn with_reference_point(mut self, pos: Vec3, dir: Vec3) -> Self {
        self.reference_point = Some(pos);
        self.reference_point_dir = dir;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
