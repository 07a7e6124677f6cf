#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::context::EntityId;
use crate::Vec3;

/// Backend-defined region a point belongs to (cover surface, nav polygon, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegionId(pub u32);

/// A candidate position.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TacticalPoint {
    pub position: Vec3,
    pub entity: Option<EntityId>,
    pub region: Option<RegionId>,
    /// Facing of the spot itself (e.g. a cover normal), used by `pointDirDot`.
    pub direction: Option<Vec3>,
}

impl TacticalPoint {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            entity: None,
            region: None,
            direction: None,
        }
    }

    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn with_region(mut self, region: RegionId) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_direction(mut self, direction: Vec3) -> Self {
        self.direction = Some(direction);
        self
    }
}

impl From<Vec3> for TacticalPoint {
    fn from(position: Vec3) -> Self {
        Self::new(position)
    }
}
