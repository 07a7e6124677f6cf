use tps_core::{words, EntityId, QueryContext, Token, Vec3};

/// A resolved object word: where it is and which way it faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectRef {
    pub position: Vec3,
    pub direction: Vec3,
    pub entity: Option<EntityId>,
}

impl ObjectRef {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            direction: Vec3::UP,
            entity: None,
        }
    }

    pub fn with_direction(mut self, direction: Vec3) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }
}

/// Distance ahead of the reference point used by
/// `referencePointOffsettedByItsForwardDirection`.
pub const REFERENCE_FORWARD_OFFSET: f32 = 10.0;

/// Resolves the core object words that only need the query context.
///
/// `None` means the word is either not a context word or the context lacks it; the caller
/// then asks language extenders.
pub fn resolve_from_context(token: Token, context: &QueryContext) -> Option<ObjectRef> {
    let actor = || {
        let object = ObjectRef::at(context.actor_pos).with_direction(context.actor_dir);
        match context.actor {
            Some(id) => object.with_entity(id),
            None => object,
        }
    };
    match token {
        words::NONE => Some(ObjectRef::at(Vec3::ZERO)),
        words::PUPPET => Some(actor()),
        words::ENTITY => context.actor.map(|_| actor()),
        words::ATTENTION_TARGET => context
            .attention_target
            .map(|p| ObjectRef::at(p).with_direction(context.attention_target_dir)),
        words::REAL_TARGET => match context.real_target {
            Some(p) => Some(ObjectRef::at(p).with_direction(context.real_target_dir)),
            None => context
                .attention_target
                .map(|p| ObjectRef::at(p).with_direction(context.attention_target_dir)),
        },
        words::REFERENCE_POINT => context
            .reference_point
            .map(|p| ObjectRef::at(p).with_direction(context.reference_point_dir)),
        words::REFERENCE_POINT_OFFSET => context.reference_point.map(|p| {
            let forward = context.reference_point_dir.normalized_or_zero();
            ObjectRef::at(p + forward * REFERENCE_FORWARD_OFFSET)
                .with_direction(context.reference_point_dir)
        }),
        words::PLAYER => context.player.map(ObjectRef::at),
        _ => None,
    }
}
