//! Core words of the query language.
//!
//! Every core word has a stable token below its category's extension start. [`CORE_WORDS`]
//! is the table a fresh [`Vocabulary`](crate::Vocabulary) is seeded from.

use crate::token::{CostClass, Token, TokenCategory};

const fn bool_prop(index: u16) -> Token {
    Token::new(TokenCategory::BoolProperty, index)
}
const fn real_prop(index: u16) -> Token {
    Token::new(TokenCategory::RealProperty, index)
}
const fn test(index: u16) -> Token {
    Token::new(TokenCategory::Test, index)
}
const fn measure(index: u16) -> Token {
    Token::new(TokenCategory::Measure, index)
}
const fn generator(index: u16) -> Token {
    Token::new(TokenCategory::Generator, index)
}
const fn generator_o(index: u16) -> Token {
    Token::new(TokenCategory::GeneratorWithObject, index)
}
const fn object(index: u16) -> Token {
    Token::new(TokenCategory::Object, index)
}

pub const COVER_SOFT: Token = bool_prop(0);
pub const COVER_SUPERIOR: Token = bool_prop(1);
pub const COVER_INFERIOR: Token = bool_prop(2);
pub const CURRENTLY_USED_OBJECT: Token = bool_prop(3);
pub const REACHABLE: Token = bool_prop(4);
pub const IS_IN_NAVIGATION_MESH: Token = bool_prop(5);

pub const COVER_RADIUS: Token = real_prop(0);
pub const COVER_DENSITY: Token = real_prop(1);
pub const BULLET_IMPACTS: Token = real_prop(2);
pub const CAMERA_CENTER: Token = real_prop(3);
pub const HOSTILES_DISTANCE: Token = real_prop(4);
pub const FRIENDLY_DISTANCE: Token = real_prop(5);
pub const RANDOM: Token = real_prop(6);
pub const TYPE: Token = real_prop(7);

pub const VISIBLE: Token = test(0);
pub const CAN_SHOOT: Token = test(1);
pub const CAN_SHOOT_TWO_RAY_TEST: Token = test(2);
pub const TOWARDS: Token = test(3);
pub const CAN_REACH_BEFORE: Token = test(4);
pub const CROSSES_LINE_OF_FIRE: Token = test(5);
pub const HAS_SHOOTING_POSTURE: Token = test(6);
pub const OTHER_SIDE: Token = test(7);

pub const DISTANCE: Token = measure(0);
pub const DISTANCE_2D: Token = measure(1);
pub const PATH_DISTANCE: Token = measure(2);
pub const CHANGE_IN_DISTANCE: Token = measure(3);
pub const DISTANCE_IN_DIRECTION: Token = measure(4);
pub const DISTANCE_LEFT: Token = measure(5);
pub const RATIO_OF_DISTANCE: Token = measure(6);
pub const DIRECTNESS: Token = measure(7);
pub const DOT: Token = measure(8);
pub const OBJECTS_DOT: Token = measure(9);
pub const OBJECTS_MOVE_DIR_DOT: Token = measure(10);
pub const HEIGHT_RELATIVE: Token = measure(11);
pub const ANGLE_OF_ELEVATION: Token = measure(12);
pub const POINT_DIR_DOT: Token = measure(13);
pub const COVER_HEIGHT: Token = measure(14);
pub const EFFECTIVE_COVER_HEIGHT: Token = measure(15);
pub const DISTANCE_TO_RAY: Token = measure(16);
pub const ABS_DISTANCE_TO_PLANE: Token = measure(17);

pub const GRID: Token = generator(0);
pub const ENTITIES: Token = generator(1);
pub const INDOOR: Token = generator(2);
pub const CURRENT_POS: Token = generator(3);
pub const CURRENT_COVER: Token = generator(4);
pub const CURRENT_FORMATION_POS: Token = generator(5);
pub const OBJECTS: Token = generator(6);
pub const POINTS_IN_NAVIGATION_MESH: Token = generator(7);
pub const PURE_GRID: Token = generator(8);

pub const HIDESPOTS: Token = generator_o(0);
pub const COVER: Token = generator_o(1);

pub const NONE: Token = object(0);
pub const PUPPET: Token = object(1);
pub const ATTENTION_TARGET: Token = object(2);
pub const REAL_TARGET: Token = object(3);
pub const REFERENCE_POINT: Token = object(4);
pub const REFERENCE_POINT_OFFSET: Token = object(5);
pub const ENTITY: Token = object(6);
pub const CURRENT_FORMATION_REF: Token = object(7);
pub const PLAYER: Token = object(8);
pub const LEADER: Token = object(9);
pub const LAST_OP: Token = object(10);

pub const MIN: Token = Token::new(TokenCategory::Limit, 0);
pub const MAX: Token = Token::new(TokenCategory::Limit, 1);
pub const EQUAL: Token = Token::new(TokenCategory::Limit, 2);

pub const GLUE: Token = Token::new(TokenCategory::Glue, 0);
pub const AROUND: Token = Token::new(TokenCategory::Around, 0);

/// Synonyms that all translate to [`GLUE`]. The reverse lookup yields `glue`.
pub const GLUE_WORDS: [&str; 7] = ["glue", "from", "to", "at", "the", "of", "for"];

/// `(token, name, cost)` for every core word. Costs are only given for scoring words.
pub const CORE_WORDS: &[(Token, &str, Option<CostClass>)] = &[
    (COVER_SOFT, "coverSoft", Some(CostClass::Cheap)),
    (COVER_SUPERIOR, "coverSuperior", Some(CostClass::Cheap)),
    (COVER_INFERIOR, "coverInferior", Some(CostClass::Cheap)),
    (CURRENTLY_USED_OBJECT, "currentlyUsedObject", Some(CostClass::Cheap)),
    (REACHABLE, "reachable", Some(CostClass::Expensive)),
    (IS_IN_NAVIGATION_MESH, "isInNavigationMesh", Some(CostClass::Medium)),
    (COVER_RADIUS, "coverRadius", Some(CostClass::Cheap)),
    (COVER_DENSITY, "coverDensity", Some(CostClass::Expensive)),
    (BULLET_IMPACTS, "bulletImpacts", Some(CostClass::Expensive)),
    (CAMERA_CENTER, "cameraCenter", Some(CostClass::Medium)),
    (HOSTILES_DISTANCE, "hostilesDistance", Some(CostClass::Medium)),
    (FRIENDLY_DISTANCE, "friendlyDistance", Some(CostClass::Medium)),
    (RANDOM, "random", Some(CostClass::Cheap)),
    (TYPE, "type", Some(CostClass::Cheap)),
    (VISIBLE, "visible", Some(CostClass::Deferred)),
    (CAN_SHOOT, "canShoot", Some(CostClass::Deferred)),
    (CAN_SHOOT_TWO_RAY_TEST, "canShootTwoRayTest", Some(CostClass::Deferred)),
    (TOWARDS, "towards", Some(CostClass::Cheap)),
    (CAN_REACH_BEFORE, "canReachBefore", Some(CostClass::Cheap)),
    (CROSSES_LINE_OF_FIRE, "crossesLineOfFire", Some(CostClass::Cheap)),
    (HAS_SHOOTING_POSTURE, "hasShootingPosture", Some(CostClass::Deferred)),
    (OTHER_SIDE, "otherSide", Some(CostClass::Cheap)),
    (DISTANCE, "distance", Some(CostClass::Cheap)),
    (DISTANCE_2D, "distance2d", Some(CostClass::Cheap)),
    (PATH_DISTANCE, "pathDistance", Some(CostClass::Deferred)),
    (CHANGE_IN_DISTANCE, "changeInDistance", Some(CostClass::Cheap)),
    (DISTANCE_IN_DIRECTION, "distanceInDirection", Some(CostClass::Cheap)),
    (DISTANCE_LEFT, "distanceLeft", Some(CostClass::Cheap)),
    (
        RATIO_OF_DISTANCE,
        "ratioOfDistanceFromActorAndDistance",
        Some(CostClass::Cheap),
    ),
    (DIRECTNESS, "directness", Some(CostClass::Cheap)),
    (DOT, "dot", Some(CostClass::Cheap)),
    (OBJECTS_DOT, "objectsDot", Some(CostClass::Cheap)),
    (OBJECTS_MOVE_DIR_DOT, "objectsMoveDirDot", Some(CostClass::Cheap)),
    (HEIGHT_RELATIVE, "heightRelative", Some(CostClass::Cheap)),
    (ANGLE_OF_ELEVATION, "angleOfElevation", Some(CostClass::Cheap)),
    (POINT_DIR_DOT, "pointDirDot", Some(CostClass::Cheap)),
    (COVER_HEIGHT, "coverHeight", Some(CostClass::Cheap)),
    (EFFECTIVE_COVER_HEIGHT, "effectiveCoverHeight", Some(CostClass::Expensive)),
    (DISTANCE_TO_RAY, "distanceToRay", Some(CostClass::Cheap)),
    (
        ABS_DISTANCE_TO_PLANE,
        "absDistanceToPlaneAtClosestRayPos",
        Some(CostClass::Cheap),
    ),
    (GRID, "grid", None),
    (ENTITIES, "entities", None),
    (INDOOR, "indoor", None),
    (CURRENT_POS, "currentPos", None),
    (CURRENT_COVER, "currentCover", None),
    (CURRENT_FORMATION_POS, "currentFormationPos", None),
    (OBJECTS, "objects", None),
    (POINTS_IN_NAVIGATION_MESH, "pointsInNavigationMesh", None),
    (PURE_GRID, "pureGrid", None),
    (HIDESPOTS, "hidespots", None),
    (COVER, "cover", None),
    (NONE, "none", None),
    (PUPPET, "puppet", None),
    (ATTENTION_TARGET, "attentionTarget", None),
    (REAL_TARGET, "realTarget", None),
    (REFERENCE_POINT, "referencePoint", None),
    (
        REFERENCE_POINT_OFFSET,
        "referencePointOffsettedByItsForwardDirection",
        None,
    ),
    (ENTITY, "entity", None),
    (CURRENT_FORMATION_REF, "currentFormationRef", None),
    (PLAYER, "player", None),
    (LEADER, "leader", None),
    (LAST_OP, "lastOp", None),
    (MIN, "min", None),
    (MAX, "max", None),
    (EQUAL, "equal", None),
    (AROUND, "around", None),
];
