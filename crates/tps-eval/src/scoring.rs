//! Evaluation of individual criteria against a single point.

use tps_core::{
    rng, unparse, words, Criterion, QueryContext, TacticalPoint, Token, TokenCategory, Vec3,
    Vocabulary,
};

use crate::error::EvalFailure;
use crate::extender::ExtenderRegistry;
use crate::object::{resolve_from_context, ObjectRef};

/// Length of the line of fire used by `crossesLineOfFire`.
pub const LINE_OF_FIRE_LENGTH: f32 = 30.0;

/// Value ranges of the core real-valued words, used to normalise weights.
pub fn core_range(token: Token) -> Option<(f32, f32)> {
    let range = match token {
        words::DISTANCE
        | words::PATH_DISTANCE
        | words::CHANGE_IN_DISTANCE
        | words::DISTANCE_IN_DIRECTION
        | words::DISTANCE_LEFT
        | words::DISTANCE_TO_RAY
        | words::ABS_DISTANCE_TO_PLANE
        | words::HOSTILES_DISTANCE
        | words::FRIENDLY_DISTANCE => (0.0, 50.0),
        words::DISTANCE_2D => (0.0, 1000.0),
        words::DIRECTNESS
        | words::DOT
        | words::OBJECTS_DOT
        | words::OBJECTS_MOVE_DIR_DOT
        | words::POINT_DIR_DOT
        | words::CAMERA_CENTER => (-1.0, 1.0),
        words::HEIGHT_RELATIVE => (-20.0, 20.0),
        words::ANGLE_OF_ELEVATION => (-90.0, 90.0),
        words::COVER_HEIGHT | words::EFFECTIVE_COVER_HEIGHT => (0.0, 20.0),
        words::COVER_RADIUS | words::COVER_DENSITY => (0.1, 5.0),
        words::RATIO_OF_DISTANCE
        | words::RANDOM
        | words::TYPE
        | words::BULLET_IMPACTS => (0.0, 1.0),
        _ => return None,
    };
    Some(range)
}

/// Maps `value` from `[min, max]` onto `[0, 1]`, clamping outliers.
pub fn normalise(value: f32, min: f32, max: f32) -> f32 {
    if max <= min || value.is_nan() {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Evaluates criteria for one query context, deferring to language extenders for words the
/// engine has no built-in meaning for.
#[derive(Clone, Copy)]
pub struct Scorer<'a> {
    vocabulary: &'a Vocabulary,
    extenders: &'a ExtenderRegistry,
    context: &'a QueryContext,
    warnings: bool,
}

impl<'a> Scorer<'a> {
    pub fn new(
        vocabulary: &'a Vocabulary,
        extenders: &'a ExtenderRegistry,
        context: &'a QueryContext,
    ) -> Self {
        Self {
            vocabulary,
            extenders,
            context,
            warnings: true,
        }
    }

    pub fn with_warnings(mut self, warnings: bool) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn context(&self) -> &'a QueryContext {
        self.context
    }

    pub fn vocabulary(&self) -> &'a Vocabulary {
        self.vocabulary
    }

    pub(crate) fn extenders(&self) -> &'a ExtenderRegistry {
        self.extenders
    }

    pub(crate) fn warnings(&self) -> bool {
        self.warnings
    }

    fn name(&self, token: Token) -> String {
        self.vocabulary.describe(token)
    }

    pub fn object(&self, token: Token) -> Result<ObjectRef, EvalFailure> {
        if token.category() != TokenCategory::Object {
            return Err(EvalFailure::WrongCategory(self.name(token)));
        }
        if let Some(object) = resolve_from_context(token, self.context) {
            return Ok(object);
        }
        let name = self.name(token);
        self.extenders
            .first(|e| e.object(&name, self.context))
            .ok_or(EvalFailure::ObjectUnavailable(name))
    }

    pub(crate) fn criterion_object(&self, criterion: &Criterion) -> Result<ObjectRef, EvalFailure> {
        let token = criterion
            .object()
            .ok_or_else(|| EvalFailure::MissingObject(self.name(criterion.query())))?;
        self.object(token)
    }

    pub fn bool_property(&self, token: Token, point: &TacticalPoint) -> Result<bool, EvalFailure> {
        let name = self.name(token);
        self.extenders
            .first(|e| e.bool_property(&name, self.context, point))
            .ok_or(EvalFailure::Unhandled(name))
    }

    pub fn bool_test(
        &self,
        token: Token,
        object: &ObjectRef,
        point: &TacticalPoint,
    ) -> Result<bool, EvalFailure> {
        if let Some(result) = self.core_test(token, object, point) {
            return Ok(result);
        }
        let name = self.name(token);
        self.extenders
            .first(|e| e.bool_test(&name, self.context, object, point))
            .ok_or(EvalFailure::Unhandled(name))
    }

    pub fn real_property(&self, token: Token, point: &TacticalPoint) -> Result<f32, EvalFailure> {
        if token == words::RANDOM {
            return Ok(rng::point_unit(self.context.seed, point.position));
        }
        let name = self.name(token);
        self.extenders
            .first(|e| e.real_property(&name, self.context, point))
            .ok_or(EvalFailure::Unhandled(name))
    }

    pub fn real_measure(
        &self,
        token: Token,
        object: &ObjectRef,
        point: &TacticalPoint,
    ) -> Result<f32, EvalFailure> {
        if let Some(result) = self.core_measure(token, object, point) {
            return Ok(result);
        }
        let name = self.name(token);
        self.extenders
            .first(|e| e.real_measure(&name, self.context, object, point))
            .ok_or(EvalFailure::Unhandled(name))
    }

    pub fn real_range(&self, token: Token) -> Result<(f32, f32), EvalFailure> {
        if let Some(range) = core_range(token) {
            return Ok(range);
        }
        let name = self.name(token);
        self.extenders
            .first(|e| e.real_range(&name))
            .ok_or(EvalFailure::NoRange(name))
    }

    /// Does the point satisfy a non-deferred condition?
    pub fn test(&self, criterion: &Criterion, point: &TacticalPoint) -> Result<bool, EvalFailure> {
        self.test_inner(criterion, point)
            .inspect_err(|err| self.report(criterion, err))
    }

    /// Normalised `[0, 1]` result of a weight criterion for the point.
    pub fn weight(&self, criterion: &Criterion, point: &TacticalPoint) -> Result<f32, EvalFailure> {
        self.weight_inner(criterion, point)
            .inspect_err(|err| self.report(criterion, err))
    }

    fn test_inner(
        &self,
        criterion: &Criterion,
        point: &TacticalPoint,
    ) -> Result<bool, EvalFailure> {
        let query = criterion.query();
        match criterion.category() {
            TokenCategory::BoolProperty => {
                Ok(self.bool_property(query, point)? == criterion.value_as_bool())
            }
            TokenCategory::Test => {
                let object = self.criterion_object(criterion)?;
                Ok(self.bool_test(query, &object, point)? == criterion.value_as_bool())
            }
            TokenCategory::RealProperty | TokenCategory::Measure => {
                let limit = criterion
                    .limit()
                    .ok_or_else(|| EvalFailure::WrongCategory(self.name(query)))?;
                let result = self.real_value(criterion, point)?;
                Ok(limit.check(result, criterion.value_as_float()))
            }
            _ => Err(EvalFailure::WrongCategory(self.name(query))),
        }
    }

    fn weight_inner(
        &self,
        criterion: &Criterion,
        point: &TacticalPoint,
    ) -> Result<f32, EvalFailure> {
        let query = criterion.query();
        let passed = match criterion.category() {
            TokenCategory::BoolProperty => self.bool_property(query, point)?,
            TokenCategory::Test => {
                let object = self.criterion_object(criterion)?;
                self.bool_test(query, &object, point)?
            }
            TokenCategory::RealProperty | TokenCategory::Measure => {
                let result = self.real_value(criterion, point)?;
                let (min, max) = self.real_range(query)?;
                return Ok(normalise(result, min, max));
            }
            _ => return Err(EvalFailure::WrongCategory(self.name(query))),
        };
        Ok(bool_score(passed))
    }

    fn real_value(&self, criterion: &Criterion, point: &TacticalPoint) -> Result<f32, EvalFailure> {
        let query = criterion.query();
        let value = if criterion.category() == TokenCategory::Measure {
            let object = self.criterion_object(criterion)?;
            self.real_measure(query, &object, point)?
        } else {
            self.real_property(query, point)?
        };
        Ok(value)
    }

    fn report(&self, criterion: &Criterion, err: &EvalFailure) {
        if self.warnings {
            let spec = unparse(self.vocabulary, criterion).unwrap_or_default();
            tracing::warn!(criterion = %spec, error = %err, "criterion could not be evaluated");
        }
    }

    fn core_test(&self, token: Token, object: &ObjectRef, point: &TacticalPoint) -> Option<bool> {
        let actor = self.context.actor_pos;
        let p = point.position;
        let o = object.position;
        let result = match token {
            words::TOWARDS => {
                let to_point = p - actor;
                let to_object = o - actor;
                to_point.dot(to_object) >= 0.0
                    && to_point.length_squared() <= to_object.length_squared()
            }
            words::CAN_REACH_BEFORE => p.distance_squared(actor) < p.distance_squared(o),
            words::CROSSES_LINE_OF_FIRE => {
                let fire_end = o + object.direction.normalized_or_zero() * LINE_OF_FIRE_LENGTH;
                tps_core::math::segments_intersect_2d(o, fire_end, actor, p)
            }
            words::OTHER_SIDE => {
                let from_object_to_actor = (actor - o).normalized_or_zero();
                let from_object_to_point = (p - o).normalized_or_zero();
                from_object_to_actor.dot(from_object_to_point) < 0.0
            }
            _ => return None,
        };
        Some(result)
    }

    fn core_measure(&self, token: Token, object: &ObjectRef, point: &TacticalPoint) -> Option<f32> {
        let actor = self.context.actor_pos;
        let p = point.position;
        let o = object.position;
        let result = match token {
            words::DISTANCE => p.distance(o),
            words::DISTANCE_2D => p.distance_2d(o),
            words::CHANGE_IN_DISTANCE => p.distance(o) - actor.distance(o),
            words::DISTANCE_IN_DIRECTION => (p - actor).dot((o - actor).normalized_or_zero()),
            words::DISTANCE_LEFT => {
                // Positive to the left of the actor-to-object line.
                let left = Vec3::UP.cross((o - actor).normalized_or_zero());
                (p - actor).dot(left)
            }
            words::RATIO_OF_DISTANCE => {
                let reference = o.distance_2d(actor);
                if reference > 0.0 {
                    p.distance_2d(actor) / reference
                } else {
                    0.0
                }
            }
            words::DIRECTNESS => {
                let travelled = p.distance_2d(actor);
                if travelled > 0.0 {
                    (o.distance_2d(actor) - o.distance_2d(p)) / travelled
                } else {
                    0.0
                }
            }
            words::DOT => (o - actor)
                .normalized_or_zero()
                .dot((p - actor).normalized_or_zero()),
            words::OBJECTS_DOT | words::OBJECTS_MOVE_DIR_DOT => object
                .direction
                .normalized_or_zero()
                .dot((p - o).normalized_or_zero()),
            words::HEIGHT_RELATIVE => p.z - o.z,
            words::ANGLE_OF_ELEVATION => {
                let delta = p - o;
                delta.z.atan2(delta.length_2d()).to_degrees()
            }
            words::POINT_DIR_DOT => match point.direction {
                Some(facing) => facing
                    .normalized_or_zero()
                    .dot((o - p).normalized_or_zero()),
                None => 0.0,
            },
            words::DISTANCE_TO_RAY => {
                let dir = object.direction.normalized_or_zero();
                let offset = p - o;
                let along = dir.dot(offset);
                if along <= 0.0 {
                    offset.length()
                } else {
                    (offset.length_squared() - along * along).max(0.0).sqrt()
                }
            }
            words::ABS_DISTANCE_TO_PLANE => {
                let dir = object.direction.normalized_or_zero();
                (dir.dot(actor - o) - dir.dot(p - o)).abs()
            }
            _ => return None,
        };
        Some(result)
    }
}

fn bool_score(passed: bool) -> f32 {
    if passed {
        1.0
    } else {
        0.0
    }
}
