use std::collections::BTreeMap;

use tps_core::{words, Criterion, QueryOption, RelativeValueSource, TacticalPoint, Token, Vec3};

use crate::error::EvalFailure;
use crate::extender::GenerateRequest;
use crate::scoring::Scorer;

/// Most points a single `pureGrid` criterion may produce.
pub const MAX_GRID_POINTS: usize = 1 << 16;

/// Height offsets smaller than this are ignored.
const HEIGHT_EPSILON: f32 = 0.001;

/// Host backend that produces candidate points for one generator word.
pub trait PointGenerator {
    /// Appends points to `out`. Returns `false` when the generator could not run at all;
    /// producing no points is still a successful run.
    fn generate(&self, request: &GenerateRequest<'_>, out: &mut Vec<TacticalPoint>) -> bool;
}

impl<F> PointGenerator for F
where
    F: Fn(&GenerateRequest<'_>, &mut Vec<TacticalPoint>) -> bool,
{
    fn generate(&self, request: &GenerateRequest<'_>, out: &mut Vec<TacticalPoint>) -> bool {
        self(request, out)
    }
}

#[derive(Default)]
pub struct GeneratorRegistry {
    backends: BTreeMap<Token, Box<dyn PointGenerator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the backend for a generator word, returning `true` if one was replaced.
    pub fn register(&mut self, generator: Token, backend: Box<dyn PointGenerator>) -> bool {
        self.backends.insert(generator, backend).is_some()
    }

    pub fn unregister(&mut self, generator: Token) -> bool {
        self.backends.remove(&generator).is_some()
    }

    pub fn contains(&self, generator: Token) -> bool {
        self.backends.contains_key(&generator)
    }
}

impl core::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.backends.keys()).finish()
    }
}

/// Square lattice of points spaced `density` apart covering `search_distance` around `center`.
///
/// Returns `false` for unusable parameters, including grids above [`MAX_GRID_POINTS`].
pub fn pure_grid(
    center: Vec3,
    search_distance: f32,
    density: f32,
    out: &mut Vec<TacticalPoint>,
) -> bool {
    if density.is_nan() || density <= 0.0 || !search_distance.is_finite() || search_distance < 0.0 {
        return false;
    }
    let span = (search_distance * 2.0 / density).floor();
    if !span.is_finite() || span >= MAX_GRID_POINTS as f32 {
        return false;
    }
    let steps = span as usize;
    let total = match (steps + 1).checked_mul(steps + 1) {
        Some(total) if total <= MAX_GRID_POINTS => total,
        _ => {
            tracing::warn!(search_distance, density, "grid too dense, not generating");
            return false;
        }
    };
    let half = density * steps as f32 / 2.0;
    let origin = Vec3::new(center.x - half, center.y - half, center.z);
    out.reserve(total);
    for ix in 0..=steps {
        for iy in 0..=steps {
            let position =
                origin + Vec3::new(ix as f32 * density, iy as f32 * density, 0.0);
            out.push(TacticalPoint::new(position));
        }
    }
    true
}

/// Runs every generation criterion of an option, in order, and returns the combined points.
///
/// Each generator is tried as a built-in, then as a registered backend, then through the
/// language extenders.
pub fn generate_points(
    scorer: &Scorer<'_>,
    generators: &GeneratorRegistry,
    option: &QueryOption,
) -> Result<Vec<TacticalPoint>, EvalFailure> {
    let mut points = Vec::new();
    for criterion in option.generation() {
        generate_one(scorer, generators, option, criterion, &mut points)?;
    }
    Ok(points)
}

fn generate_one(
    scorer: &Scorer<'_>,
    generators: &GeneratorRegistry,
    option: &QueryOption,
    criterion: &Criterion,
    out: &mut Vec<TacticalPoint>,
) -> Result<(), EvalFailure> {
    let context = scorer.context();
    let token = criterion.query();
    let name = scorer.vocabulary().describe(token);

    let object = scorer.criterion_object(criterion)?;
    // The secondary object is optional for the backend; an unresolved one is passed as absent.
    let object_aux = criterion
        .object_aux()
        .and_then(|aux| scorer.object(aux).ok());

    let search_distance = match criterion.relative() {
        Some(RelativeValueSource::ObjectRadius) => context.actor_radius,
        None => criterion.value_as_float(),
    };

    let params = option.params();
    let request = GenerateRequest {
        generator: &name,
        context,
        search_distance,
        params,
        object,
        object_aux,
    };

    let start = out.len();
    let handled = match token {
        words::PURE_GRID => {
            if !pure_grid(object.position, search_distance, params.density, out) {
                return Err(EvalFailure::BadParameters(name));
            }
            true
        }
        words::CURRENT_POS => {
            out.push(TacticalPoint::new(object.position));
            true
        }
        _ => match generators.backends.get(&token) {
            Some(backend) => backend.generate(&request, out),
            None => match scorer.extenders().first(|extender| {
                let mut produced = Vec::new();
                let handled = extender.generate_points(&request, &mut produced);
                (handled && !produced.is_empty()).then_some(produced)
            }) {
                Some(produced) => {
                    out.extend(produced);
                    true
                }
                None => false,
            },
        },
    };
    if !handled {
        return Err(EvalFailure::Unhandled(name));
    }

    if params.height.abs() > HEIGHT_EPSILON {
        for point in &mut out[start..] {
            point.position.z += params.height;
        }
    }
    tracing::trace!(generator = %name, count = out.len() - start, "generated points");
    Ok(())
}
