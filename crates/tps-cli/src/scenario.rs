//! Scenario files: a query context plus a tiny stand-in world.
//!
//! Generators return the listed points that lie within the search distance of the
//! generator's object. Rays and shooting postures are blocked by spherical occluders;
//! path distance is the straight-line distance.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tps_core::{QueryContext, TacticalPoint, Vec3};
use tps_eval::{DeferredRequest, DeferredValue, FnDeferredService, GenerateRequest};
use tps_system::TacticalPointSystem;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub context: QueryContext,
    /// Candidate points per generator word.
    pub generators: BTreeMap<String, Vec<Vec3>>,
    pub occluders: Vec<Occluder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Occluder {
    pub center: Vec3,
    pub radius: f32,
}

impl Occluder {
    /// Does the segment `from..to` pass through this sphere?
    pub fn blocks(&self, from: Vec3, to: Vec3) -> bool {
        let segment = to - from;
        let length_squared = segment.length_squared();
        let t = if length_squared > 0.0 {
            ((self.center - from).dot(segment) / length_squared).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let closest = from + segment * t;
        closest.distance_squared(self.center) <= self.radius * self.radius
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario from {}", path.display()))?;
        let scenario: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse scenario from {}", path.display()))?;
        Ok(scenario)
    }

    /// Registers the scenario's generators and a deferred service backed by its occluders.
    pub fn install(&self, system: &mut TacticalPointSystem) -> Result<()> {
        for (name, points) in &self.generators {
            let points = points.clone();
            system
                .register_generator(
                    name,
                    Box::new(
                        move |request: &GenerateRequest<'_>, out: &mut Vec<TacticalPoint>| {
                            let center = request.object.position;
                            out.extend(
                                points
                                    .iter()
                                    .filter(|p| p.distance(center) <= request.search_distance)
                                    .map(|p| TacticalPoint::new(*p)),
                            );
                            true
                        },
                    ),
                )
                .with_context(|| format!("Cannot register generator `{name}`"))?;
        }

        let occluders = self.occluders.clone();
        system.set_deferred_service(Box::new(FnDeferredService::new(
            move |request: &DeferredRequest| answer(&occluders, request),
        )));
        Ok(())
    }
}

fn answer(occluders: &[Occluder], request: &DeferredRequest) -> DeferredValue {
    let clear = |from: Vec3, to: Vec3| !occluders.iter().any(|o| o.blocks(from, to));
    match *request {
        DeferredRequest::Ray { from, to } => DeferredValue::Clear(clear(from, to)),
        DeferredRequest::ShootingPosture {
            position, target, ..
        } => DeferredValue::Clear(clear(position, target)),
        DeferredRequest::PathDistance { from, to } => DeferredValue::Distance(from.distance(to)),
    }
}
