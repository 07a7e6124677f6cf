#![cfg(feature = "system")]

use tps::prelude::*;

#[test]
fn prelude_is_enough_to_run_a_query() {
    let mut system = TacticalPointSystem::new(EngineConfig::default());
    system
        .register_generator(
            "grid",
            Box::new(|_: &GenerateRequest<'_>, out: &mut Vec<TacticalPoint>| {
                out.push(TacticalPoint::new(Vec3::new(4.0, 0.0, 0.0)));
                out.push(TacticalPoint::new(Vec3::new(1.0, 0.0, 0.0)));
                true
            }),
        )
        .unwrap();
    let id = system.create_query("Closest").unwrap();
    system
        .add_to_generation(id, 0, "grid_around_puppet", 10.0)
        .unwrap();
    system
        .add_to_weights(id, 0, "distance_from_puppet", -1.0)
        .unwrap();

    let best = system
        .sync_query_best(id, QueryContext::new(Vec3::ZERO))
        .unwrap()
        .unwrap();
    assert_eq!(best.point.position, Vec3::new(1.0, 0.0, 0.0));
}

#[cfg(feature = "serde")]
#[test]
fn points_serialize_with_the_serde_feature() {
    let point = TacticalPoint::new(Vec3::new(1.0, 2.0, 3.0));
    let json = serde_json::to_string(&point).unwrap();
    let back: TacticalPoint = serde_json::from_str(&json).unwrap();
    assert_eq!(back, point);
}
