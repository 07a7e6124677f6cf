use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tps_core::{
    words, Query, QueryContext, QueryFlags, QueryInstance, QueryTicket, TacticalPoint, Vec3,
    Vocabulary,
};
use tps_eval::trace;
use tps_eval::{
    DeferredInbox, DeferredReply, DeferredRequest, DeferredService, DeferredValue, EvalEnv,
    EvalSettings, EvalState, ExtenderRegistry, FnDeferredService, GenerateRequest,
    GeneratorRegistry, PointState, QueryEvaluation, ResultLocks, VecTraceSink,
};

struct Fixture {
    vocabulary: Vocabulary,
    extenders: ExtenderRegistry,
    generators: GeneratorRegistry,
    locks: ResultLocks,
    inbox: DeferredInbox,
    trace: VecTraceSink,
    service: Option<Box<dyn DeferredService>>,
    settings: EvalSettings,
}

impl Fixture {
    /// `grid` yields exactly `points`; `cover` yields nothing.
    fn new(points: Vec<Vec3>) -> Self {
        let mut generators = GeneratorRegistry::new();
        generators.register(
            words::GRID,
            Box::new(
                move |_: &GenerateRequest<'_>, out: &mut Vec<TacticalPoint>| {
                    out.extend(points.iter().copied().map(TacticalPoint::new));
                    true
                },
            ),
        );
        generators.register(
            words::COVER,
            Box::new(|_: &GenerateRequest<'_>, _: &mut Vec<TacticalPoint>| true),
        );
        Self {
            vocabulary: Vocabulary::with_core_words(),
            extenders: ExtenderRegistry::new(),
            generators,
            locks: ResultLocks::new(),
            inbox: DeferredInbox::new(),
            trace: VecTraceSink::default(),
            service: None,
            settings: EvalSettings {
                warnings: false,
                ..EvalSettings::default()
            },
        }
    }

    fn step(
        &mut self,
        query: &Query,
        evaluation: &mut QueryEvaluation,
        budget: Duration,
    ) -> EvalState {
        for completion in self.inbox.drain() {
            evaluation.deliver(&completion);
        }
        let deferred = match self.service.as_mut() {
            Some(service) => Some(&mut **service as &mut dyn DeferredService),
            None => None,
        };
        let mut env = EvalEnv {
            vocabulary: &self.vocabulary,
            query: Some(query),
            extenders: &self.extenders,
            generators: &self.generators,
            locks: &self.locks,
            inbox: &self.inbox,
            deferred,
            trace: &mut self.trace,
            settings: self.settings,
        };
        evaluation.advance(&mut env, Instant::now() + budget)
    }

    fn run(&mut self, query: &Query, evaluation: &mut QueryEvaluation) -> EvalState {
        for _ in 0..10_000 {
            let state = self.step(query, evaluation, Duration::from_secs(1));
            if state.is_finished() {
                return state;
            }
        }
        panic!("evaluation did not finish");
    }
}

/// Holds every reply so tests decide when each request is answered.
#[derive(Default)]
struct HeldReplies {
    replies: Rc<RefCell<Vec<(DeferredRequest, DeferredReply)>>>,
}

impl DeferredService for HeldReplies {
    fn submit(&mut self, request: DeferredRequest, reply: DeferredReply) {
        self.replies.borrow_mut().push((request, reply));
    }
}

fn instance(count: usize) -> QueryInstance {
    QueryInstance {
        ticket: QueryTicket(1),
        query: tps_core::QueryId(1),
        context: QueryContext::new(Vec3::ZERO)
            .with_attention_target(Vec3::new(10.0, 0.0, 0.0)),
        count,
        flags: QueryFlags::empty(),
    }
}

fn line_points() -> Vec<Vec3> {
    [3.0, 12.0, 1.0, 20.0, 6.0]
        .into_iter()
        .map(|x| Vec3::new(x, 0.0, 0.0))
        .collect()
}

#[test]
fn condition_rejects_far_points_and_keeps_near_ones() {
    let mut fixture = Fixture::new(vec![Vec3::new(15.0, 0.0, 0.0), Vec3::new(30.0, 0.0, 0.0)]);
    let mut query = Query::new("Near");
    let option = query.option_mut(0).unwrap();
    option
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    option
        .add_to_conditions(&fixture.vocabulary, "max_distance_from_attentionTarget", 8.0)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(5));
    assert_eq!(fixture.run(&query, &mut evaluation), EvalState::Completed);

    let results = evaluation.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].point.position, Vec3::new(15.0, 0.0, 0.0));
    assert_eq!(evaluation.rejected().len(), 1);
}

#[test]
fn best_points_come_out_in_descending_score_order() {
    let mut fixture = Fixture::new(line_points());
    let mut query = Query::new("Closest");
    let option = query.option_mut(0).unwrap();
    option
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    // Zero expensive weights are dropped instead of evaluated.
    option
        .add_to_weights(&fixture.vocabulary, "coverDensity", 0.0)
        .unwrap();
    option
        .add_to_weights(&fixture.vocabulary, "distance_from_puppet", -1.0)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(3));
    assert_eq!(fixture.run(&query, &mut evaluation), EvalState::Completed);

    let xs: Vec<f32> = evaluation
        .results()
        .iter()
        .map(|r| r.point.position.x)
        .collect();
    assert_eq!(xs, vec![1.0, 3.0, 6.0]);

    let scores: Vec<f32> = evaluation.results().iter().map(|r| r.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(evaluation.result_option(), Some(0));
}

#[test]
fn equal_scores_accept_exactly_n_points() {
    let mut fixture = Fixture::new(vec![Vec3::new(2.0, 2.0, 0.0); 5]);
    let mut query = Query::new("Ties");
    query
        .option_mut(0)
        .unwrap()
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 5.0)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(2));
    assert_eq!(fixture.run(&query, &mut evaluation), EvalState::Completed);

    assert_eq!(evaluation.accepted().len(), 2);
    assert_eq!(evaluation.in_heap(), 3);
}

#[test]
fn bounds_only_ever_tighten() {
    let mut fixture = Fixture::new(line_points());
    let mut query = Query::new("Bounds");
    let option = query.option_mut(0).unwrap();
    option
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    for (spec, weight) in [
        ("distance_from_attentionTarget", -2.0),
        ("dot_to_attentionTarget", 1.5),
        ("heightRelative_to_attentionTarget", 0.5),
    ] {
        option
            .add_to_weights(&fixture.vocabulary, spec, weight)
            .unwrap();
    }

    // A zero threshold makes every weight expensive, so each one narrows a bound.
    let mut evaluation = QueryEvaluation::new(instance(5));
    let settings = EvalSettings {
        cheap_cost_threshold: 0,
        warnings: false,
    };
    {
        let deferred: Option<&mut dyn DeferredService> = None;
        let mut env = EvalEnv {
            vocabulary: &fixture.vocabulary,
            query: Some(&query),
            extenders: &fixture.extenders,
            generators: &fixture.generators,
            locks: &fixture.locks,
            inbox: &fixture.inbox,
            deferred,
            trace: &mut fixture.trace,
            settings,
        };
        let state = evaluation.advance(&mut env, Instant::now() + Duration::from_secs(5));
        assert_eq!(state, EvalState::Completed);
    }

    let narrowed: Vec<_> = fixture
        .trace
        .events
        .iter()
        .filter(|e| e.tag == trace::POINT_NARROWED)
        .collect();
    assert!(!narrowed.is_empty());

    for point in line_points() {
        let mut last = (f32::NEG_INFINITY, f32::INFINITY);
        for event in narrowed.iter().filter(|e| e.position == Some(point)) {
            assert!(event.a >= last.0 - 1e-5, "min decreased for {point:?}");
            assert!(event.b <= last.1 + 1e-5, "max increased for {point:?}");
            assert!(event.a <= event.b + 1e-5);
            last = (event.a, event.b);
        }
    }
}

#[test]
fn rejected_points_never_come_back() {
    let mut fixture = Fixture::new(line_points());
    let mut query = Query::new("Filtered");
    let option = query.option_mut(0).unwrap();
    option
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    option
        .add_to_conditions(&fixture.vocabulary, "min_distance_from_puppet", 4.0)
        .unwrap();
    option
        .add_to_weights(&fixture.vocabulary, "distance_from_puppet", -1.0)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(5));
    fixture.run(&query, &mut evaluation);

    let rejected: Vec<Vec3> = evaluation
        .rejected()
        .iter()
        .map(|e| e.point.position)
        .collect();
    assert_eq!(rejected.len(), 2);
    for result in evaluation.results() {
        assert!(!rejected.contains(&result.point.position));
        assert!(result.point.position.x > 4.0);
    }
    assert_eq!(evaluation.results().len(), 3);
}

#[test]
fn empty_option_falls_back_to_the_next() {
    let mut fixture = Fixture::new(line_points());
    let mut query = Query::new("Fallback");
    query
        .option_mut(0)
        .unwrap()
        .add_to_generation(
            &fixture.vocabulary,
            "cover_from_attentionTarget_around_puppet",
            10.0,
        )
        .unwrap();
    let second = query.option_mut(1).unwrap();
    second
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    second
        .add_to_conditions(&fixture.vocabulary, "max_distance_from_puppet", 100.0)
        .unwrap();
    let third = query.option_mut(2).unwrap();
    third
        .add_to_generation(&fixture.vocabulary, "currentPos_around_puppet", 0.0)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(1));
    assert_eq!(fixture.run(&query, &mut evaluation), EvalState::Completed);
    assert_eq!(evaluation.result_option(), Some(1));
}

#[test]
fn exhausting_every_option_completes_empty() {
    let mut fixture = Fixture::new(line_points());
    let mut query = Query::new("Hopeless");
    let option = query.option_mut(0).unwrap();
    option
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    option
        .add_to_conditions(&fixture.vocabulary, "min_distance_from_puppet", 1000.0)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(3));
    assert_eq!(fixture.run(&query, &mut evaluation), EvalState::Completed);
    assert!(evaluation.results().is_empty());
    assert_eq!(evaluation.result_option(), None);
}

#[test]
fn zero_budget_advances_one_stage_at_a_time() {
    let mut fixture = Fixture::new(line_points());
    let mut query = Query::new("Sliced");
    let option = query.option_mut(0).unwrap();
    option
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    option
        .add_to_weights(&fixture.vocabulary, "coverDensity", 0.0)
        .unwrap();
    option
        .add_to_weights(&fixture.vocabulary, "distance_from_puppet", -1.0)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(5));
    assert_eq!(
        fixture.step(&query, &mut evaluation, Duration::ZERO),
        EvalState::Initialized
    );
    assert_eq!(
        fixture.step(&query, &mut evaluation, Duration::ZERO),
        EvalState::HeapEvaluation
    );
    let mut steps = 2;
    while !fixture
        .step(&query, &mut evaluation, Duration::ZERO)
        .is_finished()
    {
        steps += 1;
        assert!(steps < 1000);
    }
    assert!(steps > 3);
    assert_eq!(evaluation.results().len(), 5);
}

#[test]
fn deferred_tests_wait_for_their_answers() {
    let mut fixture = Fixture::new(line_points());
    // Rays towards the target are blocked when they start beyond x = 5.
    fixture.service = Some(Box::new(FnDeferredService::new(|request: &DeferredRequest| {
        match request {
            DeferredRequest::Ray { from, .. } => DeferredValue::Clear(from.x <= 5.0),
            _ => DeferredValue::Failed,
        }
    })));
    let mut query = Query::new("Visible");
    let option = query.option_mut(0).unwrap();
    option
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    option
        .add_to_conditions(&fixture.vocabulary, "visible_from_attentionTarget", true)
        .unwrap();
    option
        .add_to_weights(&fixture.vocabulary, "distance_from_puppet", 1.0)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(5));
    let mut waited = false;
    for _ in 0..100 {
        let state = fixture.step(&query, &mut evaluation, Duration::from_secs(1));
        waited |= state == EvalState::WaitingForDeferred;
        if state.is_finished() {
            break;
        }
    }

    assert!(waited);
    assert_eq!(evaluation.state(), EvalState::Completed);
    let xs: Vec<f32> = evaluation
        .results()
        .iter()
        .map(|r| r.point.position.x)
        .collect();
    assert_eq!(xs, vec![3.0, 1.0]);
}

#[test]
fn deferred_test_without_service_rejects() {
    let mut fixture = Fixture::new(line_points());
    let mut query = Query::new("Blind");
    let option = query.option_mut(0).unwrap();
    option
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    option
        .add_to_conditions(&fixture.vocabulary, "canShoot_at_attentionTarget", true)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(2));
    assert_eq!(fixture.run(&query, &mut evaluation), EvalState::Completed);
    assert!(evaluation.results().is_empty());
}

#[test]
fn locked_points_are_skipped() {
    let mut fixture = Fixture::new(line_points());
    fixture.locks.lock(
        QueryTicket(99),
        vec![TacticalPoint::new(Vec3::new(1.0, 0.0, 0.0))],
    );
    let mut query = Query::new("Unlocked");
    let option = query.option_mut(0).unwrap();
    option
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    option
        .add_to_weights(&fixture.vocabulary, "distance_from_puppet", -1.0)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(1));
    fixture.run(&query, &mut evaluation);
    assert_eq!(
        evaluation.results()[0].point.position,
        Vec3::new(3.0, 0.0, 0.0)
    );
}

#[test]
fn destroyed_query_is_an_error() {
    let mut fixture = Fixture::new(line_points());
    let mut evaluation = QueryEvaluation::new(instance(1));
    let deferred: Option<&mut dyn DeferredService> = None;
    let mut env = EvalEnv {
        vocabulary: &fixture.vocabulary,
        query: None,
        extenders: &fixture.extenders,
        generators: &fixture.generators,
        locks: &fixture.locks,
        inbox: &fixture.inbox,
        deferred,
        trace: &mut fixture.trace,
        settings: EvalSettings {
            warnings: false,
            ..EvalSettings::default()
        },
    };
    assert_eq!(
        evaluation.advance(&mut env, Instant::now() + Duration::from_secs(1)),
        EvalState::Error
    );
}

#[test]
fn oversized_grid_skips_to_the_next_option() {
    let mut fixture = Fixture::new(line_points());
    let mut query = Query::new("Huge");
    query
        .option_mut(0)
        .unwrap()
        .add_to_generation(&fixture.vocabulary, "pureGrid_around_puppet", 1.0e6)
        .unwrap();
    query
        .option_mut(1)
        .unwrap()
        .add_to_generation(&fixture.vocabulary, "currentPos_around_puppet", 0.0)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(1));
    assert_eq!(fixture.run(&query, &mut evaluation), EvalState::Completed);
    assert_eq!(evaluation.result_option(), Some(1));
    assert_eq!(evaluation.results()[0].point.position, Vec3::ZERO);
}

fn two_ray_query(vocabulary: &Vocabulary) -> Query {
    let mut query = Query::new("TwoRay");
    let option = query.option_mut(0).unwrap();
    option
        .add_to_generation(vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    option
        .add_to_conditions(vocabulary, "canShootTwoRayTest_at_attentionTarget", true)
        .unwrap();
    query
}

/// Answers the two rays of a `canShootTwoRayTest` one at a time.
fn run_two_ray_test(second_ray_clear: bool) -> QueryEvaluation {
    let mut fixture = Fixture::new(vec![Vec3::new(3.0, 0.0, 0.0)]);
    let held = HeldReplies::default();
    let replies = held.replies.clone();
    fixture.service = Some(Box::new(held));
    let query = two_ray_query(&fixture.vocabulary);
    let mut evaluation = QueryEvaluation::new(instance(1));

    assert_eq!(
        fixture.step(&query, &mut evaluation, Duration::from_secs(1)),
        EvalState::WaitingForDeferred
    );
    assert_eq!(replies.borrow().len(), 2);
    assert!(replies
        .borrow()
        .iter()
        .all(|(request, _)| matches!(request, DeferredRequest::Ray { .. })));

    let (_, first) = replies.borrow_mut().remove(0);
    first.complete(DeferredValue::Clear(true));
    assert_eq!(
        fixture.step(&query, &mut evaluation, Duration::from_secs(1)),
        EvalState::WaitingForDeferred
    );
    assert!(evaluation.results().is_empty());
    assert_eq!(replies.borrow().len(), 1);

    let (_, second) = replies.borrow_mut().remove(0);
    second.complete(DeferredValue::Clear(second_ray_clear));
    assert_eq!(
        fixture.step(&query, &mut evaluation, Duration::from_secs(1)),
        EvalState::Completed
    );
    evaluation
}

#[test]
fn two_ray_test_waits_for_both_rays() {
    let evaluation = run_two_ray_test(true);
    assert_eq!(evaluation.results().len(), 1);
    assert_eq!(
        evaluation.results()[0].point.position,
        Vec3::new(3.0, 0.0, 0.0)
    );
}

#[test]
fn one_blocked_ray_fails_the_two_ray_test() {
    let evaluation = run_two_ray_test(false);
    assert!(evaluation.results().is_empty());
    assert_eq!(evaluation.rejected().len(), 1);
}

#[test]
fn cheap_only_options_start_points_valid() {
    let mut fixture = Fixture::new(line_points());
    let mut query = Query::new("Cheap");
    let option = query.option_mut(0).unwrap();
    option
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    option
        .add_to_weights(&fixture.vocabulary, "distance_from_puppet", -1.0)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(5));
    fixture.step(&query, &mut evaluation, Duration::ZERO);
    assert_eq!(
        fixture.step(&query, &mut evaluation, Duration::ZERO),
        EvalState::HeapEvaluation
    );
    assert_eq!(evaluation.in_heap(), 5);
    assert!(evaluation
        .candidates()
        .all(|c| c.state == PointState::Valid));
}

#[test]
fn points_turn_valid_once_their_conditions_pass() {
    let mut fixture = Fixture::new(line_points());
    // Everything is expensive, so the condition runs on the heap.
    fixture.settings.cheap_cost_threshold = 0;
    let mut query = Query::new("Expensive");
    let option = query.option_mut(0).unwrap();
    option
        .add_to_generation(&fixture.vocabulary, "grid_around_puppet", 30.0)
        .unwrap();
    option
        .add_to_conditions(&fixture.vocabulary, "max_distance_from_puppet", 100.0)
        .unwrap();

    let mut evaluation = QueryEvaluation::new(instance(5));
    fixture.step(&query, &mut evaluation, Duration::ZERO);
    fixture.step(&query, &mut evaluation, Duration::ZERO);
    assert!(evaluation
        .candidates()
        .all(|c| c.state == PointState::Partial));

    // The condition, then the lock check.
    fixture.step(&query, &mut evaluation, Duration::ZERO);
    assert!(evaluation
        .candidates()
        .all(|c| c.state == PointState::Partial));
    fixture.step(&query, &mut evaluation, Duration::ZERO);
    let valid = evaluation
        .candidates()
        .filter(|c| c.state == PointState::Valid)
        .count();
    assert_eq!(valid, 1);

    assert_eq!(fixture.run(&query, &mut evaluation), EvalState::Completed);
    assert_eq!(evaluation.results().len(), 5);
    assert!(evaluation
        .accepted()
        .iter()
        .all(|e| e.state == PointState::Accepted));
}
