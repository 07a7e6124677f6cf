use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tps_core::{
    Query, QueryContext, QueryFlags, QueryId, QueryInstance, QueryTicket, Vec3, Vocabulary,
};
use tps_eval::{
    DeferredInbox, EvalEnv, EvalSettings, ExtenderRegistry, GeneratorRegistry, NullTraceSink,
    QueryEvaluation, ResultLocks,
};

fn grid_query(vocabulary: &Vocabulary) -> Query {
    let mut query = Query::new("bench");
    let option = query.option_mut(0).expect("option");
    option
        .add_to_generation(vocabulary, "pureGrid_around_puppet", 20.0)
        .expect("generation");
    option
        .add_to_conditions(vocabulary, "max_distance_from_attentionTarget", 25.0)
        .expect("condition");
    option
        .add_to_weights(vocabulary, "distance_from_attentionTarget", -1.0)
        .expect("weight");
    option
        .add_to_weights(vocabulary, "dot_to_attentionTarget", 0.5)
        .expect("weight");
    query
}

fn bench_evaluate(c: &mut Criterion) {
    let vocabulary = Vocabulary::with_core_words();
    let query = grid_query(&vocabulary);
    let extenders = ExtenderRegistry::new();
    let generators = GeneratorRegistry::new();
    let locks = ResultLocks::new();
    let inbox = DeferredInbox::new();
    let context =
        QueryContext::new(Vec3::ZERO).with_attention_target(Vec3::new(12.0, 4.0, 0.0));

    let mut group = c.benchmark_group("tps-eval/pure_grid");

    for count in [1usize, 10] {
        for threshold in [tps_core::Cost::CHEAP_THRESHOLD, 0] {
            let name = format!("best_{count}_threshold_{threshold}");
            group.bench_function(name, |b| {
                b.iter(|| {
                    let mut sink = NullTraceSink;
                    let mut env = EvalEnv {
                        vocabulary: &vocabulary,
                        query: Some(&query),
                        extenders: &extenders,
                        generators: &generators,
                        locks: &locks,
                        inbox: &inbox,
                        deferred: None,
                        trace: &mut sink,
                        settings: EvalSettings {
                            cheap_cost_threshold: threshold,
                            warnings: false,
                        },
                    };
                    let mut evaluation = QueryEvaluation::new(QueryInstance {
                        ticket: QueryTicket(1),
                        query: QueryId(1),
                        context: context.clone(),
                        count,
                        flags: QueryFlags::empty(),
                    });
                    evaluation.advance(&mut env, Instant::now() + Duration::from_secs(1));
                    black_box(evaluation.results().len());
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
