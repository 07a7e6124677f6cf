//! Incremental best-N selection for one query instance.
//!
//! Candidate points live in a max-heap ordered by the upper bound of their score. Each update
//! advances only the top point by one criterion: conditions can reject it, weights narrow its
//! `[min, max]` bound. A point whose criteria are exhausted while on top has a score no other
//! point can beat, so it is accepted. Work stops as soon as N points are accepted.

use std::cmp::Ordering;
use std::collections::binary_heap::{BinaryHeap, PeekMut};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tps_core::{
    words, Criterion, OptionParams, Query, QueryInstance, QueryOption, QueryTicket,
    TacticalPoint, TokenCategory, Vec3, Vocabulary,
};

use crate::deferred::{
    DeferredCompletion, DeferredInbox, DeferredRequest, DeferredService, DeferredValue,
    RequestId,
};
use crate::error::EvalFailure;
use crate::extender::ExtenderRegistry;
use crate::generate::{generate_points, GeneratorRegistry};
use crate::locks::ResultLocks;
use crate::scoring::Scorer;
use crate::trace::{self, TraceEvent, TraceSink};

/// Bounds given to rejected points.
pub const REJECTED_SCORE: f32 = -100.0;
/// Height above the point that visibility rays start from.
pub const EYE_HEIGHT: f32 = 1.0;
/// Sideways offset of the target end of the `canShootTwoRayTest` rays.
pub const TWO_RAY_TARGET_OFFSET: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalState {
    /// About to generate points for the current option.
    Ready,
    /// Points generated, cheap pass not yet run.
    Initialized,
    HeapEvaluation,
    WaitingForDeferred,
    /// The current option produced nothing; the next one starts on the following step.
    CompletedOption,
    Completed,
    Error,
}

impl EvalState {
    pub fn is_finished(self) -> bool {
        matches!(self, EvalState::Completed | EvalState::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointState {
    /// Expensive criteria still pending.
    Partial,
    /// Every condition passed; weights may still be pending.
    Valid,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy)]
pub struct EvalSettings {
    /// Conditions and weights cheaper than this run for every point up front.
    pub cheap_cost_threshold: i32,
    pub warnings: bool,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            cheap_cost_threshold: tps_core::Cost::CHEAP_THRESHOLD,
            warnings: true,
        }
    }
}

/// Everything an evaluation borrows from its engine for one step.
pub struct EvalEnv<'a> {
    pub vocabulary: &'a Vocabulary,
    /// The query being evaluated; `None` if it has been destroyed.
    pub query: Option<&'a Query>,
    pub extenders: &'a ExtenderRegistry,
    pub generators: &'a GeneratorRegistry,
    pub locks: &'a ResultLocks,
    pub inbox: &'a DeferredInbox,
    pub deferred: Option<&'a mut dyn DeferredService>,
    pub trace: &'a mut dyn TraceSink,
    pub settings: EvalSettings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointResult {
    pub point: TacticalPoint,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct PointEvaluation {
    pub point: TacticalPoint,
    pub min: f32,
    pub max: f32,
    pub state: PointState,
    next_step: usize,
    seq: u64,
}

impl PointEvaluation {
    fn key(&self) -> (f32, u64) {
        (self.max, self.seq)
    }

    fn narrow(&mut self, weight: f32, result: f32) {
        if weight > 0.0 {
            self.min += weight * result;
            self.max -= weight * (1.0 - result);
        } else {
            self.min -= weight * (1.0 - result);
            self.max += weight * result;
        }
    }
}

impl PartialEq for PointEvaluation {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PointEvaluation {}

impl PartialOrd for PointEvaluation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PointEvaluation {
    fn cmp(&self, other: &Self) -> Ordering {
        let (max, seq) = self.key();
        let (other_max, other_seq) = other.key();
        // Highest upper bound first; ties go to the point generated earlier.
        max.total_cmp(&other_max).then_with(|| other_seq.cmp(&seq))
    }
}

enum Step<'p> {
    Condition(&'p Criterion),
    LockCheck,
    Deferred(&'p Criterion),
    Weight(&'p Criterion),
    Done,
}

/// An option's criteria sorted into evaluation stages.
#[derive(Debug, Default)]
struct CriteriaPlan {
    cheap_conditions: Vec<Criterion>,
    expensive_conditions: Vec<Criterion>,
    deferred_conditions: Vec<Criterion>,
    cheap_weights: Vec<Criterion>,
    expensive_weights: Vec<Criterion>,
    /// Sum of the negative expensive weights.
    floor: f32,
    /// Sum of the positive expensive weights.
    ceiling: f32,
}

impl CriteriaPlan {
    fn classify(
        option: &QueryOption,
        vocabulary: &Vocabulary,
        settings: EvalSettings,
    ) -> Result<Self, String> {
        let mut plan = Self::default();
        let cost_of = |criterion: &Criterion| {
            vocabulary
                .cost(criterion.query())
                .ok_or_else(|| vocabulary.describe(criterion.query()))
        };

        for criterion in option.conditions() {
            let cost = cost_of(criterion)?;
            let bucket = if cost.is_deferred() {
                &mut plan.deferred_conditions
            } else if cost.is_cheap(settings.cheap_cost_threshold) {
                &mut plan.cheap_conditions
            } else {
                &mut plan.expensive_conditions
            };
            bucket.push(criterion.clone());
        }

        for criterion in option.weights() {
            let cost = cost_of(criterion)?;
            let weight = criterion.value_as_float();
            if cost.is_deferred() {
                return Err(vocabulary.describe(criterion.query()));
            }
            if cost.is_cheap(settings.cheap_cost_threshold) {
                plan.cheap_weights.push(criterion.clone());
                continue;
            }
            if weight == 0.0 {
                if settings.warnings {
                    let word = vocabulary.describe(criterion.query());
                    tracing::warn!(%word, "ignoring expensive weight of zero");
                }
                continue;
            }
            if weight > 0.0 {
                plan.ceiling += weight;
            } else {
                plan.floor += weight;
            }
            plan.expensive_weights.push(criterion.clone());
        }

        Ok(plan)
    }

    /// State of a point fresh out of the cheap pass.
    fn initial_state(&self) -> PointState {
        if self.expensive_conditions.is_empty()
            && self.deferred_conditions.is_empty()
            && self.expensive_weights.is_empty()
        {
            PointState::Valid
        } else {
            PointState::Partial
        }
    }

    /// Has a point at step `index` passed every condition, the lock check included?
    fn conditions_passed(&self, index: usize) -> bool {
        index > self.expensive_conditions.len() + self.deferred_conditions.len()
    }

    fn step(&self, index: usize) -> Step<'_> {
        let mut i = index;
        if let Some(c) = self.expensive_conditions.get(i) {
            return Step::Condition(c);
        }
        i -= self.expensive_conditions.len();
        if i == 0 {
            return Step::LockCheck;
        }
        i -= 1;
        if let Some(c) = self.deferred_conditions.get(i) {
            return Step::Deferred(c);
        }
        i -= self.deferred_conditions.len();
        match self.expensive_weights.get(i) {
            Some(c) => Step::Weight(c),
            None => Step::Done,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    id: RequestId,
    value: Option<DeferredValue>,
}

enum DeferredStatus {
    Pending,
    Passed,
    Rejected,
}

/// Deferred requests issued for the point currently on top of the heap.
#[derive(Debug, Default)]
struct DeferredTracker {
    pending: Vec<PendingRequest>,
    owner: Option<u64>,
}

impl DeferredTracker {
    fn deliver(&mut self, completion: &DeferredCompletion) -> bool {
        match self
            .pending
            .iter_mut()
            .find(|p| p.id == completion.request && p.value.is_none())
        {
            Some(pending) => {
                pending.value = Some(completion.value);
                true
            }
            None => false,
        }
    }

    fn take_outstanding(&mut self) -> Vec<RequestId> {
        let ids = self
            .pending
            .iter()
            .filter(|p| p.value.is_none())
            .map(|p| p.id)
            .collect();
        self.pending.clear();
        self.owner = None;
        ids
    }

    fn status(
        &mut self,
        seq: u64,
        criterion: &Criterion,
        point: &TacticalPoint,
        scorer: &Scorer<'_>,
        params: &OptionParams,
        env: &mut EvalEnv<'_>,
        ticket: QueryTicket,
    ) -> DeferredStatus {
        if self.owner == Some(seq) {
            if self.pending.iter().any(|p| p.value.is_none()) {
                return DeferredStatus::Pending;
            }
            let values: Vec<DeferredValue> =
                self.pending.drain(..).filter_map(|p| p.value).collect();
            self.owner = None;
            return interpret(criterion, &values, scorer);
        }

        let stale = self.take_outstanding();
        if let Some(service) = env.deferred.as_mut() {
            for id in stale {
                service.cancel(id);
            }
        }

        let requests = match deferred_requests(criterion, point, scorer, params) {
            Ok(requests) if !requests.is_empty() => requests,
            Ok(_) => return DeferredStatus::Rejected,
            Err(err) => {
                if scorer.warnings() {
                    tracing::warn!(error = %err, "deferred criterion could not be issued");
                }
                return DeferredStatus::Rejected;
            }
        };
        let Some(service) = env.deferred.as_mut() else {
            if scorer.warnings() {
                let word = scorer.vocabulary().describe(criterion.query());
                tracing::warn!(%word, "no deferred service installed, rejecting point");
            }
            return DeferredStatus::Rejected;
        };
        for request in requests {
            let reply = env.inbox.reply_for(ticket);
            self.pending.push(PendingRequest {
                id: reply.request_id(),
                value: None,
            });
            service.submit(request, reply);
        }
        self.owner = Some(seq);
        DeferredStatus::Pending
    }
}

fn deferred_requests(
    criterion: &Criterion,
    point: &TacticalPoint,
    scorer: &Scorer<'_>,
    params: &OptionParams,
) -> Result<Vec<DeferredRequest>, EvalFailure> {
    let context = scorer.context();
    let object = match criterion.object() {
        Some(token) => Some(scorer.object(token)?),
        None => None,
    };
    let p = point.position;
    let target = object.map(|o| o.position);
    let need_target = || {
        target.ok_or_else(|| {
            EvalFailure::MissingObject(scorer.vocabulary().describe(criterion.query()))
        })
    };

    let requests = match criterion.query() {
        words::VISIBLE => vec![DeferredRequest::Ray {
            from: p + Vec3::UP * EYE_HEIGHT,
            to: need_target()?,
        }],
        words::CAN_SHOOT => vec![DeferredRequest::Ray {
            from: p + context.fire_offset,
            to: need_target()?,
        }],
        words::CAN_SHOOT_TWO_RAY_TEST => {
            let to = need_target()?;
            let right = context.actor_dir.cross(Vec3::UP).normalized_or_zero();
            let from = p + context.fire_offset;
            let sideways = right * params.horizontal_spacing;
            let spread = right * TWO_RAY_TARGET_OFFSET;
            vec![
                DeferredRequest::Ray {
                    from: from - sideways,
                    to: to - spread,
                },
                DeferredRequest::Ray {
                    from: from + sideways,
                    to: to + spread,
                },
            ]
        }
        words::HAS_SHOOTING_POSTURE => vec![DeferredRequest::ShootingPosture {
            actor: context.actor,
            position: p,
            target: need_target()?,
            region: point.region,
        }],
        words::PATH_DISTANCE => vec![DeferredRequest::PathDistance {
            from: need_target()?,
            to: p,
        }],
        token => {
            let name = scorer.vocabulary().describe(token);
            scorer
                .extenders()
                .first(|e| e.deferred_requests(&name, context, object.as_ref(), point))
                .ok_or(EvalFailure::Unhandled(name))?
        }
    };
    Ok(requests)
}

fn interpret(
    criterion: &Criterion,
    values: &[DeferredValue],
    scorer: &Scorer<'_>,
) -> DeferredStatus {
    let verdict = |passed: bool| {
        if passed {
            DeferredStatus::Passed
        } else {
            DeferredStatus::Rejected
        }
    };
    match criterion.category() {
        TokenCategory::BoolProperty | TokenCategory::Test => {
            let outcome = if criterion.query() == words::HAS_SHOOTING_POSTURE {
                // A posture search that fails simply found no posture.
                values.iter().all(|v| matches!(v, DeferredValue::Clear(true)))
            } else {
                let mut all_clear = true;
                for value in values {
                    match value {
                        DeferredValue::Clear(clear) => all_clear &= *clear,
                        DeferredValue::Distance(_) | DeferredValue::Failed => {
                            if scorer.warnings() {
                                let word = scorer.vocabulary().describe(criterion.query());
                                tracing::warn!(%word, ?value, "deferred test failed");
                            }
                            return DeferredStatus::Rejected;
                        }
                    }
                }
                all_clear
            };
            verdict(outcome == criterion.value_as_bool())
        }
        TokenCategory::RealProperty | TokenCategory::Measure => {
            let distance = values.iter().find_map(|v| match v {
                DeferredValue::Distance(d) => Some(*d),
                _ => None,
            });
            match (distance, criterion.limit()) {
                (Some(d), Some(limit)) => verdict(limit.check(d, criterion.value_as_float())),
                _ => DeferredStatus::Rejected,
            }
        }
        _ => DeferredStatus::Rejected,
    }
}

fn reject(
    mut evaluation: PointEvaluation,
    rejected: &mut Vec<PointEvaluation>,
    sink: &mut dyn TraceSink,
    ticket: QueryTicket,
) {
    evaluation.state = PointState::Rejected;
    evaluation.min = REJECTED_SCORE;
    evaluation.max = REJECTED_SCORE;
    sink.emit(TraceEvent::new(ticket, trace::POINT_REJECTED).at(evaluation.point.position));
    rejected.push(evaluation);
}

/// Evaluation state for one [`QueryInstance`].
#[derive(Debug)]
pub struct QueryEvaluation {
    instance: QueryInstance,
    state: EvalState,
    option_index: usize,
    option: Option<Arc<QueryOption>>,
    plan: CriteriaPlan,
    fixed_points: Option<Vec<TacticalPoint>>,
    generated: Vec<TacticalPoint>,
    heap: BinaryHeap<PointEvaluation>,
    rejected: Vec<PointEvaluation>,
    accepted: Vec<PointEvaluation>,
    deferred: DeferredTracker,
    next_seq: u64,
    steps: u32,
    reported: bool,
}

impl QueryEvaluation {
    pub fn new(instance: QueryInstance) -> Self {
        Self {
            instance,
            state: EvalState::Ready,
            option_index: 0,
            option: None,
            plan: CriteriaPlan::default(),
            fixed_points: None,
            generated: Vec::new(),
            heap: BinaryHeap::new(),
            rejected: Vec::new(),
            accepted: Vec::new(),
            deferred: DeferredTracker::default(),
            next_seq: 0,
            steps: 0,
            reported: false,
        }
    }

    /// Evaluates the given points against every option instead of running its generators.
    pub fn with_points(instance: QueryInstance, points: Vec<TacticalPoint>) -> Self {
        Self {
            fixed_points: Some(points),
            ..Self::new(instance)
        }
    }

    pub fn state(&self) -> EvalState {
        self.state
    }

    pub fn ticket(&self) -> QueryTicket {
        self.instance.ticket
    }

    pub fn instance(&self) -> &QueryInstance {
        &self.instance
    }

    /// Index of the option currently (or last) evaluated.
    pub fn option_index(&self) -> usize {
        self.option_index
    }

    /// Option that produced the results, once completed with at least one point.
    pub fn result_option(&self) -> Option<usize> {
        (self.state == EvalState::Completed && !self.accepted.is_empty())
            .then_some(self.option_index)
    }

    pub fn accepted(&self) -> &[PointEvaluation] {
        &self.accepted
    }

    pub fn rejected(&self) -> &[PointEvaluation] {
        &self.rejected
    }

    /// Points still competing for a place in the results.
    pub fn in_heap(&self) -> usize {
        self.heap.len()
    }

    /// The competing points themselves, in no particular order.
    pub fn candidates(&self) -> impl Iterator<Item = &PointEvaluation> + '_ {
        self.heap.iter()
    }

    /// Number of [`QueryEvaluation::advance`] calls made so far.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Accepted points in descending score order.
    pub fn results(&self) -> Vec<PointResult> {
        self.accepted
            .iter()
            .map(|e| PointResult {
                point: e.point,
                score: e.min,
            })
            .collect()
    }

    /// Records a deferred answer. Returns `false` if this evaluation is not waiting for it.
    pub fn deliver(&mut self, completion: &DeferredCompletion) -> bool {
        completion.ticket == self.instance.ticket && self.deferred.deliver(completion)
    }

    /// Forgets unanswered deferred requests, returning their ids so they can be cancelled.
    pub fn take_outstanding(&mut self) -> Vec<RequestId> {
        self.deferred.take_outstanding()
    }

    /// Runs until finished, blocked on deferred work, or past `deadline`. At least one step is
    /// always taken.
    pub fn advance(&mut self, env: &mut EvalEnv<'_>, deadline: Instant) -> EvalState {
        self.steps += 1;
        loop {
            match self.state {
                EvalState::Completed | EvalState::Error => break,
                EvalState::Ready => self.start_option(env),
                EvalState::Initialized => self.setup_heap(env),
                EvalState::HeapEvaluation | EvalState::WaitingForDeferred => {
                    self.continue_heap(env, deadline)
                }
                EvalState::CompletedOption => self.next_option(env),
            }
            if self.state.is_finished()
                || self.state == EvalState::WaitingForDeferred
                || Instant::now() >= deadline
            {
                break;
            }
        }
        if self.state.is_finished() && !self.reported {
            self.reported = true;
            let tag = if self.state == EvalState::Completed {
                trace::COMPLETED
            } else {
                trace::FAILED
            };
            env.trace.emit(
                TraceEvent::new(self.instance.ticket, tag)
                    .with_a(self.option_index as f32)
                    .with_b(self.accepted.len() as f32),
            );
        }
        self.state
    }

    fn fail(&mut self, reason: &str, env: &mut EvalEnv<'_>) {
        if env.settings.warnings {
            tracing::warn!(ticket = self.instance.ticket.0, reason, "query evaluation failed");
        }
        self.heap.clear();
        self.accepted.clear();
        self.state = EvalState::Error;
    }

    fn start_option(&mut self, env: &mut EvalEnv<'_>) {
        let ticket = self.instance.ticket;
        let Some(query) = env.query else {
            self.fail("query no longer exists", env);
            return;
        };
        let Some(option) = query.option(self.option_index).cloned() else {
            // Every option came up empty.
            self.state = EvalState::Completed;
            return;
        };
        if let Err(word) = check_registered(env.vocabulary, &option) {
            self.fail(&format!("option uses unregistered word `{word}`"), env);
            return;
        }

        env.trace
            .emit(TraceEvent::new(ticket, trace::OPTION_STARTED).with_a(self.option_index as f32));

        let points = match &self.fixed_points {
            Some(points) => points.clone(),
            None => {
                let scorer = Scorer::new(env.vocabulary, env.extenders, &self.instance.context)
                    .with_warnings(env.settings.warnings);
                match generate_points(&scorer, env.generators, &option) {
                    Ok(points) => points,
                    Err(err) => {
                        if env.settings.warnings {
                            tracing::warn!(
                                query = query.name(),
                                option = self.option_index,
                                error = %err,
                                "point generation failed, trying next option"
                            );
                        }
                        Vec::new()
                    }
                }
            }
        };

        env.trace.emit(
            TraceEvent::new(ticket, trace::GENERATED)
                .with_a(self.option_index as f32)
                .with_b(points.len() as f32),
        );
        self.option = Some(option);
        self.state = if points.is_empty() {
            EvalState::CompletedOption
        } else {
            EvalState::Initialized
        };
        self.generated = points;
    }

    fn setup_heap(&mut self, env: &mut EvalEnv<'_>) {
        let Some(option) = self.option.clone() else {
            self.fail("no option captured", env);
            return;
        };
        let plan = match CriteriaPlan::classify(&option, env.vocabulary, env.settings) {
            Ok(plan) => plan,
            Err(word) => {
                self.fail(&format!("word `{word}` cannot be scheduled"), env);
                return;
            }
        };

        let scorer = Scorer::new(env.vocabulary, env.extenders, &self.instance.context)
            .with_warnings(env.settings.warnings);
        let ticket = self.instance.ticket;
        let points = std::mem::take(&mut self.generated);
        self.heap = BinaryHeap::with_capacity(points.len());
        self.rejected.clear();
        self.accepted.clear();

        'points: for point in points {
            let seq = self.next_seq;
            self.next_seq += 1;
            let mut evaluation = PointEvaluation {
                point,
                min: plan.floor,
                max: plan.ceiling,
                state: plan.initial_state(),
                next_step: 0,
                seq,
            };

            for criterion in &plan.cheap_conditions {
                match scorer.test(criterion, &evaluation.point) {
                    Ok(true) => {}
                    Ok(false) => {
                        reject(evaluation, &mut self.rejected, &mut *env.trace, ticket);
                        continue 'points;
                    }
                    Err(_) => return self.skip_option(env),
                }
            }
            for criterion in &plan.cheap_weights {
                match scorer.weight(criterion, &evaluation.point) {
                    Ok(result) => {
                        let contribution = criterion.value_as_float() * result;
                        evaluation.min += contribution;
                        evaluation.max += contribution;
                    }
                    Err(_) => return self.skip_option(env),
                }
            }
            self.heap.push(evaluation);
        }

        self.plan = plan;
        self.state = if self.heap.is_empty() {
            env.trace.emit(
                TraceEvent::new(ticket, trace::OPTION_EXHAUSTED).with_a(self.option_index as f32),
            );
            EvalState::CompletedOption
        } else {
            EvalState::HeapEvaluation
        };
    }

    fn skip_option(&mut self, env: &mut EvalEnv<'_>) {
        if env.settings.warnings {
            tracing::warn!(
                ticket = self.instance.ticket.0,
                option = self.option_index,
                "cheap criteria could not be evaluated, skipping option"
            );
        }
        self.heap.clear();
        self.state = EvalState::CompletedOption;
    }

    fn next_option(&mut self, env: &mut EvalEnv<'_>) {
        let stale = self.deferred.take_outstanding();
        if let Some(service) = env.deferred.as_mut() {
            for id in stale {
                service.cancel(id);
            }
        }
        self.heap.clear();
        self.rejected.clear();
        self.accepted.clear();
        self.option = None;
        self.option_index += 1;
        self.state = EvalState::Ready;
    }

    fn continue_heap(&mut self, env: &mut EvalEnv<'_>, deadline: Instant) {
        let ticket = self.instance.ticket;
        let scorer = Scorer::new(env.vocabulary, env.extenders, &self.instance.context)
            .with_warnings(env.settings.warnings);
        let option = self.option.clone();
        let default_params = OptionParams::default();
        let params = option.as_deref().map_or(&default_params, QueryOption::params);
        let wanted = self.instance.count.max(1);

        self.state = EvalState::HeapEvaluation;
        loop {
            let Some(mut top) = self.heap.peek_mut() else {
                break;
            };
            match self.plan.step(top.next_step) {
                Step::Condition(criterion) => {
                    top.next_step += 1;
                    if !matches!(scorer.test(criterion, &top.point), Ok(true)) {
                        reject(PeekMut::pop(top), &mut self.rejected, &mut *env.trace, ticket);
                    }
                }
                Step::LockCheck => {
                    top.next_step += 1;
                    if env.locks.contains(&top.point) {
                        reject(PeekMut::pop(top), &mut self.rejected, &mut *env.trace, ticket);
                    } else if self.plan.conditions_passed(top.next_step) {
                        top.state = PointState::Valid;
                    }
                }
                Step::Deferred(criterion) => {
                    let seq = top.seq;
                    match self
                        .deferred
                        .status(seq, criterion, &top.point, &scorer, params, env, ticket)
                    {
                        DeferredStatus::Pending => {
                            let event = TraceEvent::new(ticket, trace::DEFERRED_WAIT)
                                .at(top.point.position);
                            env.trace.emit(event);
                            self.state = EvalState::WaitingForDeferred;
                            break;
                        }
                        DeferredStatus::Passed => {
                            top.next_step += 1;
                            if self.plan.conditions_passed(top.next_step) {
                                top.state = PointState::Valid;
                            }
                        }
                        DeferredStatus::Rejected => {
                            reject(PeekMut::pop(top), &mut self.rejected, &mut *env.trace, ticket);
                        }
                    }
                }
                Step::Weight(criterion) => {
                    top.next_step += 1;
                    match scorer.weight(criterion, &top.point) {
                        Ok(result) => {
                            top.narrow(criterion.value_as_float(), result);
                            env.trace.emit(
                                TraceEvent::new(ticket, trace::POINT_NARROWED)
                                    .at(top.point.position)
                                    .with_a(top.min)
                                    .with_b(top.max),
                            );
                        }
                        Err(_) => {
                            reject(PeekMut::pop(top), &mut self.rejected, &mut *env.trace, ticket);
                        }
                    }
                }
                Step::Done => {
                    let mut evaluation = PeekMut::pop(top);
                    evaluation.state = PointState::Accepted;
                    env.trace.emit(
                        TraceEvent::new(ticket, trace::POINT_ACCEPTED)
                            .at(evaluation.point.position)
                            .with_a(evaluation.min)
                            .with_b(evaluation.max),
                    );
                    self.accepted.push(evaluation);
                    if self.accepted.len() >= wanted {
                        self.state = EvalState::Completed;
                        break;
                    }
                }
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        if self.state == EvalState::HeapEvaluation && self.heap.is_empty() {
            self.state = if self.accepted.is_empty() {
                env.trace.emit(
                    TraceEvent::new(ticket, trace::OPTION_EXHAUSTED)
                        .with_a(self.option_index as f32),
                );
                EvalState::CompletedOption
            } else {
                EvalState::Completed
            };
        }
    }
}

/// Every word an option uses must still be known, and scoring words must have a cost.
fn check_registered(vocabulary: &Vocabulary, option: &QueryOption) -> Result<(), String> {
    let criteria = option
        .generation()
        .iter()
        .chain(option.conditions())
        .chain(option.weights());
    for criterion in criteria {
        let tokens = [
            Some(criterion.query()),
            criterion.object(),
            criterion.object_aux(),
        ];
        for token in tokens.into_iter().flatten() {
            if !vocabulary.contains(token) {
                return Err(vocabulary.describe(token));
            }
        }
        if criterion.category().is_scoring() && vocabulary.cost(criterion.query()).is_none() {
            return Err(vocabulary.describe(criterion.query()));
        }
    }
    Ok(())
}
