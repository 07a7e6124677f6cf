//! Query manager - registry, ticketing and the per-frame update loop.
//!
//! Asynchronous requests are queued FIFO and evaluated one at a time. Each call to
//! [`TacticalPointSystem::update`] drains deferred completions, advances the active
//! evaluation until it finishes, runs out of budget or has to wait for deferred work, and
//! hands finished results to the receiver supplied with the request.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::{Duration, Instant};

use tps_core::{
    CostClass, CriterionValue, ParamValue, Query, QueryContext, QueryFlags, QueryId,
    QueryInstance, QueryOption, QueryTicket, TacticalPoint, Token, TokenCategory, Vocabulary,
};
use tps_eval::{
    DeferredService, EvalEnv, EvalState, ExtenderId, ExtenderRegistry, GeneratorRegistry,
    LanguageExtender, NullTraceSink, PointGenerator, PointResult, QueryEvaluation, ResultLocks,
    TraceSink,
};

use crate::config::EngineConfig;
use crate::definition::{DefinitionValue, OptionDefinition, QueryDefinition, QueryLibrary};
use crate::error::SystemError;

/// What a receiver gets once per submitted query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults {
    pub ticket: QueryTicket,
    /// The query was cancelled, reset or could not be evaluated.
    pub is_error: bool,
    /// Best points first.
    pub points: Vec<PointResult>,
    /// Option that produced the points; `None` when every option came up empty.
    pub option: Option<usize>,
}

impl QueryResults {
    fn error(ticket: QueryTicket) -> Self {
        Self {
            ticket,
            is_error: true,
            points: Vec::new(),
            option: None,
        }
    }
}

/// Callback for asynchronous query results. Called exactly once per ticket.
pub trait ResultsReceiver {
    fn accept_results(&mut self, results: &QueryResults);
}

impl<F> ResultsReceiver for F
where
    F: FnMut(&QueryResults),
{
    fn accept_results(&mut self, results: &QueryResults) {
        self(results)
    }
}

/// Outcome of a synchronous query.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResults {
    pub points: Vec<PointResult>,
    pub option: Option<usize>,
}

struct Pending {
    instance: QueryInstance,
    receiver: Box<dyn ResultsReceiver>,
}

struct Active {
    evaluation: QueryEvaluation,
    receiver: Box<dyn ResultsReceiver>,
}

/// State borrowed by running evaluations.
struct Engine {
    config: EngineConfig,
    vocabulary: Vocabulary,
    queries: BTreeMap<QueryId, Query>,
    locks: ResultLocks,
    no_locks: ResultLocks,
    extenders: ExtenderRegistry,
    generators: GeneratorRegistry,
    deferred: Option<Box<dyn DeferredService>>,
    inbox: tps_eval::DeferredInbox,
    trace: Box<dyn TraceSink>,
}

impl Engine {
    fn advance(
        &mut self,
        evaluation: &mut QueryEvaluation,
        deadline: Instant,
        respect_locks: bool,
    ) -> EvalState {
        let deferred = match self.deferred.as_mut() {
            Some(service) => Some(&mut **service as &mut dyn DeferredService),
            None => None,
        };
        let mut env = EvalEnv {
            vocabulary: &self.vocabulary,
            query: self.queries.get(&evaluation.instance().query),
            extenders: &self.extenders,
            generators: &self.generators,
            locks: if respect_locks {
                &self.locks
            } else {
                &self.no_locks
            },
            inbox: &self.inbox,
            deferred,
            trace: self.trace.as_mut(),
            settings: self.config.eval_settings(),
        };
        evaluation.advance(&mut env, deadline)
    }

    fn cancel_outstanding(&mut self, evaluation: &mut QueryEvaluation) {
        let outstanding = evaluation.take_outstanding();
        if let Some(service) = self.deferred.as_mut() {
            for request in outstanding {
                service.cancel(request);
            }
        }
    }

    fn option_mut(
        &mut self,
        id: QueryId,
        option: usize,
    ) -> Result<(&Vocabulary, &mut QueryOption), SystemError> {
        if option >= self.config.max_options {
            if self.config.warnings {
                tracing::warn!(query = id.0, option, "option index out of range");
            }
            return Err(tps_core::BuildError::OptionOutOfRange {
                index: option,
                max: self.config.max_options - 1,
            }
            .into());
        }
        let query = self
            .queries
            .get_mut(&id)
            .ok_or(SystemError::UnknownQuery(id))?;
        Ok((&self.vocabulary, query.option_mut(option)?))
    }

    fn query_name(&self, id: QueryId) -> String {
        self.queries
            .get(&id)
            .map(|q| q.name().to_owned())
            .unwrap_or_default()
    }
}

/// Front-end of the tactical point system.
pub struct TacticalPointSystem {
    engine: Engine,
    names: HashMap<String, QueryId>,
    next_query: u32,
    next_ticket: u64,
    queue: VecDeque<Pending>,
    active: Option<Active>,
}

impl Default for TacticalPointSystem {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl TacticalPointSystem {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_vocabulary(config, Vocabulary::with_core_words())
    }

    pub fn with_vocabulary(config: EngineConfig, vocabulary: Vocabulary) -> Self {
        Self {
            engine: Engine {
                config,
                vocabulary,
                queries: BTreeMap::new(),
                locks: ResultLocks::new(),
                no_locks: ResultLocks::new(),
                extenders: ExtenderRegistry::new(),
                generators: GeneratorRegistry::new(),
                deferred: None,
                inbox: tps_eval::DeferredInbox::new(),
                trace: Box::new(NullTraceSink),
            },
            names: HashMap::new(),
            next_query: 1,
            next_ticket: 1,
            queue: VecDeque::new(),
            active: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.engine.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.engine.vocabulary
    }

    // --- Query registry ---

    pub fn create_query(&mut self, name: &str) -> Result<QueryId, SystemError> {
        if self.names.contains_key(name) {
            if self.engine.config.warnings {
                tracing::warn!(query = name, "query name already in use");
            }
            return Err(SystemError::DuplicateName(name.to_owned()));
        }
        let id = QueryId(self.next_query);
        self.next_query += 1;
        self.engine.queries.insert(id, Query::new(name));
        self.names.insert(name.to_owned(), id);
        tracing::debug!(query = name, id = id.0, "created query");
        Ok(id)
    }

    /// Removes a query. Requests for it that have not started yet finish with an error.
    pub fn destroy_query(&mut self, id: QueryId) -> bool {
        match self.engine.queries.remove(&id) {
            Some(query) => {
                self.names.remove(query.name());
                tracing::debug!(query = query.name(), id = id.0, "destroyed query");
                true
            }
            None => false,
        }
    }

    /// Removes every query and fails every queued or running request.
    pub fn destroy_all_queries(&mut self) {
        self.fail_in_flight();
        self.engine.queries.clear();
        self.names.clear();
    }

    pub fn query_id(&self, name: &str) -> Option<QueryId> {
        self.names.get(name).copied()
    }

    pub fn query_name(&self, id: QueryId) -> Option<&str> {
        self.engine.queries.get(&id).map(Query::name)
    }

    pub fn query(&self, id: QueryId) -> Option<&Query> {
        self.engine.queries.get(&id)
    }

    /// The `optionLabel` parameter of an option, if it was set.
    pub fn option_label(&self, id: QueryId, option: usize) -> Option<&str> {
        let label = &self.engine.queries.get(&id)?.option(option)?.params().option_label;
        (!label.is_empty()).then_some(label.as_str())
    }

    pub fn add_to_generation(
        &mut self,
        id: QueryId,
        option: usize,
        spec: &str,
        distance: f32,
    ) -> Result<(), SystemError> {
        let (vocabulary, option) = self.engine.option_mut(id, option)?;
        Ok(option.add_to_generation(vocabulary, spec, distance)?)
    }

    pub fn add_to_generation_relative(
        &mut self,
        id: QueryId,
        option: usize,
        spec: &str,
        source: &str,
    ) -> Result<(), SystemError> {
        let (vocabulary, option) = self.engine.option_mut(id, option)?;
        Ok(option.add_to_generation_relative(vocabulary, spec, source)?)
    }

    pub fn add_to_conditions(
        &mut self,
        id: QueryId,
        option: usize,
        spec: &str,
        value: impl Into<CriterionValue>,
    ) -> Result<(), SystemError> {
        let (vocabulary, option) = self.engine.option_mut(id, option)?;
        Ok(option.add_to_conditions(vocabulary, spec, value)?)
    }

    pub fn add_to_weights(
        &mut self,
        id: QueryId,
        option: usize,
        spec: &str,
        weight: f32,
    ) -> Result<(), SystemError> {
        let (vocabulary, option) = self.engine.option_mut(id, option)?;
        Ok(option.add_to_weights(vocabulary, spec, weight)?)
    }

    pub fn add_to_parameters(
        &mut self,
        id: QueryId,
        option: usize,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<(), SystemError> {
        let (_, option) = self.engine.option_mut(id, option)?;
        Ok(option.add_to_parameters(name, value)?)
    }

    /// Creates every query of `library`. A definition that fails to build is removed again
    /// and stops the load; queries created before it are kept.
    pub fn load_definitions(
        &mut self,
        library: &QueryLibrary,
    ) -> Result<Vec<QueryId>, SystemError> {
        library
            .queries
            .iter()
            .map(|definition| {
                self.load_definition(definition)
                    .map_err(|source| SystemError::Definition {
                        query: definition.name.clone(),
                        source: Box::new(source),
                    })
            })
            .collect()
    }

    pub fn load_definition(
        &mut self,
        definition: &QueryDefinition,
    ) -> Result<QueryId, SystemError> {
        let id = self.create_query(&definition.name)?;
        for (index, option) in definition.options.iter().enumerate() {
            if let Err(err) = self.apply_option(id, index, option) {
                self.destroy_query(id);
                return Err(err);
            }
        }
        Ok(id)
    }

    fn apply_option(
        &mut self,
        id: QueryId,
        index: usize,
        option: &OptionDefinition,
    ) -> Result<(), SystemError> {
        for generator in &option.generation {
            match &generator.value {
                DefinitionValue::Text(source) => {
                    self.add_to_generation_relative(id, index, &generator.spec, source)?
                }
                value => {
                    let distance = value.weight(&generator.spec)?;
                    self.add_to_generation(id, index, &generator.spec, distance)?
                }
            }
        }
        for condition in &option.conditions {
            let value = condition.value.criterion_value(&condition.spec)?;
            self.add_to_conditions(id, index, &condition.spec, value)?;
        }
        for weight in &option.weights {
            let value = weight.value.weight(&weight.spec)?;
            self.add_to_weights(id, index, &weight.spec, value)?;
        }
        for (name, value) in &option.parameters {
            self.add_to_parameters(id, index, name, value.param_value())?;
        }
        Ok(())
    }

    // --- Language extension ---

    pub fn extend_language(
        &mut self,
        name: &str,
        category: TokenCategory,
        cost: Option<CostClass>,
    ) -> Result<Token, SystemError> {
        Ok(self.engine.vocabulary.extend(name, category, cost)?)
    }

    /// Extenders are consulted after the built-in handlers, oldest first.
    pub fn add_language_extender(&mut self, extender: Box<dyn LanguageExtender>) -> ExtenderId {
        self.engine.extenders.add(extender)
    }

    pub fn remove_language_extender(&mut self, id: ExtenderId) -> bool {
        self.engine.extenders.remove(id)
    }

    /// Installs the backend for a generator word. Returns `true` if it replaced one.
    pub fn register_generator(
        &mut self,
        name: &str,
        backend: Box<dyn PointGenerator>,
    ) -> Result<bool, SystemError> {
        let token = self
            .engine
            .vocabulary
            .lookup(name)
            .ok_or_else(|| SystemError::UnknownWord(name.to_owned()))?;
        if !token.category().is_generator() {
            return Err(SystemError::NotAGenerator(name.to_owned()));
        }
        Ok(self.engine.generators.register(token, backend))
    }

    pub fn unregister_generator(&mut self, name: &str) -> bool {
        match self.engine.vocabulary.lookup(name) {
            Some(token) => self.engine.generators.unregister(token),
            None => false,
        }
    }

    /// Sets the host backend for raycasts, posture checks and path queries, returning the
    /// previous one. Without a service, deferred conditions reject every point.
    pub fn set_deferred_service(
        &mut self,
        service: Box<dyn DeferredService>,
    ) -> Option<Box<dyn DeferredService>> {
        self.engine.deferred.replace(service)
    }

    pub fn clear_deferred_service(&mut self) -> Option<Box<dyn DeferredService>> {
        self.engine.deferred.take()
    }

    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.engine.trace = sink;
    }

    // --- Asynchronous queries ---

    fn next_ticket(&mut self) -> QueryTicket {
        let ticket = QueryTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn check_runnable(&self, id: QueryId, count: usize) -> Result<(), SystemError> {
        if count == 0 {
            return Err(SystemError::InvalidCount);
        }
        let query = self
            .engine
            .queries
            .get(&id)
            .ok_or(SystemError::UnknownQuery(id))?;
        if !query.is_runnable() {
            if self.engine.config.warnings {
                tracing::warn!(query = query.name(), "query has an option without generators");
            }
            return Err(SystemError::NotRunnable(query.name().to_owned()));
        }
        Ok(())
    }

    /// Queues a query for evaluation. The receiver is called exactly once, from a later
    /// [`update`](Self::update), [`cancel_async_query`](Self::cancel_async_query) or
    /// [`reset`](Self::reset).
    pub fn async_query(
        &mut self,
        id: QueryId,
        context: QueryContext,
        flags: QueryFlags,
        count: usize,
        receiver: impl ResultsReceiver + 'static,
    ) -> Result<QueryTicket, SystemError> {
        let ticket = self.next_ticket();
        self.check_runnable(id, count)?;
        tracing::debug!(ticket = ticket.0, query = id.0, count, "queued query");
        self.queue.push_back(Pending {
            instance: QueryInstance {
                ticket,
                query: id,
                context,
                count,
                flags,
            },
            receiver: Box::new(receiver),
        });
        Ok(ticket)
    }

    /// Drops a queued or running query, notifying its receiver with an error.
    pub fn cancel_async_query(&mut self, ticket: QueryTicket) -> bool {
        if self.active.as_ref().map(|a| a.evaluation.ticket()) == Some(ticket) {
            if let Some(mut active) = self.active.take() {
                self.engine.cancel_outstanding(&mut active.evaluation);
                active.receiver.accept_results(&QueryResults::error(ticket));
            }
            tracing::debug!(ticket = ticket.0, "cancelled running query");
            return true;
        }
        match self.queue.iter().position(|p| p.instance.ticket == ticket) {
            Some(index) => {
                if let Some(mut pending) = self.queue.remove(index) {
                    pending.receiver.accept_results(&QueryResults::error(ticket));
                }
                tracing::debug!(ticket = ticket.0, "cancelled queued query");
                true
            }
            None => false,
        }
    }

    pub fn unlock_results(&mut self, ticket: QueryTicket) -> bool {
        self.engine.locks.unlock(ticket)
    }

    pub fn has_locked_results(&self, ticket: QueryTicket) -> bool {
        self.engine.locks.is_locked(ticket)
    }

    /// Queued plus running queries.
    pub fn pending_count(&self) -> usize {
        self.queue.len() + usize::from(self.active.is_some())
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some() || !self.queue.is_empty()
    }

    /// Advances queued queries for at most `budget`. Returns how many finished.
    pub fn update(&mut self, budget: Duration) -> usize {
        let deadline = deadline_after(Instant::now(), budget);
        self.route_completions(None);

        let max_completions = self.engine.config.max_completions_per_update.max(1);
        let mut finished = 0;
        loop {
            if self.active.is_none() {
                let Some(pending) = self.queue.pop_front() else {
                    break;
                };
                self.active = Some(Active {
                    evaluation: QueryEvaluation::new(pending.instance),
                    receiver: pending.receiver,
                });
            }
            let Some(active) = self.active.as_mut() else {
                break;
            };

            let state = self.engine.advance(&mut active.evaluation, deadline, true);
            if !state.is_finished() {
                break;
            }
            if let Some(active) = self.active.take() {
                self.finish(active);
            }
            finished += 1;
            if finished >= max_completions || Instant::now() >= deadline {
                break;
            }
        }
        finished
    }

    /// Hands deferred completions to whichever evaluation is waiting for them. Completions
    /// for cancelled or finished queries are dropped.
    fn route_completions(&mut self, mut sync: Option<&mut QueryEvaluation>) {
        for completion in self.engine.inbox.drain() {
            let taken = match sync.as_deref_mut() {
                Some(evaluation) => evaluation.deliver(&completion),
                None => false,
            };
            let taken = taken
                || match self.active.as_mut() {
                    Some(active) => active.evaluation.deliver(&completion),
                    None => false,
                };
            if !taken {
                tracing::debug!(
                    ticket = completion.ticket.0,
                    request = completion.request.0,
                    "dropping stale deferred result"
                );
            }
        }
    }

    fn finish(&mut self, mut active: Active) {
        self.engine.cancel_outstanding(&mut active.evaluation);
        let evaluation = &active.evaluation;
        let ticket = evaluation.ticket();
        let results = match evaluation.state() {
            EvalState::Completed => QueryResults {
                ticket,
                is_error: false,
                points: evaluation.results(),
                option: evaluation.result_option(),
            },
            _ => QueryResults::error(ticket),
        };
        if !results.is_error && evaluation.instance().flags.contains(QueryFlags::LOCK_RESULTS) {
            self.engine
                .locks
                .lock(ticket, results.points.iter().map(|r| r.point).collect());
        }
        tracing::debug!(
            ticket = ticket.0,
            points = results.points.len(),
            option = ?results.option,
            is_error = results.is_error,
            "query finished"
        );
        active.receiver.accept_results(&results);
    }

    // --- Synchronous queries ---

    /// Evaluates a query to completion before returning.
    ///
    /// Fails instead of returning partial results when the evaluation errors or does not
    /// finish within the configured hard cap.
    pub fn sync_query(
        &mut self,
        id: QueryId,
        context: QueryContext,
        count: usize,
    ) -> Result<SyncResults, SystemError> {
        let ticket = self.next_ticket();
        self.check_runnable(id, count)?;
        let evaluation = QueryEvaluation::new(QueryInstance {
            ticket,
            query: id,
            context,
            count,
            flags: QueryFlags::empty(),
        });
        let evaluation = self.run_to_completion(evaluation, true)?;
        Ok(SyncResults {
            points: evaluation.results(),
            option: evaluation.result_option(),
        })
    }

    /// The single best point of a synchronous query, if any option produced one.
    pub fn sync_query_best(
        &mut self,
        id: QueryId,
        context: QueryContext,
    ) -> Result<Option<PointResult>, SystemError> {
        let results = self.sync_query(id, context, 1)?;
        Ok(results.points.into_iter().next())
    }

    /// Index of the first option whose conditions `point` satisfies, ignoring result locks.
    pub fn test_conditions(
        &mut self,
        id: QueryId,
        context: QueryContext,
        point: TacticalPoint,
    ) -> Result<Option<usize>, SystemError> {
        let ticket = self.next_ticket();
        self.check_runnable(id, 1)?;
        let evaluation = QueryEvaluation::with_points(
            QueryInstance {
                ticket,
                query: id,
                context,
                count: 1,
                flags: QueryFlags::empty(),
            },
            vec![point],
        );
        let evaluation = self.run_to_completion(evaluation, false)?;
        Ok(evaluation.result_option())
    }

    fn run_to_completion(
        &mut self,
        mut evaluation: QueryEvaluation,
        respect_locks: bool,
    ) -> Result<QueryEvaluation, SystemError> {
        let started = Instant::now();
        let cap = deadline_after(started, self.engine.config.sync_hard_cap());
        let query = evaluation.instance().query;
        loop {
            self.route_completions(Some(&mut evaluation));
            let state = self.engine.advance(&mut evaluation, cap, respect_locks);
            match state {
                EvalState::Completed => break,
                EvalState::Error => {
                    self.engine.cancel_outstanding(&mut evaluation);
                    return Err(SystemError::EvaluationFailed(self.engine.query_name(query)));
                }
                _ => {}
            }
            if Instant::now() >= cap {
                self.engine.cancel_outstanding(&mut evaluation);
                let elapsed = started.elapsed();
                let name = self.engine.query_name(query);
                if self.engine.config.warnings {
                    tracing::warn!(query = %name, ?elapsed, "synchronous query timed out");
                }
                return Err(SystemError::TimedOut {
                    query: name,
                    elapsed,
                });
            }
            if state == EvalState::WaitingForDeferred {
                std::thread::yield_now();
            }
        }

        let elapsed = started.elapsed();
        if elapsed > self.engine.config.sync_warn_threshold() && self.engine.config.warnings {
            tracing::warn!(
                query = %self.engine.query_name(query),
                ?elapsed,
                "synchronous query was slow"
            );
        }
        Ok(evaluation)
    }

    // --- Teardown ---

    /// Fails every queued or running query and releases all result locks. Queries, the
    /// vocabulary and registered backends are kept.
    pub fn reset(&mut self) {
        self.fail_in_flight();
        self.engine.locks.clear();
        self.engine.inbox.drain();
    }

    fn fail_in_flight(&mut self) {
        if let Some(mut active) = self.active.take() {
            self.engine.cancel_outstanding(&mut active.evaluation);
            let ticket = active.evaluation.ticket();
            active.receiver.accept_results(&QueryResults::error(ticket));
        }
        for mut pending in std::mem::take(&mut self.queue) {
            pending
                .receiver
                .accept_results(&QueryResults::error(pending.instance.ticket));
        }
    }
}

/// Stand-in for budgets too large to add to an [`Instant`].
const FAR_DEADLINE: Duration = Duration::from_secs(60 * 60 * 24);

fn deadline_after(start: Instant, budget: Duration) -> Instant {
    start
        .checked_add(budget)
        .or_else(|| start.checked_add(FAR_DEADLINE))
        .unwrap_or(start)
}

impl Drop for TacticalPointSystem {
    fn drop(&mut self) {
        self.fail_in_flight();
    }
}
