//! Tactical point system CLI.
//!
//! - `tps vocab` - list the words of the query language
//! - `tps parse` - show how criterion specs are understood
//! - `tps check` - build a query library and describe its options
//! - `tps run` - run a query against a scenario file

mod scenario;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use tps_core::{
    parse, unparse, Criterion, CriterionValue, QueryFlags, QueryId, TokenCategory, Vocabulary,
};
use tps_eval::PointResult;
use tps_system::{EngineConfig, QueryLibrary, QueryResults, TacticalPointSystem};

use crate::scenario::Scenario;

/// Updates an asynchronous run may take before it is abandoned.
const MAX_UPDATES: u32 = 10_000;

#[derive(Parser)]
#[command(name = "tps")]
#[command(about = "Tactical point query tool", version)]
struct Cli {
    /// Engine configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the words of the query language
    Vocab {
        /// Only show one category, e.g. `measure` or `generator`
        #[arg(long)]
        category: Option<String>,
    },

    /// Parse criterion specs such as `max_distance_from_attentionTarget`
    Parse {
        #[arg(required = true)]
        specs: Vec<String>,
    },

    /// Build a query library and describe every option
    Check {
        /// Query library (YAML)
        queries: PathBuf,
    },

    /// Run a query against a scenario
    Run {
        /// Query library (YAML)
        #[arg(long)]
        queries: PathBuf,

        /// Scenario with the query context, candidate points and occluders (YAML)
        #[arg(long)]
        scenario: PathBuf,

        /// Query to run; defaults to the first one in the library
        #[arg(long)]
        query: Option<String>,

        /// Number of points to return
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Drive the query through time-sliced updates instead of a synchronous call
        #[arg(long = "async")]
        run_async: bool,

        /// Time budget of each update in milliseconds
        #[arg(long, default_value_t = 2)]
        budget_ms: u64,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct RunReport {
    query: String,
    option: Option<usize>,
    label: Option<String>,
    updates: u32,
    elapsed_ms: f64,
    points: Vec<PointResult>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Vocab { category } => show_vocabulary(category.as_deref()),
        Commands::Parse { specs } => parse_specs(&specs),
        Commands::Check { queries } => check_library(config, &queries),
        Commands::Run {
            queries,
            scenario,
            query,
            count,
            run_async,
            budget_ms,
            json,
        } => {
            let options = RunOptions {
                query,
                count,
                run_async,
                budget: Duration::from_millis(budget_ms),
                json,
            };
            run_query(config, &queries, &scenario, options)
        }
    }
}

fn parse_category(name: &str) -> Result<TokenCategory> {
    let wanted: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    TokenCategory::ALL
        .into_iter()
        .find(|category| {
            category
                .name()
                .replace(' ', "")
                .eq_ignore_ascii_case(&wanted)
        })
        .with_context(|| format!("Unknown word category `{name}`"))
}

fn show_vocabulary(category: Option<&str>) -> Result<()> {
    let vocabulary = Vocabulary::with_core_words();
    let filter = category.map(parse_category).transpose()?;

    println!("{:<24} {:<22} {:>6}", "WORD", "CATEGORY", "COST");
    for (token, name) in vocabulary.iter() {
        if filter.is_some_and(|c| c != token.category()) {
            continue;
        }
        let cost = vocabulary
            .cost(token)
            .map(|c| c.0.to_string())
            .unwrap_or_else(|| "-".to_owned());
        println!("{:<24} {:<22} {:>6}", name, token.category(), cost);
    }
    Ok(())
}

fn parse_specs(specs: &[String]) -> Result<()> {
    let vocabulary = Vocabulary::with_core_words();
    let mut failed = 0;

    for spec in specs {
        let parsed = match parse(&vocabulary, spec) {
            Ok(parsed) => parsed,
            Err(err) => {
                println!("{spec}: {err}");
                failed += 1;
                continue;
            }
        };

        let word = |token| vocabulary.describe(token);
        println!("{spec}");
        println!("  query:  {} ({})", word(parsed.query), parsed.query.category());
        if let Some(limit) = parsed.limit {
            println!("  limit:  {}", word(limit.token()));
        }
        if let Some(object) = parsed.object {
            println!("  object: {}", word(object));
        }
        if let Some(aux) = parsed.object_aux {
            println!("  around: {}", word(aux));
        }
        if let Some(cost) = vocabulary.cost(parsed.query) {
            println!("  cost:   {}", cost.0);
        }
        let criterion = Criterion::new(parsed, CriterionValue::Float(0.0));
        let canonical = unparse(&vocabulary, &criterion)?;
        println!("  canonical: {canonical}");
    }

    if failed > 0 {
        bail!("{failed} of {} specs did not parse", specs.len());
    }
    Ok(())
}

fn check_library(config: EngineConfig, path: &Path) -> Result<()> {
    let library = QueryLibrary::load(path)?;
    let mut system = TacticalPointSystem::new(config);
    let ids = system
        .load_definitions(&library)
        .with_context(|| format!("Failed to build queries from {}", path.display()))?;

    for id in ids {
        describe_query(&system, id);
    }
    println!("{} queries OK", library.queries.len());
    Ok(())
}

fn describe_query(system: &TacticalPointSystem, id: QueryId) {
    let Some(query) = system.query(id) else {
        return;
    };
    let runnable = if query.is_runnable() {
        ""
    } else {
        " (not runnable: an option has no generator)"
    };
    println!("{}{runnable}", query.name());
    for (index, option) in query.options().iter().enumerate() {
        match system.option_label(id, index) {
            Some(label) => println!("  option {index} [{label}]"),
            None => println!("  option {index}"),
        }
        for line in option.describe(system.vocabulary()).lines() {
            println!("    {line}");
        }
    }
}

struct RunOptions {
    query: Option<String>,
    count: usize,
    run_async: bool,
    budget: Duration,
    json: bool,
}

fn run_query(
    config: EngineConfig,
    queries: &Path,
    scenario_path: &Path,
    options: RunOptions,
) -> Result<()> {
    let library = QueryLibrary::load(queries)?;
    let scenario = Scenario::load(scenario_path)?;

    let mut system = TacticalPointSystem::new(config);
    scenario.install(&mut system)?;
    let ids = system
        .load_definitions(&library)
        .with_context(|| format!("Failed to build queries from {}", queries.display()))?;
    tracing::debug!(queries = ids.len(), "loaded query library");

    let name = match options.query {
        Some(name) => name,
        None => library
            .queries
            .first()
            .map(|q| q.name.clone())
            .context("The query library is empty")?,
    };
    let id = system
        .query_id(&name)
        .with_context(|| format!("No query named `{name}`"))?;

    let started = Instant::now();
    let (results, updates) = if options.run_async {
        run_async(&mut system, id, &scenario, options.count, options.budget)?
    } else {
        let results = system.sync_query(id, scenario.context.clone(), options.count)?;
        ((results.points, results.option), 0)
    };
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let (points, option) = results;
    let report = RunReport {
        label: option
            .and_then(|o| system.option_label(id, o))
            .map(str::to_owned),
        query: name,
        option,
        updates,
        elapsed_ms,
        points,
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match (report.option, &report.label) {
        (Some(option), Some(label)) => println!("{}: option {option} [{label}]", report.query),
        (Some(option), None) => println!("{}: option {option}", report.query),
        (None, _) => println!("{}: no option produced points", report.query),
    }
    for (rank, result) in report.points.iter().enumerate() {
        let p = result.point.position;
        println!(
            "  {:>2}. ({:>8.2}, {:>8.2}, {:>8.2})  score {:.3}",
            rank + 1,
            p.x,
            p.y,
            p.z,
            result.score
        );
    }
    if report.updates > 0 {
        println!("  {} updates, {:.2} ms", report.updates, report.elapsed_ms);
    } else {
        println!("  {:.2} ms", report.elapsed_ms);
    }
    Ok(())
}

fn run_async(
    system: &mut TacticalPointSystem,
    id: QueryId,
    scenario: &Scenario,
    count: usize,
    budget: Duration,
) -> Result<((Vec<PointResult>, Option<usize>), u32)> {
    let slot: Rc<RefCell<Option<QueryResults>>> = Rc::default();
    let sink = slot.clone();
    let ticket = system.async_query(
        id,
        scenario.context.clone(),
        QueryFlags::empty(),
        count,
        move |results: &QueryResults| {
            *sink.borrow_mut() = Some(results.clone());
        },
    )?;

    let mut updates = 0;
    while slot.borrow().is_none() {
        if updates >= MAX_UPDATES {
            system.cancel_async_query(ticket);
            bail!("Query did not finish within {MAX_UPDATES} updates");
        }
        system.update(budget);
        updates += 1;
    }

    let results = slot
        .borrow_mut()
        .take()
        .context("Query finished without results")?;
    if results.is_error {
        bail!("Query evaluation failed");
    }
    Ok(((results.points, results.option), updates))
}
