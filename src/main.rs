use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use neurofit::config::{AppConfig, ConfigManager};
use neurofit::data::RunArchive;
use neurofit::engines::analysis::compare_best;
use neurofit::engines::evaluation::{FitnessEvaluator, TestReport};
use neurofit::engines::generation::{EvolutionEngine, EvolutionOutcome, LogProgressCallback};
use neurofit::engines::grid::{GridOutcome, GridSearchEngine};
use neurofit::models::Izhikevich;
use neurofit::{Candidate, NeurofitError, ParameterSpace};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "neurofit",
    version,
    about = "Fit neuron model parameters to electrophysiological observations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Configuration file (TOML or JSON); NEUROFIT__SECTION__KEY variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Directory run artifacts are written under
    #[arg(long, global = true, default_value = "runs")]
    out: PathBuf,
    /// Run identifier (default: UTC timestamp)
    #[arg(long, global = true)]
    run_id: Option<String>,
    /// Seed for the evolutionary search
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Evolutionary search
    Ga,
    /// Exhaustive grid search
    Grid,
    /// Grid search, then evolutionary search with the same evaluator, then compare
    Compare,
    /// Print the effective configuration as TOML
    ShowConfig,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let manager = ConfigManager::new();
    match &cli.config {
        Some(path) => manager
            .load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => manager.load_from_env()?,
    }
    if let Some(seed) = cli.seed {
        manager.update(|config| config.evolution.seed = Some(seed))?;
    }
    let config = manager.get();

    if let Command::ShowConfig = cli.command {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let space = stage("configuration", config.space.build())?;
    let evaluator = Arc::new(stage(
        "configuration",
        FitnessEvaluator::from_config(&config, Arc::new(Izhikevich::default)),
    )?);
    let archive = RunArchive::new(&cli.out);
    let run_id = cli
        .run_id
        .unwrap_or_else(|| Utc::now().format("%Y%m%dT%H%M%S").to_string());
    log::info!("Run {} writing to {}", run_id, archive.run_dir(&run_id).display());

    match cli.command {
        Command::Ga => {
            let outcome = run_ga(&config, &space, &evaluator)?;
            archive.save(&run_id, "ga", &outcome)?;
            report(&evaluator, &archive, &run_id, "ga", &outcome.best.candidate, &outcome.worst.candidate)?;
        }
        Command::Grid => {
            let outcome = run_grid(&config, &space, &evaluator)?;
            archive.save(&run_id, "grid", &outcome)?;
            report(
                &evaluator,
                &archive,
                &run_id,
                "grid",
                &outcome.best_point().cell.candidate,
                &outcome.worst_point().cell.candidate,
            )?;
        }
        Command::Compare => {
            let grid = run_grid(&config, &space, &evaluator)?;
            archive.save(&run_id, "grid", &grid)?;
            let ga = run_ga(&config, &space, &evaluator)?;
            archive.save(&run_id, "ga", &ga)?;

            let grid_best = grid.best_point();
            let agreement = compare_best(
                &space,
                (&ga.best.candidate, &ga.best.fitness),
                (&grid_best.cell.candidate, &grid_best.evaluation.fitness),
            );
            archive.save(&run_id, "compare", &agreement)?;
            println!("{}", serde_json::to_string_pretty(&agreement)?);
        }
        Command::ShowConfig => {}
    }
    Ok(())
}

/// Tags a fatal error with its class and the stage it happened in.
fn stage<T>(name: &str, result: neurofit::Result<T>) -> Result<T> {
    result.map_err(|e: NeurofitError| anyhow!("{} during {}: {}", e.class(), name, e))
}

fn run_ga(config: &AppConfig, space: &ParameterSpace, evaluator: &Arc<FitnessEvaluator>) -> Result<EvolutionOutcome> {
    let mut engine = stage(
        "configuration",
        EvolutionEngine::new(config.evolution.clone(), space.clone(), Arc::clone(evaluator)),
    )?;
    let outcome = stage("evolution", engine.run(LogProgressCallback))?;
    println!(
        "GA: best objective {} after {} candidates in {:.2}s ({} cache hits)",
        outcome.best.fitness.summed(),
        outcome.genealogy.len(),
        outcome.elapsed_secs,
        outcome.cache.hits
    );
    Ok(outcome)
}

fn run_grid(config: &AppConfig, space: &ParameterSpace, evaluator: &Arc<FitnessEvaluator>) -> Result<GridOutcome> {
    let engine = stage("configuration", GridSearchEngine::new(config.grid.clone(), Arc::clone(evaluator)))?;
    let outcome = stage("grid search", engine.run(space))?;
    println!(
        "Grid: best objective {} over {} cells in {:.2}s",
        outcome.best_point().evaluation.fitness.summed(),
        outcome.points.len(),
        outcome.elapsed_secs
    );
    Ok(outcome)
}

/// Per-test breakdown of the best and worst candidates.
fn report(
    evaluator: &FitnessEvaluator,
    archive: &RunArchive,
    run_id: &str,
    strategy: &str,
    best: &Candidate,
    worst: &Candidate,
) -> Result<()> {
    let (_, best_tests) = stage("report", evaluator.explain(best))?;
    let (_, worst_tests) = stage("report", evaluator.explain(worst))?;
    for row in &best_tests {
        println!(
            "  {:<24} {:<12} error {:.3}{}",
            row.test,
            row.role.to_string(),
            row.error_value,
            row.failure.as_deref().map(|f| format!(" ({})", f)).unwrap_or_default()
        );
    }

    let breakdown: [(&str, &Candidate, &[TestReport]); 2] =
        [("best", best, best_tests.as_slice()), ("worst", worst, worst_tests.as_slice())];
    let artifact: Vec<serde_json::Value> = breakdown
        .iter()
        .map(|(label, candidate, tests)| {
            serde_json::json!({ "label": label, "params": candidate.params, "tests": tests })
        })
        .collect();
    archive.save(run_id, &format!("{}_tests", strategy), &artifact)?;
    Ok(())
}
