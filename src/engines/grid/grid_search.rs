use crate::config::{ConfigSection, GridConfig};
use crate::data::CacheStats;
use crate::engines::analysis::best_worst;
use crate::engines::evaluation::FitnessEvaluator;
use crate::engines::worker_pool;
use crate::error::{NeurofitError, Result};
use crate::space::ParameterSpace;
use crate::types::{Candidate, Evaluation};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// One point of the discretised Cartesian product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    /// Position in enumeration order (last dimension varies fastest).
    pub index: usize,
    pub candidate: Candidate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub cell: GridCell,
    pub evaluation: Evaluation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridOutcome {
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    /// Scored cells in enumeration order.
    pub points: Vec<GridPoint>,
    pub best: usize,
    pub worst: usize,
    pub cache: CacheStats,
}

impl GridOutcome {
    pub fn best_point(&self) -> &GridPoint {
        &self.points[self.best]
    }

    pub fn worst_point(&self) -> &GridPoint {
        &self.points[self.worst]
    }
}

/// Exhaustive search sharing the evolutionary engine's evaluator.
pub struct GridSearchEngine {
    config: GridConfig,
    evaluator: Arc<FitnessEvaluator>,
    pool: rayon::ThreadPool,
}

impl GridSearchEngine {
    pub fn new(config: GridConfig, evaluator: Arc<FitnessEvaluator>) -> Result<Self> {
        config.validate()?;
        let pool = worker_pool(evaluator.config().workers)?;
        Ok(Self {
            config,
            evaluator,
            pool,
        })
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    /// Enumerates every cell of `space`, refusing grids above the ceiling.
    pub fn create_grid(&self, space: &ParameterSpace) -> Result<Vec<GridCell>> {
        let cells = space.grid_size();
        let ceiling = self.config.max_cells as u128;
        if cells > ceiling {
            return Err(NeurofitError::SearchExhausted { cells, ceiling });
        }
        if cells > self.config.warn_cells as u128 {
            log::warn!(
                "Grid of {} cells over {} parameters at resolution {}",
                cells,
                space.len(),
                space.resolution()
            );
        }

        Ok(enumerate_cells(space))
    }

    pub fn run(&self, space: &ParameterSpace) -> Result<GridOutcome> {
        let started_at = Utc::now();
        let start = Instant::now();
        let grid = self.create_grid(space)?;

        log::info!(
            "Starting grid search: {} cells over {} parameters",
            grid.len(),
            space.len()
        );

        let evaluator = &self.evaluator;
        let evaluations: Vec<Evaluation> = self.pool.install(|| {
            grid.par_iter()
                .map(|cell| evaluator.evaluate_contained(&cell.candidate))
                .collect::<Result<Vec<_>>>()
        })?;

        let points: Vec<GridPoint> = grid
            .into_iter()
            .zip(evaluations)
            .map(|(cell, evaluation)| GridPoint { cell, evaluation })
            .collect();
        let invalid = points.iter().filter(|p| !p.evaluation.fitness.is_valid()).count();
        if invalid > 0 {
            log::warn!("{} of {} grid cells could not be scored", invalid, points.len());
        }

        let (best, worst) = best_worst(points.iter().map(|p| &p.evaluation.fitness)).unwrap_or((0, 0));
        let outcome = GridOutcome {
            started_at,
            elapsed_secs: start.elapsed().as_secs_f64(),
            best,
            worst,
            cache: self.evaluator.cache().stats(),
            points,
        };

        log::info!(
            "Grid search finished in {:.2}s, best objective {}",
            outcome.elapsed_secs,
            outcome.best_point().evaluation.fitness.summed()
        );
        Ok(outcome)
    }
}

/// Cartesian product of the space's value ladders, last dimension fastest.
pub fn enumerate_cells(space: &ParameterSpace) -> Vec<GridCell> {
    let values = space.grid_values();
    let names: Vec<&str> = space.dimensions().iter().map(|d| d.name.as_str()).collect();
    let mut digits = vec![0usize; values.len()];
    let mut grid = Vec::new();

    loop {
        let params = names
            .iter()
            .zip(&digits)
            .zip(&values)
            .map(|((name, &digit), ladder)| (name.to_string(), ladder[digit]))
            .collect();
        grid.push(GridCell {
            index: grid.len(),
            candidate: Candidate::new(params),
        });

        // Odometer increment.
        let mut position = digits.len();
        loop {
            if position == 0 {
                return grid;
            }
            position -= 1;
            digits[position] += 1;
            if digits[position] < values[position].len() {
                break;
            }
            digits[position] = 0;
        }
    }
}
