use super::traits::{invalid, ConfigSection};
use crate::error::NeurofitError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Probability that a pair of parents is recombined.
    pub crossover_rate: f64,
    /// Per-gene probability of a bounded perturbation.
    pub mutation_rate: f64,
    /// Perturbation width as a fraction of the dimension's span.
    pub mutation_strength: f64,
    /// BLX-alpha extension of the blend interval.
    pub blend_alpha: f64,
    pub selection_method: SelectionMethod,
    pub tournament_size: usize,
    pub hall_of_fame_size: usize,
    /// Stop once the best summed objective drops below this.
    pub target_objective: Option<f64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Non-dominated sorting with crowding distance over per-test errors.
    Nsga2,
    /// Rank by summed objective and keep the best.
    Elitist,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 32,
            generations: 10,
            crossover_rate: 0.9,
            mutation_rate: 0.3,
            mutation_strength: 0.1,
            blend_alpha: 0.5,
            selection_method: SelectionMethod::Nsga2,
            tournament_size: 2,
            hall_of_fame_size: 10,
            target_objective: None,
            seed: None,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), NeurofitError> {
        let section = Self::section_name();
        if self.population_size == 0 {
            return Err(invalid(section, "Population size must be positive"));
        }
        if self.generations == 0 {
            return Err(invalid(section, "Generation count must be positive"));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(invalid(section, "Crossover rate must be between 0 and 1"));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(invalid(section, "Mutation rate must be between 0 and 1"));
        }
        if !(self.mutation_strength > 0.0 && self.mutation_strength <= 1.0) {
            return Err(invalid(section, "Mutation strength must be in (0, 1]"));
        }
        if !(self.blend_alpha >= 0.0 && self.blend_alpha.is_finite()) {
            return Err(invalid(section, "Blend alpha must be a non-negative number"));
        }
        if self.tournament_size == 0 {
            return Err(invalid(section, "Tournament size must be positive"));
        }
        Ok(())
    }
}
