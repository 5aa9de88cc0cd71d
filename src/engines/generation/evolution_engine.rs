use crate::config::{ConfigSection, EvolutionConfig};
use crate::data::CacheStats;
use crate::engines::analysis::{best_worst, objective_stats, ObjectiveStats};
use crate::engines::evaluation::FitnessEvaluator;
use crate::engines::generation::{
    genealogy::{CandidateId, Genealogy, GenealogyNode, Origin},
    hall_of_fame::{EliteCandidate, HallOfFame},
    operators::{blend_crossover, mating_pool, mutate},
    selection::{selection_rule, SelectionRule},
};
use crate::engines::worker_pool;
use crate::error::Result;
use crate::space::ParameterSpace;
use crate::types::{Candidate, Evaluation, FitnessVector};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    /// After the generation barrier: every new candidate has a fitness.
    fn on_population_evaluated(&mut self, generation: usize, evaluated: usize, invalid: usize);
    fn on_generation_complete(&mut self, record: &GenerationRecord, hall_of_fame_size: usize);
}

/// Summary of the surviving population after one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    /// Candidates evaluated in this generation.
    pub evaluated: usize,
    pub invalid: usize,
    pub best_id: CandidateId,
    /// `None` while no member of the population is valid.
    pub best_objective: Option<f64>,
    pub mean_objective: Option<f64>,
    /// Per-test error statistics over the valid members.
    pub objectives: Vec<ObjectiveStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    GenerationLimit,
    TargetReached,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionOutcome {
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub selection: String,
    pub stop_reason: StopReason,
    /// Best and worst over every candidate ever evaluated.
    pub best: GenealogyNode,
    pub worst: GenealogyNode,
    pub final_population: Vec<CandidateId>,
    pub genealogy: Genealogy,
    pub history: Vec<GenerationRecord>,
    pub hall_of_fame: Vec<EliteCandidate>,
    pub cache: CacheStats,
}

impl EvolutionOutcome {
    pub fn population(&self) -> impl Iterator<Item = &GenealogyNode> {
        self.final_population.iter().map(move |&id| &self.genealogy[id])
    }
}

/// Ranking of a population and the mating pool drawn from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub ranking: Vec<usize>,
    pub pool: Vec<usize>,
}

/// Ranks `fitness` with `rule` and draws `pool_size` tournament winners.
/// Deterministic for a given rule, input and generator state.
pub fn select<R: Rng>(
    rule: &dyn SelectionRule,
    fitness: &[FitnessVector],
    pool_size: usize,
    tournament_size: usize,
    rng: &mut R,
) -> Selection {
    let ranking = rule.rank(fitness);
    let pool = mating_pool(&ranking, pool_size, tournament_size, rng);
    Selection { ranking, pool }
}

struct Offspring {
    origin: Origin,
    parents: Vec<CandidateId>,
    candidate: Candidate,
}

pub struct EvolutionEngine {
    config: EvolutionConfig,
    space: ParameterSpace,
    evaluator: Arc<FitnessEvaluator>,
    selection: Box<dyn SelectionRule>,
    pool: rayon::ThreadPool,
    rng: StdRng,
}

impl EvolutionEngine {
    pub fn new(config: EvolutionConfig, space: ParameterSpace, evaluator: Arc<FitnessEvaluator>) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let pool = worker_pool(evaluator.config().workers)?;

        Ok(Self {
            selection: selection_rule(config.selection_method),
            config,
            space,
            evaluator,
            pool,
            rng,
        })
    }

    /// Replaces the rule chosen by `selection_method`.
    pub fn with_selection(mut self, selection: Box<dyn SelectionRule>) -> Self {
        self.selection = selection;
        self
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    /// Run the evolution process
    pub fn run<C: ProgressCallback>(&mut self, mut callback: C) -> Result<EvolutionOutcome> {
        let started_at = Utc::now();
        let start = Instant::now();
        let n = self.config.population_size;

        log::info!(
            "Starting evolution: {} candidates x {} generations over {} parameters, {} selection",
            n,
            self.config.generations,
            self.space.len(),
            self.selection.name()
        );

        let mut genealogy = Genealogy::new();
        let mut hall_of_fame = HallOfFame::new(self.config.hall_of_fame_size);
        let mut history = Vec::with_capacity(self.config.generations);

        // Initialize population
        callback.on_generation_start(0);
        let initial: Vec<Offspring> = (0..n)
            .map(|_| Offspring {
                origin: Origin::Initial,
                parents: Vec::new(),
                candidate: self.space.sample(&mut self.rng),
            })
            .collect();
        let mut population = self.evaluate_offspring(0, initial, &mut genealogy, &mut hall_of_fame, &mut callback)?;

        let mut stop_reason = self.record_generation(0, n, &population, &genealogy, &hall_of_fame, &mut history, &mut callback);

        // Evolution loop
        for generation in 1..self.config.generations {
            if stop_reason == StopReason::TargetReached {
                break;
            }
            callback.on_generation_start(generation);

            let fitness: Vec<FitnessVector> = population.iter().map(|&id| genealogy[id].fitness.clone()).collect();
            let selection = select(
                self.selection.as_ref(),
                &fitness,
                2 * n,
                self.config.tournament_size,
                &mut self.rng,
            );
            let offspring = self.vary(&genealogy, &population, &selection.pool);
            let children = self.evaluate_offspring(generation, offspring, &mut genealogy, &mut hall_of_fame, &mut callback)?;

            // mu + lambda survival; parents precede children so ties keep parents.
            let combined: Vec<CandidateId> = population.iter().chain(&children).copied().collect();
            let combined_fitness: Vec<FitnessVector> =
                combined.iter().map(|&id| genealogy[id].fitness.clone()).collect();
            population = self
                .selection
                .rank(&combined_fitness)
                .into_iter()
                .take(n)
                .map(|i| combined[i])
                .collect();

            stop_reason = self.record_generation(
                generation,
                children.len(),
                &population,
                &genealogy,
                &hall_of_fame,
                &mut history,
                &mut callback,
            );
        }

        let nodes = genealogy.nodes();
        let (best, worst) = best_worst(nodes.iter().map(|node| &node.fitness)).unwrap_or((0, 0));
        let outcome = EvolutionOutcome {
            started_at,
            elapsed_secs: start.elapsed().as_secs_f64(),
            selection: self.selection.name().to_string(),
            stop_reason,
            best: nodes[best].clone(),
            worst: nodes[worst].clone(),
            final_population: population,
            hall_of_fame: hall_of_fame.get_all().to_vec(),
            history,
            cache: self.evaluator.cache().stats(),
            genealogy,
        };

        log::info!(
            "Evolution finished after {} generations in {:.2}s: {} candidates evaluated, best objective {}",
            outcome.history.len(),
            outcome.elapsed_secs,
            outcome.genealogy.len(),
            outcome.best.fitness.summed()
        );
        Ok(outcome)
    }

    /// One child per pair of pool entries. Distinct parents are recombined
    /// with probability `crossover_rate`; otherwise, or when both draws name
    /// the same candidate, the first parent is mutated.
    fn vary(&mut self, genealogy: &Genealogy, population: &[CandidateId], pool: &[usize]) -> Vec<Offspring> {
        let n = self.config.population_size;
        let mut offspring = Vec::with_capacity(n);

        for pair in pool.chunks(2).take(n) {
            let first = population[pair[0]];
            let second = population[pair.get(1).copied().unwrap_or(pair[0])];

            if first != second && self.rng.gen::<f64>() < self.config.crossover_rate {
                let mut child = blend_crossover(
                    &self.space,
                    &genealogy[first].candidate,
                    &genealogy[second].candidate,
                    self.config.blend_alpha,
                    &mut self.rng,
                );
                mutate(
                    &self.space,
                    &mut child,
                    self.config.mutation_rate,
                    self.config.mutation_strength,
                    false,
                    &mut self.rng,
                );
                offspring.push(Offspring {
                    origin: Origin::Crossover,
                    parents: vec![first, second],
                    candidate: child,
                });
            } else {
                let mut child = genealogy[first].candidate.clone();
                mutate(
                    &self.space,
                    &mut child,
                    self.config.mutation_rate,
                    self.config.mutation_strength,
                    true,
                    &mut self.rng,
                );
                offspring.push(Offspring {
                    origin: Origin::Mutation,
                    parents: vec![first],
                    candidate: child,
                });
            }
        }

        offspring
    }

    /// Evaluates a whole batch in parallel, then records it. Returns the new
    /// ids in batch order.
    fn evaluate_offspring<C: ProgressCallback>(
        &self,
        generation: usize,
        offspring: Vec<Offspring>,
        genealogy: &mut Genealogy,
        hall_of_fame: &mut HallOfFame,
        callback: &mut C,
    ) -> Result<Vec<CandidateId>> {
        let candidates: Vec<&Candidate> = offspring.iter().map(|o| &o.candidate).collect();
        let evaluations = self.evaluate_batch(&candidates)?;

        let invalid = evaluations.iter().filter(|e| !e.fitness.is_valid()).count();
        callback.on_population_evaluated(generation, evaluations.len(), invalid);

        let mut ids = Vec::with_capacity(offspring.len());
        for (child, evaluation) in offspring.into_iter().zip(evaluations) {
            let id = genealogy.push(generation, child.origin, child.parents, child.candidate, evaluation)?;
            hall_of_fame.try_add(EliteCandidate::from_node(&genealogy[id]));
            ids.push(id);
        }
        Ok(ids)
    }

    /// Generation barrier: returns once every candidate has an evaluation.
    fn evaluate_batch(&self, candidates: &[&Candidate]) -> Result<Vec<Evaluation>> {
        let evaluator = &self.evaluator;
        self.pool.install(|| {
            candidates
                .par_iter()
                .map(|candidate| evaluator.evaluate_contained(candidate))
                .collect()
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn record_generation<C: ProgressCallback>(
        &self,
        generation: usize,
        evaluated: usize,
        population: &[CandidateId],
        genealogy: &Genealogy,
        hall_of_fame: &HallOfFame,
        history: &mut Vec<GenerationRecord>,
        callback: &mut C,
    ) -> StopReason {
        let fitness: Vec<&FitnessVector> = population.iter().map(|&id| &genealogy[id].fitness).collect();
        let (best, _) = best_worst(fitness.iter().copied()).unwrap_or((0, 0));
        let valid: Vec<f64> = fitness.iter().filter(|f| f.is_valid()).map(|f| f.objective).collect();

        let record = GenerationRecord {
            generation,
            evaluated,
            invalid: fitness.iter().filter(|f| !f.is_valid()).count(),
            best_id: population[best],
            best_objective: fitness[best].is_valid().then_some(fitness[best].objective),
            mean_objective: (!valid.is_empty()).then(|| valid.iter().sum::<f64>() / valid.len() as f64),
            objectives: objective_stats(fitness.iter().copied()),
        };

        callback.on_generation_complete(&record, hall_of_fame.len());

        let reached = match (self.config.target_objective, record.best_objective) {
            (Some(target), Some(best)) => best < target,
            _ => false,
        };
        history.push(record);

        if reached {
            log::info!("Target objective reached in generation {}", generation);
            StopReason::TargetReached
        } else {
            StopReason::GenerationLimit
        }
    }
}
