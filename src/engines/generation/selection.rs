use super::pareto;
use crate::config::SelectionMethod;
use crate::types::FitnessVector;
use std::cmp::Ordering;

/// Orders a population best first.
///
/// Implementations must be deterministic for a given input, and candidates
/// the rule cannot tell apart keep their input order.
pub trait SelectionRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Indices into `fitness`, best first.
    fn rank(&self, fitness: &[FitnessVector]) -> Vec<usize>;
}

pub fn selection_rule(method: SelectionMethod) -> Box<dyn SelectionRule> {
    match method {
        SelectionMethod::Nsga2 => Box::new(Nsga2Selection),
        SelectionMethod::Elitist => Box::new(ElitistSelection),
    }
}

/// Non-dominated front first, then crowding distance (descending).
#[derive(Debug, Clone, Copy, Default)]
pub struct Nsga2Selection;

impl SelectionRule for Nsga2Selection {
    fn name(&self) -> &'static str {
        "nsga2"
    }

    fn rank(&self, fitness: &[FitnessVector]) -> Vec<usize> {
        let objectives: Vec<Vec<f64>> = fitness.iter().map(|f| f.selection_errors()).collect();
        let mut ranked = Vec::with_capacity(fitness.len());

        for front in pareto::fast_non_dominated_sort(&objectives) {
            let distance = pareto::crowding_distance(&objectives, &front);
            let mut members: Vec<(usize, f64)> = front.into_iter().zip(distance).collect();
            members.sort_by(|a, b| match b.1.total_cmp(&a.1) {
                Ordering::Equal => a.0.cmp(&b.0),
                other => other,
            });
            ranked.extend(members.into_iter().map(|(i, _)| i));
        }
        ranked
    }
}

/// Summed objective ascending; invalid vectors last.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElitistSelection;

impl SelectionRule for ElitistSelection {
    fn name(&self) -> &'static str {
        "elitist"
    }

    fn rank(&self, fitness: &[FitnessVector]) -> Vec<usize> {
        let mut ranked: Vec<usize> = (0..fitness.len()).collect();
        // Stable sort: equal objectives keep insertion order.
        ranked.sort_by(|&a, &b| fitness[a].cmp_objective(&fitness[b]));
        ranked
    }
}
