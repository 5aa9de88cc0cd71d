//! Read-only queries over already computed fitness vectors.

use crate::engines::generation::pareto;
use crate::space::ParameterSpace;
use crate::types::{Candidate, FitnessVector, ParamMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Positions of the best and worst vectors, or `None` for an empty input.
///
/// Best has the minimal summed objective, worst the maximal summed objective
/// among valid vectors. Ties go to the first found. When nothing is valid
/// both are the first position.
pub fn best_worst<'a, I>(fitness: I) -> Option<(usize, usize)>
where
    I: IntoIterator<Item = &'a FitnessVector>,
{
    let mut best: Option<(usize, f64)> = None;
    let mut worst: Option<(usize, f64)> = None;
    let mut seen = 0;

    for (i, f) in fitness.into_iter().enumerate() {
        seen += 1;
        let summed = f.summed();
        if best.map_or(true, |(_, b)| summed < b) {
            best = Some((i, summed));
        }
        if f.is_valid() && worst.map_or(true, |(_, w)| summed > w) {
            worst = Some((i, summed));
        }
    }

    if seen == 0 {
        return None;
    }
    let best = best.map_or(0, |(i, _)| i);
    let worst = worst.map_or(0, |(i, _)| i);
    Some((best, worst))
}

/// Every per-test error of `a` is at most that of `b` and one is strictly
/// smaller. An invalid vector dominates nothing.
pub fn dominates(a: &FitnessVector, b: &FitnessVector) -> bool {
    a.is_valid() && pareto::dominates(&a.selection_errors(), &b.selection_errors())
}

/// `matrix[i][j]` is true when `fitness[i]` dominates `fitness[j]`.
pub fn domination_matrix(fitness: &[FitnessVector]) -> Vec<Vec<bool>> {
    fitness
        .iter()
        .map(|a| fitness.iter().map(|b| dominates(a, b)).collect())
        .collect()
}

/// Positions of the vectors nothing else dominates, in input order.
pub fn non_dominated(fitness: &[FitnessVector]) -> Vec<usize> {
    (0..fitness.len())
        .filter(|&i| !fitness.iter().any(|other| dominates(other, &fitness[i])))
        .collect()
}

/// Euclidean distance in raw parameter units over the names both share.
pub fn param_distance(a: &Candidate, b: &Candidate) -> f64 {
    a.params
        .iter()
        .filter_map(|(name, x)| b.get(name).map(|y| (x - y).powi(2)))
        .sum::<f64>()
        .sqrt()
}

pub fn pairwise_distances(candidates: &[Candidate], space: Option<&ParameterSpace>) -> Vec<Vec<f64>> {
    candidates
        .iter()
        .map(|a| {
            candidates
                .iter()
                .map(|b| match space {
                    Some(space) => space.normalized_distance(a, b),
                    None => param_distance(a, b),
                })
                .collect()
        })
        .collect()
}

/// Per-parameter `(min, max)` over the candidates.
pub fn parameter_extents<'a, I>(candidates: I) -> BTreeMap<String, (f64, f64)>
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let mut extents: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for candidate in candidates {
        for (name, &value) in &candidate.params {
            extents
                .entry(name.clone())
                .and_modify(|(lo, hi)| {
                    *lo = lo.min(value);
                    *hi = hi.max(value);
                })
                .or_insert((value, value));
        }
    }
    extents
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
}

/// Mean, population std and min of each per-test error over the valid
/// vectors. Empty when none are valid.
pub fn objective_stats<'a, I>(fitness: I) -> Vec<ObjectiveStats>
where
    I: IntoIterator<Item = &'a FitnessVector>,
{
    let valid: Vec<&FitnessVector> = fitness.into_iter().filter(|f| f.is_valid()).collect();
    let Some(first) = valid.first() else {
        return Vec::new();
    };
    let n = valid.len() as f64;

    (0..first.errors.len())
        .map(|k| {
            let column: Vec<f64> = valid.iter().filter_map(|f| f.errors.get(k).copied()).collect();
            let mean = column.iter().sum::<f64>() / n;
            let variance = column.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
            ObjectiveStats {
                mean,
                std: variance.sqrt(),
                min: column.iter().copied().fold(f64::INFINITY, f64::min),
            }
        })
        .collect()
}

/// How closely two strategies' best candidates agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agreement {
    pub ga_params: ParamMap,
    pub grid_params: ParamMap,
    pub ga_objective: Option<f64>,
    pub grid_objective: Option<f64>,
    /// GA minus grid; negative when the GA found the better point.
    pub objective_gap: Option<f64>,
    pub ga_dominates_grid: bool,
    pub grid_dominates_ga: bool,
    pub param_distance: f64,
    pub normalized_distance: f64,
}

pub fn compare_best(
    space: &ParameterSpace,
    ga: (&Candidate, &FitnessVector),
    grid: (&Candidate, &FitnessVector),
) -> Agreement {
    let ga_objective = ga.1.is_valid().then_some(ga.1.objective);
    let grid_objective = grid.1.is_valid().then_some(grid.1.objective);
    Agreement {
        ga_params: ga.0.params.clone(),
        grid_params: grid.0.params.clone(),
        ga_objective,
        grid_objective,
        objective_gap: ga_objective.zip(grid_objective).map(|(a, b)| a - b),
        ga_dominates_grid: dominates(ga.1, grid.1),
        grid_dominates_ga: dominates(grid.1, ga.1),
        param_distance: param_distance(ga.0, grid.0),
        normalized_distance: space.normalized_distance(ga.0, grid.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Dimension;
    use crate::types::FailureKind;

    fn scored(errors: &[f64]) -> FitnessVector {
        FitnessVector::scored(errors.to_vec(), &vec![1.0; errors.len()])
    }

    fn invalid() -> FitnessVector {
        FitnessVector::invalid(2, 100.0, FailureKind::RheobaseNotFound)
    }

    fn candidate(pairs: &[(&str, f64)]) -> Candidate {
        Candidate::new(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    #[test]
    fn test_best_worst_first_found() {
        let fitness = vec![scored(&[2.0, 1.0]), scored(&[1.0, 1.0]), invalid(), scored(&[1.0, 1.0]), scored(&[4.0, 0.0])];
        assert_eq!(best_worst(&fitness), Some((1, 4)));
    }

    #[test]
    fn test_best_worst_all_invalid() {
        let fitness = vec![invalid(), invalid(), invalid()];
        assert_eq!(best_worst(&fitness), Some((0, 0)));
        assert_eq!(best_worst(&Vec::<FitnessVector>::new()), None);
    }

    #[test]
    fn test_domination() {
        let fitness = vec![scored(&[1.0, 1.0]), scored(&[1.0, 2.0]), scored(&[0.5, 3.0]), invalid()];
        let matrix = domination_matrix(&fitness);
        assert!(matrix[0][1]);
        assert!(!matrix[1][0]);
        assert!(!matrix[0][2]);
        assert!(matrix[0][3]);
        assert!(!matrix[3][3]);
        assert_eq!(non_dominated(&fitness), vec![0, 2]);
    }

    #[test]
    fn test_distances_and_extents() {
        let a = candidate(&[("a", 0.0), ("b", 0.0)]);
        let b = candidate(&[("a", 3.0), ("b", 4.0)]);
        assert_eq!(param_distance(&a, &b), 5.0);

        let space = ParameterSpace::new(vec![Dimension::new("a", 0.0, 3.0), Dimension::new("b", 0.0, 4.0)], 2).unwrap();
        let matrix = pairwise_distances(&[a.clone(), b.clone()], Some(&space));
        assert!((matrix[0][1] - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(matrix[0][0], 0.0);

        let extents = parameter_extents([&a, &b]);
        assert_eq!(extents["a"], (0.0, 3.0));
        assert_eq!(extents["b"], (0.0, 4.0));
    }

    #[test]
    fn test_objective_stats_skip_invalid() {
        let fitness = vec![scored(&[1.0, 4.0]), invalid(), scored(&[3.0, 4.0])];
        let stats = objective_stats(&fitness);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0], ObjectiveStats { mean: 2.0, std: 1.0, min: 1.0 });
        assert_eq!(stats[1], ObjectiveStats { mean: 4.0, std: 0.0, min: 4.0 });
        assert!(objective_stats(&[invalid()]).is_empty());
    }

    #[test]
    fn test_compare_best() {
        let space = ParameterSpace::new(vec![Dimension::new("a", 0.0, 10.0)], 2).unwrap();
        let ga = (candidate(&[("a", 2.0)]), scored(&[1.0]));
        let grid = (candidate(&[("a", 4.0)]), scored(&[3.0]));
        let agreement = compare_best(&space, (&ga.0, &ga.1), (&grid.0, &grid.1));
        assert_eq!(agreement.objective_gap, Some(-2.0));
        assert!(agreement.ga_dominates_grid);
        assert!(!agreement.grid_dominates_ga);
        assert!((agreement.normalized_distance - 0.2).abs() < 1e-12);
    }
}
