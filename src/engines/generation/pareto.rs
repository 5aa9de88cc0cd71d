/// Pareto utilities for multi-objective selection over per-test errors.
/// NSGA-II style fast non-dominated sorting and crowding distance. Every
/// objective is minimised.

/// A dominates B if A is no worse than B in every objective and strictly
/// better in at least one.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut at_least_one_better = false;
    for (a_val, b_val) in a.iter().zip(b) {
        if b_val < a_val {
            return false;
        }
        if a_val < b_val {
            at_least_one_better = true;
        }
    }
    at_least_one_better
}

/// Fast non-dominated sorting (NSGA-II).
/// Returns indices grouped by front (0 = best), each front in ascending
/// index order.
pub fn fast_non_dominated_sort(objectives: &[Vec<f64>]) -> Vec<Vec<usize>> {
    let n = objectives.len();
    if n == 0 {
        return Vec::new();
    }

    // domination_count: how many individuals dominate i
    // dominated_solutions: indices i dominates
    let mut domination_count = vec![0usize; n];
    let mut dominated_solutions: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut first_front = Vec::new();

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if dominates(&objectives[i], &objectives[j]) {
                dominated_solutions[i].push(j);
            } else if dominates(&objectives[j], &objectives[i]) {
                domination_count[i] += 1;
            }
        }
        if domination_count[i] == 0 {
            first_front.push(i);
        }
    }

    let mut fronts = vec![first_front];
    let mut front_index = 0;
    while front_index < fronts.len() {
        let mut next_front = Vec::new();
        for &i in &fronts[front_index] {
            for &j in &dominated_solutions[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next_front.push(j);
                }
            }
        }
        if next_front.is_empty() {
            break;
        }
        next_front.sort_unstable();
        fronts.push(next_front);
        front_index += 1;
    }

    fronts
}

/// Crowding distance of each member of `front`, aligned with `front`.
/// Boundary members get infinite distance. Objectives whose range over the
/// front is zero or not finite contribute nothing, boundaries included.
pub fn crowding_distance(objectives: &[Vec<f64>], front: &[usize]) -> Vec<f64> {
    let front_size = front.len();
    if front_size <= 2 {
        return vec![f64::INFINITY; front_size];
    }

    let mut distance = vec![0.0; front_size];
    let num_objectives = objectives[front[0]].len();

    for obj in 0..num_objectives {
        // Positions into `front`, sorted by this objective.
        let mut sorted: Vec<usize> = (0..front_size).collect();
        sorted.sort_by(|&a, &b| objectives[front[a]][obj].total_cmp(&objectives[front[b]][obj]));

        let min_val = objectives[front[sorted[0]]][obj];
        let max_val = objectives[front[sorted[front_size - 1]]][obj];
        let range = max_val - min_val;
        if !range.is_finite() || range < 1e-10 {
            continue;
        }

        distance[sorted[0]] = f64::INFINITY;
        distance[sorted[front_size - 1]] = f64::INFINITY;

        for i in 1..(front_size - 1) {
            let prev_val = objectives[front[sorted[i - 1]]][obj];
            let next_val = objectives[front[sorted[i + 1]]][obj];
            distance[sorted[i]] += (next_val - prev_val) / range;
        }
    }

    distance
}
