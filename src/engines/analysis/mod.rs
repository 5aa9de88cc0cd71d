pub mod results;

pub use results::{
    best_worst, compare_best, domination_matrix, dominates, non_dominated, objective_stats, pairwise_distances,
    param_distance, parameter_extents, Agreement, ObjectiveStats,
};
