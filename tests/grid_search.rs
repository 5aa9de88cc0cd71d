mod common;

use common::{evaluator, passive_suite, rheobase_suite, unit_space, SyntheticFactory};
use neurofit::config::GridConfig;
use neurofit::engines::analysis::compare_best;
use neurofit::engines::grid::GridSearchEngine;
use neurofit::{FailureKind, NeurofitError};

#[test]
fn test_grid_scores_every_cell_once() {
    common::init_logging();
    let factory = SyntheticFactory::new(100.0);
    let engine = GridSearchEngine::new(GridConfig::default(), evaluator(&factory, rheobase_suite(-65.0))).unwrap();

    let outcome = engine.run(&unit_space(6)).unwrap();
    assert_eq!(outcome.points.len(), 36);
    assert_eq!(factory.builds(), 36);
    assert!(outcome.points.iter().all(|p| p.evaluation.fitness.is_valid()));
    assert!(outcome.points.iter().enumerate().all(|(i, p)| p.cell.index == i));

    // A second pass is served entirely from the cache.
    let again = engine.run(&unit_space(6)).unwrap();
    assert_eq!(factory.builds(), 36);
    assert_eq!(again.cache.hits, 36);
    assert_eq!(again.best, outcome.best);
}

#[test]
fn test_oversized_grid_is_refused_up_front() {
    let factory = SyntheticFactory::new(100.0);
    let config = GridConfig {
        max_cells: 10,
        ..GridConfig::default()
    };
    let engine = GridSearchEngine::new(config, evaluator(&factory, rheobase_suite(-65.0))).unwrap();

    let err = engine.run(&unit_space(6)).unwrap_err();
    assert!(matches!(err, NeurofitError::SearchExhausted { cells: 36, ceiling: 10 }));
    assert_eq!(err.class(), "SearchExhaustedError");
    assert_eq!(factory.builds(), 0);
}

#[test]
fn test_grid_order_and_extremes() {
    let factory = SyntheticFactory::new(100.0);
    let engine = GridSearchEngine::new(GridConfig::default(), evaluator(&factory, passive_suite(-65.0))).unwrap();
    let outcome = engine.run(&unit_space(6)).unwrap();

    // Last dimension varies fastest.
    let first_row: Vec<f64> = outcome.points[..6].iter().map(|p| p.cell.candidate.get("x").unwrap()).collect();
    assert_eq!(first_row, vec![0.0; 6]);
    assert_eq!(outcome.points[1].cell.candidate.get("y"), Some(0.2));

    // Resting potential -55 mV at (1, 1) is furthest from both targets.
    assert_eq!(outcome.worst, 35);
    assert!((outcome.worst_point().evaluation.fitness.objective - 18.0).abs() < 1e-9);

    let best = outcome.best_point().evaluation.fitness.summed();
    assert!((best - 2.0).abs() < 1e-9, "{}", best);
    let first_best = outcome
        .points
        .iter()
        .position(|p| p.evaluation.fitness.summed() <= best)
        .unwrap();
    assert_eq!(outcome.best, first_best);
}

#[test]
fn test_grid_matches_direct_scoring() {
    let factory = SyntheticFactory::new(100.0);
    let engine = GridSearchEngine::new(GridConfig::default(), evaluator(&factory, rheobase_suite(-65.0))).unwrap();
    let outcome = engine.run(&unit_space(3)).unwrap();

    let fresh = evaluator(&SyntheticFactory::new(100.0), rheobase_suite(-65.0));
    for point in &outcome.points {
        let direct = fresh.evaluate_uncached(&point.cell.candidate).unwrap();
        assert_eq!(direct, point.evaluation);
    }
}

#[test]
fn test_failing_cells_are_contained() {
    let factory = SyntheticFactory::new(100.0).failing_above(0.5);
    let engine = GridSearchEngine::new(GridConfig::default(), evaluator(&factory, rheobase_suite(-65.0))).unwrap();
    let outcome = engine.run(&unit_space(6)).unwrap();

    let failed: Vec<_> = outcome
        .points
        .iter()
        .filter(|p| !p.evaluation.fitness.is_valid())
        .collect();
    assert_eq!(failed.len(), 18);
    assert!(failed.iter().all(|p| {
        p.cell.candidate.get("x").unwrap() > 0.5
            && matches!(p.evaluation.fitness.failure, Some(FailureKind::Simulation(_)))
    }));
    assert!(outcome.worst_point().evaluation.fitness.is_valid());
    assert!(outcome.best_point().evaluation.fitness.is_valid());
}

#[test]
fn test_compare_against_itself() {
    let factory = SyntheticFactory::new(100.0);
    let engine = GridSearchEngine::new(GridConfig::default(), evaluator(&factory, passive_suite(-65.0))).unwrap();
    let space = unit_space(4);
    let outcome = engine.run(&space).unwrap();
    let best = outcome.best_point();

    let agreement = compare_best(
        &space,
        (&best.cell.candidate, &best.evaluation.fitness),
        (&best.cell.candidate, &best.evaluation.fitness),
    );
    assert_eq!(agreement.objective_gap, Some(0.0));
    assert_eq!(agreement.param_distance, 0.0);
    assert!(!agreement.ga_dominates_grid && !agreement.grid_dominates_ga);
}

#[test]
fn test_rejected_parameter_aborts_grid() {
    use neurofit::config::AppConfig;
    use neurofit::engines::evaluation::FitnessEvaluator;
    use neurofit::models::Izhikevich;
    use neurofit::{Dimension, ParameterSpace};
    use std::sync::Arc;

    let evaluator = FitnessEvaluator::from_config(&AppConfig::default(), Arc::new(Izhikevich::default)).unwrap();
    let engine = GridSearchEngine::new(GridConfig::default(), Arc::new(evaluator)).unwrap();
    let space = ParameterSpace::new(
        vec![Dimension::new("a", 0.01, 0.1), Dimension::new("bogus", 0.0, 1.0)],
        3,
    )
    .unwrap();

    let err = engine.run(&space).unwrap_err();
    assert!(matches!(err, NeurofitError::Configuration(_)), "{:?}", err);
}
