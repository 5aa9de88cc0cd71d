mod common;

use common::{evaluator, rheobase_suite, unit_space, SyntheticFactory};
use neurofit::config::{EvolutionConfig, SelectionMethod};
use neurofit::engines::generation::{
    select, ChannelProgressCallback, EvolutionEngine, EvolutionOutcome, GenerationRecord, Nsga2Selection, Origin,
    ProgressCallback, ProgressMessage, StopReason,
};
use neurofit::{FailureKind, FitnessVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::mpsc;

/// Records what the engine reports, for assertions.
#[derive(Default)]
struct TestProgressCallback {
    started: Vec<usize>,
    evaluated: Vec<(usize, usize, usize)>,
    best: Vec<Option<f64>>,
}

impl ProgressCallback for TestProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        self.started.push(generation);
    }

    fn on_population_evaluated(&mut self, generation: usize, evaluated: usize, invalid: usize) {
        self.evaluated.push((generation, evaluated, invalid));
    }

    fn on_generation_complete(&mut self, record: &GenerationRecord, hall_of_fame_size: usize) {
        self.best.push(record.best_objective);
        println!(
            "Generation {}: best = {:?}, hall of fame = {}",
            record.generation, record.best_objective, hall_of_fame_size
        );
    }
}

/// Small seeded config for fast runs.
fn create_test_evolution_config(population_size: usize, generations: usize) -> EvolutionConfig {
    EvolutionConfig {
        population_size,
        generations,
        selection_method: SelectionMethod::Elitist,
        hall_of_fame_size: 5,
        seed: Some(7),
        ..EvolutionConfig::default()
    }
}

fn run(factory: &SyntheticFactory, config: EvolutionConfig) -> EvolutionOutcome {
    let mut engine = EvolutionEngine::new(config, unit_space(5), evaluator(factory, rheobase_suite(-65.0))).unwrap();
    engine.run(TestProgressCallback::default()).unwrap()
}

#[test]
fn test_evolution_basic() {
    common::init_logging();
    let factory = SyntheticFactory::new(100.0);
    let mut engine = EvolutionEngine::new(
        create_test_evolution_config(10, 5),
        unit_space(5),
        evaluator(&factory, rheobase_suite(-65.0)),
    )
    .unwrap();
    let mut callback = TestProgressCallback::default();

    // Borrow the callback through a thin wrapper so it can be inspected afterwards.
    struct Forward<'a>(&'a mut TestProgressCallback);
    impl ProgressCallback for Forward<'_> {
        fn on_generation_start(&mut self, generation: usize) {
            self.0.on_generation_start(generation)
        }
        fn on_population_evaluated(&mut self, generation: usize, evaluated: usize, invalid: usize) {
            self.0.on_population_evaluated(generation, evaluated, invalid)
        }
        fn on_generation_complete(&mut self, record: &GenerationRecord, hall_of_fame_size: usize) {
            self.0.on_generation_complete(record, hall_of_fame_size)
        }
    }

    let outcome = engine.run(Forward(&mut callback)).unwrap();

    assert_eq!(outcome.history.len(), 5);
    assert_eq!(outcome.stop_reason, StopReason::GenerationLimit);
    assert_eq!(outcome.genealogy.len(), 10 * 5);
    assert_eq!(outcome.final_population.len(), 10);
    assert_eq!(callback.started, vec![0, 1, 2, 3, 4]);
    assert!(callback.evaluated.iter().all(|&(_, evaluated, invalid)| evaluated == 10 && invalid == 0));

    // mu + lambda survival never loses the best candidate.
    let best: Vec<f64> = callback.best.iter().map(|b| b.unwrap()).collect();
    assert!(best.windows(2).all(|w| w[1] <= w[0]), "{:?}", best);
    assert!(best[4] <= best[0]);

    let overall = outcome.genealogy.nodes().iter().map(|n| n.fitness.summed()).fold(f64::INFINITY, f64::min);
    assert_eq!(outcome.best.fitness.summed(), overall);
    assert_eq!(outcome.hall_of_fame[0].fitness.objective, overall);
    assert!(outcome
        .hall_of_fame
        .windows(2)
        .all(|w| w[0].fitness.objective <= w[1].fitness.objective));
}

#[test]
fn test_genealogy_is_acyclic() {
    let factory = SyntheticFactory::new(100.0);
    let outcome = run(&factory, create_test_evolution_config(8, 4));
    let genealogy = &outcome.genealogy;
    genealogy.validate().unwrap();

    for (parent, child) in genealogy.edges() {
        assert!(parent < child);
        assert!(genealogy[parent].generation < genealogy[child].generation);
    }
    for node in genealogy.nodes() {
        match node.origin {
            Origin::Initial => assert_eq!(node.generation, 0),
            Origin::Mutation => assert_eq!(node.parents.len(), 1),
            Origin::Crossover => {
                assert_eq!(node.parents.len(), 2);
                assert_ne!(node.parents[0], node.parents[1]);
            }
        }
    }
    assert_eq!(genealogy.generation(0).count(), 8);
    assert!(outcome.population().all(|node| unit_space(5).contains(&node.candidate)));
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let config = EvolutionConfig {
        selection_method: SelectionMethod::Nsga2,
        ..create_test_evolution_config(8, 4)
    };
    let a = run(&SyntheticFactory::new(100.0), config.clone());
    let b = run(&SyntheticFactory::new(100.0), config);

    assert_eq!(a.genealogy.summaries(), b.genealogy.summaries());
    assert_eq!(a.final_population, b.final_population);
    assert_eq!(a.history, b.history);
}

#[test]
fn test_selection_is_deterministic() {
    let fitness: Vec<FitnessVector> = [[1.0, 5.0], [2.0, 2.0], [5.0, 1.0], [3.0, 3.0], [6.0, 6.0], [1.5, 4.0]]
        .iter()
        .map(|e| FitnessVector::scored(e.to_vec(), &[1.0, 1.0]))
        .collect();

    let first = select(&Nsga2Selection, &fitness, 12, 2, &mut StdRng::seed_from_u64(3));
    let second = select(&Nsga2Selection, &fitness, 12, 2, &mut StdRng::seed_from_u64(3));
    assert_eq!(first, second);
    assert_eq!(first.pool.len(), 12);
    assert_eq!(first.ranking.last(), Some(&4));
}

#[test]
fn test_all_invalid_population() {
    let factory = SyntheticFactory::never_spiking();
    let outcome = run(&factory, create_test_evolution_config(6, 3));

    assert_eq!(outcome.best.id, 0);
    assert_eq!(outcome.worst.id, 0);
    assert!(outcome.hall_of_fame.is_empty());
    assert!(outcome.history.iter().all(|r| r.best_objective.is_none() && r.invalid == 6));
    assert!(outcome
        .genealogy
        .nodes()
        .iter()
        .all(|n| n.fitness.failure == Some(FailureKind::RheobaseNotFound)));
}

#[test]
fn test_failing_candidates_are_contained() {
    let factory = SyntheticFactory::new(100.0).failing_above(0.5);
    let outcome = run(&factory, create_test_evolution_config(10, 3));

    for node in outcome.genealogy.nodes() {
        let x = node.candidate.get("x").unwrap();
        if x > 0.5 {
            assert!(matches!(node.fitness.failure, Some(FailureKind::Simulation(_))));
        } else {
            assert!(node.fitness.is_valid());
        }
    }
    assert!(outcome.best.fitness.is_valid());
}

#[test]
fn test_stops_at_target() {
    let factory = SyntheticFactory::new(100.0);
    let config = EvolutionConfig {
        target_objective: Some(1e9),
        ..create_test_evolution_config(6, 10)
    };
    let outcome = run(&factory, config);

    assert_eq!(outcome.stop_reason, StopReason::TargetReached);
    assert_eq!(outcome.history.len(), 1);
    assert_eq!(outcome.genealogy.len(), 6);
}

#[test]
fn test_channel_progress() {
    let factory = SyntheticFactory::new(100.0);
    let (tx, rx) = mpsc::channel();
    let mut engine = EvolutionEngine::new(
        create_test_evolution_config(4, 2),
        unit_space(5),
        evaluator(&factory, rheobase_suite(-65.0)),
    )
    .unwrap();
    engine.run(ChannelProgressCallback::new(tx)).unwrap();

    let messages: Vec<ProgressMessage> = rx.try_iter().collect();
    assert_eq!(messages.len(), 6);
    assert_eq!(messages[0], ProgressMessage::GenerationStart(0));
    assert_eq!(
        messages[1],
        ProgressMessage::PopulationEvaluated {
            generation: 0,
            evaluated: 4,
            invalid: 0
        }
    );
    assert!(matches!(
        &messages[2],
        ProgressMessage::GenerationComplete { record, .. } if record.generation == 0
    ));
    assert_eq!(messages[3], ProgressMessage::GenerationStart(1));
    assert!(matches!(
        &messages[5],
        ProgressMessage::GenerationComplete { record, .. } if record.generation == 1 && record.evaluated == 4
    ));
}

#[test]
fn test_recorded_fitness_matches_direct_scoring() {
    let factory = SyntheticFactory::new(100.0);
    let outcome = run(&factory, create_test_evolution_config(6, 3));

    let fresh = evaluator(&SyntheticFactory::new(100.0), rheobase_suite(-65.0));
    for node in outcome.genealogy.nodes().iter().step_by(3) {
        let direct = fresh.evaluate_uncached(&node.candidate).unwrap();
        assert_eq!(direct.fitness, node.fitness);
        assert_eq!(direct.rheobase, node.rheobase);
    }
}

#[test]
fn test_rejected_parameter_aborts_run() {
    use neurofit::config::AppConfig;
    use neurofit::engines::evaluation::FitnessEvaluator;
    use neurofit::models::Izhikevich;
    use neurofit::{Dimension, NeurofitError, ParameterSpace};
    use std::sync::Arc;

    let evaluator = FitnessEvaluator::from_config(&AppConfig::default(), Arc::new(Izhikevich::default)).unwrap();
    let space = ParameterSpace::new(vec![Dimension::new("bogus", 0.0, 1.0)], 2).unwrap();
    let mut engine = EvolutionEngine::new(create_test_evolution_config(4, 3), space, Arc::new(evaluator)).unwrap();

    let err = engine.run(TestProgressCallback::default()).unwrap_err();
    assert!(matches!(err, NeurofitError::Configuration(_)), "{:?}", err);
}
