#![allow(dead_code)]

use neurofit::config::{EvaluationConfig, RheobaseConfig, StimulusConfig};
use neurofit::data::EvaluationCache;
use neurofit::engines::evaluation::{
    FitnessEvaluator, JudgeContext, Model, NeuroTest, RheobaseSearch, StimulusRole, SuiteEntry, TestSuite,
};
use neurofit::types::{Observation, Score, Stimulus, Trace};
use neurofit::{Dimension, NeurofitError, ParamMap, ParameterSpace, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Passive cell whose resting potential is set by `x` and `y` and which
/// fires a single spike whenever the injected current reaches
/// `threshold_pa`.
#[derive(Clone)]
pub struct SyntheticModel {
    pub threshold_pa: f64,
    /// `run` fails for candidates with `x` above this.
    pub fail_above_x: Option<f64>,
    params: ParamMap,
    runs: Arc<AtomicUsize>,
}

impl SyntheticModel {
    pub fn resting(&self) -> f64 {
        let x = self.params.get("x").copied().unwrap_or(0.0);
        let y = self.params.get("y").copied().unwrap_or(0.0);
        -70.0 + 10.0 * x + 5.0 * y
    }
}

impl Model for SyntheticModel {
    fn configure(&mut self, params: &ParamMap) -> Result<()> {
        self.params = params.clone();
        Ok(())
    }

    fn run(&mut self, stimulus: &Stimulus) -> Result<Trace> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let (Some(limit), Some(x)) = (self.fail_above_x, self.params.get("x")) {
            if *x > limit {
                return Err(NeurofitError::Simulation(format!("x = {} is unstable", x)));
            }
        }

        let rest = self.resting();
        let peak = if stimulus.amplitude_pa >= self.threshold_pa {
            30.0
        } else {
            rest + 0.01 * stimulus.amplitude_pa
        };
        Ok(Trace {
            time_ms: vec![0.0, stimulus.delay_ms + stimulus.duration_ms / 2.0, stimulus.end_ms() + 1.0],
            voltage_mv: vec![rest, peak, rest],
        })
    }
}

/// Builds [`SyntheticModel`]s and counts builds and simulation runs.
#[derive(Clone)]
pub struct SyntheticFactory {
    pub threshold_pa: f64,
    pub fail_above_x: Option<f64>,
    pub builds: Arc<AtomicUsize>,
    pub runs: Arc<AtomicUsize>,
}

impl SyntheticFactory {
    pub fn new(threshold_pa: f64) -> Self {
        Self {
            threshold_pa,
            fail_above_x: None,
            builds: Arc::new(AtomicUsize::new(0)),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn never_spiking() -> Self {
        Self::new(f64::INFINITY)
    }

    pub fn failing_above(mut self, x: f64) -> Self {
        self.fail_above_x = Some(x);
        self
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl neurofit::engines::evaluation::ModelFactory for SyntheticFactory {
    fn build(&self) -> Result<Box<dyn Model>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticModel {
            threshold_pa: self.threshold_pa,
            fail_above_x: self.fail_above_x,
            params: ParamMap::new(),
            runs: Arc::clone(&self.runs),
        }))
    }
}

/// Scores the first sample of the trace against a target voltage.
pub struct BaselineTest {
    name: String,
    observation: Observation,
}

impl BaselineTest {
    pub fn new(name: &str, target_mv: f64) -> Self {
        Self {
            name: name.to_string(),
            observation: Observation {
                mean: target_mv,
                std: 1.0,
                units: "mV".to_string(),
            },
        }
    }
}

impl NeuroTest for BaselineTest {
    fn name(&self) -> &str {
        &self.name
    }

    fn observation(&self) -> &Observation {
        &self.observation
    }

    fn judge(&self, model: &mut dyn Model, context: &JudgeContext) -> Result<Score> {
        let trace = model.run(&context.stimulus)?;
        let prediction = trace.voltage_mv[0];
        Ok(Score {
            sort_key: (prediction - self.observation.mean).abs() / self.observation.std,
            prediction: Some(prediction),
        })
    }
}

/// Scores the candidate's rheobase against a target current.
pub struct RheobaseMatchTest {
    observation: Observation,
}

impl RheobaseMatchTest {
    pub fn new(target_pa: f64) -> Self {
        Self {
            observation: Observation {
                mean: target_pa,
                std: 10.0,
                units: "pA".to_string(),
            },
        }
    }
}

impl NeuroTest for RheobaseMatchTest {
    fn name(&self) -> &str {
        "RheobaseMatch"
    }

    fn observation(&self) -> &Observation {
        &self.observation
    }

    fn judge(&self, _model: &mut dyn Model, context: &JudgeContext) -> Result<Score> {
        let rheobase = context
            .rheobase
            .ok_or_else(|| NeurofitError::Simulation("no rheobase".to_string()))?;
        Ok(Score {
            sort_key: (rheobase.amplitude_pa - self.observation.mean).abs() / self.observation.std,
            prediction: Some(rheobase.amplitude_pa),
        })
    }
}

/// Always fails to produce a score.
pub struct BrokenTest;

impl NeuroTest for BrokenTest {
    fn name(&self) -> &str {
        "Broken"
    }

    fn observation(&self) -> &Observation {
        static OBSERVATION: std::sync::OnceLock<Observation> = std::sync::OnceLock::new();
        OBSERVATION.get_or_init(|| Observation {
            mean: 0.0,
            std: 1.0,
            units: String::new(),
        })
    }

    fn judge(&self, _model: &mut dyn Model, _context: &JudgeContext) -> Result<Score> {
        Err(NeurofitError::Simulation("feature extraction failed".to_string()))
    }
}

/// Rheobase test first, then two resting-potential tests.
pub fn rheobase_suite(target_mv: f64) -> TestSuite {
    let entries = vec![
        SuiteEntry::new(Arc::new(RheobaseMatchTest::new(100.0)), StimulusRole::Rheobase),
        SuiteEntry::new(Arc::new(BaselineTest::new("RestA", target_mv)), StimulusRole::Rest),
        SuiteEntry::new(Arc::new(BaselineTest::new("RestB", target_mv + 2.0)), StimulusRole::Calibration),
    ];
    TestSuite::new("synthetic", entries, StimulusConfig::default()).unwrap()
}

/// Suite without any rheobase-dependent test.
pub fn passive_suite(target_mv: f64) -> TestSuite {
    let entries = vec![
        SuiteEntry::new(Arc::new(BaselineTest::new("RestA", target_mv)), StimulusRole::Rest),
        SuiteEntry::new(Arc::new(BaselineTest::new("RestB", target_mv + 2.0)), StimulusRole::Calibration),
    ];
    TestSuite::new("passive", entries, StimulusConfig::default()).unwrap()
}

pub fn evaluator_with(
    factory: &SyntheticFactory,
    suite: TestSuite,
    cache: EvaluationCache,
    config: EvaluationConfig,
) -> Arc<FitnessEvaluator> {
    Arc::new(FitnessEvaluator::new(
        Arc::new(factory.clone()),
        Arc::new(suite),
        RheobaseSearch::new(RheobaseConfig::default()),
        Arc::new(cache),
        config,
    ))
}

pub fn evaluator(factory: &SyntheticFactory, suite: TestSuite) -> Arc<FitnessEvaluator> {
    evaluator_with(factory, suite, EvaluationCache::in_memory(), EvaluationConfig::default())
}

pub fn unit_space(resolution: usize) -> ParameterSpace {
    ParameterSpace::new(
        vec![Dimension::new("x", 0.0, 1.0), Dimension::new("y", 0.0, 1.0)],
        resolution,
    )
    .unwrap()
}
