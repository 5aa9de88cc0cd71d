use super::rheobase::RheobaseSearch;
use super::suite::{StimulusRole, TestSuite};
use super::traits::{JudgeContext, Model, ModelFactory};
use crate::config::{AppConfig, EvaluationConfig, RheobaseConfig};
use crate::data::EvaluationCache;
use crate::error::{NeurofitError, Result};
use crate::types::{Candidate, Evaluation, FailureKind, Fingerprint, FitnessVector, Rheobase, Score, Stimulus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-test outcome of one scoring pass, for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub test: String,
    pub role: StimulusRole,
    pub stimulus: Option<Stimulus>,
    pub score: Option<Score>,
    /// Error that stands in for the score, after penalties.
    pub error_value: f64,
    pub failure: Option<String>,
}

/// Scores candidates against a test suite.
///
/// Shared by the evolutionary and grid engines so both strategies score
/// identically. Thread-safe: every evaluation builds its own model.
pub struct FitnessEvaluator {
    factory: Arc<dyn ModelFactory>,
    suite: Arc<TestSuite>,
    rheobase: RheobaseSearch,
    cache: Arc<EvaluationCache>,
    config: EvaluationConfig,
    /// Suite plus every evaluator setting that changes a stored result.
    scoring: Fingerprint,
}

impl FitnessEvaluator {
    pub fn new(
        factory: Arc<dyn ModelFactory>,
        suite: Arc<TestSuite>,
        rheobase: RheobaseSearch,
        cache: Arc<EvaluationCache>,
        config: EvaluationConfig,
    ) -> Self {
        let scoring = scoring_fingerprint(&suite, rheobase.config(), &config);
        Self {
            factory,
            suite,
            rheobase,
            cache,
            config,
            scoring,
        }
    }

    pub fn from_config(config: &AppConfig, factory: Arc<dyn ModelFactory>) -> Result<Self> {
        config.validate()?;
        let suite = TestSuite::from_config(&config.suite, &config.stimulus)?;
        let cache = EvaluationCache::from_config(&config.cache)?;
        Ok(Self::new(
            factory,
            Arc::new(suite),
            RheobaseSearch::new(config.rheobase.clone()),
            Arc::new(cache),
            config.evaluation.clone(),
        ))
    }

    pub fn suite(&self) -> &TestSuite {
        &self.suite
    }

    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Cached evaluation. Errors only under `stop_on_error` or when the
    /// cache itself fails.
    pub fn evaluate(&self, candidate: &Candidate) -> Result<Evaluation> {
        self.cache
            .get_or_compute(&candidate.params, &self.scoring, || self.evaluate_uncached(candidate))
    }

    /// What the engines call: simulation failures that escaped
    /// [`evaluate`](Self::evaluate) become an invalid vector for this
    /// candidate, anything else (a parameter the model rejects, a broken
    /// cache) stops the run.
    pub fn evaluate_contained(&self, candidate: &Candidate) -> Result<Evaluation> {
        match self.evaluate(candidate) {
            Err(NeurofitError::Simulation(message)) => {
                log::warn!("Evaluation of {} aborted: {}", candidate.fingerprint(), message);
                Ok(self.invalid(FailureKind::Simulation(message)))
            }
            other => other,
        }
    }

    pub fn evaluate_uncached(&self, candidate: &Candidate) -> Result<Evaluation> {
        self.run_suite(candidate).map(|(evaluation, _)| evaluation)
    }

    /// Re-scores `candidate` without the cache and returns each test's
    /// stimulus and score.
    pub fn explain(&self, candidate: &Candidate) -> Result<(Evaluation, Vec<TestReport>)> {
        self.run_suite(candidate)
    }

    fn run_suite(&self, candidate: &Candidate) -> Result<(Evaluation, Vec<TestReport>)> {
        let mut model = match self.prepare(candidate) {
            Ok(model) => model,
            Err(e) => return self.abandon(candidate, e).map(|ev| (ev, Vec::new())),
        };

        let rheobase = if self.suite.requires_rheobase() {
            match self.rheobase.require(model.as_mut()) {
                Ok(rheobase) => Some(rheobase),
                Err(NeurofitError::RheobaseNotFound { ceiling_pa, probes }) => {
                    log::debug!(
                        "{}: no rheobase below {} pA ({} probes)",
                        candidate.fingerprint(),
                        ceiling_pa,
                        probes
                    );
                    return Ok((self.invalid(FailureKind::RheobaseNotFound), Vec::new()));
                }
                Err(e) => return self.abandon(candidate, e).map(|ev| (ev, Vec::new())),
            }
        } else {
            None
        };

        let mut errors = Vec::with_capacity(self.suite.len());
        let mut reports = Vec::with_capacity(self.suite.len());
        let mut failure = None;

        for entry in self.suite.entries() {
            let name = entry.test.name().to_string();
            let mut report = TestReport {
                test: name.clone(),
                role: entry.role,
                stimulus: None,
                score: None,
                error_value: self.config.penalty,
                failure: None,
            };

            let Some(stimulus) = self.suite.stimulus_for(entry.role, rheobase) else {
                failure.get_or_insert(FailureKind::RheobaseNotFound);
                report.failure = Some(FailureKind::RheobaseNotFound.to_string());
                errors.push(self.config.penalty);
                reports.push(report);
                continue;
            };
            report.stimulus = Some(stimulus);

            let context = JudgeContext { stimulus, rheobase };
            match entry.test.judge(model.as_mut(), &context) {
                Ok(score) if score.sort_key.is_finite() => {
                    report.error_value = score.sort_key;
                    report.score = Some(score);
                }
                Ok(score) => {
                    log::warn!("{}: {} produced no usable score", candidate.fingerprint(), name);
                    failure.get_or_insert(FailureKind::Unscorable(name));
                    report.failure = Some("no usable score".to_string());
                    report.score = Some(score);
                }
                Err(e) if self.config.stop_on_error || !is_candidate_failure(&e) => return Err(e),
                Err(e) => {
                    log::warn!(
                        "{}: {} failed, penalised with {}: {}",
                        candidate.fingerprint(),
                        name,
                        self.config.penalty,
                        e
                    );
                    report.failure = Some(e.to_string());
                }
            }
            errors.push(report.error_value);
            reports.push(report);
        }

        let mut fitness = FitnessVector::scored(errors, &self.suite.weights());
        fitness.failure = failure;
        Ok((Evaluation { fitness, rheobase }, reports))
    }

    fn prepare(&self, candidate: &Candidate) -> Result<Box<dyn Model>> {
        let mut model = self.factory.build()?;
        model.configure(&candidate.params)?;
        Ok(model)
    }

    /// Only simulation failures are the candidate's fault; configuration
    /// and persistence errors propagate.
    fn abandon(&self, candidate: &Candidate, error: NeurofitError) -> Result<Evaluation> {
        match error {
            NeurofitError::Simulation(message) if !self.config.stop_on_error => {
                log::warn!("{}: evaluation abandoned: {}", candidate.fingerprint(), message);
                Ok(self.invalid(FailureKind::Simulation(message)))
            }
            other => Err(other),
        }
    }

    fn invalid(&self, failure: FailureKind) -> Evaluation {
        Evaluation {
            fitness: FitnessVector::invalid(self.suite.len(), self.config.penalty, failure),
            rheobase: None::<Rheobase>,
        }
    }
}

fn is_candidate_failure(error: &NeurofitError) -> bool {
    matches!(error, NeurofitError::Simulation(_) | NeurofitError::RheobaseNotFound { .. })
}

/// Cache namespace for one evaluator: results computed under another
/// rheobase protocol, penalty or error mode must never be served as hits.
fn scoring_fingerprint(suite: &TestSuite, rheobase: &RheobaseConfig, config: &EvaluationConfig) -> Fingerprint {
    let mut bytes = Vec::with_capacity(8 * 8 + 1);
    for value in [
        rheobase.initial_amplitude_pa,
        rheobase.growth_factor,
        rheobase.ceiling_pa,
        rheobase.tolerance_pa,
        rheobase.duration_ms,
        rheobase.delay_ms,
        config.penalty,
    ] {
        bytes.extend_from_slice(&value.to_bits().to_le_bytes());
    }
    bytes.extend_from_slice(&(rheobase.max_iterations as u64).to_le_bytes());
    bytes.push(u8::from(config.stop_on_error));
    suite.fingerprint().combine(&Fingerprint::of_bytes(&bytes))
}
