//! Built-in feature tests scored as absolute z-scores against an
//! observation.

use super::suite::StimulusRole;
use super::traits::{JudgeContext, Model, NeuroTest};
use super::waveform;
use crate::error::{NeurofitError, Result};
use crate::types::{Observation, Score};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Rheobase,
    InputResistance,
    RestingPotential,
    MembraneTimeConstant,
    /// Spikes fired during the threshold pulse.
    SpikeCount,
}

impl TestKind {
    pub fn name(&self) -> &'static str {
        match self {
            TestKind::Rheobase => "RheobaseTest",
            TestKind::InputResistance => "InputResistanceTest",
            TestKind::RestingPotential => "RestingPotentialTest",
            TestKind::MembraneTimeConstant => "TimeConstantTest",
            TestKind::SpikeCount => "SpikeCountTest",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            TestKind::Rheobase => "pA",
            TestKind::InputResistance => "MOhm",
            TestKind::RestingPotential => "mV",
            TestKind::MembraneTimeConstant => "ms",
            TestKind::SpikeCount => "spikes",
        }
    }

    pub fn default_role(&self) -> StimulusRole {
        match self {
            TestKind::Rheobase => StimulusRole::Rheobase,
            TestKind::InputResistance | TestKind::MembraneTimeConstant => StimulusRole::Calibration,
            TestKind::RestingPotential => StimulusRole::Rest,
            TestKind::SpikeCount => StimulusRole::Threshold,
        }
    }
}

pub fn build(kind: TestKind, observation: Observation) -> Arc<dyn NeuroTest> {
    Arc::new(FeatureTest::new(kind, observation))
}

pub struct FeatureTest {
    kind: TestKind,
    observation: Observation,
}

impl FeatureTest {
    pub fn new(kind: TestKind, observation: Observation) -> Self {
        Self { kind, observation }
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }

    fn predict(&self, model: &mut dyn Model, context: &JudgeContext) -> Result<Option<f64>> {
        let stimulus = &context.stimulus;
        let prediction = match self.kind {
            TestKind::Rheobase => {
                let rheobase = context.rheobase.ok_or_else(|| {
                    NeurofitError::Simulation("rheobase test judged without a rheobase".to_string())
                })?;
                Some(rheobase.amplitude_pa)
            }
            TestKind::InputResistance => waveform::input_resistance(&model.run(stimulus)?, stimulus),
            TestKind::RestingPotential => waveform::resting_potential(&model.run(stimulus)?, stimulus),
            TestKind::MembraneTimeConstant => waveform::time_constant(&model.run(stimulus)?, stimulus),
            TestKind::SpikeCount => {
                let trace = model.run(stimulus)?;
                Some(model.spike_count(&trace) as f64)
            }
        };
        Ok(prediction)
    }
}

impl NeuroTest for FeatureTest {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn observation(&self) -> &Observation {
        &self.observation
    }

    fn judge(&self, model: &mut dyn Model, context: &JudgeContext) -> Result<Score> {
        let prediction = self.predict(model, context)?;
        let sort_key = match prediction {
            Some(p) => ((p - self.observation.mean) / self.observation.std).abs(),
            None => f64::NAN,
        };
        Ok(Score {
            sort_key,
            prediction,
        })
    }
}
