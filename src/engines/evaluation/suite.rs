use super::neurotests;
use super::traits::NeuroTest;
use crate::config::{StimulusConfig, SuiteConfig};
use crate::error::{NeurofitError, Result};
use crate::types::{Fingerprint, Observation, Rheobase, Stimulus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which pulse protocol a test is judged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusRole {
    /// The rheobase test itself: threshold pulse plus the found rheobase as
    /// the prediction.
    Rheobase,
    /// Fixed hyperpolarising pulse.
    Calibration,
    /// Pulse at the candidate's rheobase.
    Threshold,
    /// No injected current.
    Rest,
}

impl StimulusRole {
    pub fn needs_rheobase(&self) -> bool {
        matches!(self, StimulusRole::Rheobase | StimulusRole::Threshold)
    }
}

impl fmt::Display for StimulusRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StimulusRole::Rheobase => "rheobase",
            StimulusRole::Calibration => "calibration",
            StimulusRole::Threshold => "threshold",
            StimulusRole::Rest => "rest",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub struct SuiteEntry {
    pub test: Arc<dyn NeuroTest>,
    pub role: StimulusRole,
    pub weight: f64,
}

impl SuiteEntry {
    pub fn new(test: Arc<dyn NeuroTest>, role: StimulusRole) -> Self {
        Self {
            test,
            role,
            weight: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

impl fmt::Debug for SuiteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteEntry")
            .field("test", &self.test.name())
            .field("role", &self.role)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Identity-bearing part of an entry, hashed into the suite fingerprint.
#[derive(Serialize)]
struct EntryIdentity<'a> {
    name: &'a str,
    observation: &'a Observation,
    role: StimulusRole,
    weight: f64,
}

/// Ordered test battery plus the pulse protocols its roles resolve to.
#[derive(Debug, Clone)]
pub struct TestSuite {
    name: String,
    entries: Vec<SuiteEntry>,
    protocols: StimulusConfig,
    fingerprint: Fingerprint,
}

impl TestSuite {
    pub fn new(name: impl Into<String>, entries: Vec<SuiteEntry>, protocols: StimulusConfig) -> Result<Self> {
        let name = name.into();
        if entries.is_empty() {
            return Err(NeurofitError::Configuration(format!(
                "Test suite '{}' is empty",
                name
            )));
        }

        let identity: Vec<EntryIdentity> = entries
            .iter()
            .map(|e| EntryIdentity {
                name: e.test.name(),
                observation: e.test.observation(),
                role: e.role,
                weight: e.weight,
            })
            .collect();
        let bytes = serde_json::to_vec(&(&name, &identity, &protocols))?;
        let fingerprint = Fingerprint::of_bytes(&bytes);

        Ok(Self {
            name,
            entries,
            protocols,
            fingerprint,
        })
    }

    /// Builds the built-in tests a [`SuiteConfig`] declares. Zero standard
    /// deviations are replaced by the configured fallback.
    pub fn from_config(suite: &SuiteConfig, protocols: &StimulusConfig) -> Result<Self> {
        let entries = suite
            .tests
            .iter()
            .map(|spec| {
                let observation = replace_zero_std(spec.observation(), suite.zero_std_fallback);
                SuiteEntry::new(neurotests::build(spec.kind, observation), spec.role())
                    .with_weight(spec.weight)
            })
            .collect();
        Self::new(suite.name.clone(), entries, protocols.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[SuiteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn protocols(&self) -> &StimulusConfig {
        &self.protocols
    }

    pub fn weights(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.weight).collect()
    }

    pub fn requires_rheobase(&self) -> bool {
        self.entries.iter().any(|e| e.role.needs_rheobase())
    }

    /// Pulse for `role`, or `None` when the role needs a rheobase the
    /// candidate does not have.
    pub fn stimulus_for(&self, role: StimulusRole, rheobase: Option<Rheobase>) -> Option<Stimulus> {
        match role {
            StimulusRole::Calibration => Some(self.protocols.calibration.stimulus()),
            StimulusRole::Rest => Some(self.protocols.rest()),
            StimulusRole::Rheobase | StimulusRole::Threshold => {
                rheobase.map(|r| self.protocols.threshold(r.amplitude_pa))
            }
        }
    }
}

pub fn replace_zero_std(mut observation: Observation, fallback: f64) -> Observation {
    if observation.std == 0.0 {
        log::debug!("Replacing zero std of observation {} {}", observation.mean, observation.units);
        observation.std = fallback;
    }
    observation
}
