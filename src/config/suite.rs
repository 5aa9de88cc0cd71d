use super::traits::{invalid, ConfigSection};
use crate::engines::evaluation::neurotests::TestKind;
use crate::engines::evaluation::suite::StimulusRole;
use crate::error::NeurofitError;
use crate::types::Observation;
use serde::{Deserialize, Serialize};

/// One test of the suite as declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    pub kind: TestKind,
    pub mean: f64,
    pub std: f64,
    #[serde(default)]
    pub units: String,
    /// Overrides the kind's usual stimulus role.
    #[serde(default)]
    pub role: Option<StimulusRole>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl TestSpec {
    pub fn new(kind: TestKind, mean: f64, std: f64) -> Self {
        Self {
            kind,
            mean,
            std,
            units: kind.units().to_string(),
            role: None,
            weight: 1.0,
        }
    }

    pub fn observation(&self) -> Observation {
        let units = if self.units.is_empty() {
            self.kind.units().to_string()
        } else {
            self.units.clone()
        };
        Observation {
            mean: self.mean,
            std: self.std,
            units,
        }
    }

    pub fn role(&self) -> StimulusRole {
        self.role.unwrap_or_else(|| self.kind.default_role())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub name: String,
    /// Replaces a zero observation std so z-scores stay finite.
    pub zero_std_fallback: f64,
    pub tests: Vec<TestSpec>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            name: "layer5-pyramidal".to_string(),
            zero_std_fallback: 1.0,
            tests: vec![
                TestSpec::new(TestKind::Rheobase, 150.0, 60.0),
                TestSpec::new(TestKind::InputResistance, 120.0, 40.0),
                TestSpec::new(TestKind::RestingPotential, -68.0, 5.0),
                TestSpec::new(TestKind::MembraneTimeConstant, 16.0, 6.0),
            ],
        }
    }
}

impl ConfigSection for SuiteConfig {
    fn section_name() -> &'static str {
        "suite"
    }

    fn validate(&self) -> Result<(), NeurofitError> {
        let section = Self::section_name();
        if self.tests.is_empty() {
            return Err(invalid(section, "Test suite must not be empty"));
        }
        if !(self.zero_std_fallback > 0.0) {
            return Err(invalid(section, "Zero-std fallback must be positive"));
        }
        for spec in &self.tests {
            if !spec.mean.is_finite() || !(spec.std >= 0.0) {
                return Err(invalid(
                    section,
                    format!("Observation of {:?} needs a finite mean and non-negative std", spec.kind),
                ));
            }
            if !(spec.weight >= 0.0 && spec.weight.is_finite()) {
                return Err(invalid(section, format!("Weight of {:?} must be non-negative", spec.kind)));
            }
        }
        Ok(())
    }
}
