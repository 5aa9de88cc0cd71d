use super::traits::{invalid, ConfigSection};
use crate::error::NeurofitError;
use crate::types::Stimulus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    pub amplitude_pa: f64,
    pub duration_ms: f64,
    pub delay_ms: f64,
}

impl PulseConfig {
    pub fn stimulus(&self) -> Stimulus {
        Stimulus::square(self.amplitude_pa, self.duration_ms, self.delay_ms)
    }
}

/// Pulse protocols the evaluator hands to tests by stimulus role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusConfig {
    /// Timing of the suprathreshold pulse; its amplitude is the candidate's
    /// rheobase.
    pub threshold_duration_ms: f64,
    pub threshold_delay_ms: f64,
    /// Length of the unstimulated run used by passive tests.
    pub rest_duration_ms: f64,
    /// Fixed hyperpolarising pulse for passive-property tests.
    pub calibration: PulseConfig,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            threshold_duration_ms: 1_000.0,
            threshold_delay_ms: 100.0,
            rest_duration_ms: 200.0,
            calibration: PulseConfig {
                amplitude_pa: -10.0,
                duration_ms: 100.0,
                delay_ms: 30.0,
            },
        }
    }
}

impl StimulusConfig {
    pub fn threshold(&self, amplitude_pa: f64) -> Stimulus {
        Stimulus::square(amplitude_pa, self.threshold_duration_ms, self.threshold_delay_ms)
    }

    pub fn rest(&self) -> Stimulus {
        Stimulus::square(0.0, self.rest_duration_ms, 0.0)
    }
}

impl ConfigSection for StimulusConfig {
    fn section_name() -> &'static str {
        "stimulus"
    }

    fn validate(&self) -> Result<(), NeurofitError> {
        let section = Self::section_name();
        if !(self.calibration.duration_ms > 0.0) || self.calibration.delay_ms < 0.0 {
            return Err(invalid(section, "Calibration pulse needs positive duration and non-negative delay"));
        }
        if !self.calibration.amplitude_pa.is_finite() {
            return Err(invalid(section, "Calibration amplitude must be finite"));
        }
        if !(self.threshold_duration_ms > 0.0) || self.threshold_delay_ms < 0.0 {
            return Err(invalid(section, "Threshold pulse needs positive duration and non-negative delay"));
        }
        if !(self.rest_duration_ms > 0.0) {
            return Err(invalid(section, "Rest duration must be positive"));
        }
        Ok(())
    }
}
