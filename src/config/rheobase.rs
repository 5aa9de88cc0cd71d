use super::traits::{invalid, ConfigSection};
use crate::error::NeurofitError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RheobaseConfig {
    /// First amplitude probed while bracketing.
    pub initial_amplitude_pa: f64,
    /// Multiplier applied to the amplitude until a spike is seen.
    pub growth_factor: f64,
    /// No spike at or below this amplitude means no rheobase.
    pub ceiling_pa: f64,
    /// Binary search stops once the bracket is narrower than this.
    pub tolerance_pa: f64,
    /// Probe budget for the bisection phase.
    pub max_iterations: usize,
    pub duration_ms: f64,
    pub delay_ms: f64,
}

impl Default for RheobaseConfig {
    fn default() -> Self {
        Self {
            initial_amplitude_pa: 10.0,
            growth_factor: 2.0,
            ceiling_pa: 2_000.0,
            tolerance_pa: 0.5,
            max_iterations: 40,
            duration_ms: 1_000.0,
            delay_ms: 100.0,
        }
    }
}

impl ConfigSection for RheobaseConfig {
    fn section_name() -> &'static str {
        "rheobase"
    }

    fn validate(&self) -> Result<(), NeurofitError> {
        let section = Self::section_name();
        if !(self.initial_amplitude_pa > 0.0 && self.initial_amplitude_pa.is_finite()) {
            return Err(invalid(section, "Initial amplitude must be positive"));
        }
        if !(self.growth_factor > 1.0 && self.growth_factor.is_finite()) {
            return Err(invalid(section, "Growth factor must be greater than 1"));
        }
        if !(self.ceiling_pa >= self.initial_amplitude_pa && self.ceiling_pa.is_finite()) {
            return Err(invalid(section, "Ceiling must be finite and at least the initial amplitude"));
        }
        if !(self.tolerance_pa > 0.0) {
            return Err(invalid(section, "Tolerance must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(invalid(section, "Iteration budget must be positive"));
        }
        if !(self.duration_ms > 0.0) || self.delay_ms < 0.0 {
            return Err(invalid(section, "Probe pulse needs positive duration and non-negative delay"));
        }
        Ok(())
    }
}
