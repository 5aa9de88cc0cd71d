use super::traits::{invalid, ConfigSection};
use crate::error::NeurofitError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Propagate simulation failures instead of penalising the test.
    pub stop_on_error: bool,
    /// Error substituted for a failed test judgment.
    pub penalty: f64,
    /// Worker threads; 0 lets rayon decide.
    pub workers: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            stop_on_error: false,
            penalty: 100.0,
            workers: 0,
        }
    }
}

impl ConfigSection for EvaluationConfig {
    fn section_name() -> &'static str {
        "evaluation"
    }

    fn validate(&self) -> Result<(), NeurofitError> {
        if !(self.penalty.is_finite() && self.penalty >= 0.0) {
            return Err(invalid(Self::section_name(), "Penalty must be finite and non-negative"));
        }
        Ok(())
    }
}
