use super::traits::{invalid, ConfigSection};
use crate::error::NeurofitError;
use crate::models::izhikevich;
use crate::space::ParameterSpace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    /// Grid points per dimension.
    pub resolution: usize,
    /// Parameters to optimise; empty means every entry of `ranges`.
    pub keys: Vec<String>,
    /// Full `[min, max]` table of the model's tunable parameters.
    pub ranges: BTreeMap<String, [f64; 2]>,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            resolution: 6,
            keys: vec!["a".to_string(), "vr".to_string(), "b".to_string()],
            ranges: izhikevich::default_ranges()
                .into_iter()
                .map(|(k, (lo, hi))| (k, [lo, hi]))
                .collect(),
        }
    }
}

impl SpaceConfig {
    pub fn build(&self) -> Result<ParameterSpace, NeurofitError> {
        let ranges: BTreeMap<String, (f64, f64)> = self
            .ranges
            .iter()
            .map(|(k, [lo, hi])| (k.clone(), (*lo, *hi)))
            .collect();
        ParameterSpace::from_ranges(&ranges, &self.keys, self.resolution)
    }
}

impl ConfigSection for SpaceConfig {
    fn section_name() -> &'static str {
        "space"
    }

    fn validate(&self) -> Result<(), NeurofitError> {
        self.build()
            .map(|_| ())
            .map_err(|e| invalid(Self::section_name(), e))
    }
}
