use super::traits::{invalid, ConfigSection};
use crate::error::NeurofitError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Refuse to start a grid with more cells than this.
    pub max_cells: u64,
    /// Log a warning above this many cells.
    pub warn_cells: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_cells: 100_000,
            warn_cells: 5_000,
        }
    }
}

impl ConfigSection for GridConfig {
    fn section_name() -> &'static str {
        "grid"
    }

    fn validate(&self) -> Result<(), NeurofitError> {
        if self.max_cells == 0 {
            return Err(invalid(Self::section_name(), "Cell ceiling must be positive"));
        }
        Ok(())
    }
}
