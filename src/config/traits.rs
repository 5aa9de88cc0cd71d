use crate::error::NeurofitError;
use serde::{Deserialize, Serialize};

/// Trait for configuration sections
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Default + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<(), NeurofitError>;
}

pub(crate) fn invalid(section: &str, message: impl std::fmt::Display) -> NeurofitError {
    NeurofitError::Configuration(format!("[{}] {}", section, message))
}
