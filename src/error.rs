use thiserror::Error;

#[derive(Error, Debug)]
pub enum NeurofitError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Rheobase not found below {ceiling_pa} pA after {probes} probes")]
    RheobaseNotFound { ceiling_pa: f64, probes: usize },

    #[error("Simulation failure: {0}")]
    Simulation(String),

    #[error("Cache corruption: entry {key} holds parameters {stored} but {requested} was requested")]
    CacheCorruption {
        key: String,
        stored: String,
        requested: String,
    },

    #[error("Search exhausted: grid of {cells} cells exceeds ceiling of {ceiling}")]
    SearchExhausted { cells: u128, ceiling: u128 },

    #[error("Lineage error: {0}")]
    Lineage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl NeurofitError {
    /// Stage label used when a failed run is reported to the caller.
    pub fn class(&self) -> &'static str {
        match self {
            NeurofitError::Configuration(_) | NeurofitError::Config(_) => "ConfigurationError",
            NeurofitError::RheobaseNotFound { .. } => "RheobaseNotFound",
            NeurofitError::Simulation(_) => "SimulationFailure",
            NeurofitError::CacheCorruption { .. } => "CacheCorruption",
            NeurofitError::SearchExhausted { .. } => "SearchExhaustedError",
            NeurofitError::Lineage(_) => "LineageError",
            NeurofitError::Io(_) | NeurofitError::Serde(_) | NeurofitError::Toml(_) => "PersistenceError",
        }
    }
}

pub type Result<T> = std::result::Result<T, NeurofitError>;
