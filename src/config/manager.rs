use super::{
    cache::CacheConfig,
    evaluation::EvaluationConfig,
    evolution::EvolutionConfig,
    grid::GridConfig,
    rheobase::RheobaseConfig,
    space::SpaceConfig,
    stimulus::StimulusConfig,
    suite::SuiteConfig,
    traits::ConfigSection,
};
use crate::error::NeurofitError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Prefix of environment overrides, e.g. `NEUROFIT__EVOLUTION__SEED=7`.
pub const ENV_PREFIX: &str = "NEUROFIT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub grid: GridConfig,
    pub rheobase: RheobaseConfig,
    pub cache: CacheConfig,
    pub evaluation: EvaluationConfig,
    pub stimulus: StimulusConfig,
    pub space: SpaceConfig,
    pub suite: SuiteConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), NeurofitError> {
        self.evolution.validate()?;
        self.grid.validate()?;
        self.rheobase.validate()?;
        self.cache.validate()?;
        self.evaluation.validate()?;
        self.stimulus.validate()?;
        self.space.validate()?;
        self.suite.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Layers the file (TOML or JSON, by extension) and then `NEUROFIT__*`
    /// environment variables over the defaults.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), NeurofitError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(NeurofitError::Configuration(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(Self::environment())
            .build()?;
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        log::info!("Loaded configuration from {}", path.display());
        *self.write() = config;
        Ok(())
    }

    /// Defaults plus environment overrides only.
    pub fn load_from_env(&self) -> Result<(), NeurofitError> {
        let settings = config::Config::builder()
            .add_source(Self::environment())
            .build()?;
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        *self.write() = config;
        Ok(())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), NeurofitError> {
        let toml_str = toml::to_string_pretty(&*self.read())?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.read().clone()
    }

    /// Applies `f` and keeps the result only if it validates.
    pub fn update<F>(&self, f: F) -> Result<(), NeurofitError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut candidate = self.get();
        f(&mut candidate);
        candidate.validate()?;
        *self.write() = candidate;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, AppConfig> {
        self.config.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppConfig> {
        self.config.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
