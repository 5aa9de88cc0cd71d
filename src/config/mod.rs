pub mod traits;
pub mod evolution;
pub mod grid;
pub mod rheobase;
pub mod cache;
pub mod evaluation;
pub mod stimulus;
pub mod space;
pub mod suite;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use evolution::{EvolutionConfig, SelectionMethod};
pub use grid::GridConfig;
pub use rheobase::RheobaseConfig;
pub use cache::CacheConfig;
pub use evaluation::EvaluationConfig;
pub use stimulus::{StimulusConfig, PulseConfig};
pub use space::SpaceConfig;
pub use suite::{SuiteConfig, TestSpec};
pub use traits::ConfigSection;
