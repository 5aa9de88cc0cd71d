pub mod evaluator;
pub mod neurotests;
pub mod rheobase;
pub mod suite;
pub mod traits;
pub mod waveform;

pub use evaluator::{FitnessEvaluator, TestReport};
pub use neurotests::TestKind;
pub use rheobase::RheobaseSearch;
pub use suite::{replace_zero_std, StimulusRole, SuiteEntry, TestSuite};
pub use traits::{JudgeContext, Model, ModelFactory, NeuroTest};
