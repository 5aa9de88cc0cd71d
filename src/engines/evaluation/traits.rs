use super::waveform;
use crate::error::Result;
use crate::types::{Observation, ParamMap, Rheobase, Score, Stimulus, Trace};

/// Simulator handle for one neuron model.
///
/// Implementations must not leak state from one `run` into the next; the
/// evaluator reuses a configured model for every test of a suite.
pub trait Model: Send {
    fn configure(&mut self, params: &ParamMap) -> Result<()>;

    fn run(&mut self, stimulus: &Stimulus) -> Result<Trace>;

    fn spike_count(&self, trace: &Trace) -> usize {
        waveform::count_spikes(trace, waveform::SPIKE_THRESHOLD_MV)
    }
}

/// Builds a fresh model for every evaluation so concurrent workers never
/// share simulator state.
pub trait ModelFactory: Send + Sync {
    fn build(&self) -> Result<Box<dyn Model>>;
}

impl<F, M> ModelFactory for F
where
    F: Fn() -> M + Send + Sync,
    M: Model + 'static,
{
    fn build(&self) -> Result<Box<dyn Model>> {
        Ok(Box::new(self()))
    }
}

/// What the evaluator hands a test alongside the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgeContext {
    /// Pulse chosen for the test's stimulus role.
    pub stimulus: Stimulus,
    pub rheobase: Option<Rheobase>,
}

/// One electrophysiological feature test.
pub trait NeuroTest: Send + Sync {
    fn name(&self) -> &str;

    fn observation(&self) -> &Observation;

    /// Scores `model` against the observation. An `Err` is a simulation
    /// failure; a non-finite `sort_key` means the test could not be scored.
    fn judge(&self, model: &mut dyn Model, context: &JudgeContext) -> Result<Score>;
}
