//! Parameter calibration for single-neuron models.
//!
//! An evolutionary search and an exhaustive grid search share one fitness
//! evaluator, which finds each candidate's rheobase, scores it against a
//! suite of electrophysiological feature tests and memoises the result by
//! parameter fingerprint.

pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod models;
pub mod space;
pub mod types;

pub use error::{NeurofitError, Result};
pub use space::{Dimension, ParameterSpace};
pub use types::{Candidate, Evaluation, FailureKind, Fingerprint, FitnessVector, ParamMap};
