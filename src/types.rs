use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Parameter name -> value. Ordered by name so iteration never depends on
/// insertion order.
pub type ParamMap = BTreeMap<String, f64>;

/// One parameter vector under evaluation ("gene").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub params: ParamMap,
    /// Model-specific metadata, opaque to the search engines.
    #[serde(default)]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

impl Candidate {
    pub fn new(params: ParamMap) -> Self {
        Self {
            params,
            attrs: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_params(&self.params)
    }
}

/// Content address of a parameter mapping (or of anything else hashed into
/// the same 32-byte space, such as a test suite).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of_params(params: &ParamMap) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"params");
        for (name, value) in params {
            hasher.update(&(name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update(&canonical_bits(*value).to_le_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Key for "these parameters scored against that suite".
    pub fn combine(&self, other: &Fingerprint) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.0);
        hasher.update(&other.0);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// -0.0 and 0.0 compare equal, so they must hash equal too.
fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

/// Why a candidate ended up with an invalid fitness vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailureKind {
    RheobaseNotFound,
    Simulation(String),
    Unscorable(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::RheobaseNotFound => write!(f, "rheobase not found"),
            FailureKind::Simulation(msg) => write!(f, "simulation failed: {}", msg),
            FailureKind::Unscorable(test) => write!(f, "test {} produced no usable score", test),
        }
    }
}

/// Per-test errors plus the summed objective. Lower is better.
///
/// Errors are always finite so the vector survives a JSON round trip; an
/// invalid vector reports `f64::INFINITY` from [`FitnessVector::summed`] and
/// therefore sorts after every valid one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessVector {
    pub errors: Vec<f64>,
    pub objective: f64,
    #[serde(default)]
    pub failure: Option<FailureKind>,
}

impl FitnessVector {
    pub fn scored(errors: Vec<f64>, weights: &[f64]) -> Self {
        let objective = errors
            .iter()
            .enumerate()
            .map(|(i, e)| weights.get(i).copied().unwrap_or(1.0) * e)
            .sum();
        Self {
            errors,
            objective,
            failure: None,
        }
    }

    pub fn invalid(len: usize, penalty: f64, failure: FailureKind) -> Self {
        Self {
            errors: vec![penalty; len],
            objective: penalty * len as f64,
            failure: Some(failure),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.failure.is_none()
    }

    pub fn summed(&self) -> f64 {
        if self.is_valid() {
            self.objective
        } else {
            f64::INFINITY
        }
    }

    pub fn cmp_objective(&self, other: &FitnessVector) -> Ordering {
        self.summed().total_cmp(&other.summed())
    }

    /// Objectives as seen by multi-objective selection; invalid vectors are
    /// pushed to infinity on every axis.
    pub fn selection_errors(&self) -> Vec<f64> {
        if self.is_valid() {
            self.errors.clone()
        } else {
            vec![f64::INFINITY; self.errors.len()]
        }
    }
}

/// Minimal current amplitude found to elicit a spike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rheobase {
    pub amplitude_pa: f64,
    /// Simulation runs spent finding it.
    pub probes: usize,
}

/// Square current pulse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub amplitude_pa: f64,
    pub duration_ms: f64,
    pub delay_ms: f64,
}

impl Stimulus {
    pub fn square(amplitude_pa: f64, duration_ms: f64, delay_ms: f64) -> Self {
        Self {
            amplitude_pa,
            duration_ms,
            delay_ms,
        }
    }

    pub fn end_ms(&self) -> f64 {
        self.delay_ms + self.duration_ms
    }
}

/// Voltage trace returned by a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub time_ms: Vec<f64>,
    pub voltage_mv: Vec<f64>,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.voltage_mv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage_mv.is_empty()
    }
}

/// Experimentally observed feature a test compares against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub mean: f64,
    pub std: f64,
    pub units: String,
}

/// Outcome of judging a model against one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Per-test error; lower is better.
    pub sort_key: f64,
    pub prediction: Option<f64>,
}

/// What the evaluator produces for one candidate, and what the cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub fitness: FitnessVector,
    pub rheobase: Option<Rheobase>,
}
