//! Bounded, discretised domain the searches range over.
//!
//! Each dimension is a named closed interval. The space hands out random
//! candidates for GA initialisation, clamps variation results back inside the
//! bounds and produces the evenly spaced value ladders the grid enumerates.

use crate::error::{NeurofitError, Result};
use crate::types::{Candidate, ParamMap};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl Dimension {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// `points` evenly spaced values, both bounds included.
    pub fn linspace(&self, points: usize) -> Vec<f64> {
        let step = self.span() / (points - 1) as f64;
        (0..points)
            .map(|i| {
                if i == points - 1 {
                    self.max
                } else {
                    self.min + step * i as f64
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace {
    dimensions: Vec<Dimension>,
    resolution: usize,
}

impl ParameterSpace {
    pub fn new(dimensions: Vec<Dimension>, resolution: usize) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(NeurofitError::Configuration(
                "Parameter space needs at least one dimension".to_string(),
            ));
        }
        if resolution < 2 {
            return Err(NeurofitError::Configuration(format!(
                "Resolution must be at least 2, got {}",
                resolution
            )));
        }

        let mut seen = HashSet::new();
        for dim in &dimensions {
            if !seen.insert(dim.name.as_str()) {
                return Err(NeurofitError::Configuration(format!(
                    "Duplicate parameter '{}'",
                    dim.name
                )));
            }
            if !dim.min.is_finite() || !dim.max.is_finite() {
                return Err(NeurofitError::Configuration(format!(
                    "Bounds of '{}' must be finite",
                    dim.name
                )));
            }
            if dim.min >= dim.max {
                return Err(NeurofitError::Configuration(format!(
                    "Bounds of '{}' must satisfy min < max, got [{}, {}]",
                    dim.name, dim.min, dim.max
                )));
            }
        }

        Ok(Self {
            dimensions,
            resolution,
        })
    }

    /// Builds a space over `keys` picked out of a model's full range table.
    /// An empty `keys` slice selects every entry.
    pub fn from_ranges(
        ranges: &BTreeMap<String, (f64, f64)>,
        keys: &[String],
        resolution: usize,
    ) -> Result<Self> {
        let dimensions = if keys.is_empty() {
            ranges
                .iter()
                .map(|(name, (min, max))| Dimension::new(name.clone(), *min, *max))
                .collect()
        } else {
            keys.iter()
                .map(|key| {
                    ranges
                        .get(key)
                        .map(|(min, max)| Dimension::new(key.clone(), *min, *max))
                        .ok_or_else(|| {
                            NeurofitError::Configuration(format!(
                                "Unknown parameter '{}'",
                                key
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?
        };
        Self::new(dimensions, resolution)
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Candidate {
        let params: ParamMap = self
            .dimensions
            .iter()
            .map(|d| (d.name.clone(), rng.gen_range(d.min..=d.max)))
            .collect();
        Candidate::new(params)
    }

    /// Value ladder per dimension, in dimension order.
    pub fn grid_values(&self) -> Vec<Vec<f64>> {
        self.dimensions
            .iter()
            .map(|d| d.linspace(self.resolution))
            .collect()
    }

    /// Number of cells in the full Cartesian product, saturating.
    pub fn grid_size(&self) -> u128 {
        self.dimensions
            .iter()
            .fold(1u128, |acc, _| acc.saturating_mul(self.resolution as u128))
    }

    pub fn contains(&self, candidate: &Candidate) -> bool {
        self.dimensions.iter().all(|d| {
            candidate
                .get(&d.name)
                .map(|v| v >= d.min && v <= d.max)
                .unwrap_or(false)
        })
    }

    pub fn clamp(&self, candidate: &mut Candidate) {
        for d in &self.dimensions {
            if let Some(v) = candidate.params.get_mut(&d.name) {
                *v = d.clamp(*v);
            }
        }
    }

    /// Candidate values in dimension order. Missing entries read as the
    /// dimension's lower bound.
    pub fn to_genes(&self, candidate: &Candidate) -> Vec<f64> {
        self.dimensions
            .iter()
            .map(|d| candidate.get(&d.name).unwrap_or(d.min))
            .collect()
    }

    pub fn from_genes(&self, genes: &[f64]) -> Candidate {
        let params: ParamMap = self
            .dimensions
            .iter()
            .zip(genes)
            .map(|(d, g)| (d.name.clone(), d.clamp(*g)))
            .collect();
        Candidate::new(params)
    }

    /// Euclidean distance after scaling every dimension to [0, 1].
    pub fn normalized_distance(&self, a: &Candidate, b: &Candidate) -> f64 {
        self.dimensions
            .iter()
            .map(|d| {
                let x = (a.get(&d.name).unwrap_or(d.min) - d.min) / d.span();
                let y = (b.get(&d.name).unwrap_or(d.min) - d.min) / d.span();
                (x - y).powi(2)
            })
            .sum::<f64>()
            .sqrt()
    }
}
