//! Izhikevich (2007) quadratic integrate-and-fire point neuron.
//!
//! `cm dv/dt = k (v - vr)(v - vt) - u + I`, `du/dt = a (b (v - vr) - u)`,
//! with `v <- c, u <- u + d` whenever `v` reaches `vpeak`. Units are pF, nS,
//! mV, ms and pA.

use crate::engines::evaluation::Model;
use crate::error::{NeurofitError, Result};
use crate::types::{ParamMap, Stimulus, Trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IzhikevichParams {
    pub cm: f64,
    pub k: f64,
    pub vr: f64,
    pub vt: f64,
    pub vpeak: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

/// Regular-spiking layer 5 pyramidal cell.
impl Default for IzhikevichParams {
    fn default() -> Self {
        Self {
            cm: 100.0,
            k: 0.7,
            vr: -60.0,
            vt: -40.0,
            vpeak: 35.0,
            a: 0.03,
            b: -2.0,
            c: -50.0,
            d: 100.0,
        }
    }
}

impl IzhikevichParams {
    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        let slot = match name {
            "cm" => &mut self.cm,
            "k" => &mut self.k,
            "vr" => &mut self.vr,
            "vt" => &mut self.vt,
            "vpeak" => &mut self.vpeak,
            "a" => &mut self.a,
            "b" => &mut self.b,
            "c" => &mut self.c,
            "d" => &mut self.d,
            other => {
                return Err(NeurofitError::Configuration(format!(
                    "Izhikevich model has no parameter '{}'",
                    other
                )))
            }
        };
        *slot = value;
        Ok(())
    }
}

/// Search ranges for every tunable parameter.
pub fn default_ranges() -> BTreeMap<String, (f64, f64)> {
    [
        ("a", (0.01, 0.1)),
        ("b", (-2.0, 15.0)),
        ("c", (-65.0, -45.0)),
        ("cm", (50.0, 150.0)),
        ("d", (50.0, 150.0)),
        ("k", (0.5, 1.5)),
        ("vpeak", (25.0, 45.0)),
        ("vr", (-75.0, -55.0)),
        ("vt", (-50.0, -30.0)),
    ]
    .into_iter()
    .map(|(name, range)| (name.to_string(), range))
    .collect()
}

#[derive(Debug, Clone)]
pub struct Izhikevich {
    params: IzhikevichParams,
    dt_ms: f64,
    /// Recorded after the pulse ends.
    tail_ms: f64,
}

impl Default for Izhikevich {
    fn default() -> Self {
        Self {
            params: IzhikevichParams::default(),
            dt_ms: 0.25,
            tail_ms: 50.0,
        }
    }
}

impl Izhikevich {
    pub fn with_params(params: IzhikevichParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &IzhikevichParams {
        &self.params
    }
}

impl Model for Izhikevich {
    /// Starts from the defaults, so parameters absent from `params` never
    /// carry over from a previous configuration.
    fn configure(&mut self, params: &ParamMap) -> Result<()> {
        let mut next = IzhikevichParams::default();
        for (name, &value) in params {
            next.set(name, value)?;
        }
        self.params = next;
        Ok(())
    }

    fn run(&mut self, stimulus: &Stimulus) -> Result<Trace> {
        let p = self.params;
        let total_ms = stimulus.end_ms() + self.tail_ms;
        let steps = (total_ms / self.dt_ms).ceil() as usize;

        let mut v = p.vr;
        let mut u = 0.0;
        let mut trace = Trace {
            time_ms: Vec::with_capacity(steps + 1),
            voltage_mv: Vec::with_capacity(steps + 1),
        };
        trace.time_ms.push(0.0);
        trace.voltage_mv.push(v);

        for step in 1..=steps {
            let t = step as f64 * self.dt_ms;
            let current = if t > stimulus.delay_ms && t <= stimulus.end_ms() {
                stimulus.amplitude_pa
            } else {
                0.0
            };

            v += self.dt_ms * (p.k * (v - p.vr) * (v - p.vt) - u + current) / p.cm;
            u += self.dt_ms * p.a * (p.b * (v - p.vr) - u);

            let recorded = if v >= p.vpeak {
                v = p.c;
                u += p.d;
                p.vpeak
            } else {
                v
            };
            if !recorded.is_finite() || !u.is_finite() {
                return Err(NeurofitError::Simulation(format!(
                    "membrane potential diverged at {:.2} ms",
                    t
                )));
            }

            trace.time_ms.push(t);
            trace.voltage_mv.push(recorded);
        }

        Ok(trace)
    }
}
