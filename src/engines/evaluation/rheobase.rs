use super::traits::Model;
use crate::config::RheobaseConfig;
use crate::error::{NeurofitError, Result};
use crate::types::{Rheobase, Stimulus};

/// Bracket-then-bisect search for the smallest current that fires a spike.
///
/// Amplitudes grow geometrically from `initial_amplitude_pa` until a probe
/// spikes (or the ceiling is passed without one). The last silent and first
/// spiking amplitudes are then bisected down to `tolerance_pa`. The reported
/// amplitude is always one that was observed to spike.
#[derive(Debug, Clone)]
pub struct RheobaseSearch {
    config: RheobaseConfig,
}

impl RheobaseSearch {
    pub fn new(config: RheobaseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RheobaseConfig {
        &self.config
    }

    /// `Ok(None)` when nothing at or below the ceiling spikes within the
    /// iteration budget. `Err` only for simulation failures.
    pub fn find(&self, model: &mut dyn Model) -> Result<Option<Rheobase>> {
        let (amplitude, probes) = self.search(model)?;
        Ok(amplitude.map(|amplitude_pa| Rheobase { amplitude_pa, probes }))
    }

    /// Like [`find`](Self::find), with a missing rheobase as an error.
    pub fn require(&self, model: &mut dyn Model) -> Result<Rheobase> {
        match self.search(model)? {
            (Some(amplitude_pa), probes) => Ok(Rheobase { amplitude_pa, probes }),
            (None, probes) => Err(NeurofitError::RheobaseNotFound {
                ceiling_pa: self.config.ceiling_pa,
                probes,
            }),
        }
    }

    fn search(&self, model: &mut dyn Model) -> Result<(Option<f64>, usize)> {
        let mut probes = 0;

        let Some((mut silent, mut spiking)) = self.bracket(model, &mut probes)? else {
            log::debug!(
                "No spike up to {} pA after {} probes",
                self.config.ceiling_pa,
                probes
            );
            return Ok((None, probes));
        };

        let mut iterations = 0;
        while spiking - silent > self.config.tolerance_pa && iterations < self.config.max_iterations {
            let mid = 0.5 * (silent + spiking);
            if self.spikes(model, mid, &mut probes)? {
                spiking = mid;
            } else {
                silent = mid;
            }
            iterations += 1;
        }

        log::debug!("Rheobase {:.3} pA after {} probes", spiking, probes);
        Ok((Some(spiking), probes))
    }

    /// Returns `(last silent amplitude, first spiking amplitude)`. Zero
    /// current is assumed silent and is never probed.
    fn bracket(&self, model: &mut dyn Model, probes: &mut usize) -> Result<Option<(f64, f64)>> {
        let mut silent = 0.0;
        let mut amplitude = self.config.initial_amplitude_pa;

        for _ in 0..self.config.max_iterations {
            if self.spikes(model, amplitude, probes)? {
                return Ok(Some((silent, amplitude)));
            }
            if amplitude >= self.config.ceiling_pa {
                break;
            }
            silent = amplitude;
            amplitude = (amplitude * self.config.growth_factor).min(self.config.ceiling_pa);
        }
        Ok(None)
    }

    fn spikes(&self, model: &mut dyn Model, amplitude_pa: f64, probes: &mut usize) -> Result<bool> {
        let stimulus = Stimulus::square(amplitude_pa, self.config.duration_ms, self.config.delay_ms);
        let trace = model.run(&stimulus)?;
        *probes += 1;
        let count = model.spike_count(&trace);
        log::trace!("Probe {} pA -> {} spikes", amplitude_pa, count);
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParamMap, Trace};

    /// Spikes once whenever the amplitude reaches the threshold.
    struct StepModel {
        threshold_pa: f64,
        runs: usize,
    }

    impl Model for StepModel {
        fn configure(&mut self, _params: &ParamMap) -> Result<()> {
            Ok(())
        }

        fn run(&mut self, stimulus: &Stimulus) -> Result<Trace> {
            self.runs += 1;
            let peak = if stimulus.amplitude_pa >= self.threshold_pa { 30.0 } else { -60.0 };
            Ok(Trace {
                time_ms: vec![0.0, 1.0, 2.0],
                voltage_mv: vec![-70.0, peak, -70.0],
            })
        }
    }

    fn search() -> RheobaseSearch {
        RheobaseSearch::new(RheobaseConfig::default())
    }

    #[test]
    fn test_converges_within_tolerance() {
        let mut model = StepModel {
            threshold_pa: 137.3,
            runs: 0,
        };
        let rheobase = search().find(&mut model).unwrap().unwrap();
        assert!(rheobase.amplitude_pa >= 137.3);
        assert!(rheobase.amplitude_pa - 137.3 <= RheobaseConfig::default().tolerance_pa);
        assert_eq!(rheobase.probes, model.runs);
    }

    #[test]
    fn test_never_spiking_returns_none() {
        let mut model = StepModel {
            threshold_pa: f64::INFINITY,
            runs: 0,
        };
        assert_eq!(search().find(&mut model).unwrap(), None);
        // 10, 20, ..., 1280, then the clamped ceiling.
        assert_eq!(model.runs, 9);

        let err = search().require(&mut model).unwrap_err();
        assert!(matches!(err, NeurofitError::RheobaseNotFound { .. }));
    }

    #[test]
    fn test_threshold_below_initial_amplitude() {
        let mut model = StepModel {
            threshold_pa: 3.2,
            runs: 0,
        };
        let rheobase = search().find(&mut model).unwrap().unwrap();
        assert!(rheobase.amplitude_pa >= 3.2 && rheobase.amplitude_pa - 3.2 <= 0.5);
    }
}
