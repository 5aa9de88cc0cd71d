//! Feature extraction from voltage traces.

use crate::types::{Stimulus, Trace};

/// Upward crossings of this voltage count as spikes.
pub const SPIKE_THRESHOLD_MV: f64 = 0.0;

pub fn count_spikes(trace: &Trace, threshold_mv: f64) -> usize {
    trace
        .voltage_mv
        .windows(2)
        .filter(|w| w[0] < threshold_mv && w[1] >= threshold_mv)
        .count()
}

/// Mean voltage over samples with `start_ms <= t < end_ms`.
pub fn window_mean(trace: &Trace, start_ms: f64, end_ms: f64) -> Option<f64> {
    let (sum, n) = trace
        .time_ms
        .iter()
        .zip(&trace.voltage_mv)
        .filter(|(t, _)| **t >= start_ms && **t < end_ms)
        .fold((0.0, 0usize), |(s, n), (_, v)| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Membrane potential before the pulse, or over the second half of an
/// unstimulated run.
pub fn resting_potential(trace: &Trace, stimulus: &Stimulus) -> Option<f64> {
    if stimulus.delay_ms > 0.0 && stimulus.amplitude_pa != 0.0 {
        window_mean(trace, 0.0, stimulus.delay_ms)
    } else {
        let end = trace.time_ms.last().copied()?;
        window_mean(trace, end / 2.0, end + f64::EPSILON)
    }
}

/// Mean voltage over the last fifth of the pulse.
pub fn steady_state(trace: &Trace, stimulus: &Stimulus) -> Option<f64> {
    let start = stimulus.end_ms() - stimulus.duration_ms * 0.2;
    window_mean(trace, start, stimulus.end_ms())
}

/// Input resistance in MOhm from the steady deflection of a pulse.
pub fn input_resistance(trace: &Trace, stimulus: &Stimulus) -> Option<f64> {
    if stimulus.amplitude_pa == 0.0 || stimulus.delay_ms <= 0.0 {
        return None;
    }
    let baseline = window_mean(trace, 0.0, stimulus.delay_ms)?;
    let steady = steady_state(trace, stimulus)?;
    // mV / pA = GOhm
    Some((steady - baseline) / stimulus.amplitude_pa * 1_000.0)
}

/// Time from pulse onset until the deflection first reaches 1 - 1/e of its
/// steady value.
pub fn time_constant(trace: &Trace, stimulus: &Stimulus) -> Option<f64> {
    if stimulus.delay_ms <= 0.0 {
        return None;
    }
    let baseline = window_mean(trace, 0.0, stimulus.delay_ms)?;
    let deflection = steady_state(trace, stimulus)? - baseline;
    if deflection.abs() < 1e-9 {
        return None;
    }
    let target = 1.0 - (-1.0f64).exp();
    trace
        .time_ms
        .iter()
        .zip(&trace.voltage_mv)
        .filter(|(t, _)| **t >= stimulus.delay_ms && **t < stimulus.end_ms())
        .find(|(_, v)| (**v - baseline) / deflection >= target)
        .map(|(t, _)| t - stimulus.delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1 ms samples of an RC cell: -70 mV rest, tau 10 ms, 100 MOhm.
    fn rc_trace(stimulus: &Stimulus) -> Trace {
        let mut time = Vec::new();
        let mut volt = Vec::new();
        let r_gohm = 0.1;
        let tau = 10.0;
        let mut v = -70.0;
        for i in 0..300 {
            let t = i as f64;
            time.push(t);
            volt.push(v);
            let i_pa = if t >= stimulus.delay_ms && t < stimulus.end_ms() {
                stimulus.amplitude_pa
            } else {
                0.0
            };
            let target = -70.0 + r_gohm * i_pa;
            v += (target - v) / tau;
        }
        Trace {
            time_ms: time,
            voltage_mv: volt,
        }
    }

    #[test]
    fn test_count_spikes_upward_crossings_only() {
        let trace = Trace {
            time_ms: (0..7).map(|i| i as f64).collect(),
            voltage_mv: vec![-70.0, 10.0, 20.0, -60.0, 5.0, -70.0, -70.0],
        };
        assert_eq!(count_spikes(&trace, 0.0), 2);
        assert_eq!(count_spikes(&trace, 15.0), 1);
    }

    #[test]
    fn test_passive_features() {
        let stimulus = Stimulus::square(-10.0, 150.0, 30.0);
        let trace = rc_trace(&stimulus);

        let rest = resting_potential(&trace, &stimulus).unwrap();
        assert!((rest - -70.0).abs() < 1e-9);

        let r = input_resistance(&trace, &stimulus).unwrap();
        assert!((r - 100.0).abs() < 2.0, "input resistance {}", r);

        let tau = time_constant(&trace, &stimulus).unwrap();
        assert!((9.0..=12.0).contains(&tau), "tau {}", tau);
    }

    #[test]
    fn test_empty_window() {
        assert_eq!(window_mean(&Trace::default(), 0.0, 10.0), None);
    }
}
