//! Focus excitation with a real Morlet wavelet pulse.
//!
//! The pulse is
//!
//! ```text
//! value(tau) = A * c * pi^(-1/4) * exp(-tau^2 / 2) * (cos(sigma * tau) - kappa)
//! kappa      = exp(-sigma^2 / 2)
//! c          = (1 + exp(-sigma^2) - 2 exp(-3 sigma^2 / 4))^(-1/2)
//! ```
//!
//! with `tau = (t - 3/f0) * f0`, and is zero once `|tau| > 4` or
//! `t > 8/f0`.

use super::material::MaterialMap;

/// Morlet shape parameter.
pub const MORLET_SIGMA: f64 = 6.0;

/// Fixed gain applied on top of the configured amplitude.
pub const SOURCE_GAIN: f64 = 15.0;

/// Pulse centre, in source periods.
pub const PULSE_CENTER_PERIODS: f64 = 3.0;

/// Total pulse window, in source periods.
pub const PULSE_DURATION_PERIODS: f64 = 8.0;

/// Half width of the wavelet support in dimensionless time.
pub const WAVELET_HALF_SUPPORT: f64 = 4.0;

/// Weight of the source at the four cells adjacent to the focus.
pub const NEIGHBOR_WEIGHT: f64 = 0.5;

/// Admissibility offset `kappa` for a given sigma.
pub fn morlet_kappa(sigma: f64) -> f64 {
    (-0.5 * sigma * sigma).exp()
}

/// Normalization constant `c` for a given sigma.
pub fn morlet_normalization(sigma: f64) -> f64 {
    let s2 = sigma * sigma;
    (1.0 + (-s2).exp() - 2.0 * (-0.75 * s2).exp()).powf(-0.5)
}

/// A windowed Morlet pulse centred a few periods after t = 0.
#[derive(Debug, Clone, PartialEq)]
pub struct MorletPulse {
    /// Centre frequency f0 (Hz).
    pub frequency: f64,
    /// Configured amplitude, before [`SOURCE_GAIN`].
    pub amplitude: f64,
    kappa: f64,
    prefactor: f64,
}

impl MorletPulse {
    /// Create a pulse at `frequency` with the given amplitude.
    pub fn new(frequency: f64, amplitude: f64) -> Self {
        let prefactor = morlet_normalization(MORLET_SIGMA) * std::f64::consts::PI.powf(-0.25);
        Self {
            frequency,
            amplitude,
            kappa: morlet_kappa(MORLET_SIGMA),
            prefactor,
        }
    }

    /// Seconds per source period.
    #[inline]
    pub fn time_scale(&self) -> f64 {
        1.0 / self.frequency
    }

    /// Time of the pulse peak.
    pub fn center(&self) -> f64 {
        PULSE_CENTER_PERIODS * self.time_scale()
    }

    /// End of the pulse window.
    pub fn duration(&self) -> f64 {
        PULSE_DURATION_PERIODS * self.time_scale()
    }

    /// Amplitude after the fixed gain.
    pub fn amplitude_scale(&self) -> f64 {
        self.amplitude * SOURCE_GAIN
    }

    /// Source value at time `t`.
    pub fn value(&self, t: f64) -> f64 {
        if t > self.duration() {
            return 0.0;
        }
        let tau = (t - self.center()) / self.time_scale();
        if tau.abs() > WAVELET_HALF_SUPPORT {
            return 0.0;
        }
        let envelope = (-0.5 * tau * tau).exp();
        let carrier = (MORLET_SIGMA * tau).cos();
        self.amplitude_scale() * self.prefactor * envelope * (carrier - self.kappa)
    }

    /// Value at the pulse centre, `A * c * pi^(-1/4) * (1 - kappa)`.
    pub fn peak(&self) -> f64 {
        self.amplitude_scale() * self.prefactor * (1.0 - self.kappa)
    }

    /// True once the pulse can no longer contribute.
    pub fn is_finished(&self, t: f64) -> bool {
        t > self.duration() || t > self.center() + WAVELET_HALF_SUPPORT * self.time_scale()
    }
}

/// Writes the pulse into the transient source buffer at the focus cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInjector {
    /// Focus row.
    pub row: usize,
    /// Focus column.
    pub col: usize,
}

impl SourceInjector {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Overwrite `source` with `value` at the focus and half of it at the
    /// four adjacent cells, skipping RIGID targets.
    pub fn fill(&self, source: &mut [f32], materials: &MaterialMap, value: f64) {
        source.fill(0.0);

        let n = materials.resolution();
        let focus = self.row * n + self.col;
        if materials.at(focus).propagates() {
            source[focus] = value as f32;
        }

        let neighbors = [
            (self.row.checked_sub(1), Some(self.col)),
            (Some(self.row + 1), Some(self.col)),
            (Some(self.row), self.col.checked_sub(1)),
            (Some(self.row), Some(self.col + 1)),
        ];
        let half = (value * NEIGHBOR_WEIGHT) as f32;
        for (row, col) in neighbors {
            let (Some(row), Some(col)) = (row, col) else {
                continue;
            };
            if row < n && col < n {
                let idx = row * n + col;
                if materials.at(idx).propagates() {
                    source[idx] = half;
                }
            }
        }
    }
}
