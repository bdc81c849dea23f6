//! Field integrator for the dual reflector simulation.
//!
//! The field is stored in row-major `f32` buffers. Each step computes a new
//! buffer from the current and previous buffers with an explicit leapfrog
//! scheme and linear damping:
//!
//! ```text
//! new = (-(prev - 2 cur) + q0 d prev + q1 src + q2 dxx + q3 dyy) / (1 + d q0)
//! ```
//!
//! with `q0 = c dt`, `q1 = (c dt)^2`, `q2 = (c dt / dx)^2` and
//! `q3 = (c dt / dy)^2`, `c` taken from the cell's material. Every cell of the
//! new buffer depends only on the two older buffers, so rows are updated
//! independently and in parallel for large grids.

use rayon::prelude::*;

use crate::error::{Result, WaveSimError};

use super::config::{GridConfig, Point2D, WaveParams};
use super::excitation::{MorletPulse, SourceInjector};
use super::geometry::Parabola;
use super::material::{MaterialMap, MaterialType, MediaConfig, MediumSpeeds};
use super::physics::{check_stability, StabilityReport};
use super::probe::Probe;
use super::snapshot::FieldSnapshot;

/// Rows at which [`StepMode::Auto`] switches to the parallel path.
pub const PARALLEL_THRESHOLD: usize = 128;

/// How a step distributes rows over threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    /// Parallel for grids with at least [`PARALLEL_THRESHOLD`] rows.
    #[default]
    Auto,
    /// Always on the calling thread.
    Sequential,
    /// Always on the rayon pool.
    Parallel,
}

impl StepMode {
    fn is_parallel(self, rows: usize) -> bool {
        match self {
            StepMode::Auto => rows >= PARALLEL_THRESHOLD,
            StepMode::Sequential => false,
            StepMode::Parallel => true,
        }
    }
}

/// Update rule chosen for a cell, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stencil {
    /// RIGID cell, written as zero.
    Rigid,
    /// Border cell other than the top row interior, written as zero.
    Absorbing,
    /// Top row interior, one-sided y difference.
    TopEdge,
    /// Interior cell whose neighbours share its material.
    Interior,
    /// Interior cell next to a different material.
    Interface,
}

/// Per-material coefficients for one time step.
#[derive(Debug, Clone, Copy, Default)]
struct UpdateCoefficients {
    q0: f64,
    q1: f64,
    q2: f64,
    q3: f64,
}

impl UpdateCoefficients {
    fn new(speed: f64, dt: f64, dx: f64, dy: f64) -> Self {
        let cdt = speed * dt;
        Self {
            q0: cdt,
            q1: cdt * cdt,
            q2: (cdt / dx).powi(2),
            q3: (cdt / dy).powi(2),
        }
    }
}

/// Read-only inputs shared by all row updates of a step.
struct StepContext<'a> {
    width: usize,
    current: &'a [f32],
    previous: &'a [f32],
    source: &'a [f32],
    materials: &'a [MaterialType],
    stencils: &'a [Stencil],
    coefficients: [UpdateCoefficients; 3],
    damping: f64,
}

impl StepContext<'_> {
    /// Current value of a neighbour, with RIGID neighbours contributing zero.
    #[inline(always)]
    fn neighbor(&self, idx: usize) -> f64 {
        match self.materials[idx] {
            MaterialType::Rigid => 0.0,
            _ => self.current[idx] as f64,
        }
    }

    /// Compute row `row` of the new buffer into `out`.
    fn update_row(&self, row: usize, out: &mut [f32]) {
        let n = self.width;
        let row_start = row * n;

        for (col, cell) in out.iter_mut().enumerate() {
            let idx = row_start + col;
            let center = self.current[idx] as f64;

            let (dxx, dyy) = match self.stencils[idx] {
                Stencil::Rigid | Stencil::Absorbing => {
                    *cell = 0.0;
                    continue;
                }
                Stencil::Interior => {
                    let cur = self.current;
                    (
                        cur[idx - 1] as f64 - 2.0 * center + cur[idx + 1] as f64,
                        cur[idx - n] as f64 - 2.0 * center + cur[idx + n] as f64,
                    )
                }
                Stencil::Interface => (
                    self.neighbor(idx - 1) - 2.0 * center + self.neighbor(idx + 1),
                    self.neighbor(idx - n) - 2.0 * center + self.neighbor(idx + n),
                ),
                Stencil::TopEdge => {
                    let cur = self.current;
                    (
                        cur[idx - 1] as f64 - 2.0 * center + cur[idx + 1] as f64,
                        2.0 * (cur[idx + n] as f64 - center),
                    )
                }
            };

            let k = self.coefficients[self.materials[idx] as usize];
            let previous = self.previous[idx] as f64;
            let source = self.source[idx] as f64;

            let numerator = -(previous - 2.0 * center)
                + k.q0 * self.damping * previous
                + k.q1 * source
                + k.q2 * dxx
                + k.q3 * dyy;
            *cell = (numerator / (1.0 + self.damping * k.q0)) as f32;
        }
    }
}

fn build_stencils(materials: &MaterialMap) -> Vec<Stencil> {
    let n = materials.resolution();
    let mut stencils = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            let border = row == 0 || col == 0 || row == n - 1 || col == n - 1;
            let stencil = if materials.at(row * n + col) == MaterialType::Rigid {
                Stencil::Rigid
            } else if row == 0 && col > 0 && col < n - 1 {
                Stencil::TopEdge
            } else if border {
                Stencil::Absorbing
            } else if materials.is_interface(row, col) {
                Stencil::Interface
            } else {
                Stencil::Interior
            };
            stencils.push(stencil);
        }
    }
    stencils
}

/// Summary of the field after a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    /// Steps taken since construction or the last reset.
    pub step: u64,
    /// Elapsed simulated time (s).
    pub time: f64,
    /// Largest absolute field value.
    pub max_amplitude: f32,
    /// Sum of squared field values.
    pub energy: f64,
}

/// Two-dimensional wave field between a pair of parabolic reflectors.
///
/// Owns the field buffers exclusively. Geometry is consumed once at
/// construction to classify cells and is not retained.
pub struct WaveField {
    config: GridConfig,
    wave: WaveParams,
    speeds: MediumSpeeds,
    materials: MaterialMap,
    stencils: Vec<Stencil>,
    rigid_cells: Vec<usize>,
    injector: SourceInjector,
    pulse: MorletPulse,

    current: Vec<f32>,
    previous: Vec<f32>,
    /// Receives the next buffer; holds stale data between steps.
    scratch: Vec<f32>,
    source: Vec<f32>,

    time: f64,
    step: u64,
    mode: StepMode,
    stability: StabilityReport,
    unstable_step_reported: bool,
    probes: Vec<Probe>,
}

impl WaveField {
    /// Classify the grid against both reflectors and create a zeroed field.
    ///
    /// The focus is snapped to its nearest cell. A time step above the CFL
    /// bound is reported as a warning and kept.
    pub fn new(
        config: &GridConfig,
        wave: WaveParams,
        outer: &Parabola,
        inner: &Parabola,
        focus: Point2D,
        media: &MediaConfig,
    ) -> Result<Self> {
        config.validate()?;
        wave.validate()?;

        let speeds = media.speeds(wave.speed);
        if !speeds.shell.is_finite() || speeds.shell <= 0.0 {
            return Err(WaveSimError::invalid_wave_params(format!(
                "shell speed must be positive, got {}",
                speeds.shell
            )));
        }

        let stability = check_stability(config, &speeds);
        let materials = MaterialMap::classify(config, outer, inner, media.shell_thickness)?;
        let stencils = build_stencils(&materials);
        let rigid_cells = materials
            .as_slice()
            .iter()
            .enumerate()
            .filter(|(_, &m)| m == MaterialType::Rigid)
            .map(|(idx, _)| idx)
            .collect();

        let (focus_row, focus_col) = config.cell_of(focus);
        if materials.get(focus_row, focus_col) == Some(MaterialType::Rigid) {
            tracing::warn!(
                focus_row,
                focus_col,
                "Focus cell is rigid, the source will have no effect"
            );
        }

        tracing::info!(
            "Created wave field: {}x{} cells, dx={:.4} mm, dy={:.4} mm, {} open / {} shell / {} rigid, focus at ({}, {})",
            config.resolution,
            config.resolution,
            config.dx(),
            config.dy(),
            materials.count(MaterialType::OpenMedium),
            materials.count(MaterialType::ShellMedium),
            materials.count(MaterialType::Rigid),
            focus_row,
            focus_col
        );

        let size = config.cell_count();
        Ok(Self {
            config: config.clone(),
            pulse: MorletPulse::new(wave.frequency, wave.amplitude),
            wave,
            speeds,
            materials,
            stencils,
            rigid_cells,
            injector: SourceInjector::new(focus_row, focus_col),
            current: vec![0.0; size],
            previous: vec![0.0; size],
            scratch: vec![0.0; size],
            source: vec![0.0; size],
            time: 0.0,
            step: 0,
            mode: StepMode::Auto,
            stability,
            unstable_step_reported: false,
            probes: Vec::new(),
        })
    }

    /// Advance the field by exactly one step of length `dt`.
    ///
    /// The source is evaluated at the end of the step. Stepping never fails;
    /// a `dt` above the stable bound is reported once per field.
    pub fn step(&mut self, dt: f64) {
        if dt > self.stability.max_stable_time_step && !self.unstable_step_reported {
            tracing::warn!(
                time_step = dt,
                recommended_time_step = self.stability.max_stable_time_step,
                "Step size exceeds CFL stability limit"
            );
            self.unstable_step_reported = true;
        }

        self.time += dt;
        let value = self.pulse.value(self.time);
        self.injector.fill(&mut self.source, &self.materials, value);

        self.integrate(dt);
        self.enforce_rigid();
        self.step += 1;

        for probe in &mut self.probes {
            probe.record(self.time, &self.current);
        }
    }

    /// Compute the new buffer and rotate it into place.
    fn integrate(&mut self, dt: f64) {
        let n = self.config.resolution;
        let (dx, dy) = (self.config.dx(), self.config.dy());

        let mut coefficients = [UpdateCoefficients::default(); 3];
        for material in MaterialType::ALL {
            coefficients[material as usize] =
                UpdateCoefficients::new(self.speeds.speed(material), dt, dx, dy);
        }

        let ctx = StepContext {
            width: n,
            current: &self.current,
            previous: &self.previous,
            source: &self.source,
            materials: self.materials.as_slice(),
            stencils: &self.stencils,
            coefficients,
            damping: self.config.damping,
        };

        if self.mode.is_parallel(n) {
            self.scratch
                .par_chunks_mut(n)
                .enumerate()
                .for_each(|(row, out)| ctx.update_row(row, out));
        } else {
            for (row, out) in self.scratch.chunks_mut(n).enumerate() {
                ctx.update_row(row, out);
            }
        }

        // previous <- current, current <- new
        std::mem::swap(&mut self.previous, &mut self.current);
        std::mem::swap(&mut self.current, &mut self.scratch);
    }

    /// Zero every RIGID cell in both buffers.
    fn enforce_rigid(&mut self) {
        for &idx in &self.rigid_cells {
            self.current[idx] = 0.0;
            self.previous[idx] = 0.0;
        }
    }

    /// Zero all buffers, elapsed time and probe samples.
    pub fn reset(&mut self) {
        self.current.fill(0.0);
        self.previous.fill(0.0);
        self.scratch.fill(0.0);
        self.source.fill(0.0);
        self.time = 0.0;
        self.step = 0;
        for probe in &mut self.probes {
            probe.clear();
        }
        tracing::debug!("Wave field reset");
    }

    /// Change the source frequency for subsequent steps.
    ///
    /// A non-positive or non-finite frequency is rejected and the previous
    /// value stays in effect.
    pub fn set_frequency(&mut self, frequency: f64) -> Result<()> {
        let wave = self.wave.clone().with_frequency(frequency);
        wave.validate()?;
        self.wave = wave;
        self.pulse.frequency = frequency;
        tracing::debug!(frequency, "Source frequency changed");
        Ok(())
    }

    /// Change the source amplitude for subsequent steps.
    pub fn set_amplitude(&mut self, amplitude: f64) -> Result<()> {
        let wave = self.wave.clone().with_amplitude(amplitude);
        wave.validate()?;
        self.wave = wave;
        self.pulse.amplitude = amplitude;
        tracing::debug!(amplitude, "Source amplitude changed");
        Ok(())
    }

    /// Select the row scheduling for subsequent steps.
    pub fn set_step_mode(&mut self, mode: StepMode) {
        self.mode = mode;
    }

    pub fn step_mode(&self) -> StepMode {
        self.mode
    }

    /// Current field buffer, row-major.
    pub fn field(&self) -> &[f32] {
        &self.current
    }

    /// Field buffer of the preceding step.
    pub fn previous_field(&self) -> &[f32] {
        &self.previous
    }

    /// Source buffer written during the last step.
    pub fn source(&self) -> &[f32] {
        &self.source
    }

    /// Material classification.
    pub fn materials(&self) -> &MaterialMap {
        &self.materials
    }

    /// Elapsed simulated time (s).
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Cells per side.
    pub fn resolution(&self) -> usize {
        self.config.resolution
    }

    /// Steps since construction or the last reset.
    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Focus cell `(row, col)`.
    pub fn focus(&self) -> (usize, usize) {
        (self.injector.row, self.injector.col)
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn wave_params(&self) -> &WaveParams {
        &self.wave
    }

    pub fn speeds(&self) -> &MediumSpeeds {
        &self.speeds
    }

    /// The excitation pulse in effect.
    pub fn pulse(&self) -> &MorletPulse {
        &self.pulse
    }

    /// Stability check performed at construction.
    pub fn stability(&self) -> &StabilityReport {
        &self.stability
    }

    /// Field value at `(row, col)`.
    pub fn value_at(&self, row: usize, col: usize) -> Option<f32> {
        let n = self.config.resolution;
        (row < n && col < n).then(|| self.current[row * n + col])
    }

    /// Largest absolute field value.
    pub fn max_amplitude(&self) -> f32 {
        self.current.iter().map(|v| v.abs()).fold(0.0, f32::max)
    }

    /// Sum of squared field values.
    pub fn total_energy(&self) -> f64 {
        self.current.iter().map(|&v| (v as f64) * (v as f64)).sum()
    }

    /// Amplitude and energy summary of the current buffer.
    pub fn stats(&self) -> FieldStats {
        FieldStats {
            step: self.step,
            time: self.time,
            max_amplitude: self.max_amplitude(),
            energy: self.total_energy(),
        }
    }

    /// Immutable copy of the current buffer.
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::new(self.step, self.time, self.config.resolution, &self.current)
    }

    /// Record the field at `(row, col)` after every step. Returns the probe index.
    ///
    /// The probe keeps one sample per step until [`WaveField::reset`], so
    /// memory grows with the run length. Use
    /// [`WaveField::add_probe_with_limit`] for long runs.
    pub fn add_probe(&mut self, row: usize, col: usize) -> Result<usize> {
        self.check_cell(row, col)?;
        self.probes.push(Probe::new(row, col, self.config.resolution));
        Ok(self.probes.len() - 1)
    }

    /// Like [`WaveField::add_probe`], but recording stops after `limit` samples.
    pub fn add_probe_with_limit(&mut self, row: usize, col: usize, limit: usize) -> Result<usize> {
        self.check_cell(row, col)?;
        let probe = Probe::with_limit(row, col, self.config.resolution, limit);
        self.probes.push(probe);
        Ok(self.probes.len() - 1)
    }

    fn check_cell(&self, row: usize, col: usize) -> Result<()> {
        let n = self.config.resolution;
        if row >= n || col >= n {
            return Err(WaveSimError::IndexOutOfBounds {
                row,
                col,
                resolution: n,
            });
        }
        Ok(())
    }

    /// Probe by index.
    pub fn probe(&self, index: usize) -> Option<&Probe> {
        self.probes.get(index)
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }
}

impl std::fmt::Debug for WaveField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaveField")
            .field("resolution", &self.config.resolution)
            .field("time", &self.time)
            .field("step", &self.step)
            .field("focus", &self.focus())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
