//! Simulation engine and configuration presets.
//!
//! ```ignore
//! use parabolic_wavesim::simulation::SimulationConfig;
//!
//! let mut sim = SimulationConfig::coarse(120).with_frequency(4_000.0).build()?;
//! sim.run_until(2.0e-3);
//! println!("max amplitude: {}", sim.stats().max_amplitude);
//! ```

use crate::error::Result;

use super::config::{constants, GridConfig, Point2D, WaveParams};
use super::field::{FieldStats, StepMode, WaveField};
use super::geometry::{Opening, Parabola};
use super::material::{MaterialMap, MediaConfig, ShellSpeed};
use super::snapshot::{FieldSnapshot, SnapshotPublisher, SnapshotReader};

/// Dimensions of a confocal reflector pair.
///
/// The outer reflector opens downward and the inner one upward; both
/// vertices are placed one focal length from the shared focus.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectorProfile {
    /// Outer (major) reflector aperture (mm).
    pub outer_diameter: f64,
    /// Outer reflector focal length (mm).
    pub outer_focal_length: f64,
    /// Inner (minor) reflector aperture (mm).
    pub inner_diameter: f64,
    /// Inner reflector focal length (mm).
    pub inner_focal_length: f64,
    /// Shared focus, also the source position.
    pub focus: Point2D,
    /// Shell thickness and speed model.
    pub media: MediaConfig,
}

impl Default for ReflectorProfile {
    fn default() -> Self {
        Self::canonical()
    }
}

impl ReflectorProfile {
    /// 508 mm / f100 outer reflector over a 200 mm / f50 bowl, 40 mm shells
    /// at a fixed 1.5e6 mm/s.
    pub fn canonical() -> Self {
        Self {
            outer_diameter: 508.0,
            outer_focal_length: 100.0,
            inner_diameter: 200.0,
            inner_focal_length: 50.0,
            focus: Point2D::origin(),
            media: MediaConfig::default(),
        }
    }

    /// Canonical outer reflector over a 100 mm bowl, with a shell that
    /// propagates at a thousandth of the ambient speed.
    pub fn narrow_bowl() -> Self {
        Self {
            inner_diameter: 100.0,
            media: MediaConfig {
                shell_thickness: constants::SHELL_THICKNESS,
                shell_speed: ShellSpeed::AmbientRatio(1e-3),
            },
            ..Self::canonical()
        }
    }

    /// Set the inner reflector aperture.
    pub fn with_inner_diameter(mut self, diameter: f64) -> Self {
        self.inner_diameter = diameter;
        self
    }

    /// Set the shell thickness.
    pub fn with_shell_thickness(mut self, thickness: f64) -> Self {
        self.media.shell_thickness = thickness;
        self
    }

    /// Set the shell speed model.
    pub fn with_shell_speed(mut self, speed: ShellSpeed) -> Self {
        self.media.shell_speed = speed;
        self
    }

    /// The downward-opening outer reflector.
    pub fn outer(&self) -> Result<Parabola> {
        Parabola::new(
            self.outer_diameter,
            self.outer_focal_length,
            Point2D::new(self.focus.x, self.focus.y + self.outer_focal_length),
            Opening::Downward,
        )
    }

    /// The upward-opening inner reflector.
    pub fn inner(&self) -> Result<Parabola> {
        Parabola::new(
            self.inner_diameter,
            self.inner_focal_length,
            Point2D::new(self.focus.x, self.focus.y - self.inner_focal_length),
            Opening::Upward,
        )
    }
}

/// Configuration for creating a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Grid bounds, resolution and time step.
    pub grid: GridConfig,
    /// Source and ambient medium.
    pub wave: WaveParams,
    /// Reflector dimensions and shell media.
    pub profile: ReflectorProfile,
    /// Replace the grid time step with the stable bound for the profile's
    /// fastest medium when building.
    pub auto_time_step: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl SimulationConfig {
    /// Canonical 300x300 grid, 1 kHz source, canonical reflectors.
    pub fn canonical() -> Self {
        Self {
            grid: GridConfig::default(),
            wave: WaveParams::default(),
            profile: ReflectorProfile::canonical(),
            auto_time_step: true,
        }
    }

    /// Canonical geometry at a lower resolution.
    pub fn coarse(resolution: usize) -> Self {
        Self {
            grid: GridConfig::default().with_resolution(resolution),
            ..Self::canonical()
        }
    }

    /// Canonical grid with the [`ReflectorProfile::narrow_bowl`] reflectors.
    pub fn narrow_bowl() -> Self {
        Self {
            profile: ReflectorProfile::narrow_bowl(),
            ..Self::canonical()
        }
    }

    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_wave(mut self, wave: WaveParams) -> Self {
        self.wave = wave;
        self
    }

    pub fn with_profile(mut self, profile: ReflectorProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the grid resolution.
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.grid.resolution = resolution;
        self
    }

    /// Set the source frequency.
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.wave.frequency = frequency;
        self
    }

    /// Set the source amplitude.
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.wave.amplitude = amplitude;
        self
    }

    /// Set the damping coefficient.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.grid.damping = damping;
        self
    }

    /// Use an explicit time step. Disables `auto_time_step`.
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.grid.time_step = time_step;
        self.auto_time_step = false;
        self
    }

    pub fn with_auto_time_step(mut self, enabled: bool) -> Self {
        self.auto_time_step = enabled;
        self
    }

    /// Grid configuration the engine will be built with.
    pub fn resolved_grid(&self) -> GridConfig {
        if self.auto_time_step {
            let fastest = self.profile.media.speeds(self.wave.speed).fastest();
            self.grid.clone().with_stable_time_step(fastest)
        } else {
            self.grid.clone()
        }
    }

    /// Build the simulation engine.
    pub fn build(self) -> Result<DualParabolicSimulation> {
        self.grid.validate_layout()?;
        let grid = self.resolved_grid();
        let outer = self.profile.outer()?;
        let inner = self.profile.inner()?;
        let field = WaveField::new(
            &grid,
            self.wave,
            &outer,
            &inner,
            self.profile.focus,
            &self.profile.media,
        )?;

        Ok(DualParabolicSimulation {
            time_step: grid.time_step,
            field,
            outer,
            inner,
            focus: self.profile.focus,
            publisher: None,
        })
    }
}

/// Simulation engine that steps a [`WaveField`] at a fixed time step.
///
/// Readers obtained from [`DualParabolicSimulation::subscribe`] receive a
/// snapshot each time a call to `step`, `step_n` or `run_until` returns.
pub struct DualParabolicSimulation {
    field: WaveField,
    outer: Parabola,
    inner: Parabola,
    focus: Point2D,
    time_step: f64,
    publisher: Option<SnapshotPublisher>,
}

impl DualParabolicSimulation {
    /// Perform one step at the configured time step.
    pub fn step(&mut self) {
        self.field.step(self.time_step);
        self.publish();
    }

    /// Perform one step of an explicit length.
    pub fn step_with(&mut self, dt: f64) {
        self.field.step(dt);
        self.publish();
    }

    /// Perform `n` steps.
    pub fn step_n(&mut self, n: usize) {
        for _ in 0..n {
            self.field.step(self.time_step);
        }
        self.publish();
    }

    /// Step until the elapsed time reaches `time`. Returns the steps taken.
    pub fn run_until(&mut self, time: f64) -> u64 {
        let start = self.field.step_count();
        while self.field.time() < time {
            self.field.step(self.time_step);
        }
        self.publish();
        self.field.step_count() - start
    }

    /// Reset the simulation.
    pub fn reset(&mut self) {
        self.field.reset();
        self.publish();
    }

    fn publish(&self) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(self.field.snapshot());
        }
    }

    /// Reader for snapshots of completed steps. The current state is
    /// published immediately.
    pub fn subscribe(&mut self) -> SnapshotReader {
        let publisher = self.publisher.get_or_insert_with(SnapshotPublisher::new);
        let reader = publisher.reader();
        self.publish();
        reader
    }

    pub fn set_frequency(&mut self, frequency: f64) -> Result<()> {
        self.field.set_frequency(frequency)
    }

    pub fn set_amplitude(&mut self, amplitude: f64) -> Result<()> {
        self.field.set_amplitude(amplitude)
    }

    pub fn set_step_mode(&mut self, mode: StepMode) {
        self.field.set_step_mode(mode);
    }

    /// Current field buffer, row-major.
    pub fn values(&self) -> &[f32] {
        self.field.field()
    }

    pub fn materials(&self) -> &MaterialMap {
        self.field.materials()
    }

    /// Elapsed simulated time (s).
    pub fn time(&self) -> f64 {
        self.field.time()
    }

    pub fn step_count(&self) -> u64 {
        self.field.step_count()
    }

    pub fn resolution(&self) -> usize {
        self.field.resolution()
    }

    /// Time step used by `step`, `step_n` and `run_until`.
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn stats(&self) -> FieldStats {
        self.field.stats()
    }

    pub fn snapshot(&self) -> FieldSnapshot {
        self.field.snapshot()
    }

    /// Read access to the integrator. Stepping goes through the engine so
    /// published snapshots never fall behind the field.
    pub fn field(&self) -> &WaveField {
        &self.field
    }

    /// Record the field at `(row, col)` after every step. See
    /// [`WaveField::add_probe`].
    pub fn add_probe(&mut self, row: usize, col: usize) -> Result<usize> {
        self.field.add_probe(row, col)
    }

    /// Probe that keeps at most `limit` samples.
    pub fn add_probe_with_limit(&mut self, row: usize, col: usize, limit: usize) -> Result<usize> {
        self.field.add_probe_with_limit(row, col, limit)
    }

    pub fn outer(&self) -> &Parabola {
        &self.outer
    }

    pub fn inner(&self) -> &Parabola {
        &self.inner
    }

    /// Shared focus of the reflectors.
    pub fn focus(&self) -> Point2D {
        self.focus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WaveSimError;
    use crate::simulation::material::MaterialType;

    #[test]
    fn test_profile_is_confocal() {
        let profile = ReflectorProfile::canonical();
        let outer = profile.outer().unwrap();
        let inner = profile.inner().unwrap();
        assert_eq!(outer.vertex(), Point2D::new(0.0, 100.0));
        assert_eq!(inner.vertex(), Point2D::new(0.0, -50.0));
        assert_eq!(outer.focus(), inner.focus());
    }

    #[test]
    fn test_narrow_bowl_profile() {
        let profile = ReflectorProfile::narrow_bowl();
        assert_eq!(profile.inner_diameter, 100.0);
        let speeds = profile.media.speeds(constants::AMBIENT_SPEED);
        assert!((speeds.shell - 343.0).abs() < 1e-9);
    }

    #[test]
    fn test_auto_time_step_uses_fastest_medium() {
        let config = SimulationConfig::coarse(80);
        let grid = config.resolved_grid();
        let expected = 0.4 * grid.dy() / (constants::SHELL_SPEED * 2f64.sqrt());
        assert!((grid.time_step - expected).abs() < 1e-20);

        let narrow = SimulationConfig::narrow_bowl().with_resolution(80).resolved_grid();
        let expected = 0.4 * narrow.dy() / (constants::AMBIENT_SPEED * 2f64.sqrt());
        assert!((narrow.time_step - expected).abs() < 1e-20);
    }

    #[test]
    fn test_explicit_time_step_is_kept() {
        let sim = SimulationConfig::coarse(40)
            .with_time_step(1e-9)
            .build()
            .unwrap();
        assert_eq!(sim.time_step(), 1e-9);
    }

    #[test]
    fn test_build_rejects_bad_profile() {
        let profile = ReflectorProfile::canonical().with_inner_diameter(0.0);
        let result = SimulationConfig::coarse(40).with_profile(profile).build();
        assert!(matches!(result, Err(WaveSimError::InvalidGeometry(_))));
    }

    #[test]
    fn test_build_rejects_degenerate_resolution() {
        for resolution in [0, 1, 2] {
            let result = SimulationConfig::coarse(resolution).build();
            assert!(
                matches!(result, Err(WaveSimError::InvalidGrid(_))),
                "resolution {resolution}"
            );
        }
    }

    #[test]
    fn test_engine_steps_record_samples() {
        let mut sim = SimulationConfig::coarse(40)
            .with_frequency(20_000.0)
            .build()
            .unwrap();
        let reader = sim.subscribe();
        let (row, col) = sim.field().focus();
        let full = sim.add_probe(row, col).unwrap();
        let short = sim.add_probe_with_limit(row, col, 4).unwrap();
        assert!(sim.add_probe(40, 0).is_err());

        sim.step_n(10);
        assert_eq!(sim.field().probe(full).unwrap().samples().len(), 10);
        assert_eq!(sim.field().probe(short).unwrap().samples().len(), 4);
        assert_eq!(reader.latest_step(), Some(10));
    }

    #[test]
    fn test_step_helpers() {
        let mut sim = SimulationConfig::coarse(40)
            .with_frequency(20_000.0)
            .build()
            .unwrap();
        let dt = sim.time_step();

        sim.step();
        sim.step_n(9);
        assert_eq!(sim.step_count(), 10);

        let taken = sim.run_until(25.0 * dt);
        assert!(taken >= 15);
        assert!(sim.time() >= 25.0 * dt);
        assert!(sim.time() < 26.5 * dt);

        sim.reset();
        assert_eq!(sim.step_count(), 0);
        assert_eq!(sim.time(), 0.0);
    }

    #[test]
    fn test_subscribe_publishes_completed_steps() {
        let mut sim = SimulationConfig::coarse(40)
            .with_frequency(20_000.0)
            .build()
            .unwrap();
        let reader = sim.subscribe();
        assert_eq!(reader.latest_step(), Some(0));

        sim.step_n(5);
        let snapshot = reader.latest().unwrap();
        assert_eq!(snapshot.step, 5);
        assert_eq!(snapshot.values(), sim.values());
    }

    #[test]
    fn test_canonical_focus_is_open() {
        let sim = SimulationConfig::coarse(100).build().unwrap();
        let (row, col) = sim.field().focus();
        assert_eq!(sim.materials().get(row, col), Some(MaterialType::OpenMedium));
        assert_eq!(sim.focus(), Point2D::origin());
    }
}
