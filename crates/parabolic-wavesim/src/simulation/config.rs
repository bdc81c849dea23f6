//! Grid and wave configuration for the dual reflector simulation.
//!
//! All lengths are millimetres, speeds are millimetres per second and times
//! are seconds.

use crate::error::{Result, WaveSimError};

use super::physics::max_stable_time_step;

/// Physical constants and canonical settings.
pub mod constants {
    /// Speed of sound in air (mm/s).
    pub const AMBIENT_SPEED: f64 = 343_000.0;

    /// Speed of sound in the reflector shell material (mm/s).
    pub const SHELL_SPEED: f64 = 1_500_000.0;

    /// Default source frequency (Hz).
    pub const DEFAULT_FREQUENCY: f64 = 1_000.0;

    /// Default linear damping coefficient.
    pub const DEFAULT_DAMPING: f64 = 0.001;

    /// Default reflection coefficient (stored, not applied by the update rule).
    pub const DEFAULT_REFLECTION_COEFF: f64 = 0.95;

    /// Thickness of each reflector shell (mm).
    pub const SHELL_THICKNESS: f64 = 40.0;

    /// Width of the rigid frame around the grid, in cells.
    pub const EDGE_MARGIN_CELLS: usize = 5;

    /// Canonical grid resolution (cells per side).
    pub const CANONICAL_RESOLUTION: usize = 300;

    /// Canonical domain bounds (mm).
    pub const CANONICAL_X_MIN: f64 = -300.0;
    pub const CANONICAL_X_MAX: f64 = 300.0;
    pub const CANONICAL_Y_MIN: f64 = -100.0;
    pub const CANONICAL_Y_MAX: f64 = 150.0;
}

/// A point in physical coordinates (mm).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    /// Create a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The origin, where both reflectors share their focus.
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Dot product with another vector.
    #[inline]
    pub fn dot(&self, other: &Point2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Euclidean length.
    #[inline]
    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }
}

/// Immutable description of the simulation grid.
///
/// The grid is `resolution` x `resolution` cells covering the inclusive
/// rectangle `[x_min, x_max] x [y_min, y_max]`. Row 0 is the top of the
/// domain (`y_max`), column 0 is the left edge (`x_min`).
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,

    /// Cells per side.
    pub resolution: usize,

    /// Global time step (s).
    pub time_step: f64,

    /// Linear damping coefficient folded into the update.
    pub damping: f64,

    /// Reflection coefficient. Rigid cells are hard-zeroed, so this value is
    /// carried for graded reflectivity but never read by the integrator.
    pub reflection_coeff: f64,

    /// Cells on every side forced to RIGID.
    pub edge_margin: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        let mut config = Self {
            x_min: constants::CANONICAL_X_MIN,
            x_max: constants::CANONICAL_X_MAX,
            y_min: constants::CANONICAL_Y_MIN,
            y_max: constants::CANONICAL_Y_MAX,
            resolution: constants::CANONICAL_RESOLUTION,
            time_step: 0.0,
            damping: constants::DEFAULT_DAMPING,
            reflection_coeff: constants::DEFAULT_REFLECTION_COEFF,
            edge_margin: constants::EDGE_MARGIN_CELLS,
        };
        config.time_step = max_stable_time_step(&config, constants::SHELL_SPEED);
        config
    }
}

impl GridConfig {
    /// Create a grid over the given bounds.
    ///
    /// The time step starts at zero; call [`GridConfig::with_time_step`] or
    /// [`GridConfig::with_stable_time_step`] before building a field.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64, resolution: usize) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            resolution,
            time_step: 0.0,
            damping: constants::DEFAULT_DAMPING,
            reflection_coeff: constants::DEFAULT_REFLECTION_COEFF,
            edge_margin: constants::EDGE_MARGIN_CELLS,
        }
    }

    /// Set the resolution, keeping the bounds.
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the time step explicitly.
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Replace the time step with the largest CFL-stable value for `fastest_speed`.
    pub fn with_stable_time_step(mut self, fastest_speed: f64) -> Self {
        self.time_step = max_stable_time_step(&self, fastest_speed);
        self
    }

    /// Set the damping coefficient.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Set the reflection coefficient.
    pub fn with_reflection_coeff(mut self, reflection_coeff: f64) -> Self {
        self.reflection_coeff = reflection_coeff;
        self
    }

    /// Set the rigid frame width in cells.
    pub fn with_edge_margin(mut self, edge_margin: usize) -> Self {
        self.edge_margin = edge_margin;
        self
    }

    /// Check that the configuration describes a usable grid.
    pub fn validate(&self) -> Result<()> {
        self.validate_layout()?;
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(WaveSimError::invalid_grid(format!(
                "time step must be positive, got {}",
                self.time_step
            )));
        }
        if !self.damping.is_finite() || self.damping < 0.0 {
            return Err(WaveSimError::invalid_grid(format!(
                "damping must be non-negative, got {}",
                self.damping
            )));
        }
        if !self.reflection_coeff.is_finite() {
            return Err(WaveSimError::invalid_grid("reflection coefficient must be finite"));
        }
        Ok(())
    }

    /// Check bounds, resolution and edge margin only.
    ///
    /// Anything derived from the cell spacing, such as a stable time step, is
    /// meaningful only once this passes.
    pub fn validate_layout(&self) -> Result<()> {
        let bounds = [self.x_min, self.x_max, self.y_min, self.y_max];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(WaveSimError::invalid_grid("bounds must be finite"));
        }
        if self.x_max <= self.x_min || self.y_max <= self.y_min {
            return Err(WaveSimError::invalid_grid(format!(
                "bounds must be increasing, got x [{}, {}] y [{}, {}]",
                self.x_min, self.x_max, self.y_min, self.y_max
            )));
        }
        if self.resolution < 3 {
            return Err(WaveSimError::invalid_grid(format!(
                "resolution must be at least 3, got {}",
                self.resolution
            )));
        }
        if 2 * self.edge_margin > self.resolution {
            return Err(WaveSimError::invalid_grid(format!(
                "edge margin {} exceeds half of resolution {}",
                self.edge_margin, self.resolution
            )));
        }
        Ok(())
    }

    /// Cell intervals per side, never zero so spacing stays finite before
    /// [`GridConfig::validate`] has rejected a degenerate resolution.
    #[inline]
    fn intervals(&self) -> f64 {
        self.resolution.saturating_sub(1).max(1) as f64
    }

    /// Horizontal cell spacing.
    #[inline]
    pub fn dx(&self) -> f64 {
        (self.x_max - self.x_min) / self.intervals()
    }

    /// Vertical cell spacing.
    #[inline]
    pub fn dy(&self) -> f64 {
        (self.y_max - self.y_min) / self.intervals()
    }

    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.resolution * self.resolution
    }

    /// Row-major linear index of `(row, col)`.
    #[inline(always)]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.resolution + col
    }

    /// Physical coordinates of the cell at `(row, col)`.
    #[inline]
    pub fn coordinates(&self, row: usize, col: usize) -> Point2D {
        Point2D::new(
            self.x_min + col as f64 * self.dx(),
            self.y_max - row as f64 * self.dy(),
        )
    }

    /// Nearest cell to a physical point, clamped into the grid.
    pub fn cell_of(&self, point: Point2D) -> (usize, usize) {
        let last = self.resolution.saturating_sub(1) as f64;
        let row = ((self.y_max - point.y) / self.dy()).round().clamp(0.0, last);
        let col = ((point.x - self.x_min) / self.dx()).round().clamp(0.0, last);
        (row as usize, col as usize)
    }

    /// True if `(row, col)` lies within the rigid frame.
    #[inline]
    pub fn in_edge_margin(&self, row: usize, col: usize) -> bool {
        let n = self.resolution;
        let m = self.edge_margin;
        row < m || col < m || row + m >= n || col + m >= n
    }
}

/// Parameters of the excitation and the ambient medium.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveParams {
    /// Source centre frequency (Hz).
    pub frequency: f64,

    /// Ambient propagation speed (mm/s).
    pub speed: f64,

    /// Source amplitude before the fixed gain is applied.
    pub amplitude: f64,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            frequency: constants::DEFAULT_FREQUENCY,
            speed: constants::AMBIENT_SPEED,
            amplitude: 1.0,
        }
    }
}

impl WaveParams {
    /// Create wave parameters.
    pub fn new(frequency: f64, speed: f64, amplitude: f64) -> Self {
        Self {
            frequency,
            speed,
            amplitude,
        }
    }

    /// Set the source frequency.
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    /// Set the source amplitude.
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Check the parameters are physically meaningful.
    pub fn validate(&self) -> Result<()> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(WaveSimError::invalid_wave_params(format!(
                "frequency must be positive, got {}",
                self.frequency
            )));
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(WaveSimError::invalid_wave_params(format!(
                "speed must be positive, got {}",
                self.speed
            )));
        }
        if !self.amplitude.is_finite() {
            return Err(WaveSimError::invalid_wave_params("amplitude must be finite"));
        }
        Ok(())
    }

    /// Wavelength in the ambient medium (mm).
    pub fn wavelength(&self) -> f64 {
        self.speed / self.frequency
    }

    /// Number of cells per ambient wavelength for spacing `spacing`.
    pub fn cells_per_wavelength(&self, spacing: f64) -> f64 {
        self.wavelength() / spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_is_canonical() {
        let config = GridConfig::default();
        assert_eq!(config.resolution, 300);
        assert_eq!(config.edge_margin, 5);
        assert!(config.validate().is_ok());
        assert!((config.dx() - 600.0 / 299.0).abs() < 1e-12);
        assert!((config.dy() - 250.0 / 299.0).abs() < 1e-12);
    }

    #[test]
    fn test_default_time_step_is_shell_stable() {
        let config = GridConfig::default();
        let expected = 0.4 * config.dy() / (constants::SHELL_SPEED * 2f64.sqrt());
        assert!((config.time_step - expected).abs() < 1e-20);
    }

    #[test]
    fn test_validate_rejects_bad_grids() {
        let base = GridConfig::default();

        assert!(base.clone().with_resolution(2).validate().is_err());
        assert!(base.clone().with_time_step(0.0).validate().is_err());
        assert!(base.clone().with_time_step(f64::NAN).validate().is_err());
        assert!(base.clone().with_damping(-1.0).validate().is_err());
        assert!(base.clone().with_edge_margin(151).validate().is_err());

        let flipped = GridConfig::new(1.0, -1.0, 0.0, 1.0, 10).with_time_step(1e-6);
        assert!(matches!(flipped.validate(), Err(WaveSimError::InvalidGrid(_))));
    }

    #[test]
    fn test_degenerate_resolution_is_rejected_not_panicking() {
        for resolution in [0, 1, 2] {
            let config = GridConfig::default()
                .with_resolution(resolution)
                .with_stable_time_step(constants::SHELL_SPEED);
            assert!(config.dx().is_finite());
            assert!(config.dy().is_finite());
            assert!(config.time_step > 0.0);
            assert_eq!(config.cell_of(Point2D::origin()), (0, 0));
            assert!(matches!(config.validate(), Err(WaveSimError::InvalidGrid(_))));
        }
    }

    #[test]
    fn test_coordinates_row_zero_is_top() {
        let config = GridConfig::new(0.0, 10.0, 0.0, 10.0, 11).with_time_step(1e-6);
        assert_eq!(config.coordinates(0, 0), Point2D::new(0.0, 10.0));
        assert_eq!(config.coordinates(10, 10), Point2D::new(10.0, 0.0));
        assert_eq!(config.coordinates(3, 7), Point2D::new(7.0, 7.0));
    }

    #[test]
    fn test_cell_of_rounds_and_clamps() {
        let config = GridConfig::new(0.0, 10.0, 0.0, 10.0, 11).with_time_step(1e-6);
        assert_eq!(config.cell_of(Point2D::new(2.4, 7.6)), (2, 2));
        assert_eq!(config.cell_of(Point2D::new(-50.0, 50.0)), (0, 0));
        assert_eq!(config.cell_of(Point2D::new(50.0, -50.0)), (10, 10));
    }

    #[test]
    fn test_edge_margin() {
        let config = GridConfig::new(0.0, 1.0, 0.0, 1.0, 20).with_edge_margin(5);
        assert!(config.in_edge_margin(0, 10));
        assert!(config.in_edge_margin(4, 10));
        assert!(!config.in_edge_margin(5, 10));
        assert!(!config.in_edge_margin(14, 14));
        assert!(config.in_edge_margin(15, 10));
        assert!(config.in_edge_margin(10, 19));
    }

    #[test]
    fn test_wavelength() {
        let params = WaveParams::default();
        assert!((params.wavelength() - 343.0).abs() < 1e-9);
        assert!((params.cells_per_wavelength(2.0) - 171.5).abs() < 1e-9);
    }

    #[test]
    fn test_wave_params_validate() {
        assert!(WaveParams::default().validate().is_ok());
        assert!(WaveParams::default().with_frequency(0.0).validate().is_err());
        assert!(WaveParams::default().with_amplitude(f64::INFINITY).validate().is_err());
        assert!(WaveParams::new(1000.0, -1.0, 1.0).validate().is_err());
    }
}
