//! CFL stability checks for the explicit 2D scheme.

use super::config::GridConfig;
use super::material::MediumSpeeds;

/// Safety factor applied to the 2D CFL bound `min(dx, dy) / (c * sqrt(2))`.
pub const CFL_FACTOR: f64 = 0.4;

/// Largest time step that keeps the scheme stable for `fastest_speed`.
///
/// `dt_max = CFL_FACTOR * min(dx, dy) / (fastest_speed * sqrt(2))`
pub fn max_stable_time_step(config: &GridConfig, fastest_speed: f64) -> f64 {
    let spacing = config.dx().min(config.dy());
    CFL_FACTOR * spacing / (fastest_speed * std::f64::consts::SQRT_2)
}

/// Courant number `c * dt / h` for a given speed, step and spacing.
pub fn courant_number(speed: f64, time_step: f64, spacing: f64) -> f64 {
    speed * time_step / spacing
}

/// Outcome of a stability check.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityReport {
    pub dx: f64,
    pub dy: f64,
    pub open_speed: f64,
    pub shell_speed: f64,
    /// Fastest non-zero propagation speed in the grid.
    pub fastest_speed: f64,
    /// Time step the grid is configured with.
    pub time_step: f64,
    /// Recommended (maximum stable) time step.
    pub max_stable_time_step: f64,
}

impl StabilityReport {
    /// Evaluate `config` against the given media without logging.
    pub fn evaluate(config: &GridConfig, speeds: &MediumSpeeds) -> Self {
        let fastest_speed = speeds.fastest();
        Self {
            dx: config.dx(),
            dy: config.dy(),
            open_speed: speeds.open,
            shell_speed: speeds.shell,
            fastest_speed,
            time_step: config.time_step,
            max_stable_time_step: max_stable_time_step(config, fastest_speed),
        }
    }

    /// True if the configured step does not exceed the bound.
    pub fn is_stable(&self) -> bool {
        self.time_step <= self.max_stable_time_step
    }

    /// Configured step relative to the bound.
    pub fn ratio(&self) -> f64 {
        self.time_step / self.max_stable_time_step
    }
}

/// Check `config` against the given media and warn if it violates the bound.
///
/// The violation is not fatal: the configured step is kept as-is.
pub fn check_stability(config: &GridConfig, speeds: &MediumSpeeds) -> StabilityReport {
    let report = StabilityReport::evaluate(config, speeds);
    if !report.is_stable() {
        tracing::warn!(
            dx = report.dx,
            dy = report.dy,
            open_speed = report.open_speed,
            shell_speed = report.shell_speed,
            fastest_speed = report.fastest_speed,
            time_step = report.time_step,
            recommended_time_step = report.max_stable_time_step,
            "Time step exceeds CFL stability limit by {:.2}x",
            report.ratio()
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::constants;

    fn unit_grid(time_step: f64) -> GridConfig {
        // 101 cells over 100 mm gives dx = dy = 1 mm
        GridConfig::new(0.0, 100.0, 0.0, 100.0, 101).with_time_step(time_step)
    }

    #[test]
    fn test_max_stable_time_step_unit_spacing() {
        let dt = max_stable_time_step(&unit_grid(1e-7), 343_000.0);
        let expected = 0.4 / (343_000.0 * 2f64.sqrt());
        assert!((dt - expected).abs() < 1e-20);
        assert!((dt - 8.246e-7).abs() < 1e-9);
    }

    #[test]
    fn test_stability_threshold() {
        let speeds = MediumSpeeds::new(343_000.0, 0.0);
        let limit = max_stable_time_step(&unit_grid(1e-7), 343_000.0);

        assert!(check_stability(&unit_grid(limit), &speeds).is_stable());
        assert!(check_stability(&unit_grid(limit * 0.5), &speeds).is_stable());
        assert!(!check_stability(&unit_grid(limit * 1.01), &speeds).is_stable());
    }

    #[test]
    fn test_fastest_medium_drives_bound() {
        let speeds = MediumSpeeds::new(constants::AMBIENT_SPEED, constants::SHELL_SPEED);
        let air_only = max_stable_time_step(&unit_grid(1e-7), constants::AMBIENT_SPEED);

        let report = StabilityReport::evaluate(&unit_grid(air_only), &speeds);
        assert_eq!(report.fastest_speed, constants::SHELL_SPEED);
        assert!(!report.is_stable());
        assert!(report.ratio() > 4.0);
    }

    #[test]
    fn test_courant_number() {
        let dt = max_stable_time_step(&unit_grid(1e-7), 343_000.0);
        let c = courant_number(343_000.0, dt, 1.0);
        assert!((c - 0.4 / 2f64.sqrt()).abs() < 1e-12);
    }
}
