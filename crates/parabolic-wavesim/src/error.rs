//! Error types for wave field construction and configuration.

use thiserror::Error;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, WaveSimError>;

/// Errors that can occur while configuring a simulation.
///
/// Stepping itself never fails; every variant here is raised at
/// construction time or by an explicit runtime setter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WaveSimError {
    /// Grid bounds, resolution, time step or damping are unusable.
    #[error("Invalid grid configuration: {0}")]
    InvalidGrid(String),

    /// A reflector definition is malformed.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Source frequency, propagation speed or amplitude is unusable.
    #[error("Invalid wave parameters: {0}")]
    InvalidWaveParams(String),

    /// A cell index lies outside the grid.
    #[error("Cell ({row}, {col}) is outside a {resolution}x{resolution} grid")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        resolution: usize,
    },
}

impl WaveSimError {
    /// Create an invalid grid error.
    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }

    /// Create an invalid geometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Create an invalid wave parameters error.
    pub fn invalid_wave_params(msg: impl Into<String>) -> Self {
        Self::InvalidWaveParams(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WaveSimError::invalid_grid("resolution must be at least 3");
        assert_eq!(
            err.to_string(),
            "Invalid grid configuration: resolution must be at least 3"
        );

        let err = WaveSimError::IndexOutOfBounds {
            row: 10,
            col: 2,
            resolution: 8,
        };
        assert_eq!(err.to_string(), "Cell (10, 2) is outside a 8x8 grid");
    }
}
