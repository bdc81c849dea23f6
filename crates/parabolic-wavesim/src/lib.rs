//! # Parabolic WaveSim
//!
//! 2D scalar acoustic wave propagation in the cavity between two confocal
//! parabolic reflectors.
//!
//! A downward-opening outer reflector and an upward-opening inner reflector
//! share a focus where a Morlet wavelet pulse is injected. Every grid cell is
//! classified once as open medium, reflector shell or rigid, and the field is
//! advanced with an explicit finite-difference leapfrog scheme using
//! per-material propagation speeds.
//!
//! ## Features
//!
//! - Canonical and alternate reflector profiles
//! - CFL stability reporting
//! - Row-parallel stepping with rayon
//! - Thread-safe snapshots of completed steps
//! - Point probes for time series
//!
//! ## Run
//!
//! ```bash
//! cargo run --release -p parabolic-wavesim --bin benchmark
//! ```

pub mod error;
pub mod simulation;

pub use error::{Result, WaveSimError};
pub use simulation::{DualParabolicSimulation, SimulationConfig, WaveField};

/// Commonly used types.
pub mod prelude {
    pub use crate::error::{Result, WaveSimError};
    pub use crate::simulation::{
        DualParabolicSimulation, FieldSnapshot, FieldStats, GridConfig, MaterialType, MediaConfig,
        Opening, Parabola, Point2D, ReflectorProfile, ShellSpeed, SimulationConfig, StepMode,
        WaveField, WaveParams,
    };
}
