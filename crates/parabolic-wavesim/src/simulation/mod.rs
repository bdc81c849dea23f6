//! Simulation core for wave propagation between two parabolic reflectors.
//!
//! Geometry and material classification run once at construction. After
//! that the [`WaveField`] owns its buffers and advances them one explicit
//! step at a time.

pub mod config;
pub mod engine;
pub mod excitation;
pub mod field;
pub mod geometry;
pub mod material;
pub mod physics;
pub mod probe;
pub mod snapshot;

pub use config::{constants, GridConfig, Point2D, WaveParams};
pub use engine::{DualParabolicSimulation, ReflectorProfile, SimulationConfig};
pub use excitation::{MorletPulse, SourceInjector};
pub use field::{FieldStats, StepMode, WaveField, PARALLEL_THRESHOLD};
pub use geometry::{Opening, Parabola};
pub use material::{MaterialMap, MaterialType, MediaConfig, MediumSpeeds, ShellSpeed};
pub use physics::{check_stability, max_stable_time_step, StabilityReport, CFL_FACTOR};
pub use probe::{Probe, ProbeSample};
pub use snapshot::{FieldSnapshot, SnapshotPublisher, SnapshotReader};
