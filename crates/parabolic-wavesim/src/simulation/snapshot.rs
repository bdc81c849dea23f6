//! Read-only views of completed steps for other threads.
//!
//! The integrator owns its buffers exclusively. Consumers such as renderers
//! or exporters get an immutable [`FieldSnapshot`], published only after a
//! step has fully completed, so they never observe a half-written buffer.

use std::sync::Arc;

use parking_lot::RwLock;

/// Immutable copy of the field after a completed step.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSnapshot {
    /// Step count when the snapshot was taken.
    pub step: u64,
    /// Simulated time when the snapshot was taken (s).
    pub time: f64,
    resolution: usize,
    values: Arc<[f32]>,
}

impl FieldSnapshot {
    /// Copy `values` into a new snapshot.
    pub fn new(step: u64, time: f64, resolution: usize, values: &[f32]) -> Self {
        Self {
            step,
            time,
            resolution,
            values: Arc::from(values),
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Field values, row-major.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        let n = self.resolution;
        (row < n && col < n).then(|| self.values[row * n + col])
    }

    /// Largest absolute value.
    pub fn max_amplitude(&self) -> f32 {
        self.values.iter().map(|v| v.abs()).fold(0.0, f32::max)
    }
}

type SharedSlot = Arc<RwLock<Option<FieldSnapshot>>>;

/// Writer side of a snapshot slot, held by the stepping thread.
#[derive(Debug, Default)]
pub struct SnapshotPublisher {
    slot: SharedSlot,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot.
    pub fn publish(&self, snapshot: FieldSnapshot) {
        *self.slot.write() = Some(snapshot);
    }

    /// Create a reader sharing this slot.
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Reader side of a snapshot slot. Cheap to clone and send across threads.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    slot: SharedSlot,
}

impl SnapshotReader {
    /// Most recently published snapshot, if any.
    ///
    /// The returned snapshot shares its buffer with the slot; the lock is
    /// released before returning.
    pub fn latest(&self) -> Option<FieldSnapshot> {
        self.slot.read().clone()
    }

    /// Step count of the latest snapshot.
    pub fn latest_step(&self) -> Option<u64> {
        self.slot.read().as_ref().map(|s| s.step)
    }
}
