//! Point probes recording the field at a fixed cell over time.

/// A single recorded value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeSample {
    /// Simulated time of the sample (s).
    pub time: f64,
    /// Field value at the probe cell.
    pub value: f32,
}

/// Time series of the field at one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    row: usize,
    col: usize,
    index: usize,
    limit: Option<usize>,
    samples: Vec<ProbeSample>,
}

impl Probe {
    /// Probe at `(row, col)` on a grid with `resolution` cells per side.
    ///
    /// Keeps one sample per step for as long as it exists.
    pub fn new(row: usize, col: usize, resolution: usize) -> Self {
        Self {
            row,
            col,
            index: row * resolution + col,
            limit: None,
            samples: Vec::new(),
        }
    }

    /// Probe that stops recording once it holds `limit` samples.
    pub fn with_limit(row: usize, col: usize, resolution: usize, limit: usize) -> Self {
        Self {
            limit: Some(limit),
            samples: Vec::with_capacity(limit.min(4096)),
            ..Self::new(row, col, resolution)
        }
    }

    /// Maximum number of samples kept, if bounded.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Whether a bounded probe has stopped recording.
    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.samples.len() >= limit)
    }

    /// Append the value of `field` at the probe cell. No-op once full.
    #[inline]
    pub fn record(&mut self, time: f64, field: &[f32]) {
        if self.is_full() {
            return;
        }
        self.samples.push(ProbeSample {
            time,
            value: field[self.index],
        });
    }

    /// Drop all samples, keeping the position.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Probe cell `(row, col)`.
    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn samples(&self) -> &[ProbeSample] {
        &self.samples
    }

    /// Recorded values without their times.
    pub fn values(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Sample with the largest absolute value.
    pub fn peak(&self) -> Option<ProbeSample> {
        self.samples
            .iter()
            .copied()
            .max_by(|a, b| a.value.abs().total_cmp(&b.value.abs()))
    }

    /// Time of the first sample whose magnitude exceeds `threshold`.
    pub fn arrival_time(&self, threshold: f32) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| s.value.abs() > threshold)
            .map(|s| s.time)
    }
}
