//! Shared data types for the composite scanner.
//!
//! These are the values that cross the boundary between the imaging
//! engine, the composite controller, and the hardware capability traits:
//! axis ranges, scan paths, and per-pixel photon counts. `ScanPath` is
//! validated at construction, so every path a caller can hand to the
//! controller already satisfies the length invariants.

use crate::error::{ScanError, ScanResult};
use serde::Deserialize;

/// Per-pixel photon-count rates: `k` pixels by `m` channels, in
/// counts/second, ordered as the originating scan path.
pub type PixelCounts = Vec<Vec<f64>>;

/// A closed interval `[low, high]` over one axis, in a declared unit
/// (meters for positions, the actuator's native scale for voltages).
///
/// The invariant `low <= high` holds for every constructed value,
/// including values deserialized from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "[f64; 2]")]
pub struct AxisRange {
    low: f64,
    high: f64,
}

impl AxisRange {
    /// Build a range, rejecting `low > high`.
    pub fn new(low: f64, high: f64) -> ScanResult<Self> {
        if low > high {
            return Err(ScanError::Configuration(format!(
                "axis range low {low} exceeds high {high}"
            )));
        }
        Ok(Self { low, high })
    }

    /// A range symmetric about zero with the given half-span.
    pub fn symmetric(half_span: f64) -> Self {
        let half_span = half_span.abs();
        Self {
            low: -half_span,
            high: half_span,
        }
    }

    /// Lower bound.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Upper bound.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Whether `value` lies inside the closed interval.
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

impl TryFrom<[f64; 2]> for AxisRange {
    type Error = ScanError;

    fn try_from(pair: [f64; 2]) -> ScanResult<Self> {
        Self::new(pair[0], pair[1])
    }
}

/// Classification of a scan path, derived fresh per call and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanClassification {
    /// Only the two fast galvo axes vary per pixel; z is constant.
    Lateral,
    /// Only the slow piezo axis varies; the lateral position is held.
    Depth,
    /// Depth varies while a lateral axis also varies. Rejected.
    Unsupported,
}

/// An ordered sequence of `(x, y, z)` sample positions in meters, one
/// tuple per pixel to acquire.
///
/// Constructed per scan-line request and consumed synchronously by the
/// controller. All three coordinate sequences have equal length `k >= 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPath {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl ScanPath {
    /// Build a path from three coordinate sequences.
    ///
    /// Fails with [`ScanError::MalformedScanPath`] on an empty path or
    /// mismatched sequence lengths.
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> ScanResult<Self> {
        if x.len() != y.len() || x.len() != z.len() {
            return Err(ScanError::MalformedScanPath(format!(
                "coordinate lengths differ: x={} y={} z={}",
                x.len(),
                y.len(),
                z.len()
            )));
        }
        if x.is_empty() {
            return Err(ScanError::MalformedScanPath("scan path is empty".into()));
        }
        Ok(Self { x, y, z })
    }

    /// Number of samples in the path.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always false for a constructed path; present for API completeness.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// The x coordinate sequence, meters.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// The y coordinate sequence, meters.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// The z coordinate sequence, meters.
    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// The lateral portion of the path as `(x, y)` tuples, the shape the
    /// galvo's line-scan primitive consumes.
    pub fn lateral(&self) -> Vec<(f64, f64)> {
        self.x.iter().copied().zip(self.y.iter().copied()).collect()
    }

    /// Classify the path by coordinate constancy, in priority order:
    /// constant z wins (lateral scan) even when x and y are also constant.
    pub fn classify(&self) -> ScanClassification {
        // Constancy is exact repetition of the first element.
        fn constant(seq: &[f64]) -> bool {
            seq.iter().all(|v| *v == seq[0])
        }

        if constant(&self.z) {
            ScanClassification::Lateral
        } else if constant(&self.x) && constant(&self.y) {
            ScanClassification::Depth
        } else {
            ScanClassification::Unsupported
        }
    }
}
