//! Unit conversion for the depth axis.
//!
//! The piezo is addressed in its native scale (0..100 over the full
//! travel, micrometer-sized steps) while callers work in meters centered
//! at zero. One fixed affine map covers both directions so a written
//! value always reads back identically.

/// Native units per meter (the actuator's scale is micrometer-sized).
const UNITS_PER_METER: f64 = 1e6;

/// Fixed affine mapping between caller meters and actuator-native units.
///
/// `to_actuator` and `to_meters` are exact inverses of each other; both
/// are pure and side-effect free.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthConversion {
    offset: f64,
}

impl DepthConversion {
    /// Build a conversion with the given native value at z = 0.
    pub fn new(offset: f64) -> Self {
        Self { offset }
    }

    /// Native value corresponding to z = 0.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Caller position, meters, to actuator-native value.
    pub fn to_actuator(&self, meters: f64) -> f64 {
        meters * UNITS_PER_METER + self.offset
    }

    /// Actuator-native reading to caller position, meters.
    pub fn to_meters(&self, reading: f64) -> f64 {
        (reading - self.offset) / UNITS_PER_METER
    }
}
