//! The composite scan controller and its unit-conversion seam.

pub mod composite;
pub mod units;

pub use composite::CompositeScanController;
pub use units::DepthConversion;
